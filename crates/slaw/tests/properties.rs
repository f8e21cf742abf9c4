use std::cmp::Ordering;

use proptest::prelude::*;
use slaw::limits::SLAW_VERSION_V1;
use slaw::{
    convert_from, convert_to, ordering, Endian, Personality, Shape, Slaw, SlawCodec, SwapDirection, V1, V2,
};

fn numeric_leaf() -> impl Strategy<Value = Slaw> {
    prop_oneof![
        any::<i8>().prop_map(|v| Slaw::scalar(v).unwrap()),
        any::<u16>().prop_map(|v| Slaw::scalar(v).unwrap()),
        any::<i32>().prop_map(|v| Slaw::scalar(v).unwrap()),
        any::<u64>().prop_map(|v| Slaw::scalar(v).unwrap()),
        (-1.0e6f32..1.0e6).prop_map(|v| Slaw::scalar(v).unwrap()),
        (-1.0e12f64..1.0e12).prop_map(|v| Slaw::scalar(v).unwrap()),
        (any::<i16>(), any::<i16>()).prop_map(|(re, im)| Slaw::complex(re, im).unwrap()),
        prop::collection::vec(any::<u8>(), 2..=4).prop_map(|v| Slaw::vector(&v).unwrap()),
        prop::collection::vec(any::<i64>(), 0..40).prop_map(|v| Slaw::array(&v).unwrap()),
        prop::collection::vec(-100.0f64..100.0, 4..=4).prop_map(|v| Slaw::multivector(&v).unwrap()),
        prop::collection::vec(any::<[i32; 3]>(), 0..12).prop_map(|v| Slaw::vector_array(&v).unwrap()),
        Just(Slaw::empty_array(Personality::of::<u32>().with_shape(Shape::Vector(2)).unwrap()).unwrap()),
    ]
}

fn leaf() -> impl Strategy<Value = Slaw> {
    prop_oneof![
        Just(Slaw::nil().unwrap()),
        any::<bool>().prop_map(|b| Slaw::boolean(b).unwrap()),
        "[a-zA-Z0-9 éü]{0,24}".prop_map(|s| Slaw::string(&s).unwrap()),
        numeric_leaf(),
    ]
}

fn tree() -> impl Strategy<Value = Slaw> {
    leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..20).prop_map(|items| Slaw::list(&items).unwrap()),
            prop::collection::vec(("[a-d]{1,2}", inner.clone()), 0..8).prop_map(|pairs| {
                let keyed: Vec<(Slaw, Slaw)> =
                    pairs.into_iter().map(|(k, v)| (Slaw::string(&k).unwrap(), v)).collect();
                Slaw::map(keyed.iter().map(|(k, v)| (k, v))).unwrap()
            }),
            (inner.clone(), inner.clone()).prop_map(|(a, d)| Slaw::cons(&a, &d).unwrap()),
            (
                prop::option::of(prop::collection::vec(inner.clone(), 0..4)),
                prop::option::of(inner),
                prop::collection::vec(any::<u8>(), 0..40),
            )
                .prop_map(|(descrips, ingests, rude)| {
                    let descrips = descrips.map(|d| Slaw::list(&d).unwrap());
                    Slaw::protein(descrips.as_ref(), ingests.as_ref(), &rude).unwrap()
                }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_v1_roundtrip(s in tree()) {
        let (old, len) = convert_to(&s, SLAW_VERSION_V1).unwrap();
        prop_assert_eq!(len, old.len());
        let back = convert_from(old, Endian::Current, SLAW_VERSION_V1).unwrap();
        prop_assert_eq!(back, s);
    }

    #[test]
    fn prop_bytes_revalidate(s in tree()) {
        let again = Slaw::from_slice(s.as_bytes()).unwrap();
        prop_assert_eq!(again, s);
    }

    #[test]
    fn prop_double_swap_is_identity(s in tree()) {
        let mut v2 = s.as_bytes().to_vec();
        V2.swap(&mut v2, SwapDirection::ToForeign).unwrap();
        let foreign = v2.clone();
        V2.swap(&mut v2, SwapDirection::ToNative).unwrap();
        prop_assert_eq!(&v2[..], s.as_bytes());
        prop_assert_eq!(convert_from(foreign, Endian::Opposite, 2).unwrap(), s.clone());

        let (mut v1, _) = convert_to(&s, SLAW_VERSION_V1).unwrap();
        let native = v1.clone();
        V1.swap(&mut v1, SwapDirection::ToForeign).unwrap();
        V1.swap(&mut v1, SwapDirection::ToNative).unwrap();
        prop_assert_eq!(v1, native);
    }

    #[test]
    fn prop_ordering_antisymmetric(a in tree(), b in tree()) {
        let ab = ordering::compare(&V2, a.as_bytes(), b.as_bytes());
        let ba = ordering::compare(&V2, b.as_bytes(), a.as_bytes());
        prop_assert_eq!(ab, ba.reverse());
        if a == b {
            prop_assert_eq!(ab, Ordering::Equal);
        }
    }

    #[test]
    fn prop_ordering_transitive(a in tree(), b in tree(), c in tree()) {
        let le = |x: &Slaw, y: &Slaw| x.cmp(y) != Ordering::Greater;
        if le(&a, &b) && le(&b, &c) {
            prop_assert!(le(&a, &c));
        }
        if !le(&a, &b) && !le(&b, &c) {
            prop_assert_eq!(a.cmp(&c), Ordering::Greater);
        }
    }

    #[test]
    fn prop_sort_is_consistent(mut xs in prop::collection::vec(tree(), 0..12)) {
        xs.sort();
        for w in xs.windows(2) {
            prop_assert_ne!(w[0].cmp(&w[1]), Ordering::Greater);
        }
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Slaw::from_slice(&bytes);
        let _ = convert_from(bytes.clone(), Endian::Unknown, 2);
        let _ = convert_from(bytes.clone(), Endian::Opposite, SLAW_VERSION_V1);
        let _ = ordering::compare(&V2, &bytes, &bytes);
        let mut scratch = bytes.clone();
        let _ = V1.swap(&mut scratch, SwapDirection::ToNative);
        let _ = Slaw::from_stream_bytes(&bytes);
    }

    #[test]
    fn prop_header_prefixed_bytes_never_panic(
        word in any::<u64>(),
        rest in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut bytes = word.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&rest);
        let _ = Slaw::from_slice(&bytes);
        if let Ok(s) = Slaw::from_slice(&bytes) {
            let _ = slaw::overview(s.view());
        }
        let _ = V2.swap(&mut bytes, SwapDirection::ToNative);
    }
}
