//! Benchmark for slaw construction, transcoding, traversal, ordering and
//! stream I/O.
//!
//! With a JSON file argument, every top-level array element (or the whole
//! document) becomes one protein record; without one, a synthetic gesture
//! corpus is generated.

use std::fs;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use slaw::{
    convert_from, convert_to, validate, Endian, ReadOptions, Slabu, Slaw, SlawReader, SlawWriter, WriteOptions, V2,
};

const SYNTHETIC_RECORDS: usize = 20_000;
const ITERS: u32 = 5;

// =============================================================================
// CORPUS
// =============================================================================

/// Converts a JSON value into the equivalent slaw tree.
fn json_to_slaw(v: &Value) -> Slaw {
    let s = match v {
        Value::Null => Slaw::nil(),
        Value::Bool(b) => Slaw::boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Slaw::scalar(i)
            } else if let Some(u) = n.as_u64() {
                Slaw::scalar(u)
            } else {
                Slaw::scalar(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Slaw::string(&s.replace('\0', "")),
        Value::Array(items) => {
            let mut b = Slabu::new();
            for item in items {
                b.push(json_to_slaw(item));
            }
            b.into_list()
        }
        Value::Object(fields) => {
            let mut b = Slabu::new();
            for (k, item) in fields {
                let key = Slaw::string(&k.replace('\0', "")).expect("Failed to build key");
                b.map_put(key, json_to_slaw(item)).expect("Failed to add map entry");
            }
            b.into_map()
        }
    };
    s.expect("Failed to convert JSON value")
}

fn json_corpus(path: &str) -> Vec<Slaw> {
    let text = fs::read_to_string(path).expect("Failed to read JSON input");
    let doc: Value = serde_json::from_str(&text).expect("Failed to parse JSON");
    let items = match doc {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut descrips = Slabu::new();
            descrips.push(Slaw::string("json-record").expect("Failed to build descrip"));
            descrips.push(Slaw::scalar(i as u64).expect("Failed to build descrip"));
            let descrips = descrips.into_list().expect("Failed to build descrips");
            let ingests = match json_to_slaw(item) {
                m if m.view().list().is_some_and(|l| l.is_map()) => m,
                other => Slaw::map([(&Slaw::string("value").expect("key"), &other)]).expect("Failed to wrap value"),
            };
            Slaw::protein(Some(&descrips), Some(&ingests), &[]).expect("Failed to build protein")
        })
        .collect()
}

const GESTURES: [&str; 4] = ["point", "pinch", "swipe", "victory"];

fn synthetic_record(i: usize) -> slaw::Result<Slaw> {
    let mut descrips = Slabu::new();
    descrips.push(Slaw::string("gesture")?);
    descrips.push(Slaw::string(GESTURES[i % GESTURES.len()])?);
    if i % 3 == 0 {
        descrips.push(Slaw::string("left-hand")?);
    }

    let t = i as f64 * 0.001;
    let samples: Vec<f32> = (0..64).map(|k| ((i + k) as f32 * 0.1).sin()).collect();
    let mut ingests = Slabu::new();
    ingests.map_put(Slaw::string("id")?, Slaw::scalar(i as u64)?)?;
    ingests.map_put(Slaw::string("name")?, Slaw::string(&format!("hand-{}", i % 10))?)?;
    ingests.map_put(Slaw::string("pos")?, Slaw::vector(&[t.cos(), t.sin(), t])?)?;
    ingests.map_put(Slaw::string("rot")?, Slaw::complex(t.cos() as f32, t.sin() as f32)?)?;
    ingests.map_put(Slaw::string("samples")?, Slaw::array(&samples)?)?;
    ingests.map_put(
        Slaw::string("fingers")?,
        Slaw::list([&Slaw::boolean(i % 2 == 0)?, &Slaw::boolean(i % 5 == 0)?])?,
    )?;
    ingests.map_put(Slaw::string("range")?, Slaw::cons(&Slaw::scalar(-1i32)?, &Slaw::scalar(1i32)?)?)?;

    let rude: Vec<u8> = (0..(i % 24)).map(|b| b as u8).collect();
    descrips.into_protein(Some(ingests), &rude)
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Serialize)]
struct Phase {
    name: &'static str,
    micros: u128,
    bytes: usize,
    mb_per_sec: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    source: String,
    records: usize,
    v2_bytes: usize,
    v1_bytes: usize,
    stream_bytes: usize,
    compressed_bytes: usize,
    phases: Vec<Phase>,
}

fn phase(name: &'static str, elapsed: Duration, bytes: usize) -> Phase {
    let secs = elapsed.as_secs_f64();
    let mb_per_sec = if secs > 0.0 { (bytes as f64 / 1_000_000.0) / secs } else { 0.0 };
    println!("\n{}: {:?}", name, elapsed);
    println!("  Throughput: {:.2} MB/s", mb_per_sec);
    Phase { name, micros: elapsed.as_micros(), bytes, mb_per_sec }
}

fn averaged<T>(mut f: impl FnMut() -> T) -> (T, Duration) {
    // Warmup
    let _ = f();
    let start = Instant::now();
    let mut last = None;
    for _ in 0..ITERS {
        last = Some(f());
    }
    let elapsed = start.elapsed() / ITERS;
    (last.expect("ITERS is nonzero"), elapsed)
}

fn main() {
    let input = std::env::args().nth(1);
    let mut phases = Vec::new();

    let build_start = Instant::now();
    let (source, corpus) = match &input {
        Some(path) => {
            println!("Loading records from: {}", path);
            (path.clone(), json_corpus(path))
        }
        None => {
            println!("Generating {} synthetic records", SYNTHETIC_RECORDS);
            let corpus = (0..SYNTHETIC_RECORDS)
                .map(synthetic_record)
                .collect::<slaw::Result<Vec<_>>>()
                .expect("Failed to build corpus");
            ("synthetic".to_string(), corpus)
        }
    };
    let build_time = build_start.elapsed();
    let v2_bytes: usize = corpus.iter().map(Slaw::len_bytes).sum();
    println!("Built {} records ({} bytes) in {:?}", corpus.len(), v2_bytes, build_time);
    phases.push(phase("build", build_time, v2_bytes));

    // Validation walk
    let (_, validate_time) = averaged(|| {
        for s in &corpus {
            validate(&V2, s.as_bytes()).expect("Corpus record failed validation");
        }
    });
    phases.push(phase("validate", validate_time, v2_bytes));

    // v2 -> v1
    let (v1, down_time) = averaged(|| {
        corpus
            .iter()
            .map(|s| convert_to(s, slaw::limits::SLAW_VERSION_V1).expect("Failed to downgrade").0)
            .collect::<Vec<_>>()
    });
    let v1_bytes: usize = v1.iter().map(Vec::len).sum();
    phases.push(phase("convert v2->v1", down_time, v2_bytes));

    // v1 -> v2
    let (back, up_time) = averaged(|| {
        v1.iter()
            .map(|b| convert_from(b.clone(), Endian::Current, slaw::limits::SLAW_VERSION_V1).expect("Failed to upgrade"))
            .collect::<Vec<_>>()
    });
    assert_eq!(back, corpus, "v1 round trip must preserve every record");
    phases.push(phase("convert v1->v2", up_time, v1_bytes));

    // Semantic sort
    let (sorted, sort_time) = averaged(|| {
        let mut sorted = corpus.clone();
        sorted.sort();
        sorted
    });
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    phases.push(phase("sort", sort_time, v2_bytes));

    // Descrip search
    let needle = Slaw::list([&Slaw::string("gesture").expect("needle"), &Slaw::string("pinch").expect("needle")])
        .expect("Failed to build needle");
    let (hits, search_time) = averaged(|| {
        corpus
            .iter()
            .filter(|s| s.view().protein().is_some_and(|p| p.search(&needle).is_some()))
            .count()
    });
    println!("\nDescrips matching [gesture, pinch]: {}", hits);
    phases.push(phase("search", search_time, v2_bytes));

    // Stream write + read
    let write_stream = |options: WriteOptions| {
        let mut w = SlawWriter::with_options(Vec::new(), options).expect("Failed to open stream");
        for s in &corpus {
            w.write(s).expect("Failed to write record");
        }
        w.finish().expect("Failed to finish stream")
    };
    let (stream, stream_write_time) = averaged(|| write_stream(WriteOptions::new()));
    phases.push(phase("stream write", stream_write_time, stream.len()));

    let read_stream = |bytes: &[u8]| {
        SlawReader::with_options(bytes, ReadOptions::new())
            .expect("Failed to open stream")
            .collect::<slaw::Result<Vec<_>>>()
            .expect("Failed to read stream")
    };
    let (read_back, stream_read_time) = averaged(|| read_stream(&stream[..]));
    assert_eq!(read_back.len(), corpus.len());
    phases.push(phase("stream read", stream_read_time, stream.len()));

    let (compressed, compress_time) = averaged(|| write_stream(WriteOptions::new().compressed(3)));
    println!(
        "\nCompressed stream (level 3): {} bytes, ratio {:.1}x",
        compressed.len(),
        stream.len() as f64 / compressed.len() as f64
    );
    phases.push(phase("stream write (zstd)", compress_time, stream.len()));

    let (read_back, decompress_time) = averaged(|| read_stream(&compressed[..]));
    assert_eq!(read_back, corpus);
    phases.push(phase("stream read (zstd)", decompress_time, stream.len()));

    // Summary
    println!("\n=== Summary ===");
    println!("Records: {}", corpus.len());
    println!("v2 size: {} bytes ({:.1} MB)", v2_bytes, v2_bytes as f64 / 1_000_000.0);
    println!(
        "v1 size: {} bytes ({:.1}% of v2)",
        v1_bytes,
        100.0 * v1_bytes as f64 / v2_bytes as f64
    );
    println!("Stream: {} bytes, compressed {} bytes", stream.len(), compressed.len());

    let report = Report {
        source,
        records: corpus.len(),
        v2_bytes,
        v1_bytes,
        stream_bytes: stream.len(),
        compressed_bytes: compressed.len(),
        phases,
    };
    println!("\n=== JSON Report ===");
    println!("{}", serde_json::to_string_pretty(&report).expect("Failed to serialize report"));
}
