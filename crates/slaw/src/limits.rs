//! Format constants and default safety limits.
//!
//! The decoder uses these to reject hostile input before allocating or
//! recursing.

/// Current (native) wire version.
pub const SLAW_VERSION_CURRENT: u8 = 2;

/// Legacy wire version with 4-byte words.
pub const SLAW_VERSION_V1: u8 = 1;

/// Magic bytes opening every binary slaw file.
pub const FILE_MAGIC: [u8; 4] = [0xff, 0xff, 0x0b, 0x10];

/// Length of the binary file header.
pub const FILE_HEADER_LEN: usize = 8;

/// Stream type byte: a plain sequence of slawx.
pub const TYPE_SLAW: u8 = 1;

/// Stream type byte: a pool backing file (not readable as a slaw stream).
pub const TYPE_POOL: u8 = 2;

/// Header flag: the records are big-endian.
pub const FLAG_BIG_ENDIAN: u16 = 1 << 0;

/// Containers with this many elements or more carry an explicit count word.
pub const MAX_WEE_CONTAINER: u64 = 15;

/// Largest numeric unit (one element of an array) in bytes.
pub const MAX_UNIT_BSIZE: usize = 256;

/// Largest breadth a v2 numeric array header can express.
pub const MAX_V2_BREADTH: u64 = 0x0000_3fff_ffff_ffff;

/// Largest breadth a v1 numeric array can inline into its header.
pub const MAX_V1_WEE_BREADTH: u64 = 1022;

/// Maximum nesting of containers accepted by walk, swap and validation.
pub const MAX_NESTING_DEPTH: usize = 1024;

/// Default cap on a single record read from a stream (1 GiB).
pub const DEFAULT_MAX_SLAW_BYTES: u64 = 1 << 30;

/// Frame magic of a zstd stream, used to detect compressed slaw files.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
