//! Error types for slaw construction, decoding, conversion and stream I/O.

use thiserror::Error;

/// Symbolic error kinds, one per failure class.
///
/// The names are the historical identifiers used by other slaw
/// implementations, so logs and wire-level diagnostics line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    OutOfMemory,
    CorruptSlaw,
    CorruptProtein,
    UnidentifiedSlaw,
    WrongVersion,
    WrongFormat,
    EndOfFile,
    BadTag,
    FabricatorBadness,
    AliasNotSupported,
    NotFound,
    BadIndex,
    RangeErr,
    NotNumeric,
    WrongLength,
    Io,
}

impl ErrorCode {
    /// Returns the symbolic name (e.g. "SLAW_CORRUPT_SLAW").
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::OutOfMemory => "OB_NO_MEM",
            ErrorCode::CorruptSlaw => "SLAW_CORRUPT_SLAW",
            ErrorCode::CorruptProtein => "SLAW_CORRUPT_PROTEIN",
            ErrorCode::UnidentifiedSlaw => "SLAW_UNIDENTIFIED_SLAW",
            ErrorCode::WrongVersion => "SLAW_WRONG_VERSION",
            ErrorCode::WrongFormat => "SLAW_WRONG_FORMAT",
            ErrorCode::EndOfFile => "SLAW_END_OF_FILE",
            ErrorCode::BadTag => "SLAW_BAD_TAG",
            ErrorCode::FabricatorBadness => "SLAW_FABRICATOR_BADNESS",
            ErrorCode::AliasNotSupported => "SLAW_ALIAS_NOT_SUPPORTED",
            ErrorCode::NotFound => "SLAW_NOT_FOUND",
            ErrorCode::BadIndex => "OB_BAD_INDEX",
            ErrorCode::RangeErr => "SLAW_RANGE_ERR",
            ErrorCode::NotNumeric => "SLAW_NOT_NUMERIC",
            ErrorCode::WrongLength => "SLAW_WRONG_LENGTH",
            ErrorCode::Io => "OB_IO_ERROR",
        }
    }

    /// Returns a one-line human readable description of the kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::OutOfMemory => "memory could not be allocated",
            ErrorCode::CorruptSlaw => "slaw is internally inconsistent",
            ErrorCode::CorruptProtein => "protein is internally inconsistent",
            ErrorCode::UnidentifiedSlaw => "header does not describe a known slaw kind",
            ErrorCode::WrongVersion => "slaw version is not supported",
            ErrorCode::WrongFormat => "stream is not a binary slaw stream",
            ErrorCode::EndOfFile => "no more slawx in the stream",
            ErrorCode::BadTag => "unexpected tag in external representation",
            ErrorCode::FabricatorBadness => "fabricator received events in an impossible order",
            ErrorCode::AliasNotSupported => "aliases cannot be represented as slawx",
            ErrorCode::NotFound => "no matching element",
            ErrorCode::BadIndex => "index out of range",
            ErrorCode::RangeErr => "value out of range",
            ErrorCode::NotNumeric => "slaw is not numeric",
            ErrorCode::WrongLength => "unexpected element count",
            ErrorCode::Io => "underlying stream failed",
        }
    }

    /// Looks up a kind by its symbolic name.
    pub fn from_name(name: &str) -> Option<ErrorCode> {
        ALL_CODES.iter().copied().find(|c| c.name() == name)
    }
}

const ALL_CODES: [ErrorCode; 16] = [
    ErrorCode::OutOfMemory,
    ErrorCode::CorruptSlaw,
    ErrorCode::CorruptProtein,
    ErrorCode::UnidentifiedSlaw,
    ErrorCode::WrongVersion,
    ErrorCode::WrongFormat,
    ErrorCode::EndOfFile,
    ErrorCode::BadTag,
    ErrorCode::FabricatorBadness,
    ErrorCode::AliasNotSupported,
    ErrorCode::NotFound,
    ErrorCode::BadIndex,
    ErrorCode::RangeErr,
    ErrorCode::NotNumeric,
    ErrorCode::WrongLength,
    ErrorCode::Io,
];

/// Error produced by any slaw operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlawError {
    // === Resources ===
    #[error("[OB_NO_MEM] could not allocate {bytes} bytes")]
    OutOfMemory { bytes: u64 },

    #[error("[SLAW_RANGE_ERR] {field} length {len} exceeds maximum {max}")]
    TooLarge { field: &'static str, len: u64, max: u64 },

    // === Structure ===
    #[error("[SLAW_CORRUPT_SLAW] {context}")]
    CorruptSlaw { context: &'static str },

    #[error("[SLAW_CORRUPT_PROTEIN] {context}")]
    CorruptProtein { context: &'static str },

    #[error("[SLAW_UNIDENTIFIED_SLAW] unrecognized {context}")]
    UnidentifiedSlaw { context: &'static str },

    // === Versions and streams ===
    #[error("[SLAW_WRONG_VERSION] no codec for slaw version {version}")]
    WrongVersion { version: u8 },

    #[error("[SLAW_WRONG_FORMAT] {context}")]
    WrongFormat { context: &'static str },

    #[error("[SLAW_END_OF_FILE] no more slawx in stream")]
    EndOfFile,

    #[error("[OB_IO_ERROR] {0}")]
    Io(String),

    #[error("[OB_IO_ERROR] zstd stream failed: {0}")]
    Compression(String),

    // === External representations and fabrication ===
    #[error("[SLAW_BAD_TAG] unexpected tag {tag:?}")]
    BadTag { tag: String },

    #[error("[SLAW_FABRICATOR_BADNESS] {context}")]
    FabricatorBadness { context: &'static str },

    #[error("[SLAW_ALIAS_NOT_SUPPORTED] alias {alias:?} cannot be represented")]
    AliasNotSupported { alias: String },

    // === Lookups and arguments ===
    #[error("[SLAW_NOT_FOUND] no matching element")]
    NotFound,

    #[error("[OB_BAD_INDEX] index {index} out of range for {len} entries")]
    BadIndex { index: i64, len: usize },

    #[error("[SLAW_RANGE_ERR] {context}")]
    RangeErr { context: &'static str },

    #[error("[SLAW_NOT_NUMERIC] expected a numeric slaw")]
    NotNumeric,

    #[error("[SLAW_WRONG_LENGTH] {context}: expected {expected}, got {actual}")]
    WrongLength {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SlawError {
    /// Returns the symbolic kind of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SlawError::OutOfMemory { .. } => ErrorCode::OutOfMemory,
            SlawError::TooLarge { .. } | SlawError::RangeErr { .. } => ErrorCode::RangeErr,
            SlawError::CorruptSlaw { .. } => ErrorCode::CorruptSlaw,
            SlawError::CorruptProtein { .. } => ErrorCode::CorruptProtein,
            SlawError::UnidentifiedSlaw { .. } => ErrorCode::UnidentifiedSlaw,
            SlawError::WrongVersion { .. } => ErrorCode::WrongVersion,
            SlawError::WrongFormat { .. } => ErrorCode::WrongFormat,
            SlawError::EndOfFile => ErrorCode::EndOfFile,
            SlawError::Io(_) | SlawError::Compression(_) => ErrorCode::Io,
            SlawError::BadTag { .. } => ErrorCode::BadTag,
            SlawError::FabricatorBadness { .. } => ErrorCode::FabricatorBadness,
            SlawError::AliasNotSupported { .. } => ErrorCode::AliasNotSupported,
            SlawError::NotFound => ErrorCode::NotFound,
            SlawError::BadIndex { .. } => ErrorCode::BadIndex,
            SlawError::NotNumeric => ErrorCode::NotNumeric,
            SlawError::WrongLength { .. } => ErrorCode::WrongLength,
        }
    }

    pub(crate) fn corrupt(context: &'static str) -> Self {
        SlawError::CorruptSlaw { context }
    }

    pub(crate) fn unidentified(context: &'static str) -> Self {
        SlawError::UnidentifiedSlaw { context }
    }

    pub(crate) fn badness(context: &'static str) -> Self {
        SlawError::FabricatorBadness { context }
    }
}

impl From<std::io::Error> for SlawError {
    fn from(e: std::io::Error) -> Self {
        SlawError::Io(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SlawError>;
