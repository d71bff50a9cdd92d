//! Error taxonomy for GRF reading.
//!
//! Every failure carries a stable [`ErrorCode`] so embedders can branch on
//! the class of failure without parsing messages.  Archive-level failures
//! (`InvalidMagic`, `UnsupportedVersion`, `CorruptTable`, `LimitExceeded`)
//! poison the load; per-entry failures (`FileNotFound`, `AmbiguousPath`,
//! `DecompressFail`, `InvalidOffset`) leave the loaded archive usable.
//! Read errors from the source bubble up unchanged as `Io`.

use std::io;
use thiserror::Error;

/// Stable machine-readable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidMagic,
    UnsupportedVersion,
    NotLoaded,
    FileNotFound,
    AmbiguousPath,
    DecompressFail,
    CorruptTable,
    LimitExceeded,
    InvalidOffset,
    DecryptRequired,
    Io,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidMagic       => "InvalidMagic",
            ErrorCode::UnsupportedVersion => "UnsupportedVersion",
            ErrorCode::NotLoaded          => "NotLoaded",
            ErrorCode::FileNotFound       => "FileNotFound",
            ErrorCode::AmbiguousPath      => "AmbiguousPath",
            ErrorCode::DecompressFail     => "DecompressFail",
            ErrorCode::CorruptTable       => "CorruptTable",
            ErrorCode::LimitExceeded      => "LimitExceeded",
            ErrorCode::InvalidOffset      => "InvalidOffset",
            ErrorCode::DecryptRequired    => "DecryptRequired",
            ErrorCode::Io                 => "Io",
        }
    }
}

#[derive(Error, Debug)]
pub enum GrfError {
    #[error("invalid signature — not a GRF archive")]
    InvalidMagic,

    #[error("unsupported GRF version {0:#x} (supported: 0x200, 0x300)")]
    UnsupportedVersion(u32),

    #[error("archive is not loaded — call load() first")]
    NotLoaded,

    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Carries at most five candidate exact names; never silently picked.
    #[error("ambiguous path {query:?} — candidates: {}", .candidates.join(", "))]
    AmbiguousPath { query: String, candidates: Vec<String> },

    #[error("decompression failed for {name:?}: {reason}")]
    DecompressFail { name: String, reason: String },

    #[error("corrupt file table: {0}")]
    CorruptTable(String),

    #[error("declared entry count {declared} exceeds the limit of {limit}")]
    LimitExceeded { declared: u64, limit: u64 },

    #[error("entry {name:?} extends past the end of the source ({offset} + {length} > {source_len})")]
    InvalidOffset { name: String, offset: u64, length: u64, source_len: u64 },

    /// Reserved for archives using a protection scheme this reader does not
    /// implement.  No current GRF v0x200/0x300 produces it.
    #[error("entry {0:?} uses an unsupported encryption scheme")]
    DecryptRequired(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl GrfError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GrfError::InvalidMagic           => ErrorCode::InvalidMagic,
            GrfError::UnsupportedVersion(_)  => ErrorCode::UnsupportedVersion,
            GrfError::NotLoaded              => ErrorCode::NotLoaded,
            GrfError::FileNotFound(_)        => ErrorCode::FileNotFound,
            GrfError::AmbiguousPath { .. }   => ErrorCode::AmbiguousPath,
            GrfError::DecompressFail { .. }  => ErrorCode::DecompressFail,
            GrfError::CorruptTable(_)        => ErrorCode::CorruptTable,
            GrfError::LimitExceeded { .. }   => ErrorCode::LimitExceeded,
            GrfError::InvalidOffset { .. }   => ErrorCode::InvalidOffset,
            GrfError::DecryptRequired(_)     => ErrorCode::DecryptRequired,
            GrfError::Io(_)                  => ErrorCode::Io,
        }
    }

    /// Whether the failure invalidates the whole archive (as opposed to a
    /// single entry or query).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::InvalidMagic
                | ErrorCode::UnsupportedVersion
                | ErrorCode::CorruptTable
                | ErrorCode::LimitExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_diagnostics() {
        assert!(GrfError::InvalidMagic.to_string().contains("invalid signature"));
        assert!(GrfError::UnsupportedVersion(0x103).to_string().contains("0x103"));
    }

    #[test]
    fn fatality_split() {
        assert!(GrfError::CorruptTable("truncated".into()).is_fatal());
        assert!(!GrfError::FileNotFound("a.spr".into()).is_fatal());
        assert!(!GrfError::NotLoaded.is_fatal());
    }

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(ErrorCode::AmbiguousPath.as_str(), "AmbiguousPath");
        assert_eq!(
            GrfError::LimitExceeded { declared: 600_000, limit: 500_000 }.code(),
            ErrorCode::LimitExceeded
        );
    }
}
