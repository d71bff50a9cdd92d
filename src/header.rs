//! Archive header — format anchor at offset 0.
//!
//! # On-disk layout (46 bytes, numeric fields little-endian)
//!
//! ```text
//! Offset  Size  Field
//!    0     15   signature   = "Master of Magic"  (ASCII, no terminator)
//!   15     15   reserved    legacy watermark key; carried, never consulted
//!   30     12   version-dependent payload (below)
//!   42      4   version     0x200 or 0x300  (LE u32)
//! ```
//!
//! v0x200 payload:
//! ```text
//!   30      4   table_offset   relative to the end of the header
//!   34      4   seed
//!   38      4   raw_count      file_count = raw_count - seed - 7
//! ```
//!
//! v0x300 payload:
//! ```text
//!   30      4   table_offset low word
//!   34      4   table_offset high word
//!   38      4   file_count
//! ```
//!
//! # Mis-tagged archives
//! Some archives declare 0x300 but are laid out as 0x200: their "high"
//! word overlaps the 0x200 seed field and carries garbage in its upper
//! bytes.  When `high >> 8 != 0` the payload is re-parsed as 0x200.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::GrfError;

pub const GRF_HEADER_SIZE: usize = 46;
pub const GRF_SIGNATURE: &[u8; 15] = b"Master of Magic";

/// The archive format reserves seven pseudo-entries inside the v0x200
/// count field.
const RESERVED_ENTRY_COUNT: u32 = 7;

// ── Version ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V200,
    V300,
}

impl Version {
    pub fn as_u32(self) -> u32 {
        match self {
            Version::V200 => 0x200,
            Version::V300 => 0x300,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.as_u32())
    }
}

// ── GrfHeader ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GrfHeader {
    pub version: Version,
    /// Declared entry count, directory sentinels included.
    pub file_count: u32,
    /// Absolute offset of the compressed central directory.
    pub table_offset: u64,
}

impl GrfHeader {
    /// Parse and validate the fixed 46-byte header.
    pub fn parse(buf: &[u8; GRF_HEADER_SIZE], max_entries: u32) -> Result<Self, GrfError> {
        if &buf[0..15] != GRF_SIGNATURE {
            return Err(GrfError::InvalidMagic);
        }
        // Bytes 15..30 are the reserved legacy key region; skipped.

        let version = LittleEndian::read_u32(&buf[42..46]);
        let header = match version {
            0x200 => Self::parse_v200(buf)?,
            0x300 => {
                let low = LittleEndian::read_u32(&buf[30..34]);
                let high = LittleEndian::read_u32(&buf[34..38]);
                if high >> 8 != 0 {
                    // Mis-tagged: the layout is 0x200.
                    Self::parse_v200(buf)?
                } else {
                    let table_offset =
                        ((high as u64) << 32) + low as u64 + GRF_HEADER_SIZE as u64;
                    Self {
                        version: Version::V300,
                        file_count: LittleEndian::read_u32(&buf[38..42]),
                        table_offset,
                    }
                }
            }
            other => return Err(GrfError::UnsupportedVersion(other)),
        };

        if header.file_count > max_entries {
            return Err(GrfError::LimitExceeded {
                declared: header.file_count as u64,
                limit: max_entries as u64,
            });
        }
        Ok(header)
    }

    fn parse_v200(buf: &[u8; GRF_HEADER_SIZE]) -> Result<Self, GrfError> {
        let table_offset = LittleEndian::read_u32(&buf[30..34]);
        let seed = LittleEndian::read_u32(&buf[34..38]);
        let raw_count = LittleEndian::read_u32(&buf[38..42]);

        let file_count = raw_count as i64 - seed as i64 - RESERVED_ENTRY_COUNT as i64;
        if file_count < 0 {
            return Err(GrfError::CorruptTable(format!(
                "entry count underflow: raw {raw_count}, seed {seed}"
            )));
        }

        Ok(Self {
            version: Version::V200,
            file_count: file_count as u32,
            table_offset: table_offset as u64 + GRF_HEADER_SIZE as u64,
        })
    }
}
