//! Central directory — compressed entry table and per-entry metadata.
//!
//! The table lives at `GrfHeader::table_offset` as one zlib stream:
//!
//! ```text
//! v0x300 only:  4 bytes   skipped
//!               4 bytes   compressed_size  (LE u32)
//!               4 bytes   real_size        (LE u32)
//!               compressed_size bytes of deflate data, inflating to
//!               exactly real_size bytes
//! ```
//!
//! # Record layout inside the inflated buffer
//!
//! ```text
//! name bytes …  0x00     null-terminated, undeclared encoding
//!  +0      4    compressed_size  i32 LE   on-disk payload bytes
//!  +4      4    length_aligned   i32 LE   payload rounded up for the cipher
//!  +8      4    real_size        i32 LE   uncompressed bytes
//! +12      1    type             bit 0 file, bit 1 mixed, bit 2 header-DES
//! +13      4    offset           u32 LE               (v0x200)
//! +13      8    offset           u32 LE low, u32 high (v0x300)
//! ```
//!
//! The three sizes are stored signed but must be non-negative; a negative
//! value is table corruption.  The v0x200 offset is unsigned and
//! zero-extended to 64 bits.  Offsets are stored relative to the end of
//! the 46-byte header; [`FileEntry::offset`] carries the absolute value.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;

use crate::error::GrfError;
use crate::header::{GrfHeader, Version, GRF_HEADER_SIZE};
use crate::source::ReadSource;

// ── Entry type bits ──────────────────────────────────────────────────────────

/// Bit 0: the record is a file (clear = directory sentinel, ignored).
pub const ENTRY_TYPE_FILE: u8 = 0x01;
/// Bit 1: payload uses the mixed DES + shuffle scheme.
pub const ENTRY_TYPE_MIXED_CRYPT: u8 = 0x02;
/// Bit 2: only the first 20 payload blocks are DES-encrypted.
pub const ENTRY_TYPE_HEADER_CRYPT: u8 = 0x04;

// ── FileEntry ────────────────────────────────────────────────────────────────

/// One parsed central-directory record.  Immutable after load.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub entry_type: u8,
    /// Archive-absolute offset of the payload (stored offset + 46).
    pub offset: u64,
    /// On-disk payload size before inflate.
    pub compressed_size: u32,
    /// Bytes actually read from disk; block-aligned for ciphered entries.
    pub length_aligned: u32,
    /// Uncompressed size; equal to `compressed_size` for stored payloads.
    pub real_size: u32,
    /// Filename bytes as stored, encoding undeclared.
    pub raw_name: Vec<u8>,
}

impl FileEntry {
    #[inline]
    pub fn is_file(&self) -> bool {
        self.entry_type & ENTRY_TYPE_FILE != 0
    }

    #[inline]
    pub fn is_mixed_crypt(&self) -> bool {
        self.entry_type & ENTRY_TYPE_MIXED_CRYPT != 0
    }

    #[inline]
    pub fn is_header_crypt(&self) -> bool {
        self.entry_type & ENTRY_TYPE_HEADER_CRYPT != 0
    }

    #[inline]
    pub fn is_ciphered(&self) -> bool {
        self.is_mixed_crypt() || self.is_header_crypt()
    }

    /// Stored payloads skip the inflate step entirely.
    #[inline]
    pub fn is_stored(&self) -> bool {
        self.real_size == self.compressed_size
    }
}

// ── Inflate ──────────────────────────────────────────────────────────────────

/// Inflate one zlib stream to completion.
pub(crate) fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

// ── Table parsing ────────────────────────────────────────────────────────────

/// Read, inflate, and walk the central directory.
///
/// Returns every record, directory sentinels included — filtering and
/// index construction happen in `index`.  Suspends (reads from the
/// source) exactly once.
pub fn read_table<S: ReadSource>(source: &S, header: &GrfHeader) -> Result<Vec<FileEntry>, GrfError> {
    // v0x300 prefixes the two table sizes with 4 extra bytes.
    let (prefix_len, sizes_at) = match header.version {
        Version::V200 => (8usize, 0usize),
        Version::V300 => (12usize, 4usize),
    };

    let prefix = source.read_exact_at(header.table_offset, prefix_len)?;
    let compressed_size = LittleEndian::read_u32(&prefix[sizes_at..sizes_at + 4]) as usize;
    let real_size = LittleEndian::read_u32(&prefix[sizes_at + 4..sizes_at + 8]) as usize;

    let compressed = source.read_exact_at(header.table_offset + prefix_len as u64, compressed_size)?;
    let table = inflate(&compressed)
        .map_err(|e| GrfError::CorruptTable(format!("table inflate failed: {e}")))?;
    if table.len() != real_size {
        return Err(GrfError::CorruptTable(format!(
            "table inflated to {} bytes, header declares {real_size}",
            table.len()
        )));
    }

    parse_records(&table, header)
}

fn parse_records(table: &[u8], header: &GrfHeader) -> Result<Vec<FileEntry>, GrfError> {
    let trailer_len = match header.version {
        Version::V200 => 17usize,
        Version::V300 => 21usize,
    };

    let mut entries = Vec::with_capacity(header.file_count as usize);
    let mut cursor = 0usize;

    for record in 0..header.file_count {
        let rest = &table[cursor..];
        let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            GrfError::CorruptTable(format!("record {record}: unterminated filename"))
        })?;
        let raw_name = rest[..nul].to_vec();
        cursor += nul + 1;

        if cursor + trailer_len > table.len() {
            return Err(GrfError::CorruptTable(format!(
                "record {record}: trailer runs past the table ({} of {} bytes)",
                cursor + trailer_len,
                table.len()
            )));
        }
        let trailer = &table[cursor..cursor + trailer_len];
        cursor += trailer_len;

        let compressed_size = read_size(trailer, 0, "compressed_size", record)?;
        let length_aligned = read_size(trailer, 4, "length_aligned", record)?;
        let real_size = read_size(trailer, 8, "real_size", record)?;
        let entry_type = trailer[12];

        let stored_offset = match header.version {
            // Unsigned on disk; zero-extended.
            Version::V200 => LittleEndian::read_u32(&trailer[13..17]) as u64,
            Version::V300 => {
                let low = LittleEndian::read_u32(&trailer[13..17]) as u64;
                let high = LittleEndian::read_u32(&trailer[17..21]) as u64;
                (high << 32) | low
            }
        };

        entries.push(FileEntry {
            entry_type,
            offset: stored_offset + GRF_HEADER_SIZE as u64,
            compressed_size,
            length_aligned,
            real_size,
            raw_name,
        });
    }

    Ok(entries)
}

fn read_size(trailer: &[u8], at: usize, field: &str, record: u32) -> Result<u32, GrfError> {
    let value = LittleEndian::read_i32(&trailer[at..at + 4]);
    if value < 0 {
        return Err(GrfError::CorruptTable(format!(
            "record {record}: negative {field} ({value})"
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn v200_header(file_count: u32) -> GrfHeader {
        GrfHeader { version: Version::V200, file_count, table_offset: 46 }
    }

    fn record_v200(name: &[u8], comp: i32, aligned: i32, real: i32, ty: u8, offset: u32) -> Vec<u8> {
        let mut rec = Vec::new();
        rec.extend_from_slice(name);
        rec.push(0);
        rec.extend_from_slice(&comp.to_le_bytes());
        rec.extend_from_slice(&aligned.to_le_bytes());
        rec.extend_from_slice(&real.to_le_bytes());
        rec.push(ty);
        rec.extend_from_slice(&offset.to_le_bytes());
        rec
    }

    #[test]
    fn parses_v200_records() {
        let mut table = record_v200(b"data\\a.spr", 10, 16, 40, 0x03, 0);
        table.extend(record_v200(b"data\\b.act", 7, 7, 7, 0x01, 100));
        let entries = parse_records(&table, &v200_header(2)).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].raw_name, b"data\\a.spr");
        assert!(entries[0].is_file());
        assert!(entries[0].is_mixed_crypt());
        assert!(!entries[0].is_stored());
        assert_eq!(entries[0].offset, 46);

        assert!(entries[1].is_stored());
        assert!(!entries[1].is_ciphered());
        assert_eq!(entries[1].offset, 146);
    }

    #[test]
    fn v200_offset_is_zero_extended() {
        // A stored offset with the sign bit set must not sign-extend.
        let table = record_v200(b"big", 8, 8, 8, 0x01, 0xFFFF_FFF0);
        let entries = parse_records(&table, &v200_header(1)).unwrap();
        assert_eq!(entries[0].offset, 0xFFFF_FFF0u64 + 46);
    }

    #[test]
    fn parses_v300_wide_offsets() {
        let mut rec = Vec::new();
        rec.extend_from_slice(b"huge.gat");
        rec.push(0);
        rec.extend_from_slice(&8i32.to_le_bytes());
        rec.extend_from_slice(&8i32.to_le_bytes());
        rec.extend_from_slice(&8i32.to_le_bytes());
        rec.push(0x01);
        rec.extend_from_slice(&0x10u32.to_le_bytes()); // low
        rec.extend_from_slice(&0x3u32.to_le_bytes()); // high
        let header = GrfHeader { version: Version::V300, file_count: 1, table_offset: 46 };
        let entries = parse_records(&rec, &header).unwrap();
        assert_eq!(entries[0].offset, (0x3u64 << 32) + 0x10 + 46);
    }

    #[test]
    fn truncated_trailer_names_the_record() {
        let mut table = record_v200(b"ok.str", 1, 1, 1, 0x01, 0);
        table.extend_from_slice(b"cut.str\0\x01\x00");
        let err = parse_records(&table, &v200_header(2)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CorruptTable);
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn unterminated_name_is_corrupt() {
        let err = parse_records(b"no-terminator", &v200_header(1)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CorruptTable);
    }

    #[test]
    fn negative_size_is_corrupt() {
        let table = record_v200(b"bad.xml", -5, 8, 8, 0x01, 0);
        let err = parse_records(&table, &v200_header(1)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CorruptTable);
        assert!(err.to_string().contains("compressed_size"));
    }

    #[test]
    fn inflate_round_trip() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let payload = b"the quick brown fox jumps over the lazy dog";
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(payload).unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(inflate(&compressed).unwrap(), payload);
        assert!(inflate(b"\x00garbage").is_err());
    }
}
