//! Filename encoding: UTF-8/CP949 auto-detection and mojibake repair.
//!
//! GRF filenames are null-terminated byte strings with no declared
//! encoding.  Korean-era archives use CP949 (the windows superset of
//! EUC-KR, covering the extended Hangul rows); repacked archives are
//! frequently UTF-8; badly converted ones carry CP949 bytes that were
//! once decoded as Windows-1252 (mojibake).  This module picks a decoder
//! by scoring both candidates over a sample of names, and can detect and
//! undo the Windows-1252 misread.
//!
//! encoding_rs's `EUC_KR` is the WHATWG definition — windows-949 — so the
//! `cp949` and `euc-kr` options share one decoder and extended lead bytes
//! decode correctly.  Quality scoring counts U+FFFD replacements plus C1
//! controls (U+0080..U+009F), the signature of mis-decoded CP949 lead
//! bytes in lesser decoders.

use encoding_rs::{Encoding, EUC_KR, UTF_8, WINDOWS_1252};
use serde::Serialize;

/// Default bad-character ratio under which a UTF-8 decoding is accepted.
pub const DEFAULT_AUTO_DETECT_THRESHOLD: f64 = 0.01;

/// Auto-detection samples at most this many filenames.
const DETECT_SAMPLE_LIMIT: usize = 200;

// ── FilenameEncoding ─────────────────────────────────────────────────────────

/// Filename decoder selection.  `Auto` resolves to a concrete choice
/// during load and is never reported back by a loaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilenameEncoding {
    Auto,
    Utf8,
    Cp949,
    EucKr,
    Latin1,
}

impl FilenameEncoding {
    /// Parse a CLI/options string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(FilenameEncoding::Auto),
            "utf-8" | "utf8" => Some(FilenameEncoding::Utf8),
            "cp949" => Some(FilenameEncoding::Cp949),
            "euc-kr" | "euckr" => Some(FilenameEncoding::EucKr),
            "latin-1" | "latin1" => Some(FilenameEncoding::Latin1),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilenameEncoding::Auto => "auto",
            FilenameEncoding::Utf8 => "utf-8",
            FilenameEncoding::Cp949 => "cp949",
            FilenameEncoding::EucKr => "euc-kr",
            FilenameEncoding::Latin1 => "latin-1",
        }
    }

    fn decoder(self) -> &'static Encoding {
        match self {
            // Auto is resolved before decoding; UTF-8 is its fallback.
            FilenameEncoding::Auto | FilenameEncoding::Utf8 => UTF_8,
            FilenameEncoding::Cp949 | FilenameEncoding::EucKr => EUC_KR,
            FilenameEncoding::Latin1 => WINDOWS_1252,
        }
    }
}

// ── Quality scoring ──────────────────────────────────────────────────────────

fn is_hangul(c: char) -> bool {
    ('\u{ac00}'..='\u{d7a3}').contains(&c)
}

fn is_c1_control(c: char) -> bool {
    ('\u{80}'..='\u{9f}').contains(&c)
}

/// Replacement characters plus C1 controls — the two signals of a wrong
/// decoder choice.
pub fn bad_chars(s: &str) -> usize {
    s.chars().filter(|&c| c == '\u{fffd}' || is_c1_control(c)).count()
}

/// Whether a decoded name should count against the archive's bad-name
/// statistic.
pub fn is_bad_name(s: &str) -> bool {
    bad_chars(s) > 0
}

// ── Auto-detection ───────────────────────────────────────────────────────────

/// Choose UTF-8 or CP949 by decoding up to 200 sampled names both ways and
/// comparing bad-character ratios.  Pure-ASCII sample sets deterministically
/// choose UTF-8.
pub fn detect<'a, I>(names: I, threshold: f64) -> FilenameEncoding
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut utf8_bad = 0usize;
    let mut cp949_bad = 0usize;
    let mut sampled_bytes = 0usize;

    for raw in names.into_iter().take(DETECT_SAMPLE_LIMIT) {
        if raw.iter().all(|&b| b < 0x80) {
            continue;
        }
        let (as_utf8, _, _) = UTF_8.decode(raw);
        let (as_cp949, _, _) = EUC_KR.decode(raw);
        utf8_bad += bad_chars(&as_utf8);
        cp949_bad += bad_chars(&as_cp949);
        sampled_bytes += raw.len();
    }

    if sampled_bytes == 0 {
        return FilenameEncoding::Utf8;
    }

    let utf8_ratio = utf8_bad as f64 / sampled_bytes as f64;
    let cp949_ratio = cp949_bad as f64 / sampled_bytes as f64;

    if utf8_ratio < threshold {
        FilenameEncoding::Utf8
    } else if cp949_ratio < utf8_ratio {
        FilenameEncoding::Cp949
    } else {
        FilenameEncoding::Utf8
    }
}

// ── Mojibake ─────────────────────────────────────────────────────────────────

/// High-frequency CP949-as-Windows-1252 misreads of common archive path
/// components (유저, 인터페이스, 아이템, 몬스터, 이벤트).
const MOJIBAKE_SIGNATURES: &[&str] = &[
    "\u{c0}\u{af}\u{c0}\u{fa}",                         // À¯Àú
    "\u{c0}\u{ce}\u{c5}\u{cd}\u{c6}\u{e4}\u{c0}\u{cc}\u{bd}\u{ba}", // ÀÎÅÍÆäÀ̽º
    "\u{be}\u{c6}\u{c0}\u{cc}\u{c5}\u{db}",             // ¾ÆÀÌÅÛ
    "\u{b8}\u{f3}\u{bd}\u{ba}\u{c5}\u{cd}",             // ¸ó½ºÅÍ
    "\u{c0}\u{cc}\u{ba}\u{a5}\u{c6}\u{ae}",             // À̺¥Æ®
];

/// Heuristic: does `s` look like CP949 bytes that were decoded as
/// Windows-1252?  Never true for strings already containing Hangul.
pub fn is_mojibake(s: &str) -> bool {
    if s.chars().any(is_hangul) {
        return false;
    }
    if MOJIBAKE_SIGNATURES.iter().any(|sig| s.contains(sig)) {
        return true;
    }
    let total = s.chars().count();
    if total == 0 {
        return false;
    }
    let high = s.chars().filter(|&c| ('\u{80}'..='\u{ff}').contains(&c)).count();
    high as f64 / total as f64 > 0.30
}

/// Re-encode as Windows-1252 and decode as CP949.  The repair is kept only
/// when it produces Hangul without introducing new bad characters;
/// otherwise the input comes back unchanged.
pub fn fix_mojibake(s: &str) -> String {
    let (bytes, _, had_unmappable) = WINDOWS_1252.encode(s);
    if had_unmappable {
        return s.to_owned();
    }
    let (fixed, _, _) = EUC_KR.decode(&bytes);
    if fixed.chars().any(is_hangul) && bad_chars(&fixed) <= bad_chars(s) {
        fixed.into_owned()
    } else {
        s.to_owned()
    }
}

// ── Name decoding ────────────────────────────────────────────────────────────

/// Decode one raw filename with the selected encoding, repairing mojibake
/// when the result looks like a Windows-1252 misread.
pub fn decode_name(raw: &[u8], encoding: FilenameEncoding) -> String {
    let (decoded, _, _) = encoding.decoder().decode(raw);
    if is_mojibake(&decoded) {
        fix_mojibake(&decoded)
    } else {
        decoded.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // data\유저인터페이스 in CP949.
    const KOREAN_PATH_CP949: &[u8] = &[
        b'd', b'a', b't', b'a', b'\\',
        0xc0, 0xaf, 0xc0, 0xfa, 0xc0, 0xce, 0xc5, 0xcd, 0xc6, 0xe4, 0xc0, 0xcc, 0xbd, 0xba,
    ];

    #[test]
    fn ascii_samples_choose_utf8() {
        let names: Vec<&[u8]> = vec![b"data\\sprite.act", b"data\\texture.bmp"];
        assert_eq!(detect(names, DEFAULT_AUTO_DETECT_THRESHOLD), FilenameEncoding::Utf8);
        assert_eq!(detect(Vec::<&[u8]>::new(), 0.01), FilenameEncoding::Utf8);
    }

    #[test]
    fn cp949_samples_choose_cp949() {
        let names: Vec<&[u8]> = vec![KOREAN_PATH_CP949, KOREAN_PATH_CP949];
        assert_eq!(detect(names, DEFAULT_AUTO_DETECT_THRESHOLD), FilenameEncoding::Cp949);
    }

    #[test]
    fn utf8_hangul_samples_choose_utf8() {
        let name = "data\\유저인터페이스\\login.bmp".as_bytes();
        assert_eq!(detect(vec![name], DEFAULT_AUTO_DETECT_THRESHOLD), FilenameEncoding::Utf8);
    }

    #[test]
    fn decode_name_cp949() {
        assert_eq!(
            decode_name(KOREAN_PATH_CP949, FilenameEncoding::Cp949),
            "data\\유저인터페이스"
        );
    }

    #[test]
    fn mojibake_detected_and_repaired() {
        // The CP949 bytes misread as Windows-1252.
        let (garbled, _, _) = WINDOWS_1252.decode(KOREAN_PATH_CP949);
        assert!(is_mojibake(&garbled));
        assert_eq!(fix_mojibake(&garbled), "data\\유저인터페이스");
        // decode_name with latin-1 runs the repair end to end.
        assert_eq!(
            decode_name(KOREAN_PATH_CP949, FilenameEncoding::Latin1),
            "data\\유저인터페이스"
        );
    }

    #[test]
    fn hangul_is_never_mojibake() {
        assert!(!is_mojibake("data\\유저인터페이스"));
        assert!(!is_mojibake("data/plain/path.bmp"));
        assert!(!is_mojibake(""));
    }

    #[test]
    fn fix_mojibake_keeps_unrepairable_input() {
        // French text is high-byte heavy but not CP949; the repair must
        // leave it alone because no Hangul comes out.
        let s = "téléchargé.cfg";
        assert_eq!(fix_mojibake(s), s);
    }

    #[test]
    fn bad_char_scoring() {
        assert_eq!(bad_chars("clean/path.bmp"), 0);
        assert_eq!(bad_chars("a\u{fffd}b\u{85}c"), 2);
        assert!(is_bad_name("x\u{fffd}"));
        assert!(!is_bad_name("유저"));
    }

    #[test]
    fn chosen_encoding_re_encodes_to_original_bytes() {
        let decoded = decode_name(KOREAN_PATH_CP949, FilenameEncoding::Cp949);
        let (bytes, _, had_errors) = EUC_KR.encode(&decoded);
        assert!(!had_errors);
        assert_eq!(bytes.as_ref(), KOREAN_PATH_CP949);

        let ascii = decode_name(b"data\\sprite.act", FilenameEncoding::Utf8);
        assert_eq!(ascii.as_bytes(), b"data\\sprite.act");
    }

    #[test]
    fn encoding_names_round_trip() {
        for enc in [
            FilenameEncoding::Auto,
            FilenameEncoding::Utf8,
            FilenameEncoding::Cp949,
            FilenameEncoding::EucKr,
            FilenameEncoding::Latin1,
        ] {
            assert_eq!(FilenameEncoding::from_name(enc.name()), Some(enc));
        }
        assert_eq!(FilenameEncoding::from_name("shift-jis"), None);
    }
}
