//! Keyless single-round DES variant used for protected GRF entries.
//!
//! The game client ships a cut-down DES: one round, no key schedule, four
//! S-boxes instead of eight, and its own IP/FP/P-box tables.  The tables
//! below are the defining constants of the format and must match the
//! client bit for bit.  Bit indexing inside each byte is MSB-first
//! (table value 1 = bit 0x80 of byte 0); everything else in the archive
//! is little-endian.
//!
//! # Modes
//!
//! Per-entry `type` bits select the mode:
//! - **header-only** (bit 2): the first `min(20, nblocks)` 8-byte blocks
//!   are DES-decrypted, the remainder is verbatim — [`decode_header`].
//! - **mixed** (bit 1): the first 20 blocks are DES-decrypted; past block
//!   20 a block is DES-decrypted at every `cycle` interval, and every
//!   seventh remaining block after the first gets [`shuffle_decode`] —
//!   [`decode_full`].  The cycle length depends on the decimal digit
//!   count of the entry's compressed size, see [`cycle_for`].
//!
//! There is no encryption path: the client never re-encrypts, and the
//! single keyless round makes block decryption its own inverse.

/// Cipher block unit.
pub const BLOCK_SIZE: usize = 8;

/// Blocks 0..20 are always DES-decrypted in both cipher modes.
const HEADER_BLOCKS: usize = 20;

/// MSB-first bit mask per in-byte bit index.
const BIT_MASK: [u8; 8] = [0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01];

/// Initial permutation.  Entry `i` names the 1-based input bit that lands
/// on output bit `i`.
const IP_TABLE: [u8; 64] = [
    58, 50, 42, 34, 26, 18, 10,  2, 60, 52, 44, 36, 28, 20, 12,  4,
    62, 54, 46, 38, 30, 22, 14,  6, 64, 56, 48, 40, 32, 24, 16,  8,
    57, 49, 41, 33, 25, 17,  9,  1, 59, 51, 43, 35, 27, 19, 11,  3,
    61, 53, 45, 37, 29, 21, 13,  5, 63, 55, 47, 39, 31, 23, 15,  7,
];

/// Final permutation, the inverse of [`IP_TABLE`].
const FP_TABLE: [u8; 64] = [
    40,  8, 48, 16, 56, 24, 64, 32, 39,  7, 47, 15, 55, 23, 63, 31,
    38,  6, 46, 14, 54, 22, 62, 30, 37,  5, 45, 13, 53, 21, 61, 29,
    36,  4, 44, 12, 52, 20, 60, 28, 35,  3, 43, 11, 51, 19, 59, 27,
    34,  2, 42, 10, 50, 18, 58, 26, 33,  1, 41,  9, 49, 17, 57, 25,
];

/// P-box applied to the S-box output inside the round function.
const TP_TABLE: [u8; 32] = [
    16,  7, 20, 21, 29, 12, 28, 17,  1, 15, 23, 26,  5, 18, 31, 10,
     2,  8, 24, 14, 32, 27,  3,  9, 19, 13, 30,  6, 22, 11,  4, 25,
];

/// The four S-boxes.  Each entry packs two 4-bit outputs: the high nibble
/// serves even expansion slots, the low nibble odd ones.
const S_TABLE: [[u8; 64]; 4] = [
    [
        0xef, 0x03, 0x41, 0xfd, 0xd8, 0x74, 0x1e, 0x47, 0x26, 0xef, 0xfb, 0x22, 0xb3, 0xd8,
        0x84, 0x1e, 0x39, 0xac, 0xa7, 0x60, 0x62, 0xc1, 0xcd, 0xba, 0x5c, 0x96, 0x90, 0x59,
        0x05, 0x3b, 0x7a, 0x85, 0x40, 0xfd, 0x1e, 0xc8, 0xe7, 0x8a, 0x8b, 0x21, 0xda, 0x43,
        0x64, 0x9f, 0x2d, 0x14, 0xb1, 0x72, 0xf5, 0x5b, 0xc8, 0xb6, 0x9c, 0x37, 0x76, 0xec,
        0x39, 0xa0, 0xa3, 0x05, 0x52, 0x6e, 0x0f, 0xd9,
    ],
    [
        0xa7, 0xdd, 0x0d, 0x78, 0x9e, 0x0b, 0xe3, 0x95, 0x60, 0x36, 0x36, 0x4f, 0xf9, 0x60,
        0x5a, 0xa3, 0x11, 0x24, 0xd2, 0x87, 0xc8, 0x52, 0x75, 0xec, 0xbb, 0xc1, 0x4c, 0xba,
        0x24, 0xfe, 0x8f, 0x19, 0xda, 0x13, 0x66, 0xaf, 0x49, 0xd0, 0x90, 0x06, 0x8c, 0x6a,
        0xfb, 0x91, 0x37, 0x8d, 0x0d, 0x78, 0xbf, 0x49, 0x11, 0xf4, 0x23, 0xe5, 0xce, 0x3b,
        0x55, 0xbc, 0xa2, 0x57, 0xe8, 0x22, 0x74, 0xce,
    ],
    [
        0x2c, 0xea, 0xc1, 0xbf, 0x4a, 0x24, 0x1f, 0xc2, 0x79, 0x47, 0xa2, 0x7c, 0xb6, 0xd9,
        0x68, 0x15, 0x80, 0x56, 0x5d, 0x01, 0x33, 0xfd, 0xf4, 0xae, 0xde, 0x30, 0x07, 0x9b,
        0xe5, 0x83, 0x9b, 0x68, 0x49, 0xb4, 0x2e, 0x83, 0x1f, 0xc2, 0xb5, 0x7c, 0xa2, 0x19,
        0xd8, 0xe5, 0x7c, 0x2f, 0x83, 0xda, 0xf7, 0x6b, 0x90, 0xfe, 0xc4, 0x01, 0x5a, 0x97,
        0x61, 0xa6, 0x3d, 0x40, 0x0b, 0x58, 0xe6, 0x3d,
    ],
    [
        0x4d, 0xd1, 0xb2, 0x0f, 0x28, 0xbd, 0xe4, 0x78, 0xf6, 0x4a, 0x0f, 0x93, 0x8b, 0x17,
        0xd1, 0xa4, 0x3a, 0xec, 0xc9, 0x35, 0x93, 0x56, 0x7e, 0xcb, 0x55, 0x20, 0xa0, 0xfe,
        0x6c, 0x89, 0x17, 0x62, 0x17, 0x62, 0x4b, 0xb1, 0xb4, 0xde, 0xd1, 0x87, 0xc9, 0x14,
        0x3c, 0x4a, 0x7e, 0xa8, 0xe2, 0x7d, 0xa0, 0x9f, 0xf6, 0x5c, 0x6a, 0x09, 0x8d, 0xf0,
        0x0f, 0xe3, 0x53, 0x25, 0x95, 0x36, 0x28, 0xcb,
    ],
];

/// Byte substitution for the eighth byte of a shuffled block: identity
/// except for seven bidirectional swaps.
const SHUFFLE_SWAP: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    const PAIRS: [(u8, u8); 7] = [
        (0x00, 0x2b),
        (0x6c, 0x80),
        (0x01, 0x68),
        (0x48, 0x77),
        (0x60, 0xff),
        (0xb9, 0xc0),
        (0xfe, 0xeb),
    ];
    let mut p = 0;
    while p < PAIRS.len() {
        let (a, b) = PAIRS[p];
        table[a as usize] = b;
        table[b as usize] = a;
        p += 1;
    }
    table
};

// ── Primitive steps ──────────────────────────────────────────────────────────

fn permute(src: &[u8; 8], table: &[u8; 64]) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (i, &t) in table.iter().enumerate() {
        let j = (t - 1) as usize;
        if src[j >> 3] & BIT_MASK[j & 7] != 0 {
            out[i >> 3] |= BIT_MASK[i & 7];
        }
    }
    out
}

/// Expand the right half (bytes 4..8) into eight 6-bit S-box inputs.
fn expand(block: &[u8; 8]) -> [u8; 8] {
    let r = [block[4], block[5], block[6], block[7]];
    [
        ((r[3] << 5) | (r[0] >> 3)) & 0x3f,
        ((r[0] << 1) | (r[1] >> 7)) & 0x3f,
        ((r[0] << 5) | (r[1] >> 3)) & 0x3f,
        ((r[1] << 1) | (r[2] >> 7)) & 0x3f,
        ((r[1] << 5) | (r[2] >> 3)) & 0x3f,
        ((r[2] << 1) | (r[3] >> 7)) & 0x3f,
        ((r[2] << 5) | (r[3] >> 3)) & 0x3f,
        ((r[3] << 1) | (r[0] >> 7)) & 0x3f,
    ]
}

/// Collapse the eight expansion values through the four S-boxes.
fn substitute(e: &[u8; 8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (i, sbox) in S_TABLE.iter().enumerate() {
        out[i] = (sbox[e[2 * i] as usize] & 0xf0) | (sbox[e[2 * i + 1] as usize] & 0x0f);
    }
    out
}

/// P-box over the 32-bit S-box output.
fn transpose(s: &[u8; 4]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (i, &t) in TP_TABLE.iter().enumerate() {
        let j = (t - 1) as usize;
        if s[j >> 3] & BIT_MASK[j & 7] != 0 {
            out[i >> 3] |= BIT_MASK[i & 7];
        }
    }
    out
}

/// One Feistel round: `L ^= P(S(E(R)))`, R untouched.
fn round(block: &mut [u8; 8]) {
    let f = transpose(&substitute(&expand(block)));
    for i in 0..4 {
        block[i] ^= f[i];
    }
}

// ── Block operations ─────────────────────────────────────────────────────────

/// Decrypt one 8-byte block in place.
///
/// With a single keyless round this function is an involution: applying it
/// twice restores the input.  Test fixtures rely on that to produce
/// ciphertext.
pub fn decrypt_block(block: &mut [u8; 8]) {
    *block = permute(block, &IP_TABLE);
    round(block);
    *block = permute(block, &FP_TABLE);
}

/// Undo the byte shuffle applied to every seventh non-DES block in mixed
/// mode.
pub fn shuffle_decode(block: &mut [u8; 8]) {
    let x = *block;
    block[0] = x[3];
    block[1] = x[4];
    block[2] = x[6];
    block[3] = x[0];
    block[4] = x[1];
    block[5] = x[2];
    block[6] = x[5];
    block[7] = SHUFFLE_SWAP[x[7] as usize];
}

/// The swap-table half of [`shuffle_decode`], exposed for fixtures and
/// diagnostics.  The table is an involution.
pub fn swap_shuffle_byte(b: u8) -> u8 {
    SHUFFLE_SWAP[b as usize]
}

fn decrypt_block_at(data: &mut [u8], index: usize) {
    let block: &mut [u8; 8] = (&mut data[index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE])
        .try_into()
        .expect("block slice is exactly 8 bytes");
    decrypt_block(block);
}

fn shuffle_decode_at(data: &mut [u8], index: usize) {
    let block: &mut [u8; 8] = (&mut data[index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE])
        .try_into()
        .expect("block slice is exactly 8 bytes");
    shuffle_decode(block);
}

// ── Cycle schedule ───────────────────────────────────────────────────────────

fn decimal_digits(mut n: u32) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Block stride between DES decryptions past block 20 in mixed mode, a
/// function of the decimal digit count of the compressed size.
///
/// digits:  1  2  3  4  5  6  7  8  9 …
/// cycle:   1  1  4  5 14 15 22 23 24 …
pub fn cycle_for(compressed_size: u32) -> usize {
    let digits = decimal_digits(compressed_size);
    match digits {
        0..=2 => 1,
        3..=4 => digits + 1,
        5..=6 => digits + 9,
        _ => digits + 15,
    }
}

// ── Whole-payload modes ──────────────────────────────────────────────────────

/// Header-only mode: DES-decrypt the first `min(20, nblocks)` blocks and
/// leave the rest verbatim.
///
/// `data.len()` must be a multiple of [`BLOCK_SIZE`]; the caller rejects
/// misaligned entries before reaching the cipher.  Empty input is a no-op.
pub fn decode_header(data: &mut [u8]) {
    debug_assert!(data.len() % BLOCK_SIZE == 0);
    let nblocks = data.len() / BLOCK_SIZE;
    for i in 0..HEADER_BLOCKS.min(nblocks) {
        decrypt_block_at(data, i);
    }
}

/// Mixed mode: DES over the first 20 blocks, then DES at every `cycle`
/// interval with a shuffle on every seventh remaining block after the
/// first.
///
/// `compressed_size` is the entry's on-disk payload size *before* block
/// alignment — its decimal digit count selects the cycle.
pub fn decode_full(data: &mut [u8], compressed_size: u32) {
    debug_assert!(data.len() % BLOCK_SIZE == 0);
    let nblocks = data.len() / BLOCK_SIZE;
    let cycle = cycle_for(compressed_size);

    for i in 0..HEADER_BLOCKS.min(nblocks) {
        decrypt_block_at(data, i);
    }

    // Past the header region, `skipped` indexes the blocks the DES stride
    // leaves alone; every seventh of those after the first is shuffled.
    let mut skipped = 0usize;
    for i in HEADER_BLOCKS..nblocks {
        if i % cycle == 0 {
            decrypt_block_at(data, i);
        } else {
            if skipped != 0 && skipped % 7 == 0 {
                shuffle_decode_at(data, i);
            }
            skipped += 1;
        }
    }
}
