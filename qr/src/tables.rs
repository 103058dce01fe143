//! Version/ECC-level-indexed tables from ISO/IEC 18004 Annex tables 9, 13,
//! and friends: Reed-Solomon block layout, character-count-indicator widths,
//! the alphanumeric alphabet, and the alignment-pattern position list.
//! Table-driven per the Section 4.H note ("Codeword counts, block counts,
//! and data/ECC splits are table-driven per (version, ecc_level)").

use crate::data::EccLevel;

/// Reed-Solomon block layout for one (version, ecc_level) pair.
#[derive(Debug, Clone, Copy)]
pub struct RsBlockInfo {
    pub ecc_per_block: u16,
    pub group1_blocks: u16,
    pub group1_data_words: u16,
    pub group2_blocks: u16,
    pub group2_data_words: u16,
}

impl RsBlockInfo {
    pub fn total_data_codewords(&self) -> usize {
        self.group1_blocks as usize * self.group1_data_words as usize
            + self.group2_blocks as usize * self.group2_data_words as usize
    }

    pub fn total_blocks(&self) -> usize {
        self.group1_blocks as usize + self.group2_blocks as usize
    }
}

const fn b(
    ecc_per_block: u16,
    group1_blocks: u16,
    group1_data_words: u16,
    group2_blocks: u16,
    group2_data_words: u16,
) -> RsBlockInfo {
    RsBlockInfo { ecc_per_block, group1_blocks, group1_data_words, group2_blocks, group2_data_words }
}

/// Indexed `[version - 1][ecc_level as usize]`, ecc_level ordered M, L, H, Q
/// (matching `EccLevel`'s declaration order, which follows the 2-bit
/// format-info encoding 0=M/1=L/2=H/3=Q rather than the published table's
/// L/M/Q/H column order).
#[rustfmt::skip]
pub static RS_BLOCK_TABLE: [[RsBlockInfo; 4]; 40] = [
    // version 1
    [b(10,1,16,0,0), b(7,1,19,0,0),  b(17,1,9,0,0), b(13,1,13,0,0)],
    // version 2
    [b(16,1,28,0,0), b(10,1,34,0,0), b(28,1,16,0,0), b(22,1,22,0,0)],
    // version 3
    [b(26,1,44,0,0), b(15,1,55,0,0), b(22,2,13,0,0), b(18,2,17,0,0)],
    // version 4
    [b(18,2,32,0,0), b(20,1,80,0,0), b(16,4,9,0,0), b(26,2,24,0,0)],
    // version 5
    [b(24,2,43,0,0), b(26,1,108,0,0), b(22,2,11,2,12), b(18,2,15,2,16)],
    // version 6
    [b(16,4,27,0,0), b(18,2,68,0,0), b(28,4,15,0,0), b(24,4,19,0,0)],
    // version 7
    [b(18,4,31,0,0), b(20,2,78,0,0), b(26,4,13,1,14), b(18,2,14,4,15)],
    // version 8
    [b(22,2,38,2,39), b(24,2,97,0,0), b(26,4,14,2,15), b(22,4,18,2,19)],
    // version 9
    [b(22,3,36,2,37), b(30,2,116,0,0), b(24,4,12,4,13), b(20,4,16,4,17)],
    // version 10
    [b(26,4,43,1,44), b(18,2,68,2,69), b(28,6,15,2,16), b(24,6,19,2,20)],
    // version 11
    [b(30,1,50,4,51), b(20,4,81,0,0), b(24,3,12,8,13), b(28,4,22,4,23)],
    // version 12
    [b(22,6,36,2,37), b(24,2,92,2,93), b(28,7,14,4,15), b(26,4,20,6,21)],
    // version 13
    [b(22,8,37,1,38), b(26,4,107,0,0), b(22,12,11,4,12), b(24,8,20,4,21)],
    // version 14
    [b(24,4,40,5,41), b(30,3,115,1,116), b(24,11,12,5,13), b(20,11,16,5,17)],
    // version 15
    [b(24,5,41,5,42), b(22,5,87,1,88), b(24,11,12,7,13), b(30,5,24,7,25)],
    // version 16
    [b(28,7,45,3,46), b(24,5,98,1,99), b(30,3,15,13,16), b(24,15,19,2,20)],
    // version 17
    [b(28,10,46,1,47), b(28,1,107,5,108), b(28,2,14,17,15), b(28,1,22,15,23)],
    // version 18
    [b(26,9,43,4,44), b(30,5,120,1,121), b(28,2,14,19,15), b(28,17,22,1,23)],
    // version 19
    [b(26,3,44,11,45), b(28,3,113,4,114), b(26,9,13,16,14), b(26,17,21,4,22)],
    // version 20
    [b(26,3,41,13,42), b(28,3,107,5,108), b(28,15,15,10,16), b(30,15,24,5,25)],
    // version 21
    [b(26,17,42,0,0), b(28,4,116,4,117), b(30,19,16,6,17), b(28,17,22,6,23)],
    // version 22
    [b(28,17,46,0,0), b(28,2,111,7,112), b(24,34,13,0,0), b(30,7,24,16,25)],
    // version 23
    [b(28,4,47,14,48), b(30,4,121,5,122), b(30,16,15,14,16), b(30,11,24,14,25)],
    // version 24
    [b(28,6,45,14,46), b(30,6,117,4,118), b(30,30,16,2,17), b(30,11,24,16,25)],
    // version 25
    [b(28,8,47,13,48), b(26,8,106,4,107), b(30,22,15,13,16), b(30,7,24,22,25)],
    // version 26
    [b(28,19,46,4,47), b(28,10,114,2,115), b(30,33,16,4,17), b(28,28,22,6,23)],
    // version 27
    [b(28,22,45,3,46), b(30,8,122,4,123), b(30,12,15,28,16), b(30,8,23,26,24)],
    // version 28
    [b(28,3,45,23,46), b(30,3,117,10,118), b(30,11,15,31,16), b(30,4,24,31,25)],
    // version 29
    [b(28,21,45,7,46), b(30,7,116,7,117), b(30,19,15,26,16), b(30,1,23,37,24)],
    // version 30
    [b(28,19,47,10,48), b(30,5,115,10,116), b(30,23,15,25,16), b(30,15,24,25,25)],
    // version 31
    [b(28,2,46,29,47), b(30,13,115,3,116), b(30,23,15,28,16), b(30,42,24,1,25)],
    // version 32
    [b(28,10,46,23,47), b(30,17,115,0,0), b(30,19,15,35,16), b(30,10,24,35,25)],
    // version 33
    [b(28,14,46,21,47), b(30,17,115,1,116), b(30,11,15,46,16), b(30,29,24,19,25)],
    // version 34
    [b(28,14,46,23,47), b(30,13,115,6,116), b(30,59,16,1,17), b(30,44,24,7,25)],
    // version 35
    [b(28,12,47,26,48), b(30,12,121,7,122), b(30,22,15,41,16), b(30,39,24,14,25)],
    // version 36
    [b(28,6,47,34,48), b(30,6,121,14,122), b(30,2,15,64,16), b(30,46,24,10,25)],
    // version 37
    [b(28,29,46,14,47), b(30,17,122,4,123), b(30,24,15,46,16), b(30,49,24,10,25)],
    // version 38
    [b(28,13,46,32,47), b(30,4,122,18,123), b(30,42,15,32,16), b(30,48,24,14,25)],
    // version 39
    [b(28,40,47,7,48), b(30,20,117,4,118), b(30,10,15,67,16), b(30,43,24,22,25)],
    // version 40
    [b(28,18,47,31,48), b(30,19,118,6,119), b(30,20,15,61,16), b(30,34,24,34,25)],
];

pub fn rs_block_info(version: u8, ecc_level: EccLevel) -> &'static RsBlockInfo {
    &RS_BLOCK_TABLE[version as usize - 1][ecc_level as usize]
}

/// `17 + 4 * version`.
pub fn grid_size_for_version(version: u8) -> usize {
    17 + 4 * version as usize
}

/// Inverse of [`grid_size_for_version`]; `None` if `size` is not of the form
/// `17 + 4k` or out of range.
pub fn version_for_grid_size(size: usize) -> Option<u8> {
    if !(21..=177).contains(&size) || (size - 17) % 4 != 0 {
        return None;
    }
    Some(((size - 17) / 4) as u8)
}

/// Width, in bits, of the character-count indicator for `mode` at `version`,
/// per Table 3 of ISO/IEC 18004.
pub fn char_count_bits(mode: crate::data::Mode, version: u8) -> u32 {
    use crate::data::Mode::*;
    let band = if version <= 9 {
        0
    } else if version <= 26 {
        1
    } else {
        2
    };
    match mode {
        Numeric => [10, 12, 14][band],
        Alphanumeric => [9, 11, 13][band],
        Byte => [8, 16, 16][band],
        Kanji => [8, 10, 12][band],
    }
}

/// The 45-symbol alphanumeric alphabet (ISO/IEC 18004 Table 5), indexed by
/// value 0..45.
pub const ALPHANUMERIC_ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

pub fn alphanumeric_value(c: u8) -> Option<u8> {
    ALPHANUMERIC_ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
}

/// Alignment-pattern axis coordinates (ISO/IEC 18004 Table E.1), `None` for
/// version 1 (no alignment patterns).
#[rustfmt::skip]
pub fn alignment_axis_positions(version: u8) -> &'static [u16] {
    match version {
        1 => &[],
        2 => &[6, 18],
        3 => &[6, 22],
        4 => &[6, 26],
        5 => &[6, 30],
        6 => &[6, 34],
        7 => &[6, 22, 38],
        8 => &[6, 24, 42],
        9 => &[6, 26, 46],
        10 => &[6, 28, 50],
        11 => &[6, 30, 54],
        12 => &[6, 32, 58],
        13 => &[6, 34, 62],
        14 => &[6, 26, 46, 66],
        15 => &[6, 26, 48, 70],
        16 => &[6, 26, 50, 74],
        17 => &[6, 30, 54, 78],
        18 => &[6, 30, 56, 82],
        19 => &[6, 30, 58, 86],
        20 => &[6, 34, 62, 90],
        21 => &[6, 28, 50, 72, 94],
        22 => &[6, 26, 50, 74, 98],
        23 => &[6, 30, 54, 78, 102],
        24 => &[6, 28, 54, 80, 106],
        25 => &[6, 32, 58, 84, 110],
        26 => &[6, 30, 58, 86, 114],
        27 => &[6, 34, 62, 90, 118],
        28 => &[6, 26, 50, 74, 98, 122],
        29 => &[6, 30, 54, 78, 102, 126],
        30 => &[6, 26, 52, 78, 104, 130],
        31 => &[6, 30, 56, 82, 108, 134],
        32 => &[6, 34, 60, 86, 112, 138],
        33 => &[6, 30, 58, 86, 114, 142],
        34 => &[6, 34, 62, 90, 118, 146],
        35 => &[6, 30, 54, 78, 102, 126, 150],
        36 => &[6, 24, 50, 76, 102, 128, 154],
        37 => &[6, 28, 54, 80, 106, 132, 158],
        38 => &[6, 32, 58, 84, 110, 136, 162],
        39 => &[6, 26, 54, 82, 110, 138, 166],
        40 => &[6, 30, 58, 86, 114, 142, 170],
        _ => &[],
    }
}

/// All alignment-pattern centres for `version`, excluding the three corners
/// that overlap a finder pattern.
pub fn alignment_pattern_centers(version: u8) -> Vec<(u16, u16)> {
    let axis = alignment_axis_positions(version);
    if axis.is_empty() {
        return Vec::new();
    }
    let first = axis[0];
    let last = axis[axis.len() - 1];
    let mut out = Vec::new();
    for &r in axis {
        for &c in axis {
            let top_left = r == first && c == first;
            let top_right = r == first && c == last;
            let bottom_left = r == last && c == first;
            if top_left || top_right || bottom_left {
                continue;
            }
            out.push((c, r));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EccLevel;

    #[test]
    fn grid_size_round_trips() {
        for v in 1u8..=40 {
            let size = grid_size_for_version(v);
            assert_eq!(version_for_grid_size(size), Some(v));
        }
    }

    #[test]
    fn version_1_has_no_alignment_patterns() {
        assert!(alignment_pattern_centers(1).is_empty());
    }

    #[test]
    fn version_7_has_six_alignment_patterns() {
        assert_eq!(alignment_pattern_centers(7).len(), 6);
    }

    #[test]
    fn rs_table_totals_are_internally_consistent() {
        for version in 1..=40u8 {
            for &level in &[EccLevel::L, EccLevel::M, EccLevel::Q, EccLevel::H] {
                let info = rs_block_info(version, level);
                assert!(info.total_blocks() >= 1);
                assert!(info.total_data_codewords() > 0);
            }
        }
    }
}
