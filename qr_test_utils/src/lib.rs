//! Synthetic QR-symbol generator (Section 4.M). Renders `(version,
//! ecc_level, mask, payload)` into a packed cell bitmap and an upscaled
//! grayscale raster, so `qr`'s test suite can exercise the recognition
//! pipeline against known-good ground truth instead of hand-drawn bitmaps.
//!
//! This is test-support tooling, not a conformant QR encoder: payloads are
//! always emitted in byte mode and no masking heuristic is applied (the
//! caller picks the mask directly).

use qr::format::mask_bit;
use qr::tables::{self, RsBlockInfo};
use qr::{EccLevel, Point};

const PRIMITIVE_POLY: u16 = 0x11d;

/// A fully-rendered symbol: a `size x size` grid of cells, `true` = dark.
pub struct Symbol {
    pub size: usize,
    pub modules: Vec<bool>,
}

impl Symbol {
    fn get(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.size + x]
    }

    fn set(&mut self, x: usize, y: usize, dark: bool) {
        self.modules[y * self.size + x] = dark;
    }
}

/// Builds a complete, maskable, error-corrected symbol for `payload`
/// (encoded as one byte-mode segment) at the given `version`/`ecc_level`,
/// with data mask `mask` applied.
pub fn generate(version: u8, ecc_level: EccLevel, mask: u8, payload: &[u8]) -> Symbol {
    let size = tables::grid_size_for_version(version);
    let mut symbol = Symbol { size, modules: vec![false; size * size] };

    draw_finder(&mut symbol, 0, 0);
    draw_finder(&mut symbol, size - 7, 0);
    draw_finder(&mut symbol, 0, size - 7);
    draw_timing(&mut symbol);
    for &(cx, cy) in &tables::alignment_pattern_centers(version) {
        draw_alignment(&mut symbol, cx as usize, cy as usize);
    }
    symbol.set(8, size - 8, true); // dark module

    let is_function = function_module_map(size, version);

    let codewords = build_codewords(version, ecc_level, payload);
    place_data(&mut symbol, &is_function, &codewords, mask);

    draw_format_info(&mut symbol, ecc_level, mask);
    if version >= 7 {
        draw_version_info(&mut symbol, version);
    }

    symbol
}

/// Upscales `symbol` into a grayscale raster (255 = light, 0 = dark) with a
/// `quiet_zone_cells`-wide light border, `pixels_per_cell` pixels per
/// module. Returns `(pixels, width, height)`.
pub fn render_grayscale(symbol: &Symbol, pixels_per_cell: usize, quiet_zone_cells: usize) -> (Vec<u8>, usize, usize) {
    let cells = symbol.size + 2 * quiet_zone_cells;
    let side = cells * pixels_per_cell;
    let mut pixels = vec![255u8; side * side];
    for y in 0..symbol.size {
        for x in 0..symbol.size {
            if !symbol.get(x, y) {
                continue;
            }
            let px0 = (x + quiet_zone_cells) * pixels_per_cell;
            let py0 = (y + quiet_zone_cells) * pixels_per_cell;
            for dy in 0..pixels_per_cell {
                for dx in 0..pixels_per_cell {
                    pixels[(py0 + dy) * side + px0 + dx] = 0;
                }
            }
        }
    }
    (pixels, side, side)
}

/// Four capstone centre pixels in the rendered raster, for tests that need
/// to seed a capstone search rather than run the full pipeline.
pub fn finder_centres(symbol_size: usize, pixels_per_cell: usize, quiet_zone_cells: usize) -> [Point; 3] {
    let to_px = |cell: f64| -> i32 { ((cell + quiet_zone_cells as f64) * pixels_per_cell as f64).round() as i32 };
    [
        Point::new(to_px(3.5), to_px(3.5)),
        Point::new(to_px(symbol_size as f64 - 3.5), to_px(3.5)),
        Point::new(to_px(3.5), to_px(symbol_size as f64 - 3.5)),
    ]
}

fn draw_finder(symbol: &mut Symbol, x0: usize, y0: usize) {
    for dy in 0..7usize {
        for dx in 0..7usize {
            let ring = dx == 0 || dx == 6 || dy == 0 || dy == 6;
            let core = (2..=4).contains(&dx) && (2..=4).contains(&dy);
            symbol.set(x0 + dx, y0 + dy, ring || core);
        }
    }
}

fn draw_timing(symbol: &mut Symbol) {
    for i in 0..symbol.size {
        let dark = i % 2 == 0;
        symbol.set(i, 6, dark);
        symbol.set(6, i, dark);
    }
}

fn draw_alignment(symbol: &mut Symbol, cx: usize, cy: usize) {
    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let ring = dx.abs() == 2 || dy.abs() == 2;
            let core = dx == 0 && dy == 0;
            let x = (cx as i32 + dx) as usize;
            let y = (cy as i32 + dy) as usize;
            symbol.set(x, y, ring || core);
        }
    }
}

fn function_module_map(size: usize, version: u8) -> Vec<bool> {
    let mut map = vec![false; size * size];
    let mut mark_box = |map: &mut Vec<bool>, x0: usize, y0: usize, x1: usize, y1: usize| {
        for y in y0..=y1.min(size - 1) {
            for x in x0..=x1.min(size - 1) {
                map[y * size + x] = true;
            }
        }
    };
    mark_box(&mut map, 0, 0, 8, 8);
    mark_box(&mut map, size.saturating_sub(8), 0, size - 1, 8);
    mark_box(&mut map, 0, size.saturating_sub(8), 8, size - 1);
    for i in 0..size {
        map[6 * size + i] = true;
        map[i * size + 6] = true;
    }
    for &(cx, cy) in &tables::alignment_pattern_centers(version) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let x = cx as i32 + dx;
                let y = cy as i32 + dy;
                if x >= 0 && y >= 0 && (x as usize) < size && (y as usize) < size {
                    map[y as usize * size + x as usize] = true;
                }
            }
        }
    }
    if version >= 7 {
        for y in 0..6 {
            for x in (size - 11)..(size - 8) {
                map[y * size + x] = true;
                map[x * size + y] = true;
            }
        }
    }
    map
}

fn build_codewords(version: u8, ecc_level: EccLevel, payload: &[u8]) -> Vec<u8> {
    let info = tables::rs_block_info(version, ecc_level);
    let total_data = info.total_data_codewords();

    let count_bits = tables::char_count_bits(qr::Mode::Byte, version);
    let mut bits: Vec<bool> = Vec::new();
    push_bits(&mut bits, 0b0100, 4); // byte-mode indicator
    push_bits(&mut bits, payload.len() as u32, count_bits);
    for &byte in payload {
        push_bits(&mut bits, byte as u32, 8);
    }
    for _ in 0..4 {
        if bits.len() >= total_data * 8 {
            break;
        }
        bits.push(false);
    }
    while bits.len() % 8 != 0 {
        bits.push(false);
    }
    let mut data_codewords: Vec<u8> = bits.chunks(8).map(pack_byte).collect();
    let pad = [0xecu8, 0x11u8];
    let mut pad_idx = 0;
    while data_codewords.len() < total_data {
        data_codewords.push(pad[pad_idx % 2]);
        pad_idx += 1;
    }
    data_codewords.truncate(total_data);

    interleave_with_ecc(&data_codewords, info)
}

fn push_bits(bits: &mut Vec<bool>, value: u32, width: u32) {
    for i in (0..width).rev() {
        bits.push((value >> i) & 1 == 1);
    }
}

fn pack_byte(bits: &[bool]) -> u8 {
    let mut byte = 0u8;
    for &b in bits {
        byte = (byte << 1) | (b as u8);
    }
    byte
}

fn interleave_with_ecc(data: &[u8], info: &RsBlockInfo) -> Vec<u8> {
    let group1 = info.group1_blocks as usize;
    let group2 = info.group2_blocks as usize;
    let g1_len = info.group1_data_words as usize;
    let g2_len = info.group2_data_words as usize;
    let ecc_len = info.ecc_per_block as usize;

    let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(group1 + group2);
    let mut cursor = 0usize;
    for _ in 0..group1 {
        blocks.push(data[cursor..cursor + g1_len].to_vec());
        cursor += g1_len;
    }
    for _ in 0..group2 {
        blocks.push(data[cursor..cursor + g2_len].to_vec());
        cursor += g2_len;
    }

    let ecc_blocks: Vec<Vec<u8>> = blocks.iter().map(|b| rs_encode(b, ecc_len)).collect();

    let max_data_len = g1_len.max(g2_len);
    let mut out = Vec::with_capacity(data.len() + blocks.len() * ecc_len);
    for col in 0..max_data_len {
        for block in &blocks {
            if col < block.len() {
                out.push(block[col]);
            }
        }
    }
    for col in 0..ecc_len {
        for block in &ecc_blocks {
            out.push(block[col]);
        }
    }
    out
}

// --- Self-contained GF(256) Reed-Solomon encoder (mirrors qr::rs's field,
// but kept independent since this crate only needs to go one direction:
// encode, never correct). ---

fn gf_tables() -> ([u8; 256], [u8; 256]) {
    let mut exp = [0u8; 256];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    for i in 0..255usize {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE_POLY;
        }
    }
    (exp, log)
}

fn gf_mul(exp: &[u8; 256], log: &[u8; 256], a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let sum = (log[a as usize] as usize + log[b as usize] as usize) % 255;
    exp[sum]
}

/// Builds the degree-`ecc_len` RS generator polynomial
/// `(x - alpha^0)(x - alpha^1)...(x - alpha^{ecc_len-1})`, highest-degree
/// coefficient first.
fn generator_poly(exp: &[u8; 256], log: &[u8; 256], ecc_len: usize) -> Vec<u8> {
    let mut g = vec![1u8];
    for i in 0..ecc_len {
        let root = exp[i % 255];
        let mut next = vec![0u8; g.len() + 1];
        for (j, &coeff) in g.iter().enumerate() {
            next[j] ^= coeff;
            next[j + 1] ^= gf_mul(exp, log, coeff, root);
        }
        g = next;
    }
    g
}

fn rs_encode(data: &[u8], ecc_len: usize) -> Vec<u8> {
    let (exp, log) = gf_tables();
    let generator = generator_poly(&exp, &log, ecc_len);
    let mut remainder = vec![0u8; ecc_len];
    for &byte in data {
        let factor = byte ^ remainder[0];
        remainder.rotate_left(1);
        *remainder.last_mut().unwrap() = 0;
        if factor != 0 {
            for (i, &g) in generator.iter().skip(1).enumerate() {
                remainder[i] ^= gf_mul(&exp, &log, g, factor);
            }
        }
    }
    remainder
}

fn place_data(symbol: &mut Symbol, is_function: &[bool], codewords: &[u8], mask: u8) {
    let size = symbol.size;
    let mut bit_idx = 0usize;
    let total_bits = codewords.len() * 8;
    let mut x = size - 1;
    let mut going_up = true;
    loop {
        if x == 6 {
            if x == 0 {
                break;
            }
            x -= 1;
        }
        let rows: Box<dyn Iterator<Item = usize>> = if going_up { Box::new((0..size).rev()) } else { Box::new(0..size) };
        for y in rows {
            for &col in &[x, x - 1] {
                if !is_function[y * size + col] {
                    let dark = if bit_idx < total_bits {
                        let byte = codewords[bit_idx / 8];
                        let bit = (byte >> (7 - (bit_idx % 8))) & 1 == 1;
                        bit_idx += 1;
                        bit
                    } else {
                        false
                    };
                    symbol.set(col, y, dark ^ mask_bit(mask, col, y));
                }
            }
        }
        going_up = !going_up;
        if x < 2 {
            break;
        }
        x -= 2;
    }
}

fn bch_poly_mod(mut value: u32, generator: u32) -> u32 {
    let gen_bits = 32 - generator.leading_zeros();
    let mut value_bits = 32 - value.leading_zeros().min(32);
    while value != 0 && value_bits >= gen_bits {
        value ^= generator << (value_bits - gen_bits);
        value_bits = 32 - value.leading_zeros().min(32);
    }
    value
}

fn draw_format_info(symbol: &mut Symbol, ecc_level: EccLevel, mask: u8) {
    const FORMAT_MASK: u16 = 0x5412;
    const FORMAT_GENERATOR: u32 = 0x537;
    let ecc_bits = match ecc_level {
        EccLevel::M => 0u32,
        EccLevel::L => 1,
        EccLevel::H => 2,
        EccLevel::Q => 3,
    };
    let data = (ecc_bits << 3 | mask as u32) << 10;
    let remainder = bch_poly_mod(data, FORMAT_GENERATOR);
    let raw = ((data | remainder) as u16) ^ FORMAT_MASK;

    let bit = |i: u32| -> bool { (raw >> i) & 1 == 1 };
    let size = symbol.size;
    for x in 0..6 {
        symbol.set(x, 8, bit(14 - x as u32));
    }
    symbol.set(7, 8, bit(8));
    symbol.set(8, 8, bit(7));
    symbol.set(8, 7, bit(6));
    for y in 0..6 {
        symbol.set(8, y, bit(5 - y as u32));
    }
    for x in 0..8 {
        symbol.set(size - 1 - x, 8, bit(x as u32));
    }
    for y in 0..7 {
        symbol.set(8, size - 1 - y, bit(14 - y as u32));
    }
}

fn draw_version_info(symbol: &mut Symbol, version: u8) {
    const VERSION_GENERATOR: u32 = 0x1f25;
    let data = (version as u32) << 12;
    let remainder = bch_poly_mod(data, VERSION_GENERATOR);
    let raw = data | remainder;
    let size = symbol.size;
    let mut i = 0u32;
    for x in 0..6 {
        for y in (size - 11)..(size - 8) {
            let bit = (raw >> i) & 1 == 1;
            symbol.set(x, y, bit);
            symbol.set(y, x, bit);
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_1_symbol_has_correct_size() {
        let symbol = generate(1, EccLevel::M, 0, b"HELLO");
        assert_eq!(symbol.size, 21);
    }

    #[test]
    fn finder_patterns_are_dark_at_their_corners() {
        let symbol = generate(1, EccLevel::M, 0, b"HI");
        assert!(symbol.get(0, 0));
        assert!(symbol.get(20, 0));
        assert!(symbol.get(0, 20));
    }

    #[test]
    fn render_grayscale_has_quiet_zone_border() {
        let symbol = generate(1, EccLevel::M, 0, b"HI");
        let (pixels, w, _h) = render_grayscale(&symbol, 3, 4);
        assert_eq!(pixels[0], 255);
        assert_eq!(w, (21 + 8) * 3);
    }
}
