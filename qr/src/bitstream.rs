//! Stage I (and the tail of stage H): unmasking, function-module exclusion,
//! zig-zag codeword assembly, Reed-Solomon correction, and bitstream segment
//! parsing (Section 4.H, Section 4.I).

use crate::data::{Code, Data, DataType, EccLevel, Mode, Segment};
use crate::error::DecodeError;
use crate::format::{self, mask_bit};
use crate::tables;
use crate::util::tracing_wrappers::*;

/// A `grid_size x grid_size` map of which cells are function modules
/// (finder/separator/timing/alignment/format/version) rather than data
/// modules, built once per decode (Section 4.I "Function-module map").
struct FunctionModules {
    size: usize,
    is_function: Vec<bool>,
}

impl FunctionModules {
    fn new(size: usize, version: u8) -> Self {
        let mut map = FunctionModules { size, is_function: vec![false; size * size] };
        map.mark_finder_and_separator(0, 0);
        map.mark_finder_and_separator(size - 7, 0);
        map.mark_finder_and_separator(0, size - 7);
        map.mark_timing();
        for &(cx, cy) in &tables::alignment_pattern_centers(version) {
            map.mark_alignment(cx as usize, cy as usize);
        }
        map.mark_format_areas();
        if version >= 7 {
            map.mark_version_areas();
        }
        map
    }

    fn set(&mut self, x: usize, y: usize) {
        if x < self.size && y < self.size {
            self.is_function[y * self.size + x] = true;
        }
    }

    fn mark_finder_and_separator(&mut self, x0: usize, y0: usize) {
        // 7x7 finder plus the 1-module light separator ring around it, clipped
        // to the grid.
        let lo_x = x0.saturating_sub(1);
        let lo_y = y0.saturating_sub(1);
        for y in lo_y..=(y0 + 7).min(self.size - 1) {
            for x in lo_x..=(x0 + 7).min(self.size - 1) {
                self.set(x, y);
            }
        }
    }

    fn mark_timing(&mut self) {
        for i in 0..self.size {
            self.set(i, 6);
            self.set(6, i);
        }
    }

    fn mark_alignment(&mut self, cx: usize, cy: usize) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let x = cx as i32 + dx;
                let y = cy as i32 + dy;
                if x >= 0 && y >= 0 {
                    self.set(x as usize, y as usize);
                }
            }
        }
    }

    fn mark_format_areas(&mut self) {
        for i in 0..9 {
            self.set(i, 8);
            self.set(8, i);
        }
        for i in 0..8 {
            self.set(self.size - 1 - i, 8);
            self.set(8, self.size - 1 - i);
        }
        self.set(8, self.size - 8);
    }

    fn mark_version_areas(&mut self) {
        for y in 0..6 {
            for x in (self.size - 11)..(self.size - 8) {
                self.set(x, y);
                self.set(y, x);
            }
        }
    }

    fn is_data(&self, x: usize, y: usize) -> bool {
        !self.is_function[y * self.size + x]
    }
}

/// Reads the two format-info copies and returns `(ecc_level, mask)`, or
/// `DecodeError::FormatEcc` if both copies fail BCH correction.
fn read_format(code: &Code, size: usize) -> Result<(EccLevel, u8), DecodeError> {
    let bit = |x: usize, y: usize| -> u16 {
        if code.get_cell(x, y) { 1 } else { 0 }
    };
    // Primary copy: around the top-left finder.
    let mut primary = 0u16;
    for x in 0..6 {
        primary = (primary << 1) | bit(x, 8);
    }
    primary = (primary << 1) | bit(7, 8);
    primary = (primary << 1) | bit(8, 8);
    primary = (primary << 1) | bit(8, 7);
    for y in 0..6 {
        primary = (primary << 1) | bit(8, y);
    }

    if let Some((ecc, mask)) = format::decode_format(primary) {
        return Ok((EccLevel::from_bits(ecc), mask));
    }

    // Secondary copy: split across the top-right and bottom-left finders.
    let mut secondary = 0u16;
    for y in (size - 7..size).rev() {
        secondary = (secondary << 1) | bit(8, y);
    }
    for x in (size - 8)..size {
        secondary = (secondary << 1) | bit(x, 8);
    }
    if let Some((ecc, mask)) = format::decode_format(secondary) {
        return Ok((EccLevel::from_bits(ecc), mask));
    }

    debug!("both format-info copies failed bch correction");
    Err(DecodeError::FormatEcc)
}

fn read_version(code: &Code, size: usize) -> Option<u8> {
    if size < tables::grid_size_for_version(7) {
        return Some(tables::version_for_grid_size(size)?);
    }
    let bit = |x: usize, y: usize| -> u32 {
        if code.get_cell(x, y) { 1 } else { 0 }
    };
    // Bottom-left 6x3 version block.
    let mut raw = 0u32;
    for x in 0..6 {
        for y in (size - 11)..(size - 8) {
            raw = (raw << 1) | bit(x, y);
        }
    }
    format::decode_version(raw).or_else(|| tables::version_for_grid_size(size))
}

/// Unmasks, descrambles, deinterleaves, error-corrects, and parses `code`
/// into a decoded [`Data`] (Section 4.H, Section 4.I).
pub fn decode(code: &Code) -> Result<Data, DecodeError> {
    let size = code.size;
    let version = read_version(code, size).ok_or(DecodeError::InvalidVersion)?;
    let (ecc_level, mask) = read_format(code, size)?;

    let func_map = FunctionModules::new(size, version);
    let raw_bits = zigzag_bits(code, &func_map, mask);

    let block_info = tables::rs_block_info(version, ecc_level);
    let data_bytes = deinterleave_and_correct(&raw_bits, block_info)?;

    let (data_type, payload, eci) = parse_segments(&data_bytes, version)?;

    debug!(version, ?ecc_level, mask, payload_len = payload.len(), "symbol decoded");
    Ok(Data { version, ecc_level, mask, data_type, payload, eci })
}

/// Walks the data modules in the standard up/down zig-zag column pairs,
/// skipping the vertical timing-pattern column, applying the mask as it
/// goes (Section 4.H.2 / ISO/IEC 18004 Section 8.7.3).
fn zigzag_bits(code: &Code, func_map: &FunctionModules, mask: u8) -> Vec<bool> {
    let size = code.size;
    let mut bits = Vec::with_capacity(size * size);
    let mut x = size - 1;
    let mut going_up = true;
    loop {
        if x == 6 {
            // Column 6 is entirely the vertical timing pattern; skip it as
            // the real encoder does.
            if x == 0 {
                break;
            }
            x -= 1;
        }
        let rows: Box<dyn Iterator<Item = usize>> = if going_up { Box::new((0..size).rev()) } else { Box::new(0..size) };
        for y in rows {
            for &col in &[x, x - 1] {
                if func_map.is_data(col, y) {
                    let raw = code.get_cell(col, y);
                    let bit = raw ^ mask_bit(mask, col, y);
                    bits.push(bit);
                }
            }
        }
        going_up = !going_up;
        if x < 2 {
            break;
        }
        x -= 2;
    }
    bits
}

fn deinterleave_and_correct(bits: &[bool], info: &tables::RsBlockInfo) -> Result<Vec<u8>, DecodeError> {
    let total_data = info.total_data_codewords();
    let total_blocks = info.total_blocks();
    let ecc_per_block = info.ecc_per_block as usize;
    let total_codewords = total_data + total_blocks * ecc_per_block;

    let mut codewords = Vec::with_capacity(total_codewords);
    for chunk in bits.chunks(8) {
        if chunk.len() < 8 {
            break;
        }
        let mut byte = 0u8;
        for &b in chunk {
            byte = (byte << 1) | (b as u8);
        }
        codewords.push(byte);
        if codewords.len() == total_codewords {
            break;
        }
    }
    if codewords.len() < total_codewords {
        debug!(have = codewords.len(), need = total_codewords, "insufficient codewords sampled");
        return Err(DecodeError::InvalidGridSize);
    }

    // Reassemble each block's data words from the column-major data
    // interleaving, then append that block's own ECC words (Section 4.H.2).
    let group1 = info.group1_blocks as usize;
    let group2 = info.group2_blocks as usize;
    let g1_len = info.group1_data_words as usize;
    let g2_len = info.group2_data_words as usize;
    let max_data_len = g1_len.max(g2_len);

    let mut blocks: Vec<Vec<u8>> = vec![Vec::new(); total_blocks];
    let mut cursor = 0usize;
    for col in 0..max_data_len {
        for (b, block) in blocks.iter_mut().enumerate() {
            let block_len = if b < group1 { g1_len } else { g2_len };
            if col < block_len {
                block.push(codewords[cursor]);
                cursor += 1;
            }
        }
    }
    let ecc_start = cursor;
    for col in 0..ecc_per_block {
        for b in 0..total_blocks {
            blocks[b].push(codewords[ecc_start + col * total_blocks + b]);
        }
    }

    let mut data_out = Vec::with_capacity(total_data);
    for mut block in blocks {
        match crate::rs::correct(&mut block, ecc_per_block) {
            Ok(n) => {
                if n > 0 {
                    debug!(corrected = n, "reed-solomon block corrected during decode");
                }
            }
            Err(()) => {
                debug!("reed-solomon block uncorrectable");
                return Err(DecodeError::DataEcc);
            }
        }
        data_out.extend_from_slice(&block[..block.len() - ecc_per_block]);
    }
    Ok(data_out)
}

/// Parses the ISO/IEC 18004 Section 8.4 segment stream out of `data`,
/// returning the combined `(data_type, payload, eci)` the public `Data`
/// struct exposes (Section 3: `data_type` is "the highest-valued segment
/// seen").
fn parse_segments(data: &[u8], version: u8) -> Result<(DataType, Vec<u8>, u32), DecodeError> {
    let mut reader = BitReader::new(data);
    let mut payload = Vec::new();
    let mut data_type = DataType::Numeric;
    let mut eci = 0u32;
    let mut any_segment = false;

    loop {
        let Some(indicator) = reader.read_bits(4) else { break };
        if indicator == 0 {
            break; // terminator
        }
        let segment = match indicator {
            0x1 => parse_numeric(&mut reader, version)?,
            0x2 => parse_alphanumeric(&mut reader, version)?,
            0x4 => parse_byte(&mut reader, version)?,
            0x8 => parse_kanji(&mut reader, version)?,
            0x7 => {
                eci = parse_eci(&mut reader)?;
                any_segment = true;
                continue;
            }
            _ => {
                debug!(indicator, "unknown segment mode indicator");
                return Err(DecodeError::UnknownDataType);
            }
        };
        any_segment = true;
        match segment {
            Segment::Numeric(s) => {
                data_type = data_type.max(DataType::from(Mode::Numeric));
                payload.extend_from_slice(s.as_bytes());
            }
            Segment::Alphanumeric(s) => {
                data_type = data_type.max(DataType::from(Mode::Alphanumeric));
                payload.extend_from_slice(s.as_bytes());
            }
            Segment::Byte(b) => {
                data_type = data_type.max(DataType::from(Mode::Byte));
                payload.extend_from_slice(&b);
            }
            Segment::Kanji(b) => {
                data_type = data_type.max(DataType::from(Mode::Kanji));
                payload.extend_from_slice(&b);
            }
            Segment::Eci(v) => eci = v,
        }
        if payload.len() > crate::data::MAX_PAYLOAD {
            debug!(len = payload.len(), "payload exceeds maximum, overflow");
            return Err(DecodeError::DataOverflow);
        }
    }
    if !any_segment {
        return Err(DecodeError::DataUnderflow);
    }
    Ok((data_type, payload, eci))
}

fn parse_numeric(reader: &mut BitReader, version: u8) -> Result<Segment, DecodeError> {
    let count_bits = tables::char_count_bits(Mode::Numeric, version);
    let count = reader.read_bits(count_bits).ok_or(DecodeError::DataUnderflow)? as usize;
    let mut out = String::with_capacity(count);
    let mut remaining = count;
    while remaining > 0 {
        let group = remaining.min(3);
        let bits = match group {
            3 => 10,
            2 => 7,
            _ => 4,
        };
        let value = reader.read_bits(bits).ok_or(DecodeError::DataUnderflow)?;
        let digits = format!("{:0width$}", value, width = group);
        out.push_str(&digits);
        remaining -= group;
    }
    Ok(Segment::Numeric(out))
}

fn parse_alphanumeric(reader: &mut BitReader, version: u8) -> Result<Segment, DecodeError> {
    let count_bits = tables::char_count_bits(Mode::Alphanumeric, version);
    let count = reader.read_bits(count_bits).ok_or(DecodeError::DataUnderflow)? as usize;
    let mut out = String::with_capacity(count);
    let mut remaining = count;
    while remaining >= 2 {
        let value = reader.read_bits(11).ok_or(DecodeError::DataUnderflow)?;
        let (hi, lo) = ((value / 45) as usize, (value % 45) as usize);
        out.push(tables::ALPHANUMERIC_ALPHABET[hi] as char);
        out.push(tables::ALPHANUMERIC_ALPHABET[lo] as char);
        remaining -= 2;
    }
    if remaining == 1 {
        let value = reader.read_bits(6).ok_or(DecodeError::DataUnderflow)? as usize;
        out.push(tables::ALPHANUMERIC_ALPHABET[value] as char);
    }
    Ok(Segment::Alphanumeric(out))
}

fn parse_byte(reader: &mut BitReader, version: u8) -> Result<Segment, DecodeError> {
    let count_bits = tables::char_count_bits(Mode::Byte, version);
    let count = reader.read_bits(count_bits).ok_or(DecodeError::DataUnderflow)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(reader.read_bits(8).ok_or(DecodeError::DataUnderflow)? as u8);
    }
    Ok(Segment::Byte(out))
}

fn parse_kanji(reader: &mut BitReader, version: u8) -> Result<Segment, DecodeError> {
    let count_bits = tables::char_count_bits(Mode::Kanji, version);
    let count = reader.read_bits(count_bits).ok_or(DecodeError::DataUnderflow)? as usize;
    let mut out = Vec::with_capacity(count * 2);
    for _ in 0..count {
        let value = reader.read_bits(13).ok_or(DecodeError::DataUnderflow)?;
        // Section 4.I: "Shift-JIS transcoding is left to callers" - re-derive
        // the raw Shift-JIS code point and hand back the two bytes untranslated.
        let msb = (value / 0xc0) as u16;
        let lsb = (value % 0xc0) as u16;
        let combined = (msb << 8) | lsb;
        let sjis = if combined <= 0x1f00 { combined + 0x8140 } else { combined + 0xc140 };
        out.push((sjis >> 8) as u8);
        out.push((sjis & 0xff) as u8);
    }
    Ok(Segment::Kanji(out))
}

fn parse_eci(reader: &mut BitReader) -> Result<u32, DecodeError> {
    let first = reader.read_bits(8).ok_or(DecodeError::DataUnderflow)?;
    let value = if first & 0x80 == 0 {
        first
    } else if first & 0xc0 == 0x80 {
        let second = reader.read_bits(8).ok_or(DecodeError::DataUnderflow)?;
        ((first & 0x3f) << 8) | second
    } else {
        let second = reader.read_bits(8).ok_or(DecodeError::DataUnderflow)?;
        let third = reader.read_bits(8).ok_or(DecodeError::DataUnderflow)?;
        ((first & 0x1f) << 16) | (second << 8) | third
    };
    Ok(value)
}

/// MSB-first bit reader over a byte slice, with a peek/consume-style
/// interface.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit_pos: 0 }
    }

    fn read_bits(&mut self, n: u32) -> Option<u32> {
        if n == 0 {
            return Some(0);
        }
        let mut value = 0u32;
        for _ in 0..n {
            let byte_idx = self.bit_pos / 8;
            if byte_idx >= self.data.len() {
                return None;
            }
            let bit_idx = 7 - (self.bit_pos % 8);
            let bit = (self.data[byte_idx] >> bit_idx) & 1;
            value = (value << 1) | bit as u32;
            self.bit_pos += 1;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_reader_reads_msb_first() {
        let data = [0b1010_0000u8];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read_bits(1), Some(1));
        assert_eq!(r.read_bits(1), Some(0));
        assert_eq!(r.read_bits(1), Some(1));
        assert_eq!(r.read_bits(1), Some(0));
    }

    fn push_bits(bits: &mut Vec<bool>, value: u32, width: u32) {
        for i in (0..width).rev() {
            bits.push((value >> i) & 1 == 1);
        }
    }

    fn pack_bits(bits: &[bool]) -> Vec<u8> {
        let mut out = vec![0u8; bits.len().div_ceil(8)];
        for (i, &b) in bits.iter().enumerate() {
            if b {
                out[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        out
    }

    #[test]
    fn numeric_segment_round_trips_grouping() {
        let count_bits = tables::char_count_bits(Mode::Numeric, 1);
        let mut bits = Vec::new();
        push_bits(&mut bits, 3, count_bits); // count = 3
        push_bits(&mut bits, 123, 10); // "123" as one group of 3 digits
        let bytes = pack_bits(&bits);
        let mut reader = BitReader::new(&bytes);
        let segment = parse_numeric(&mut reader, 1).unwrap();
        assert_eq!(segment, Segment::Numeric("123".to_string()));
    }

    #[test]
    fn alphanumeric_decodes_pair_and_single() {
        let count_bits = tables::char_count_bits(Mode::Alphanumeric, 1);
        let mut bits = Vec::new();
        push_bits(&mut bits, 3, count_bits); // count = 3
        push_bits(&mut bits, 10 * 45 + 11, 11); // "AB": A=10, B=11
        push_bits(&mut bits, 12, 6); // "C": C=12
        let bytes = pack_bits(&bits);
        let mut reader = BitReader::new(&bytes);
        let segment = parse_alphanumeric(&mut reader, 1).unwrap();
        assert_eq!(segment, Segment::Alphanumeric("ABC".to_string()));
    }
}
