//! Splitting logical values into port fragments.
//!
//! Every fragment is 16 bits wide. Multi-fragment values always go out in
//! ascending significance (low half first) and text goes out in buffer order,
//! two bytes per fragment, little-endian.

/// Low 16 bits of a value, as posted in a single 16-bit write.
pub const FRAGMENT_MASK: u32 = 0x0000_FFFF;

/// Low 16 bits of `value`.
pub fn low16(value: u32) -> u16 {
    (value & FRAGMENT_MASK) as u16
}

/// Splits a 32-bit value into `[low, high]`.
pub fn split32(value: u32) -> [u16; 2] {
    [low16(value), low16(value >> 16)]
}

/// Splits the IEEE-754 bit pattern of `value` into `[low, high]`.
///
/// The float is reinterpreted with [`f32::to_bits`]; no numeric conversion
/// takes place, so NaN payloads and negative zero survive intact.
pub fn float(value: f32) -> [u16; 2] {
    split32(value.to_bits())
}

/// Smallest even number not below `len`.
pub fn round_up_even(len: usize) -> usize {
    len.div_ceil(2) * 2
}

/// Packs text into `round_up_even(declared_len) / 2` fragments.
///
/// Bytes are copied until a NUL, the end of `source` or `declared_len` bytes,
/// whichever comes first. Everything after that is zero.
pub fn text(source: &[u8], declared_len: usize) -> Vec<u16> {
    let mut buf = vec![0u8; round_up_even(declared_len)];
    let copied = source
        .iter()
        .take(declared_len)
        .take_while(|&&byte| byte != 0);
    for (slot, &byte) in buf.iter_mut().zip(copied) {
        *slot = byte;
    }

    buf.chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split32_low_then_high() {
        assert_eq!(split32(0xDEAD_BEEF), [0xBEEF, 0xDEAD]);
        assert_eq!(split32(0x0000_0001), [0x0001, 0x0000]);
        assert_eq!(split32(u32::MAX), [0xFFFF, 0xFFFF]);
    }

    #[test]
    fn float_one_is_3f80() {
        assert_eq!(float(1.0), [0x0000, 0x3F80]);
        assert_eq!(float(-2.5), [0x0000, 0xC020]);
    }

    #[test]
    fn float_keeps_nan_payload() {
        let nan = f32::from_bits(0x7FFF_FFFF);
        assert_eq!(float(nan), [0xFFFF, 0x7FFF]);
    }

    #[test]
    fn text_pads_to_declared_length() {
        assert_eq!(text(b"AB", 4), vec![0x4241, 0x0000]);
    }

    #[test]
    fn text_odd_length_rounds_up_and_truncates() {
        // "HEL" then a zero pad byte
        assert_eq!(text(b"HELLO", 3), vec![0x4548, 0x004C]);
    }

    #[test]
    fn text_stops_at_nul() {
        assert_eq!(text(b"A\0BCD", 6), vec![0x0041, 0x0000, 0x0000]);
    }

    #[test]
    fn text_zero_length_is_empty() {
        assert!(text(b"ignored", 0).is_empty());
    }

    #[test]
    fn text_short_source_is_zero_filled() {
        let fragments = text(b"xyz", 9);
        assert_eq!(fragments.len(), 5);
        assert_eq!(fragments[0], u16::from_le_bytes([b'x', b'y']));
        assert_eq!(fragments[1], u16::from(b'z'));
        assert!(fragments[2..].iter().all(|&f| f == 0));
    }

    #[test]
    fn round_up_even_values() {
        assert_eq!(round_up_even(0), 0);
        assert_eq!(round_up_even(1), 2);
        assert_eq!(round_up_even(4), 4);
        assert_eq!(round_up_even(7), 8);
    }
}
