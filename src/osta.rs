//! OSTA Compressed Unicode (the UDF "dstring" encoding).
//! See UncompressUnicode/CompressUnicode, UDF 2.6.0 §6.5.

use log::warn;

/// Decodes a dstring, ignoring any trailing-length-byte convention (the
/// caller is responsible for trimming to the on-disc field length before
/// calling this). Returns an empty string for an unrecognized compression
/// ID. Lossless for compression ID 8 and for ID 16 when every high byte is
/// zero; see [`decode_lossy`] for the variant that reports this.
pub fn decode(bytes: &[u8]) -> String {
    decode_lossy(bytes).1
}

/// Like [`decode`], but also reports whether decoding lost information.
/// Per the decoder contract: compression ID 16 with any non-zero high byte
/// is flagged lossy (`ok = false`), though the low bytes are still used to
/// build the returned string. An unrecognized compression ID also reports
/// `ok = false` and returns an empty string.
pub fn decode_lossy(bytes: &[u8]) -> (bool, String) {
    if bytes.is_empty() {
        return (true, String::new());
    }
    let compression_id = bytes[0];
    let mut result = String::new();
    match compression_id {
        8 => {
            for &b in &bytes[1..] {
                if b == 0 {
                    break;
                }
                result.push(b as char);
            }
            (true, result)
        }
        16 => {
            let mut lossy = false;
            let mut i = 1;
            while i + 1 < bytes.len() {
                let high = bytes[i];
                let low = bytes[i + 1];
                if high != 0 {
                    lossy = true;
                }
                let unicode = ((high as u16) << 8) | (low as u16);
                if unicode == 0 {
                    break;
                }
                if let Some(c) = char::from_u32(unicode as u32) {
                    result.push(c);
                }
                i += 2;
            }
            (!lossy, result)
        }
        _ => {
            warn!("osta::decode: unknown compression id {}", compression_id);
            (false, String::new())
        }
    }
}

/// Encodes a string into a dstring, choosing 8-bit compression when every
/// character fits in a byte and 16-bit compression otherwise.
pub fn encode(s: &str) -> Vec<u8> {
    let needs_16bit = s.chars().any(|c| c as u32 > 0xFF);
    let compression_id = if needs_16bit { 16 } else { 8 };
    let mut result = Vec::with_capacity(1 + s.len() * if needs_16bit { 2 } else { 1 } + 2);
    result.push(compression_id);
    if needs_16bit {
        for c in s.chars() {
            let unicode = c as u16;
            result.push((unicode >> 8) as u8);
            result.push((unicode & 0xFF) as u8);
        }
        result.push(0);
        result.push(0);
    } else {
        for c in s.chars() {
            result.push(c as u8);
        }
        result.push(0);
    }
    result
}
