use crate::domain::model::Record;
use crate::utils::error::{RelayError, Result};

pub const BITMAP_WIDTH: u32 = 350;
pub const BITMAP_HEIGHT: u32 = 450;
const CAPACITY: usize = (BITMAP_WIDTH * BITMAP_HEIGHT) as usize;
const LENGTH_DIGITS: usize = 6;
const HEADER_SIZE: usize = 54;

/// Renders a record as a 350x450 bitmap. The record's JSON is prefixed with
/// a 6-digit zero-padded length (in UTF-16 code units) and each unit's low
/// 24 bits are spread 8 bits per channel across R/G/B, alpha fixed at 255.
/// R carries bits 16-23, which stay zero for 16-bit code units.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let json = serde_json::to_string(record)?;
    let payload: Vec<u16> = json.encode_utf16().collect();
    if LENGTH_DIGITS + payload.len() > CAPACITY {
        return Err(RelayError::ImageOverflow {
            length: LENGTH_DIGITS + payload.len(),
            capacity: CAPACITY,
        });
    }

    let prefix = format!("{:0width$}", payload.len(), width = LENGTH_DIGITS);
    let units = prefix
        .encode_utf16()
        .chain(payload.into_iter())
        .chain(std::iter::repeat(0));

    let mut bmp = bmp_header();
    for unit in units.take(CAPACITY) {
        let code = unit as u32;
        // Pixel rows are written top-down; BMP stores channels as B,G,R,A.
        bmp.push((code & 0xFF) as u8);
        bmp.push(((code >> 8) & 0xFF) as u8);
        bmp.push(((code >> 16) & 0xFF) as u8);
        bmp.push(0xFF);
    }
    Ok(bmp)
}

/// Recovers the serialized record JSON from a bitmap produced by
/// `encode_record`. The counterpart the original relays never shipped.
pub fn decode_record(bmp: &[u8]) -> Result<String> {
    if bmp.len() != HEADER_SIZE + CAPACITY * 4 || &bmp[0..2] != b"BM" {
        return Err(RelayError::MalformedRecord {
            reason: "not a record bitmap".to_string(),
        });
    }

    let unit_at = |index: usize| -> u16 {
        let at = HEADER_SIZE + index * 4;
        u16::from(bmp[at]) | (u16::from(bmp[at + 1]) << 8)
    };

    let mut length = 0usize;
    for i in 0..LENGTH_DIGITS {
        let digit = unit_at(i);
        if !(0x30..=0x39).contains(&digit) {
            return Err(RelayError::MalformedRecord {
                reason: "length prefix is not decimal".to_string(),
            });
        }
        length = length * 10 + (digit - 0x30) as usize;
    }
    if LENGTH_DIGITS + length > CAPACITY {
        return Err(RelayError::MalformedRecord {
            reason: "length prefix exceeds bitmap capacity".to_string(),
        });
    }

    let units: Vec<u16> = (LENGTH_DIGITS..LENGTH_DIGITS + length).map(unit_at).collect();
    String::from_utf16(&units).map_err(|_| RelayError::MalformedRecord {
        reason: "payload is not valid UTF-16".to_string(),
    })
}

// 32-bit uncompressed BMP, top-down rows (negative height) so pixel order
// matches the packing order. Row stride is 350 * 4, already 4-byte aligned.
fn bmp_header() -> Vec<u8> {
    let pixel_bytes = (CAPACITY * 4) as u32;
    let file_size = HEADER_SIZE as u32 + pixel_bytes;

    let mut header = Vec::with_capacity(HEADER_SIZE + CAPACITY * 4);
    header.extend_from_slice(b"BM");
    header.extend_from_slice(&file_size.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes()); // reserved
    header.extend_from_slice(&(HEADER_SIZE as u32).to_le_bytes()); // pixel offset
    header.extend_from_slice(&40u32.to_le_bytes()); // BITMAPINFOHEADER size
    header.extend_from_slice(&(BITMAP_WIDTH as i32).to_le_bytes());
    header.extend_from_slice(&(-(BITMAP_HEIGHT as i32)).to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // planes
    header.extend_from_slice(&32u16.to_le_bytes()); // bits per pixel
    header.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB
    header.extend_from_slice(&pixel_bytes.to_le_bytes());
    header.extend_from_slice(&2835u32.to_le_bytes()); // 72 DPI
    header.extend_from_slice(&2835u32.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes()); // palette colors
    header.extend_from_slice(&0u32.to_le_bytes()); // important colors
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Entry;

    fn sample_record() -> Record {
        Record {
            messages: vec![Entry::message("hello".to_string())],
            ..Record::default()
        }
    }

    #[test]
    fn test_roundtrip_recovers_serialized_record() {
        let record = sample_record();
        let bmp = encode_record(&record).unwrap();

        let recovered = decode_record(&bmp).unwrap();
        assert_eq!(recovered, serde_json::to_string(&record).unwrap());

        let reparsed: Record = serde_json::from_str(&recovered).unwrap();
        assert_eq!(reparsed, record);
    }

    #[test]
    fn test_roundtrip_with_wide_characters() {
        let record = Record {
            messages: vec![Entry::message("你好 — héllo".to_string())],
            ..Record::default()
        };

        let bmp = encode_record(&record).unwrap();
        let recovered = decode_record(&bmp).unwrap();
        assert_eq!(recovered, serde_json::to_string(&record).unwrap());
    }

    #[test]
    fn test_bitmap_has_fixed_dimensions() {
        let bmp = encode_record(&Record::default()).unwrap();

        assert_eq!(bmp.len(), 54 + 350 * 450 * 4);
        assert_eq!(&bmp[0..2], b"BM");
        assert_eq!(
            i32::from_le_bytes(bmp[18..22].try_into().unwrap()),
            350
        );
        assert_eq!(
            i32::from_le_bytes(bmp[22..26].try_into().unwrap()),
            -450
        );
    }

    #[test]
    fn test_length_prefix_is_zero_padded() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let bmp = encode_record(&record).unwrap();

        let prefix: String = (0..6)
            .map(|i| char::from(bmp[54 + i * 4]))
            .collect();
        assert_eq!(prefix, format!("{:06}", json.encode_utf16().count()));
    }

    #[test]
    fn test_channel_layout_packs_low_byte_in_blue() {
        // 'A' (0x41) lands in the blue channel of the first payload pixel.
        let record = Record::default();
        let json = serde_json::to_string(&record).unwrap();
        let bmp = encode_record(&record).unwrap();

        let first_payload = 54 + 6 * 4;
        assert_eq!(bmp[first_payload], json.as_bytes()[0]); // B = low 8 bits
        assert_eq!(bmp[first_payload + 1], 0); // G
        assert_eq!(bmp[first_payload + 2], 0); // R stays empty for 16-bit codes
        assert_eq!(bmp[first_payload + 3], 0xFF); // alpha
    }

    #[test]
    fn test_oversized_record_is_rejected() {
        let record = Record {
            messages: vec![Entry::message("x".repeat(160_000))],
            ..Record::default()
        };

        assert!(matches!(
            encode_record(&record).unwrap_err(),
            RelayError::ImageOverflow { .. }
        ));
    }

    #[test]
    fn test_decode_rejects_foreign_bytes() {
        assert!(decode_record(b"PNG not BMP").is_err());

        let mut bmp = encode_record(&Record::default()).unwrap();
        bmp[54] = b'x'; // corrupt the length prefix
        assert!(matches!(
            decode_record(&bmp).unwrap_err(),
            RelayError::MalformedRecord { .. }
        ));
    }
}
