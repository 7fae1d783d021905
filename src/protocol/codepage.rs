//! # Code Page 437 Encoding
//!
//! Receipt text is Spanish (`Café`, `¡Gracias!`, `Nº`), but the printers take
//! single-byte text. The RFCOMM transport selects CP437 (`ESC t 0`) and runs
//! every job through [`encode`] before writing.
//!
//! Control characters and ASCII pass through untouched, so escape sequences
//! survive encoding. Characters outside CP437 become `?`.

use super::commands::ESC;

/// # Select Character Code Table (ESC t n)
///
/// Table 0 is PC437 (USA / Standard Europe) on Woosim and Star ESC/POS
/// firmware.
pub fn select_cp437() -> String {
    format!("{ESC}t\x00")
}

/// Encode a print job as CP437 bytes.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut unmapped = 0usize;
    for ch in s.chars() {
        if ch.is_ascii() {
            out.push(ch as u8);
        } else if let Some(byte) = to_cp437(ch) {
            out.push(byte);
        } else {
            unmapped += 1;
            out.push(b'?');
        }
    }
    if unmapped > 0 {
        tracing::warn!(unmapped, "characters outside CP437 replaced with '?'");
    }
    out
}

/// Map a character to its CP437 upper-half byte.
///
/// Covers Latin-1 letters, currency and punctuation used on receipts plus the
/// rule characters; the rest of the table (Greek, math) never appears.
fn to_cp437(ch: char) -> Option<u8> {
    let byte = match ch {
        'Ç' => 0x80,
        'ü' => 0x81,
        'é' => 0x82,
        'â' => 0x83,
        'ä' => 0x84,
        'à' => 0x85,
        'å' => 0x86,
        'ç' => 0x87,
        'ê' => 0x88,
        'ë' => 0x89,
        'è' => 0x8A,
        'ï' => 0x8B,
        'î' => 0x8C,
        'ì' => 0x8D,
        'Ä' => 0x8E,
        'Å' => 0x8F,
        'É' => 0x90,
        'æ' => 0x91,
        'Æ' => 0x92,
        'ô' => 0x93,
        'ö' => 0x94,
        'ò' => 0x95,
        'û' => 0x96,
        'ù' => 0x97,
        'ÿ' => 0x98,
        'Ö' => 0x99,
        'Ü' => 0x9A,
        '¢' => 0x9B,
        '£' => 0x9C,
        '¥' => 0x9D,
        'á' => 0xA0,
        'í' => 0xA1,
        'ó' => 0xA2,
        'ú' => 0xA3,
        'ñ' => 0xA4,
        'Ñ' => 0xA5,
        'ª' => 0xA6,
        'º' => 0xA7,
        '¿' => 0xA8,
        '¬' => 0xAA,
        '½' => 0xAB,
        '¼' => 0xAC,
        '¡' => 0xAD,
        '«' => 0xAE,
        '»' => 0xAF,
        '─' => 0xC4,
        '═' => 0xCD,
        '±' => 0xF1,
        '°' => 0xF8,
        '·' => 0xFA,
        '\u{00A0}' => 0xFF,
        // Uppercase vowels with acute have no CP437 slot; print them bare.
        'Á' => b'A',
        'Í' => b'I',
        'Ó' => b'O',
        'Ú' => b'U',
        _ => return None,
    };
    Some(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_and_escapes_pass_through() {
        assert_eq!(encode("\x1B!\x08Total\r\n"), b"\x1B!\x08Total\r\n");
    }

    #[test]
    fn test_spanish_receipt_words() {
        assert_eq!(encode("¡Gracias!"), vec![0xAD, b'G', b'r', b'a', b'c', b'i', b'a', b's', b'!']);
        assert_eq!(encode("Móvil"), vec![b'M', 0xA2, b'v', b'i', b'l']);
        assert_eq!(encode("Nº"), vec![b'N', 0xA7]);
        assert_eq!(encode("año"), vec![b'a', 0xA4, b'o']);
    }

    #[test]
    fn test_uppercase_acute_degrades_to_plain_letter() {
        assert_eq!(encode("ÁREA"), b"AREA");
    }

    #[test]
    fn test_unmapped_char_becomes_question_mark() {
        assert_eq!(encode("€5"), b"?5");
    }

    #[test]
    fn test_select_cp437() {
        assert_eq!(select_cp437().as_bytes(), &[0x1B, 0x74, 0x00]);
    }
}
