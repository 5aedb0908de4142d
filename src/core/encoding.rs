//! Template File Encoding
//!
//! Template files are read whole and decoded to text before normalization.
//! Detects UTF-16 by BOM or by the `<` byte pattern, otherwise expects UTF-8
//! (a UTF-8 BOM is skipped).

/// Encoding of a template file as detected from its first bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TemplateEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return TemplateEncoding::Utf8;
        }

        match (input[0], input[1]) {
            (0xFF, 0xFE) => TemplateEncoding::Utf16Le,
            (0xFE, 0xFF) => TemplateEncoding::Utf16Be,
            // No BOM: '<' next to a NUL byte
            (0x00, b'<') => TemplateEncoding::Utf16Be,
            (b'<', 0x00) => TemplateEncoding::Utf16Le,
            _ => TemplateEncoding::Utf8,
        }
    }
}

/// Decode raw template file bytes to text
pub fn decode_template(input: Vec<u8>) -> Result<String, String> {
    match TemplateEncoding::detect(&input) {
        TemplateEncoding::Utf8 => {
            let mut input = input;
            if input.starts_with(&[0xEF, 0xBB, 0xBF]) {
                input.drain(..3);
            }
            String::from_utf8(input).map_err(|e| format!("invalid UTF-8: {}", e))
        }
        TemplateEncoding::Utf16Le => decode_utf16(&input, [0xFF, 0xFE], u16::from_le_bytes, "LE"),
        TemplateEncoding::Utf16Be => decode_utf16(&input, [0xFE, 0xFF], u16::from_be_bytes, "BE"),
    }
}

fn decode_utf16(
    input: &[u8],
    bom: [u8; 2],
    unit: fn([u8; 2]) -> u16,
    label: &str,
) -> Result<String, String> {
    let bytes = input.strip_prefix(&bom[..]).unwrap_or(input);

    if bytes.len() % 2 != 0 {
        return Err(format!("invalid UTF-16 {}: odd number of bytes", label));
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| unit([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16(&code_units).map_err(|e| format!("invalid UTF-16 {}: {}", label, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(TemplateEncoding::detect(b"<html/>"), TemplateEncoding::Utf8);
        assert_eq!(TemplateEncoding::detect(&[0xEF, 0xBB, 0xBF, b'<']), TemplateEncoding::Utf8);
        assert_eq!(TemplateEncoding::detect(&[0xFF, 0xFE, b'<', 0x00]), TemplateEncoding::Utf16Le);
        assert_eq!(TemplateEncoding::detect(&[0x00, b'<', 0x00, b'h']), TemplateEncoding::Utf16Be);
        assert_eq!(TemplateEncoding::detect(b"<"), TemplateEncoding::Utf8);
    }

    #[test]
    fn test_utf8_bom_skipped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("<p>é</p>".as_bytes());
        assert_eq!(decode_template(bytes).unwrap(), "<p>é</p>");
    }

    #[test]
    fn test_utf16_le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<p/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_template(bytes).unwrap(), "<p/>");
    }

    #[test]
    fn test_utf16_be_without_bom() {
        let mut bytes = Vec::new();
        for unit in "<p>©</p>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_template(bytes).unwrap(), "<p>©</p>");
    }

    #[test]
    fn test_odd_utf16_rejected() {
        let err = decode_template(vec![0xFF, 0xFE, b'<']).unwrap_err();
        assert!(err.contains("odd number of bytes"));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(decode_template(vec![b'<', 0xC3, 0x28]).is_err());
    }
}
