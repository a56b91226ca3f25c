//! Content-Transfer-Encoding of part bodies. Decoding is done by `mail-parser`;
//! this side only names encodings and re-encodes replaced content.

use base64::engine::general_purpose;
use base64::Engine as _;

/// Line length for base64 bodies (RFC 2045)
const BASE64_LINE_LENGTH: usize = 76;

/// Transfer encoding declared by a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    QuotedPrintable,
    Base64,
    Other(String),
}

impl TransferEncoding {
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::SevenBit;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "quoted-printable" => Self::QuotedPrintable,
            "base64" => Self::Base64,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Binary => "binary",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
            Self::Other(other) => other,
        }
    }
}

/// Base64 body wrapped at 76 columns, lines joined with `line_ending`, no trailing break.
pub fn encode_base64_body(data: &[u8], line_ending: &str) -> Vec<u8> {
    let encoded = general_purpose::STANDARD.encode(data);
    let lines: Vec<&str> = encoded
        .as_bytes()
        .chunks(BASE64_LINE_LENGTH)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect();
    lines.join(line_ending).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        assert_eq!(TransferEncoding::from_header(None), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::from_header(Some(" Base64 ")), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::from_header(Some("x-uuencode")),
            TransferEncoding::Other("x-uuencode".to_string())
        );
    }

    #[test]
    fn test_encode_base64_body_wraps_lines() {
        let data = vec![0u8; 120];
        let body = String::from_utf8(encode_base64_body(&data, "\r\n")).unwrap();
        let lines: Vec<&str> = body.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert!(!body.ends_with("\r\n"));
    }
}
