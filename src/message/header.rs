//! Header block handling: raw fields kept verbatim, plus the parameter editing
//! needed to rewrite `Content-Type` / `Content-Disposition` of a replaced part.
//! Decoding of parameter values (RFC 2047 / RFC 2231) is left to `mail-parser`.

use base64::Engine as _;

/// One header field, stored exactly as it appeared (folded lines included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    raw: Vec<u8>,
}

impl HeaderField {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unfolded value with surrounding whitespace removed
    pub fn value(&self) -> String {
        let text = decode_header_bytes(&self.raw);
        let after_colon = text.split_once(':').map(|(_, v)| v).unwrap_or("");
        after_colon
            .replace("\r\n", "")
            .replace('\n', "")
            .trim()
            .to_string()
    }
}

/// UTF-8 when valid, otherwise Windows-1252 (accepts every byte)
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Header section of a message or MIME part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    fields: Vec<HeaderField>,
    /// Lines that precede the first field and do not parse as one
    leading: Vec<u8>,
    /// The blank line closing the section (empty when the input ended first)
    terminator: Vec<u8>,
}

impl HeaderBlock {
    /// Parses a header section; `section` includes the terminating blank line if any.
    pub fn parse(section: &[u8]) -> Self {
        let mut block = HeaderBlock::default();
        let mut lines = split_lines(section);

        for line in lines.by_ref() {
            if is_blank_line(line) {
                block.terminator = line.to_vec();
                break;
            }

            let is_continuation = matches!(line.first(), Some(b' ') | Some(b'\t'));
            match field_name(line).filter(|_| !is_continuation) {
                Some(name) => block.fields.push(HeaderField {
                    name,
                    raw: line.to_vec(),
                }),
                None => match block.fields.last_mut() {
                    Some(field) => field.raw.extend_from_slice(line),
                    None => block.leading.extend_from_slice(line),
                },
            }
        }

        // Anything after the blank line stays with the section
        for line in lines {
            block.terminator.extend_from_slice(line);
        }

        block
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.leading.is_empty()
    }

    /// Value of the first field with this name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(HeaderField::value)
    }

    /// Line ending used by this section, CRLF unless the section is LF-only
    pub fn line_ending(&self) -> &'static str {
        let sample = self
            .fields
            .first()
            .map(|f| f.raw.as_slice())
            .unwrap_or(self.terminator.as_slice());
        if sample.ends_with(b"\n") && !sample.ends_with(b"\r\n") {
            "\n"
        } else {
            "\r\n"
        }
    }

    /// Replaces the first field with this name, or appends a new one.
    pub fn set(&mut self, name: &str, value: &str) {
        let raw = format!("{}: {}{}", name, value, self.line_ending()).into_bytes();
        match self.fields.iter_mut().find(|f| f.name.eq_ignore_ascii_case(name)) {
            Some(field) => field.raw = raw,
            None => self.fields.push(HeaderField {
                name: name.to_string(),
                raw,
            }),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.leading);
        for field in &self.fields {
            out.extend_from_slice(&field.raw);
        }
        out.extend_from_slice(&self.terminator);
    }

    /// Ensures the block ends with a blank line, required once a body is rewritten
    pub fn ensure_terminator(&mut self) {
        if self.terminator.is_empty() {
            let line_ending = self.line_ending();
            if let Some(last) = self.fields.last_mut() {
                if !last.raw.ends_with(b"\n") {
                    last.raw.extend_from_slice(line_ending.as_bytes());
                }
            }
            self.terminator = line_ending.as_bytes().to_vec();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Param {
    /// Lowercased key as written, RFC 2231 markers included (`filename*0*`)
    key: String,
    value: String,
    /// Original `key=value` text, re-emitted untouched
    raw: Option<String>,
}

impl Param {
    /// Key without RFC 2231 section and charset markers
    fn base_name(&self) -> &str {
        self.key.split('*').next().unwrap_or(&self.key)
    }
}

/// Structured header value such as `image/png; name="a.png"`, edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedValue {
    /// Everything before the first `;`
    pub value: String,
    params: Vec<Param>,
}

impl ParameterizedValue {
    pub fn parse(raw: &str) -> Self {
        let mut pieces = split_unquoted(raw, ';').into_iter();
        let value = pieces.next().unwrap_or_default().trim().to_string();

        let params = pieces
            .filter_map(|piece| {
                let piece = piece.trim();
                let (key, val) = piece.split_once('=')?;
                Some(Param {
                    key: key.trim().to_ascii_lowercase(),
                    value: unquote(val.trim()),
                    raw: Some(piece.to_string()),
                })
            })
            .collect();

        Self { value, params }
    }

    /// Raw value of a plain (non RFC 2231) parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }

    /// True when the parameter is present in any form, RFC 2231 sections included
    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.base_name().eq_ignore_ascii_case(name))
    }

    /// Replaces every form of the parameter with a single plain one, keeping its position.
    pub fn set_param(&mut self, name: &str, value: &str) {
        let position = self
            .params
            .iter()
            .position(|p| p.base_name().eq_ignore_ascii_case(name));
        self.params.retain(|p| !p.base_name().eq_ignore_ascii_case(name));

        let param = Param {
            key: name.to_ascii_lowercase(),
            value: value.to_string(),
            raw: None,
        };
        match position {
            Some(index) => self.params.insert(index.min(self.params.len()), param),
            None => self.params.push(param),
        }
    }

    /// Formats back into a header value; new non-ASCII values become RFC 2047 words
    pub fn to_header_value(&self) -> String {
        let mut out = self.value.clone();
        for param in &self.params {
            match param.raw {
                Some(ref raw) => out.push_str(&format!("; {}", raw)),
                None => {
                    let value = if param.value.is_ascii() {
                        param.value.clone()
                    } else {
                        encode_word(&param.value)
                    };
                    out.push_str(&format!(
                        "; {}=\"{}\"",
                        param.key,
                        value.replace('\\', "\\\\").replace('"', "\\\"")
                    ));
                }
            }
        }
        out
    }
}

fn encode_word(text: &str) -> String {
    format!(
        "=?utf-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut escaped = false;
            for c in inner.chars() {
                if escaped {
                    out.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => value.to_string(),
    }
}

/// Splits on `separator` outside double quotes.
fn split_unquoted(input: &str, separator: char) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c == separator && !in_quotes => pieces.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    pieces.push(current);
    pieces
}

/// Splits into lines, each keeping its own line ending.
pub(crate) fn split_lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes.split_inclusive(|&b| b == b'\n')
}

pub(crate) fn is_blank_line(line: &[u8]) -> bool {
    line == b"\n" || line == b"\r\n"
}

/// `Name: value` where the name is printable ASCII without spaces
pub(crate) fn looks_like_field(line: &[u8]) -> bool {
    field_name(line).is_some()
}

fn field_name(line: &[u8]) -> Option<String> {
    let colon = line.iter().position(|&b| b == b':')?;
    let name = &line[..colon];
    if name.is_empty() || !name.iter().all(|&b| (33..=126).contains(&b)) {
        return None;
    }
    Some(String::from_utf8_lossy(name).into_owned())
}
