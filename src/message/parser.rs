//! Builds the part tree from raw message bytes.
//!
//! MIME structure and decoded content come from `mail-parser`. Its part offsets
//! are only used to cut the input into spans; every byte between two spans is
//! kept as a gap, so an untouched tree writes back exactly the input.

use mail_parser::{MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::debug;

use super::header::{looks_like_field, split_lines};
use super::{Container, HeaderBlock, Leaf, Node, ParameterizedValue, ParseError, Part, TransferEncoding};

/// Deeper multipart nesting is kept as an opaque leaf
const MAX_DEPTH: usize = 32;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Root node plus the bytes around it that belong to no MIME entity
pub(super) struct ParsedMessage {
    pub(super) leading: Vec<u8>,
    pub(super) root: Node,
    pub(super) trailing: Vec<u8>,
}

pub(super) fn parse_message(bytes: &[u8]) -> Result<ParsedMessage, ParseError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ParseError::Empty);
    }

    let (envelope, rest) = bytes.split_at(envelope_len(bytes));
    let first = split_lines(rest).next().unwrap_or_default();
    if !looks_like_field(first) {
        return Err(ParseError::MissingHeaders);
    }

    let parsed = MessageParser::default()
        .parse(rest)
        .ok_or(ParseError::MissingHeaders)?;
    if parsed.parts.is_empty() {
        return Err(ParseError::MissingHeaders);
    }

    let builder = TreeBuilder {
        raw: rest,
        parts: &parsed.parts,
    };
    let (root, span) = builder.build(0, 0);

    let mut leading = envelope.to_vec();
    leading.extend_from_slice(&rest[..span.start]);

    Ok(ParsedMessage {
        leading,
        root,
        trailing: rest[span.end..].to_vec(),
    })
}

/// Length of a UTF-8 BOM and an mbox `From ` separator line, when present
fn envelope_len(bytes: &[u8]) -> usize {
    let mut len = 0;
    if bytes.starts_with(UTF8_BOM) {
        len = UTF8_BOM.len();
    }
    if bytes[len..].starts_with(b"From ") {
        len += split_lines(&bytes[len..]).next().map_or(0, <[u8]>::len);
    }
    len
}

/// Byte range of an entity: header section, then body up to `end`
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    body: usize,
    end: usize,
}

struct TreeBuilder<'a, 'x> {
    raw: &'a [u8],
    parts: &'a [MessagePart<'x>],
}

impl TreeBuilder<'_, '_> {
    /// Offsets clamped so that `start <= body <= end <= input length`
    fn span(&self, part: &MessagePart<'_>) -> Span {
        let len = self.raw.len();
        let start = (part.offset_header as usize).min(len);
        let body = (part.offset_body as usize).clamp(start, len);
        let end = (part.offset_end as usize).clamp(body, len);
        Span { start, body, end }
    }

    fn build(&self, id: usize, depth: usize) -> (Node, Span) {
        let Some(part) = self.parts.get(id) else {
            let whole = Span {
                start: 0,
                body: 0,
                end: self.raw.len(),
            };
            return (Node::Leaf(self.opaque_leaf(whole)), whole);
        };
        let span = self.span(part);

        if let PartType::Multipart(ref children) = part.body {
            if depth >= MAX_DEPTH {
                debug!("multipart nesting deeper than {}, keeping it as a leaf", MAX_DEPTH);
            } else if children.is_empty() {
                debug!("multipart without any part, keeping it as a leaf");
            } else if let Some((container, end)) = self.container(part, children, span, depth) {
                return (Node::Container(container), Span { end, ..span });
            } else {
                debug!("multipart with overlapping parts, keeping it as a leaf");
            }
        }

        (Node::Leaf(self.leaf(part, span)), span)
    }

    /// Children in input order with the gaps between them; `None` when offsets go backwards
    fn container(
        &self,
        part: &MessagePart<'_>,
        children: &[usize],
        span: Span,
        depth: usize,
    ) -> Option<(Container, usize)> {
        let mut cursor = span.body;
        let mut parts = Vec::with_capacity(children.len());

        for &child in children {
            let (node, child_span) = self.build(child, depth + 1);
            if child_span.start < cursor {
                return None;
            }
            parts.push(Part {
                delimiter: self.raw[cursor..child_span.start].to_vec(),
                node,
            });
            cursor = child_span.end;
        }

        let end = span.end.max(cursor);
        let subtype = part
            .content_type()
            .and_then(|ct| ct.subtype())
            .unwrap_or("mixed")
            .to_string();

        Some((
            Container {
                header: HeaderBlock::parse(&self.raw[span.start..span.body]),
                subtype,
                parts,
                closing: self.raw[cursor..end].to_vec(),
            },
            end,
        ))
    }

    fn leaf(&self, part: &MessagePart<'_>, span: Span) -> Leaf {
        let header = HeaderBlock::parse(&self.raw[span.start..span.body]);
        let raw_body = &self.raw[span.body..span.end];

        let (media_type, media_subtype) = part
            .content_type()
            .filter(|ct| !ct.ctype().is_empty())
            .map(|ct| (ct.ctype().to_string(), ct.subtype().unwrap_or_default().to_string()))
            .unwrap_or_else(|| ("text".to_string(), "plain".to_string()));

        let content_type = header
            .get("content-type")
            .map(|value| ParameterizedValue::parse(&value))
            .filter(|ct| ct.value.contains('/'))
            .unwrap_or_else(|| ParameterizedValue::parse(&format!("{}/{}", media_type, media_subtype)));
        let disposition = header
            .get("content-disposition")
            .map(|value| ParameterizedValue::parse(&value));
        let filename = part
            .attachment_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty());
        let encoding = TransferEncoding::from_header(header.get("content-transfer-encoding").as_deref());

        let content = if part.is_encoding_problem || matches!(part.body, PartType::Multipart(_)) {
            debug!("Keeping raw {} body of {}/{}", encoding.as_str(), media_type, media_subtype);
            raw_body.to_vec()
        } else {
            part.contents().to_vec()
        };

        Leaf {
            header,
            content_type,
            disposition,
            media_type,
            media_subtype,
            filename,
            encoding,
            content,
            raw_body: raw_body.to_vec(),
            modified: false,
        }
    }

    fn opaque_leaf(&self, span: Span) -> Leaf {
        let raw_body = self.raw[span.body..span.end].to_vec();
        Leaf {
            header: HeaderBlock::default(),
            content_type: ParameterizedValue::parse("text/plain"),
            disposition: None,
            media_type: "text".to_string(),
            media_subtype: "plain".to_string(),
            filename: None,
            encoding: TransferEncoding::SevenBit,
            content: raw_body.clone(),
            raw_body,
            modified: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Message;
    use super::*;

    const WITH_IMAGE: &str = "Subject: photos\n\
Content-Type: multipart/mixed; boundary=\"sep\"\n\
\n\
--sep\n\
Content-Type: text/plain\n\
\n\
see attached\n\
--sep\n\
Content-Type: image/png; name=\"a.png\"\n\
Content-Transfer-Encoding: base64\n\
\n\
aGVsbG8gd29ybGQ=\n\
--sep--\n";

    fn image_leaf(message: &Message) -> Option<(String, Vec<u8>)> {
        message
            .leaves()
            .into_iter()
            .find(|(_, leaf)| leaf.media_type().eq_ignore_ascii_case("image"))
            .map(|(_, leaf)| (leaf.filename().unwrap_or_default().to_string(), leaf.content().to_vec()))
    }

    #[test]
    fn test_rejects_empty_and_headerless_input() {
        assert_eq!(Message::parse(b"").unwrap_err(), ParseError::Empty);
        assert_eq!(Message::parse(b" \r\n\r\n").unwrap_err(), ParseError::Empty);
        assert_eq!(
            Message::parse(b"\x00\x01 definitely not a mail").unwrap_err(),
            ParseError::MissingHeaders
        );
        assert_eq!(
            Message::parse(b"From someone@example.com\n").unwrap_err(),
            ParseError::MissingHeaders
        );
    }

    #[test]
    fn test_accepts_mbox_separator_line() {
        let raw = format!("From someone@example.com Mon Jan  1 00:00:00 2024\n{}", WITH_IMAGE);
        let message = Message::parse(raw.as_bytes()).unwrap();

        assert!(matches!(message.root(), Node::Container(_)));
        assert_eq!(message.headers().get("subject").as_deref(), Some("photos"));
        assert_eq!(message.leaves().len(), 2);
        assert_eq!(
            image_leaf(&message),
            Some(("a.png".to_string(), b"hello world".to_vec()))
        );
        assert_eq!(message.to_bytes(), raw.as_bytes());
    }

    #[test]
    fn test_accepts_byte_order_mark() {
        let mut raw = UTF8_BOM.to_vec();
        raw.extend_from_slice(WITH_IMAGE.as_bytes());
        let message = Message::parse(&raw).unwrap();

        assert!(matches!(message.root(), Node::Container(_)));
        assert_eq!(
            image_leaf(&message),
            Some(("a.png".to_string(), b"hello world".to_vec()))
        );
        assert_eq!(message.to_bytes(), raw);
    }

    #[test]
    fn test_single_part_message_is_a_leaf() {
        let raw = b"Subject: scan\r\nContent-Type: application/PDF; name=scan.pdf\r\n\r\n%PDF-1.4\r\n";
        let message = Message::parse(raw).unwrap();
        let leaves = message.leaves();
        assert_eq!(leaves.len(), 1);
        let (path, leaf) = &leaves[0];
        assert_eq!(path.to_string(), "root");
        assert_eq!(leaf.media_type(), "application");
        assert!(leaf.media_subtype().eq_ignore_ascii_case("pdf"));
        assert_eq!(leaf.filename(), Some("scan.pdf"));
        assert!(leaf.content().starts_with(b"%PDF-1.4"));
        assert_eq!(message.to_bytes(), raw);
    }

    #[test]
    fn test_missing_content_type_defaults_to_text_plain() {
        let message = Message::parse(b"Subject: plain\n\nhello\n").unwrap();
        let leaves = message.leaves();
        assert_eq!(leaves[0].1.media_type(), "text");
        assert_eq!(leaves[0].1.media_subtype(), "plain");
    }

    #[test]
    fn test_encoded_filename_in_legacy_charset() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\n\
Content-Type: image/png; name=\"=?windows-1252?Q?caf=E9.png?=\"\n\
Content-Transfer-Encoding: base64\n\naGk=\n--b--\n";
        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(
            image_leaf(&message),
            Some(("café.png".to_string(), b"hi".to_vec()))
        );
    }

    #[test]
    fn test_rfc2231_filename() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\n\
Content-Type: image/png\n\
Content-Disposition: attachment; filename*=utf-8''caf%C3%A9.png\n\
Content-Transfer-Encoding: base64\n\naGk=\n--b--\n";
        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(image_leaf(&message).map(|(name, _)| name).as_deref(), Some("café.png"));
        assert_eq!(message.to_bytes(), raw.as_bytes());
    }

    #[test]
    fn test_multipart_without_parts_round_trips() {
        let raw = b"Content-Type: multipart/mixed; boundary=zzz\n\nno parts here\n";
        let message = Message::parse(raw).unwrap();
        assert!(message.leaves().iter().all(|(_, leaf)| !leaf.media_type().eq_ignore_ascii_case("image")));
        assert_eq!(message.to_bytes(), raw);
    }

    #[test]
    fn test_boundary_prefix_line_round_trips() {
        let raw = "Content-Type: multipart/mixed; boundary=ab\n\n--ab\nContent-Type: text/plain\n\n--abc is text\n--ab--\n";
        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.to_bytes(), raw.as_bytes());
    }

    #[test]
    fn test_part_without_headers() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\n\nimplicit text\n--b--\n";
        let message = Message::parse(raw.as_bytes()).unwrap();
        let leaves = message.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].1.media_type(), "text");
        assert_eq!(leaves[0].1.media_subtype(), "plain");
        assert_eq!(message.to_bytes(), raw.as_bytes());
    }
}
