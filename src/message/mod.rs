//! # Message Container Module
//!
//! Questo modulo gestisce il formato dei messaggi `.eml` (MIME multipart).
//!
//! ## Responsabilità:
//! - Decodifica di un messaggio in un albero di nodi `Container` / `Leaf` (via `mail-parser`)
//! - Righe di envelope mbox (`From `) e BOM conservate come segmento iniziale
//! - Serializzazione dell'albero: i nodi non modificati vengono riscritti
//!   byte per byte, solo le foglie compresse vengono ricodificate
//!
//! ## Struttura:
//! - `Message`: segmento iniziale + nodo radice + byte finali
//! - `Node::Container`: figli ordinati, byte originali tra un figlio e l'altro
//! - `Node::Leaf`: media type, subtype, filename, contenuto decodificato
//! - `NodePath`: percorso di indici dalla radice a un nodo
//!
//! ## Esempio:
//! ```rust,ignore
//! let message = Message::parse(&bytes)?;
//! let output = message.to_bytes();
//! ```

pub mod encoding;
pub mod header;
mod parser;

use std::fmt;

pub use encoding::TransferEncoding;
pub use header::{HeaderBlock, ParameterizedValue};

use encoding::encode_base64_body;

/// Input that cannot be read as a message at all
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("input is empty")]
    Empty,

    #[error("input does not start with a header field")]
    MissingHeaders,
}

/// Index path from the root to a node; the root itself is the empty path
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// A parsed message: its header block is the root node's header block
#[derive(Debug, Clone)]
pub struct Message {
    /// BOM and mbox `From ` line, written back untouched
    leading: Vec<u8>,
    root: Node,
    trailing: Vec<u8>,
}

/// Position in the part tree
#[derive(Debug, Clone)]
pub enum Node {
    Container(Container),
    Leaf(Leaf),
}

/// One child of a container together with the bytes that precede it
/// (preamble and delimiter line for the first child, delimiter line otherwise)
#[derive(Debug, Clone)]
pub struct Part {
    delimiter: Vec<u8>,
    node: Node,
}

/// `multipart/*` entity; children keep their input order
#[derive(Debug, Clone)]
pub struct Container {
    header: HeaderBlock,
    subtype: String,
    parts: Vec<Part>,
    /// Close delimiter and epilogue
    closing: Vec<u8>,
}

/// Non-container entity: the unit of compression
#[derive(Debug, Clone)]
pub struct Leaf {
    header: HeaderBlock,
    content_type: ParameterizedValue,
    disposition: Option<ParameterizedValue>,
    media_type: String,
    media_subtype: String,
    filename: Option<String>,
    encoding: TransferEncoding,
    content: Vec<u8>,
    raw_body: Vec<u8>,
    modified: bool,
}

/// Replacement produced by a successful compression task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafUpdate {
    pub content: Vec<u8>,
    pub subtype: Option<String>,
    pub filename: Option<String>,
}

impl Message {
    /// Decodes a message; fails only when the input has no header block at all.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        parser::parse_message(bytes).map(|parsed| Self {
            leading: parsed.leading,
            root: parsed.root,
            trailing: parsed.trailing,
        })
    }

    pub fn headers(&self) -> &HeaderBlock {
        self.root.header()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        path.indices()
            .iter()
            .try_fold(&self.root, |node, &index| match node {
                Node::Container(container) => container.parts.get(index).map(|p| &p.node),
                Node::Leaf(_) => None,
            })
    }

    pub fn leaf_mut(&mut self, path: &NodePath) -> Option<&mut Leaf> {
        let mut node = &mut self.root;
        for &index in path.indices() {
            node = match node {
                Node::Container(container) => &mut container.parts.get_mut(index)?.node,
                Node::Leaf(_) => return None,
            };
        }
        match node {
            Node::Leaf(leaf) => Some(leaf),
            Node::Container(_) => None,
        }
    }

    /// Every leaf with its path, in tree order
    pub fn leaves(&self) -> Vec<(NodePath, &Leaf)> {
        let mut out = Vec::new();
        collect_leaves(&self.root, NodePath::root(), &mut out);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.leading.clone();
        self.root.write_to(&mut out);
        out.extend_from_slice(&self.trailing);
        out
    }
}

fn collect_leaves<'a>(node: &'a Node, path: NodePath, out: &mut Vec<(NodePath, &'a Leaf)>) {
    match node {
        Node::Leaf(leaf) => out.push((path, leaf)),
        Node::Container(container) => {
            for (index, child) in container.children().enumerate() {
                collect_leaves(child, path.child(index), out);
            }
        }
    }
}

impl Node {
    pub fn header(&self) -> &HeaderBlock {
        match self {
            Node::Container(container) => &container.header,
            Node::Leaf(leaf) => &leaf.header,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Node::Container(container) => container.write_to(out),
            Node::Leaf(leaf) => leaf.write_to(out),
        }
    }
}

impl Container {
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.parts.iter().map(|p| &p.node)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        self.header.write_to(out);
        for part in &self.parts {
            out.extend_from_slice(&part.delimiter);
            part.node.write_to(out);
        }
        out.extend_from_slice(&self.closing);
    }
}

impl Leaf {
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn media_subtype(&self) -> &str {
        &self.media_subtype
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn encoding(&self) -> &TransferEncoding {
        &self.encoding
    }

    /// Decoded body
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Human readable label for diagnostics, `fallback` when the part has no filename
    pub fn label(&self, fallback: &str) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Swaps in compressed content; headers are rewritten on serialization.
    pub fn apply(&mut self, update: LeafUpdate) {
        if let Some(subtype) = update.subtype {
            self.media_subtype = subtype;
            self.content_type.value = format!("{}/{}", self.media_type, self.media_subtype);
        }

        if let Some(filename) = update.filename {
            if self.content_type.has_param("name") {
                self.content_type.set_param("name", &filename);
            }
            if let Some(ref mut disposition) = self.disposition {
                if disposition.has_param("filename") {
                    disposition.set_param("filename", &filename);
                }
            }
            self.filename = Some(filename);
        }

        self.content = update.content;
        self.encoding = TransferEncoding::Base64;
        self.modified = true;
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        if !self.modified {
            self.header.write_to(out);
            out.extend_from_slice(&self.raw_body);
            return;
        }

        let mut header = self.header.clone();
        header.set("Content-Type", &self.content_type.to_header_value());
        if let Some(ref disposition) = self.disposition {
            header.set("Content-Disposition", &disposition.to_header_value());
        }
        header.set("Content-Transfer-Encoding", self.encoding.as_str());
        header.ensure_terminator();

        let line_ending = header.line_ending();
        header.write_to(out);
        out.extend_from_slice(&encode_base64_body(&self.content, line_ending));
        if self.raw_body.ends_with(b"\n") || self.raw_body.is_empty() {
            out.extend_from_slice(line_ending.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "From: sender@example.com\r\n\
To: rcpt@example.com\r\n\
Subject: holiday\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
This is a multi-part message in MIME format.\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hello there\r\n\
--inner\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Hello there</p>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: image/png; name=\"a.png\"\r\n\
Content-Disposition: attachment; filename=\"a.png\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aGVsbG8gd29ybGQ=\r\n\
--outer--\r\n\
epilogue\r\n";

    #[test]
    fn test_parse_tree_shape() {
        let message = Message::parse(MIXED.as_bytes()).unwrap();
        assert_eq!(message.headers().get("subject").as_deref(), Some("holiday"));

        let leaves = message.leaves();
        let summary: Vec<(String, &str, &str)> = leaves
            .iter()
            .map(|(path, leaf)| (path.to_string(), leaf.media_type(), leaf.media_subtype()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("0.0".to_string(), "text", "plain"),
                ("0.1".to_string(), "text", "html"),
                ("1".to_string(), "image", "png"),
            ]
        );

        let (_, image) = &leaves[2];
        assert_eq!(image.filename(), Some("a.png"));
        assert_eq!(image.content(), b"hello world");
        assert_eq!(image.encoding(), &TransferEncoding::Base64);
    }

    #[test]
    fn test_untouched_message_round_trips_byte_identical() {
        let message = Message::parse(MIXED.as_bytes()).unwrap();
        assert_eq!(message.to_bytes(), MIXED.as_bytes());
    }

    #[test]
    fn test_lf_only_message_round_trips() {
        let lf = MIXED.replace("\r\n", "\n");
        let message = Message::parse(lf.as_bytes()).unwrap();
        assert_eq!(message.leaves().len(), 3);
        assert_eq!(message.to_bytes(), lf.as_bytes());
    }

    #[test]
    fn test_apply_rewrites_only_the_leaf() {
        let mut message = Message::parse(MIXED.as_bytes()).unwrap();
        let path = NodePath::root().child(1);
        message.leaf_mut(&path).unwrap().apply(LeafUpdate {
            content: b"jpeg bytes".to_vec(),
            subtype: Some("jpeg".to_string()),
            filename: Some("a.jpg".to_string()),
        });

        let output = String::from_utf8(message.to_bytes()).unwrap();
        assert!(output.contains("Content-Type: image/jpeg; name=\"a.jpg\"\r\n"));
        assert!(output.contains("Content-Disposition: attachment; filename=\"a.jpg\"\r\n"));
        assert!(output.contains("anBlZyBieXRlcw==\r\n--outer--\r\nepilogue\r\n"));
        assert!(output.starts_with("From: sender@example.com\r\n"));
        assert!(output.contains("<p>Hello there</p>\r\n--inner--\r\n"));

        let reparsed = Message::parse(output.as_bytes()).unwrap();
        let leaves = reparsed.leaves();
        let (_, image) = &leaves[2];
        assert_eq!(image.media_subtype(), "jpeg");
        assert_eq!(image.filename(), Some("a.jpg"));
        assert_eq!(image.content(), b"jpeg bytes");
    }

    #[test]
    fn test_node_lookup() {
        let message = Message::parse(MIXED.as_bytes()).unwrap();
        assert!(matches!(message.node(&NodePath::root().child(0)), Some(Node::Container(_))));
        assert!(matches!(message.node(&NodePath::root().child(1)), Some(Node::Leaf(_))));
        assert!(message.node(&NodePath::root().child(7)).is_none());
        assert_eq!(NodePath::root().to_string(), "root");
    }
}
