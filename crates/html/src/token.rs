//! Lossless token model.

use crate::span::Span;

/// Syntactic kind of a tag occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `<name ...>`
    Open,
    /// `</name ...>`
    Close,
    /// `<name .../>`
    Empty,
}

/// Quoting style of an attribute value as written in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
    Unquoted,
}

/// Attribute value location inside the tag source (quotes excluded).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeValue {
    pub span: Span,
    pub quote: Quote,
}

/// Attribute of a tag, stored as spans into the tag source.
///
/// Determinism contract:
/// - Attributes are stored in encounter order.
/// - Duplicate names (ASCII case-insensitive) are dropped after the first
///   occurrence ("first-wins"); the dropped text stays in the tag source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: Span,
    pub value: Option<AttributeValue>,
}

/// One tag occurrence exactly as it appeared in the input.
///
/// Invariant: `name` and every attribute span resolve against `source`, and
/// `source` is the verbatim input text of the tag, delimiters included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTag {
    pub(crate) source: String,
    pub(crate) kind: TagKind,
    pub(crate) name: Span,
    pub(crate) attributes: Vec<RawAttribute>,
}

impl RawTag {
    /// Parse a complete tag such as `<a href="x">`.
    ///
    /// Returns `None` unless `source` is exactly one well-formed tag.
    pub fn parse(source: &str) -> Option<Self> {
        let bytes = source.as_bytes();
        if bytes.first() != Some(&b'<') {
            return None;
        }
        let is_close = bytes.get(1) == Some(&b'/');
        let (tag, consumed) = crate::tokenizer::scan_tag(source, is_close)?;
        (consumed == source.len()).then_some(tag)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Tag name as written (original case).
    pub fn name(&self) -> &str {
        self.name.resolve(&self.source)
    }

    pub fn name_span(&self) -> Span {
        self.name
    }

    pub fn attributes(&self) -> &[RawAttribute] {
        &self.attributes
    }

    pub fn attribute_name(&self, attribute: &RawAttribute) -> &str {
        attribute.name.resolve(&self.source)
    }

    /// Attribute value without quotes, `None` for a bare attribute (`<input disabled>`).
    pub fn attribute_value(&self, attribute: &RawAttribute) -> Option<&str> {
        attribute
            .value
            .map(|value| value.span.resolve(&self.source))
    }

    pub fn into_source(self) -> String {
        self.source
    }
}

/// Token emitted by the streaming tokenizer.
///
/// Every variant carries its verbatim source text, so concatenating
/// [`Token::source`] over a token stream reproduces the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Text(String),
    /// `<!-- ... -->`, or a bogus comment such as `<?xml ...?>` / `<![CDATA[...]]>`.
    Comment(String),
    Doctype(String),
    Tag(RawTag),
}

impl Token {
    pub fn source(&self) -> &str {
        match self {
            Token::Text(text) | Token::Comment(text) | Token::Doctype(text) => text,
            Token::Tag(tag) => tag.source(),
        }
    }
}
