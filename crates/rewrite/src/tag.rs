//! Read-only view over one tag occurrence.

use std::borrow::Cow;
use std::fmt;

use html::{RawAttribute, RawTag, TagKind};

use crate::buffer::Buffer;

/// View over a tokenized tag, optionally under a substituted name.
///
/// The underlying [`RawTag`] is never mutated: [`Tag::with_name`] derives a
/// new view, so any other observer still sees the original occurrence.
#[derive(Clone, Debug)]
pub struct Tag<'a> {
    raw: &'a RawTag,
    renamed: Option<Cow<'a, str>>,
}

impl<'a> Tag<'a> {
    pub fn new(raw: &'a RawTag) -> Self {
        Self { raw, renamed: None }
    }

    /// Tag name as it will be serialized.
    pub fn name(&self) -> &str {
        self.renamed.as_deref().unwrap_or_else(|| self.raw.name())
    }

    /// Tag name as written in the input.
    pub fn original_name(&self) -> &'a str {
        self.raw.name()
    }

    pub fn kind(&self) -> TagKind {
        self.raw.kind()
    }

    pub fn is_renamed(&self) -> bool {
        self.renamed.is_some()
    }

    pub fn raw(&self) -> &'a RawTag {
        self.raw
    }

    pub fn attribute_count(&self) -> usize {
        self.raw.attributes().len()
    }

    /// Name of the attribute at `index`, as written.
    ///
    /// # Panics
    ///
    /// Panics if `index >= attribute_count()`.
    pub fn attribute_name(&self, index: usize) -> &'a str {
        self.raw.attribute_name(self.attribute_at(index))
    }

    /// Value of the attribute at `index`; `""` for a bare attribute.
    ///
    /// # Panics
    ///
    /// Panics if `index >= attribute_count()`.
    pub fn attribute_value(&self, index: usize) -> &'a str {
        self.raw
            .attribute_value(self.attribute_at(index))
            .unwrap_or_default()
    }

    /// Value of the attribute called `name` (ASCII case-insensitive).
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        let raw = self.raw;
        raw.attributes()
            .iter()
            .find(|attr| raw.attribute_name(attr).eq_ignore_ascii_case(name))
            .map(|attr| raw.attribute_value(attr).unwrap_or_default())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// `(name, value)` pairs in source order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let raw = self.raw;
        raw.attributes().iter().map(move |attr| {
            (
                raw.attribute_name(attr),
                raw.attribute_value(attr).unwrap_or_default(),
            )
        })
    }

    /// Derive a view with a different name; kind and attributes are unchanged.
    pub fn with_name<'n>(&self, name: impl Into<Cow<'n, str>>) -> Tag<'n>
    where
        'a: 'n,
    {
        Tag {
            raw: self.raw,
            renamed: Some(name.into()),
        }
    }

    /// Serialize the tag into `buffer`.
    ///
    /// An un-renamed view writes its source verbatim. A renamed view swaps only
    /// the name; delimiters, attribute order, quoting and whitespace are kept.
    pub fn write_to(&self, buffer: &mut Buffer) {
        let source = self.raw.source();
        match self.renamed.as_deref() {
            None => buffer.append(source),
            Some(name) => {
                let span = self.raw.name_span();
                buffer.append(&source[..span.start]);
                buffer.append(name);
                buffer.append(&source[span.end..]);
            }
        }
    }

    fn attribute_at(&self, index: usize) -> &'a RawAttribute {
        let attributes = self.raw.attributes();
        assert!(
            index < attributes.len(),
            "attribute index {index} out of range for <{}> with {} attributes",
            self.raw.name(),
            attributes.len()
        );
        &attributes[index]
    }
}

impl fmt::Display for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = Buffer::new();
        self.write_to(&mut buffer);
        f.write_str(buffer.as_str())
    }
}
