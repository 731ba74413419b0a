//! Byte spans into a token's source text.

/// Byte span into the source text of a single token.
///
/// Invariant: `start <= end`, and both ends sit on UTF-8 boundaries of the
/// source the span was produced for. Spans are relative to the owning token,
/// never to the document, so a token stays valid after the tokenizer compacts
/// its input buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must be <= end");
        Self { start, end }
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Resolve the span against the source it was produced for.
    pub fn resolve(self, source: &str) -> &str {
        debug_assert!(
            source.is_char_boundary(self.start) && source.is_char_boundary(self.end),
            "span must be on UTF-8 boundaries"
        );
        &source[self.start..self.end]
    }
}
