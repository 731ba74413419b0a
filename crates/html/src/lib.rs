//! Streaming, lossless markup tokenizer.
//!
//! Produces the tag/text event stream consumed by the `rewrite` engine. Tokens
//! keep their exact source text so unmatched markup can be re-emitted byte for
//! byte.

mod span;
mod token;
mod tokenizer;

pub use crate::span::Span;
pub use crate::token::{AttributeValue, Quote, RawAttribute, RawTag, TagKind, Token};
pub use crate::tokenizer::{Tokenizer, TokenizerConfig, TokenizerStats, tokenize};
