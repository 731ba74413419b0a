//! Rule-driven streaming markup rewriting.
//!
//! A [`RewriteSession`] pulls tokens from the `html` tokenizer and routes
//! every tag whose name has a registered rule to that rule. Everything else
//! (text, comments, unmatched tags) is copied through verbatim. Rules write
//! through a [`ProcessingContext`], which exposes a stack of output buffers:
//! pushing a buffer captures subsequent output, so a block rule can read the
//! markup between its open and close tags and export it as a property.
//!
//! ```
//! use rewrite::{CaptureAndExport, RuleSet, TagRename, rewrite_str};
//!
//! let mut rules = RuleSet::new();
//! rules.add_basic("b", TagRename::new("strong")).unwrap();
//! rules.add_block("title", CaptureAndExport::new("title")).unwrap();
//!
//! let out = rewrite_str("<title>Hi</title><b>x</b>", &rules).unwrap();
//! assert_eq!(out.document, "<title>Hi</title><strong>x</strong>");
//! assert_eq!(out.properties.get("title"), Some("Hi"));
//! ```

mod buffer;
pub mod config;
mod context;
mod error;
mod properties;
mod rule;
mod rule_set;
pub mod rules;
mod session;
mod tag;

pub use buffer::{Buffer, BufferStack};
pub use config::RewriteConfig;
pub use context::ProcessingContext;
pub use error::{ConfigError, RewriteError};
pub use properties::{Properties, PropertySink};
pub use rule::{BasicRule, BlockRule};
pub use rule_set::{RuleSet, TextFilter};
pub use rules::{CaptureAndExport, MetaTagExport, ReplaceTextFilter, TagRename};
pub use session::{
    RewriteOutcome, RewriteSession, Rewritten, SessionConfig, SessionStats, rewrite_str,
};
pub use tag::Tag;

pub use html::TagKind;
