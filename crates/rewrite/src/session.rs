//! Rewrite session: drives the tokenizer and dispatches tags to rules.
//!
//! One session is one document pass. It owns the buffer stack, the exported
//! properties and the pending block states; the rule set is only borrowed, so
//! concurrent passes each get their own session over a shared `RuleSet`.
//!
//! Invariants:
//! - Output is flushed to the writer only while the buffer stack is at root
//!   depth, so captured (pushed) content is never written early.
//! - A basic rule leaves the buffer depth unchanged; a block rule's end
//!   callback restores the depth recorded before its start callback.
//! - Chunk-equivalence: output and properties do not depend on how the input
//!   is split across `push_str`/`push_bytes` calls.

use std::borrow::Cow;
use std::io;

use html::{RawTag, TagKind, Token, Tokenizer, TokenizerConfig};
use tools::utf8::Utf8ChunkDecoder;

use crate::buffer::BufferStack;
use crate::context::ProcessingContext;
use crate::error::RewriteError;
use crate::properties::Properties;
use crate::rule::{PendingState, Rule};
use crate::rule_set::{RuleSet, RuleSlot};
use crate::tag::Tag;

/// Root output is handed to the writer once it grows past this many bytes.
const FLUSH_THRESHOLD: usize = 8 * 1024;

#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub tokenizer: TokenizerConfig,
}

/// Per-pass instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub tokens: u64,
    pub tags_matched: u64,
    /// Close tags of block-rule tags with no pending open tag.
    pub unmatched_close_tags: u64,
    /// Block tags that were never closed (misnested or open at end of input).
    pub unclosed_blocks: u64,
    pub max_buffer_depth: usize,
}

/// Result of a finished pass.
#[derive(Debug)]
pub struct RewriteOutcome<W> {
    pub writer: W,
    pub properties: Properties,
    pub stats: SessionStats,
}

/// Rewritten document and exported properties of an in-memory pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewritten {
    pub document: String,
    pub properties: Properties,
}

/// Rewrite a complete in-memory document.
pub fn rewrite_str(input: &str, rules: &RuleSet) -> Result<Rewritten, RewriteError> {
    let mut session = RewriteSession::new(rules, Vec::with_capacity(input.len()));
    session.push_str(input)?;
    let outcome = session.finish()?;
    Ok(Rewritten {
        document: String::from_utf8_lossy(&outcome.writer).into_owned(),
        properties: outcome.properties,
    })
}

struct PendingBlock {
    slot: RuleSlot,
    state: PendingState,
    /// Buffer depth before `process_start` ran.
    depth: usize,
}

pub struct RewriteSession<'r, W: io::Write> {
    rules: &'r RuleSet,
    tokenizer: Tokenizer,
    decoder: Utf8ChunkDecoder,
    buffers: BufferStack,
    properties: Properties,
    pending: Vec<PendingBlock>,
    writer: W,
    folded_name: String,
    decoded: String,
    stats: SessionStats,
}

impl<'r, W: io::Write> RewriteSession<'r, W> {
    pub fn new(rules: &'r RuleSet, writer: W) -> Self {
        Self::with_config(rules, writer, SessionConfig::default())
    }

    pub fn with_config(rules: &'r RuleSet, writer: W, config: SessionConfig) -> Self {
        Self {
            rules,
            tokenizer: Tokenizer::new(config.tokenizer),
            decoder: Utf8ChunkDecoder::new(),
            buffers: BufferStack::new(),
            properties: Properties::new(),
            pending: Vec::new(),
            writer,
            folded_name: String::new(),
            decoded: String::new(),
            stats: SessionStats::default(),
        }
    }

    /// Feed decoded text and process every token it completes.
    pub fn push_str(&mut self, chunk: &str) -> Result<(), RewriteError> {
        self.tokenizer.push_str(chunk);
        self.pump()
    }

    /// Feed raw UTF-8 bytes; characters split across calls are carried over.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), RewriteError> {
        let mut decoded = std::mem::take(&mut self.decoded);
        decoded.clear();
        self.decoder.push(bytes, &mut decoded);
        let result = self.push_str(&decoded);
        self.decoded = decoded;
        result
    }

    /// Properties exported so far.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            max_buffer_depth: self.buffers.max_depth(),
            ..self.stats
        }
    }

    /// End the pass: flush pending input, unwind unclosed blocks and write the
    /// remaining output.
    pub fn finish(mut self) -> Result<RewriteOutcome<W>, RewriteError> {
        let mut tail = String::new();
        self.decoder.finish(&mut tail);
        self.tokenizer.push_str(&tail);
        self.tokenizer.finish();
        self.pump()?;

        while let Some(block) = self.pending.pop() {
            self.abandon_block(block, "end of input");
        }
        if !self.buffers.is_at_root() {
            return Err(RewriteError::UnbalancedBuffers {
                tag: "#document".to_string(),
                expected: 1,
                actual: self.buffers.depth(),
            });
        }
        self.flush_root(0)?;
        self.writer.flush()?;

        let stats = self.stats();
        log::debug!(target: "rewrite.session", "pass finished: {stats:?}");
        Ok(RewriteOutcome {
            writer: self.writer,
            properties: self.properties,
            stats,
        })
    }

    fn pump(&mut self) -> Result<(), RewriteError> {
        while let Some(token) = self.tokenizer.next_token() {
            self.stats.tokens = self.stats.tokens.saturating_add(1);
            self.process_token(token)?;
            if self.buffers.is_at_root() {
                self.flush_root(FLUSH_THRESHOLD)?;
            }
        }
        Ok(())
    }

    fn flush_root(&mut self, threshold: usize) -> Result<(), RewriteError> {
        if self.buffers.current().len() < threshold.max(1) {
            return Ok(());
        }
        let out = self.buffers.take_root();
        self.writer.write_all(out.as_bytes())?;
        Ok(())
    }

    fn process_token(&mut self, token: Token) -> Result<(), RewriteError> {
        match token {
            Token::Text(text) => {
                self.write_text(&text);
                Ok(())
            }
            Token::Comment(source) | Token::Doctype(source) => {
                self.buffers.current_mut().append(&source);
                Ok(())
            }
            Token::Tag(raw) => self.process_tag(&raw),
        }
    }

    fn write_text(&mut self, text: &str) {
        let mut current = Cow::Borrowed(text);
        for filter in self.rules.text_filters() {
            let replaced = match filter.filter(&current) {
                Cow::Borrowed(_) => None,
                Cow::Owned(owned) => Some(owned),
            };
            if let Some(owned) = replaced {
                current = Cow::Owned(owned);
            }
        }
        self.buffers.current_mut().append(&current);
    }

    fn process_tag(&mut self, raw: &RawTag) -> Result<(), RewriteError> {
        self.folded_name.clear();
        self.folded_name.push_str(raw.name());
        self.folded_name.make_ascii_lowercase();
        let Some(slot) = self.rules.slot_for_folded(&self.folded_name) else {
            self.buffers.current_mut().append(raw.source());
            return Ok(());
        };

        let rules = self.rules;
        let tag = Tag::new(raw);
        self.stats.tags_matched = self.stats.tags_matched.saturating_add(1);
        log::trace!(
            target: "rewrite.session",
            "dispatch {:?} <{}> depth={}",
            tag.kind(),
            tag.name(),
            self.buffers.depth()
        );

        match rules.rule(slot) {
            Rule::Basic(rule) => {
                let depth = self.buffers.depth();
                rule.process(
                    &tag,
                    &mut ProcessingContext::new(&mut self.buffers, &mut self.properties),
                )?;
                self.check_depth(&tag, depth)
            }
            Rule::Block(rule) => match tag.kind() {
                TagKind::Open => {
                    let depth = self.buffers.depth();
                    let state = rule.start(
                        &tag,
                        &mut ProcessingContext::new(&mut self.buffers, &mut self.properties),
                    )?;
                    if self.buffers.depth() < depth {
                        return Err(self.unbalanced(&tag, depth));
                    }
                    self.pending.push(PendingBlock { slot, state, depth });
                    Ok(())
                }
                TagKind::Close => {
                    let Some(index) = self.pending.iter().rposition(|block| block.slot == slot)
                    else {
                        log::debug!(
                            target: "rewrite.session",
                            "unmatched close tag </{}> passed through",
                            tag.name()
                        );
                        self.stats.unmatched_close_tags =
                            self.stats.unmatched_close_tags.saturating_add(1);
                        tag.write_to(self.buffers.current_mut());
                        return Ok(());
                    };
                    // Blocks opened inside this one but never closed (misnesting).
                    while self.pending.len() > index + 1 {
                        if let Some(inner) = self.pending.pop() {
                            self.abandon_block(inner, "misnested close tag");
                        }
                    }
                    let Some(block) = self.pending.pop() else {
                        return Ok(());
                    };
                    rule.end(
                        &tag,
                        block.state,
                        &mut ProcessingContext::new(&mut self.buffers, &mut self.properties),
                    )?;
                    self.check_depth(&tag, block.depth)
                }
                TagKind::Empty => {
                    let depth = self.buffers.depth();
                    rule.empty(
                        &tag,
                        &mut ProcessingContext::new(&mut self.buffers, &mut self.properties),
                    )?;
                    self.check_depth(&tag, depth)
                }
            },
        }
    }

    /// Drop a block whose close tag never arrives; its captured buffers are
    /// folded back so no bytes are lost.
    fn abandon_block(&mut self, block: PendingBlock, reason: &str) {
        let tag = self.rules.tag_names().nth(block.slot.0).unwrap_or("?");
        log::warn!(
            target: "rewrite.session",
            "unclosed <{tag}> ({reason}); captured content kept without running its end rule"
        );
        self.stats.unclosed_blocks = self.stats.unclosed_blocks.saturating_add(1);
        self.buffers.unwind_to(block.depth);
    }

    fn check_depth(&self, tag: &Tag<'_>, expected: usize) -> Result<(), RewriteError> {
        if self.buffers.depth() == expected {
            Ok(())
        } else {
            Err(self.unbalanced(tag, expected))
        }
    }

    fn unbalanced(&self, tag: &Tag<'_>, expected: usize) -> RewriteError {
        RewriteError::UnbalancedBuffers {
            tag: tag.original_name().to_string(),
            expected,
            actual: self.buffers.depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RewriteSession, rewrite_str};
    use crate::context::ProcessingContext;
    use crate::error::RewriteError;
    use crate::rule::{BasicRule, BlockRule};
    use crate::rule_set::RuleSet;
    use crate::rules::{CaptureAndExport, TagRename};
    use crate::tag::Tag;

    struct LeakyRule;

    impl BasicRule for LeakyRule {
        fn process(
            &self,
            tag: &Tag<'_>,
            ctx: &mut ProcessingContext<'_>,
        ) -> Result<(), RewriteError> {
            tag.write_to(ctx.current_buffer());
            ctx.push_buffer();
            Ok(())
        }
    }

    struct OverPop;

    impl BlockRule for OverPop {
        type State = ();

        fn process_start(
            &self,
            _tag: &Tag<'_>,
            _ctx: &mut ProcessingContext<'_>,
        ) -> Result<(), RewriteError> {
            Ok(())
        }

        fn process_end(
            &self,
            _tag: &Tag<'_>,
            _state: (),
            ctx: &mut ProcessingContext<'_>,
        ) -> Result<(), RewriteError> {
            ctx.pop_buffer()
        }
    }

    /// Counts nesting through the state channel only.
    struct Depth;

    impl BlockRule for Depth {
        type State = usize;

        fn process_start(
            &self,
            tag: &Tag<'_>,
            ctx: &mut ProcessingContext<'_>,
        ) -> Result<usize, RewriteError> {
            tag.write_to(ctx.current_buffer());
            Ok(ctx.buffer_depth())
        }

        fn process_end(
            &self,
            tag: &Tag<'_>,
            state: usize,
            ctx: &mut ProcessingContext<'_>,
        ) -> Result<(), RewriteError> {
            ctx.add_property("depth", &state.to_string());
            tag.write_to(ctx.current_buffer());
            Ok(())
        }
    }

    #[test]
    fn basic_rule_that_leaks_a_buffer_is_fatal() {
        let mut rules = RuleSet::new();
        rules.add_basic("x", LeakyRule).expect("register");
        let err = rewrite_str("<x>", &rules).expect_err("unbalanced");
        assert!(matches!(
            err,
            RewriteError::UnbalancedBuffers { ref tag, expected: 1, actual: 2 } if tag == "x"
        ));
    }

    #[test]
    fn popping_root_from_a_rule_is_fatal() {
        let mut rules = RuleSet::new();
        rules.add_block("x", OverPop).expect("register");
        let err = rewrite_str("<x></x>", &rules).expect_err("pop root");
        assert!(matches!(err, RewriteError::PopRootBuffer));
    }

    #[test]
    fn block_state_is_threaded_per_occurrence() {
        let mut rules = RuleSet::new();
        rules.add_block("d", Depth).expect("register");
        let out = rewrite_str("<d><d></d></d>", &rules).expect("rewrite");
        assert_eq!(out.document, "<d><d></d></d>");
        assert_eq!(
            out.properties.get_all("depth").collect::<Vec<_>>(),
            vec!["1", "1"]
        );
    }

    #[test]
    fn unmatched_close_tag_passes_through() {
        let mut rules = RuleSet::new();
        rules.add_block("foo", CaptureAndExport::new("bar")).expect("register");
        let mut session = RewriteSession::new(&rules, Vec::new());
        session.push_str("a</foo>b").expect("push");
        let outcome = session.finish().expect("finish");
        assert_eq!(outcome.writer, b"a</foo>b");
        assert!(outcome.properties.is_empty());
        assert_eq!(outcome.stats.unmatched_close_tags, 1);
    }

    #[test]
    fn unclosed_block_at_end_of_input_keeps_content() {
        let mut rules = RuleSet::new();
        rules.add_block("foo", CaptureAndExport::new("bar")).expect("register");
        let mut session = RewriteSession::new(&rules, Vec::new());
        session.push_str("<foo a=1>never closed").expect("push");
        let outcome = session.finish().expect("finish");
        assert_eq!(outcome.writer, b"<foo a=1>never closed");
        assert_eq!(outcome.properties.get("bar.a"), Some("1"));
        assert_eq!(outcome.properties.get("bar"), None);
        assert_eq!(outcome.stats.unclosed_blocks, 1);
    }

    #[test]
    fn misnested_blocks_are_unwound_without_losing_bytes() {
        let mut rules = RuleSet::new();
        rules.add_block("a", CaptureAndExport::new("a")).expect("register");
        rules.add_block("b", CaptureAndExport::new("b")).expect("register");
        let input = "<a>1<b>2</a>3</b>";
        let out = rewrite_str(input, &rules).expect("rewrite");
        assert_eq!(out.document, input);
        assert_eq!(out.properties.get("a"), Some("1<b>2"));
        assert!(!out.properties.contains_key("b"));
    }

    #[test]
    fn output_is_streamed_only_at_root_depth() {
        let mut rules = RuleSet::new();
        rules.add_block("foo", CaptureAndExport::new("bar")).expect("register");
        rules.add_basic("b", TagRename::new("strong")).expect("register");
        let mut session = RewriteSession::new(&rules, Vec::new());
        session.push_str("<foo>inside <b>x</b>").expect("push");
        assert_eq!(session.properties().len(), 0);
        session.push_str("</foo>").expect("push");
        assert_eq!(session.properties().get("bar"), Some("inside <strong>x</strong>"));
        let outcome = session.finish().expect("finish");
        assert_eq!(outcome.writer, b"<foo>inside <strong>x</strong></foo>");
        assert_eq!(outcome.stats.max_buffer_depth, 2);
    }

    #[test]
    fn push_bytes_carries_split_characters() {
        let rules = RuleSet::new();
        let mut session = RewriteSession::new(&rules, Vec::new());
        let input = "<p>caf\u{e9}</p>".as_bytes();
        for byte in input {
            session.push_bytes(std::slice::from_ref(byte)).expect("push");
        }
        let outcome = session.finish().expect("finish");
        assert_eq!(outcome.writer, input);
    }
}
