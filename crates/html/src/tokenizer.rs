//! Streaming, lossless markup tokenizer.
//!
//! The tokenizer buffers pushed chunks and emits tokens once their full source
//! text is available, so a tag, comment or quoted attribute value split across
//! chunk boundaries is held until it is complete.
//!
//! Invariants:
//! - Lossless: concatenating `Token::source` over all emitted tokens reproduces
//!   the pushed input byte for byte.
//! - Chunk-equivalence: feeding input in one chunk or many (UTF-8 aligned)
//!   chunks yields the same token sequence.
//!
//! Known limitations (intentional):
//! - Not an HTML5 tokenizer state machine: no parse-error recovery and no
//!   entity decoding.
//! - Tag names are restricted to ASCII `[A-Za-z0-9:_-]` and must start with a
//!   letter; any other `<` is text.
//! - Raw-text close-tag scanning accepts only ASCII whitespace before `>`
//!   (see `find_rawtext_close_tag`).
//! - Text, comments, declarations and raw text resume their terminator search
//!   where the previous push left off. An incomplete tag is rescanned from its
//!   `<` on every push.
use crate::span::Span;
use crate::token::{AttributeValue, Quote, RawAttribute, RawTag, TagKind, Token};
use memchr::{memchr, memmem, memrchr};

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const DOCTYPE: &[u8] = b"<!doctype";

// it only attempts matches starting at ASCII <
// < cannot appear in UTF-8 continuation bytes
const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

/// Configuration for the tokenizer.
#[derive(Clone, Debug)]
pub struct TokenizerConfig {
    /// Treat `script` and `style` bodies as raw text up to their close tag.
    pub raw_text_elements: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            raw_text_elements: true,
        }
    }
}

/// Minimal tokenizer instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    pub tokens_emitted: u64,
    pub bytes_consumed: u64,
    /// Scans that stopped on an incomplete construct and waited for more input.
    pub incomplete_waits: u64,
}

enum Scan {
    Token(Token, usize),
    NeedMoreInput,
}

/// Streaming tokenizer.
pub struct Tokenizer {
    config: TokenizerConfig,
    buffer: String,
    cursor: usize,
    raw_text_close: Option<&'static [u8]>,
    /// Length of the pending input already searched for the terminator of the
    /// construct at `cursor`. Relative to `cursor`; zero after every emit.
    resume: usize,
    finished: bool,
    stats: TokenizerStats,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self {
            config,
            buffer: String::new(),
            cursor: 0,
            raw_text_close: None,
            resume: 0,
            finished: false,
            stats: TokenizerStats::default(),
        }
    }

    /// Append decoded text to the pending input.
    pub fn push_str(&mut self, chunk: &str) {
        assert!(
            !self.finished,
            "Tokenizer::push_str called after finish(); this violates end-of-stream contract"
        );
        if chunk.is_empty() {
            return;
        }
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buffer.push_str(chunk);
    }

    /// Mark end of input. Incomplete constructs still pending are flushed as text.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether input is buffered that has not been emitted as a token yet.
    pub fn has_pending_input(&self) -> bool {
        self.cursor < self.buffer.len()
    }

    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    /// Next complete token, or `None` when more input (or `finish`) is required.
    pub fn next_token(&mut self) -> Option<Token> {
        let rest = &self.buffer[self.cursor..];
        if rest.is_empty() {
            return None;
        }
        let resume = self.resume;
        let scan = match self.raw_text_close {
            Some(close_tag) => match find_rawtext_close_tag(rest, close_tag, resume) {
                Some((0, _)) => {
                    self.raw_text_close = None;
                    scan_markup(rest, resume)
                }
                Some((start, _)) => {
                    self.raw_text_close = None;
                    Scan::Token(Token::Text(rest[..start].to_string()), start)
                }
                None => Scan::NeedMoreInput,
            },
            None => scan_markup(rest, resume),
        };
        let (token, consumed) = match scan {
            Scan::Token(token, consumed) => (token, consumed),
            Scan::NeedMoreInput if self.finished => (Token::Text(rest.to_string()), rest.len()),
            Scan::NeedMoreInput => {
                self.resume = rest.len();
                self.stats.incomplete_waits = self.stats.incomplete_waits.saturating_add(1);
                return None;
            }
        };
        debug_assert!(consumed > 0, "tokenizer must make progress");
        if self.config.raw_text_elements
            && let Token::Tag(tag) = &token
        {
            self.raw_text_close = raw_text_close_tag(tag);
        }
        self.cursor += consumed;
        self.resume = 0;
        self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
        self.stats.bytes_consumed = self.stats.bytes_consumed.saturating_add(consumed as u64);
        log::trace!(target: "html.tokenizer", "emit token: {token:?}");
        Some(token)
    }

    /// Drain every token that is complete with the input seen so far.
    pub fn drain(&mut self) -> impl Iterator<Item = Token> + '_ {
        std::iter::from_fn(move || self.next_token())
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

/// Tokenize a complete document in one call.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::default();
    tokenizer.push_str(input);
    tokenizer.finish();
    tokenizer.drain().collect()
}

fn raw_text_close_tag(tag: &RawTag) -> Option<&'static [u8]> {
    if tag.kind() != TagKind::Open {
        return None;
    }
    let name = tag.name();
    if name.eq_ignore_ascii_case("script") {
        Some(SCRIPT_CLOSE_TAG)
    } else if name.eq_ignore_ascii_case("style") {
        Some(STYLE_CLOSE_TAG)
    } else {
        None
    }
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

/// Find the close tag in `haystack`, skipping the first `resume` bytes that
/// an earlier call already searched.
///
/// Only the last `<` in the searched prefix can begin a close tag that was
/// still incomplete, since `close_tag` holds a single `<`.
fn find_rawtext_close_tag(
    haystack: &str,
    close_tag: &[u8],
    resume: usize,
) -> Option<(usize, usize)> {
    let hay_bytes = haystack.as_bytes();
    let len = hay_bytes.len();
    let n = close_tag.len();
    debug_assert!(n >= 2 && close_tag[0] == b'<' && close_tag[1] == b'/');
    let mut i = memrchr(b'<', &hay_bytes[..resume]).unwrap_or(resume);
    while i + n <= len {
        let rel = memchr(b'<', &hay_bytes[i..])?;
        i += rel;
        if i + n > len {
            return None;
        }
        if hay_bytes[i + 1] == b'/' && starts_with_ignore_ascii_case_at(hay_bytes, i, close_tag) {
            let mut k = i + n;
            while k < len && hay_bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && hay_bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

/// Scan the construct at the start of `rest`. The first `resume` bytes are
/// known not to hold its terminator.
fn scan_markup(rest: &str, resume: usize) -> Scan {
    let bytes = rest.as_bytes();
    if bytes[0] != b'<' {
        return match memchr(b'<', &bytes[resume..]) {
            Some(rel) => {
                let end = resume + rel;
                Scan::Token(Token::Text(rest[..end].to_string()), end)
            }
            None => Scan::NeedMoreInput,
        };
    }
    if bytes.len() < 2 {
        return Scan::NeedMoreInput;
    }
    match bytes[1] {
        b'!' => scan_declaration(rest, resume),
        b'?' => scan_until_gt(rest, resume, Token::Comment),
        b'/' if bytes.len() < 3 => Scan::NeedMoreInput,
        b'/' if bytes[2].is_ascii_alphabetic() => scan_tag_token(rest, true),
        b if b.is_ascii_alphabetic() => scan_tag_token(rest, false),
        _ => scan_stray_lt(rest, resume),
    }
}

/// A `<` that does not open markup is text up to the next `<`.
fn scan_stray_lt(rest: &str, resume: usize) -> Scan {
    let from = resume.max(1);
    match memchr(b'<', &rest.as_bytes()[from..]) {
        Some(rel) => {
            let end = from + rel;
            Scan::Token(Token::Text(rest[..end].to_string()), end)
        }
        None => Scan::NeedMoreInput,
    }
}

fn scan_declaration(rest: &str, resume: usize) -> Scan {
    let bytes = rest.as_bytes();
    if bytes.len() < COMMENT_START.len() && COMMENT_START.as_bytes().starts_with(bytes) {
        return Scan::NeedMoreInput;
    }
    if rest.starts_with(COMMENT_START) {
        // A terminator may straddle the previous end of input.
        let from = resume
            .saturating_sub(COMMENT_END.len() - 1)
            .max(COMMENT_START.len());
        return match memmem::find(&bytes[from..], COMMENT_END.as_bytes()) {
            Some(rel) => {
                let end = from + rel + COMMENT_END.len();
                Scan::Token(Token::Comment(rest[..end].to_string()), end)
            }
            None => Scan::NeedMoreInput,
        };
    }
    if starts_with_ignore_ascii_case_at(bytes, 0, DOCTYPE) {
        scan_until_gt(rest, resume, Token::Doctype)
    } else {
        scan_until_gt(rest, resume, Token::Comment)
    }
}

fn scan_until_gt(rest: &str, resume: usize, make: fn(String) -> Token) -> Scan {
    match memchr(b'>', &rest.as_bytes()[resume..]) {
        Some(rel) => {
            let end = resume + rel + 1;
            Scan::Token(make(rest[..end].to_string()), end)
        }
        None => Scan::NeedMoreInput,
    }
}

fn scan_tag_token(rest: &str, is_close: bool) -> Scan {
    match scan_tag(rest, is_close) {
        Some((tag, consumed)) => Scan::Token(Token::Tag(tag), consumed),
        None => Scan::NeedMoreInput,
    }
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

fn is_attribute_name_end(c: u8) -> bool {
    c.is_ascii_whitespace() || c == b'/' || c == b'>' || c == b'='
}

/// Scan one tag at the start of `source`.
///
/// Returns `None` when the tag is not complete yet. Invariant: every slice
/// endpoint is an ASCII structural byte or the end of input, so spans stay on
/// UTF-8 boundaries.
pub(crate) fn scan_tag(source: &str, is_close: bool) -> Option<(RawTag, usize)> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    let name_start = if is_close { 2 } else { 1 };
    let mut i = name_start;
    while i < len && is_name_char(bytes[i]) {
        i += 1;
    }
    if i >= len || i == name_start {
        return None;
    }
    let name = Span::new(name_start, i);
    let mut attributes: Vec<RawAttribute> = Vec::new();

    let kind = loop {
        skip_whitespace(&mut i);
        if i >= len {
            return None;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break if is_close { TagKind::Close } else { TagKind::Open };
            }
            b'/' => {
                if i + 1 >= len {
                    return None;
                }
                if bytes[i + 1] == b'>' {
                    i += 2;
                    break if is_close { TagKind::Close } else { TagKind::Empty };
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        // The first character is part of the name even when it is `=` or a quote.
        let attr_start = i;
        i += 1;
        while i < len && !is_attribute_name_end(bytes[i]) {
            i += 1;
        }
        if i >= len {
            return None;
        }
        let attr_name = Span::new(attr_start, i);

        let mut k = i;
        skip_whitespace(&mut k);
        if k >= len {
            return None;
        }
        let value = if bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            if k >= len {
                return None;
            }
            match bytes[k] {
                quote @ (b'"' | b'\'') => {
                    let vstart = k + 1;
                    let rel = memchr(quote, &bytes[vstart..])?;
                    i = vstart + rel + 1;
                    Some(AttributeValue {
                        span: Span::new(vstart, vstart + rel),
                        quote: if quote == b'"' {
                            Quote::Double
                        } else {
                            Quote::Single
                        },
                    })
                }
                _ => {
                    let vstart = k;
                    while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                            break;
                        }
                        k += 1;
                    }
                    if k >= len {
                        return None;
                    }
                    i = k;
                    Some(AttributeValue {
                        span: Span::new(vstart, k),
                        quote: Quote::Unquoted,
                    })
                }
            }
        } else {
            None
        };

        let attr_text = attr_name.resolve(source);
        let duplicate = attributes
            .iter()
            .any(|existing| existing.name.resolve(source).eq_ignore_ascii_case(attr_text));
        if !duplicate {
            attributes.push(RawAttribute {
                name: attr_name,
                value,
            });
        }
    };

    debug_assert!(source.is_char_boundary(i));
    let tag = RawTag {
        source: source[..i].to_string(),
        kind,
        name,
        attributes,
    };
    Some((tag, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(Token::source).collect()
    }

    fn tokenize_in_chunks(input: &str, size: usize) -> Vec<Token> {
        let mut tokenizer = Tokenizer::default();
        let mut out = Vec::new();
        let mut start = 0;
        while start < input.len() {
            let mut end = (start + size).min(input.len());
            while !input.is_char_boundary(end) {
                end += 1;
            }
            tokenizer.push_str(&input[start..end]);
            out.extend(tokenizer.drain());
            start = end;
        }
        tokenizer.finish();
        out.extend(tokenizer.drain());
        out
    }

    #[test]
    fn tokenize_is_lossless() {
        let input = "<!DOCTYPE html>\n<p class=\"a\" id=x>caf\u{e9} &amp; <b>bold</b></p><!-- c --><br/>tail";
        let tokens = tokenize(input);
        assert_eq!(sources(&tokens).concat(), input);
    }

    #[test]
    fn tokenize_classifies_tags_and_markup() {
        let tokens = tokenize("<!doctype html><a><!-- <b> --></a><img/><?xml v?>");
        assert!(matches!(&tokens[0], Token::Doctype(s) if s == "<!doctype html>"));
        assert!(matches!(&tokens[1], Token::Tag(t) if t.kind() == TagKind::Open && t.name() == "a"));
        assert!(matches!(&tokens[2], Token::Comment(s) if s == "<!-- <b> -->"));
        assert!(matches!(&tokens[3], Token::Tag(t) if t.kind() == TagKind::Close));
        assert!(matches!(&tokens[4], Token::Tag(t) if t.kind() == TagKind::Empty && t.name() == "img"));
        assert!(matches!(&tokens[5], Token::Comment(s) if s == "<?xml v?>"));
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let tokens = tokenize(r#"<a title="1 > 0">x</a>"#);
        assert_eq!(sources(&tokens), vec![r#"<a title="1 > 0">"#, "x", "</a>"]);
    }

    #[test]
    fn stray_lt_is_text() {
        let tokens = tokenize("1 < 2 <3 </ >");
        assert!(tokens.iter().all(|t| matches!(t, Token::Text(_))));
        assert_eq!(sources(&tokens).concat(), "1 < 2 <3 </ >");
    }

    #[test]
    fn script_body_is_raw_text() {
        let tokens = tokenize("<script>if (a <b>) {}</ScRiPt ><b>");
        assert_eq!(
            sources(&tokens),
            vec!["<script>", "if (a <b>) {}", "</ScRiPt >", "<b>"]
        );
        assert!(matches!(&tokens[1], Token::Text(_)));
    }

    #[test]
    fn raw_text_can_be_disabled() {
        let mut tokenizer = Tokenizer::new(TokenizerConfig {
            raw_text_elements: false,
        });
        tokenizer.push_str("<style><b></style>");
        tokenizer.finish();
        let tokens: Vec<_> = tokenizer.drain().collect();
        assert_eq!(sources(&tokens), vec!["<style>", "<b>", "</style>"]);
    }

    #[test]
    fn incomplete_tag_waits_for_more_input() {
        let mut tokenizer = Tokenizer::default();
        tokenizer.push_str("<foo x=\"1");
        assert!(tokenizer.next_token().is_none());
        assert!(tokenizer.has_pending_input());
        tokenizer.push_str("\">");
        let token = tokenizer.next_token().expect("complete tag");
        assert_eq!(token.source(), "<foo x=\"1\">");
        assert!(!tokenizer.has_pending_input());
    }

    #[test]
    fn finish_flushes_incomplete_construct_as_text() {
        let mut tokenizer = Tokenizer::default();
        tokenizer.push_str("ok<foo bar='");
        let first: Vec<_> = tokenizer.drain().collect();
        assert_eq!(sources(&first), vec!["ok"]);
        tokenizer.finish();
        let rest: Vec<_> = tokenizer.drain().collect();
        assert_eq!(rest, vec![Token::Text("<foo bar='".to_string())]);
    }

    #[test]
    fn chunked_input_matches_whole_input() {
        let input = "<html><head><title>T\u{1F600}</title><meta name=\"a\" content='b'/></head>\
                     <body><!-- x --><script>a</b</script><foo x=1 y>hi</foo></body></html>";
        let whole = tokenize(input);
        for size in [1, 2, 3, 5, 8, 13] {
            assert_eq!(tokenize_in_chunks(input, size), whole, "chunk size {size}");
        }
    }

    #[test]
    fn terminator_split_across_pushes_is_found() {
        let cases: &[&[&str]] = &[
            &["<!-- a -", "-", ">x"],
            &["<!-- a --", ">x"],
            &["<!doc", "type html", ">x"],
            &["<script>a <", "/scr", "ipt", " ", ">x"],
            &["<script>a <<", "</", "script>x"],
            &["plain", " text", "<b>"],
            &["<", " stray", "<b>"],
        ];
        for chunks in cases {
            let input = chunks.concat();
            let mut tokenizer = Tokenizer::default();
            let mut tokens = Vec::new();
            for chunk in *chunks {
                tokenizer.push_str(chunk);
                tokens.extend(tokenizer.drain());
            }
            tokenizer.finish();
            tokens.extend(tokenizer.drain());
            assert_eq!(tokens, tokenize(&input), "chunks {chunks:?}");
        }
    }

    #[test]
    fn streamed_large_rawtext_body_without_pathological_slowdown() {
        let body = "let x = a < b; // </scrip\n".repeat(100_000);
        let input = format!("<script>{body}</script>");
        let tokens = tokenize_in_chunks(&input, 256);
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[1], Token::Text(text) if *text == body));
        assert!(matches!(&tokens[2], Token::Tag(t) if t.kind() == TagKind::Close));
    }

    #[test]
    fn streamed_large_text_and_comment_without_pathological_slowdown() {
        let text = "no markup here ".repeat(200_000);
        let comment = format!("<!--{}-->", "- -".repeat(200_000));
        let input = format!("{text}{comment}<!x{}>", "y".repeat(1_000_000));
        let tokens = tokenize_in_chunks(&input, 256);
        let declaration = &input[text.len() + comment.len()..];
        assert_eq!(
            sources(&tokens),
            vec![text.as_str(), comment.as_str(), declaration]
        );
        assert!(matches!(&tokens[1], Token::Comment(_)));
    }

    #[cfg(feature = "perf-tests")]
    #[test]
    fn streamed_rawtext_scales_roughly_linearly() {
        use std::time::{Duration, Instant};

        fn build_input(repeats: usize) -> String {
            format!("<script>{}</script>", "a<b;".repeat(repeats))
        }

        fn measure_total(input: &str) -> Duration {
            let _ = tokenize_in_chunks(input, 1024);
            let mut total = Duration::ZERO;
            for _ in 0..3 {
                let start = Instant::now();
                let _ = tokenize_in_chunks(input, 1024);
                total += start.elapsed();
            }
            total
        }

        let small = build_input(50_000);
        let large = build_input(400_000);

        let t_small = measure_total(&small);
        let t_large = measure_total(&large);
        assert!(!t_small.is_zero(), "timer resolution too coarse for test");
        // 8x the input; a rescan per push would be closer to 64x.
        assert!(
            t_large <= t_small.saturating_mul(24),
            "expected near-linear raw text scan; t_small={t_small:?} t_large={t_large:?}"
        );
    }

    #[cfg(feature = "perf-tests")]
    #[test]
    fn streamed_unterminated_comment_scales_roughly_linearly() {
        use std::time::{Duration, Instant};

        fn build_input(body_len: usize) -> String {
            format!("<!--{}", "-x".repeat(body_len))
        }

        fn measure_total(input: &str) -> Duration {
            let _ = tokenize_in_chunks(input, 1024);
            let mut total = Duration::ZERO;
            for _ in 0..3 {
                let start = Instant::now();
                let _ = tokenize_in_chunks(input, 1024);
                total += start.elapsed();
            }
            total
        }

        let small = build_input(100_000);
        let large = build_input(800_000);

        let t_small = measure_total(&small);
        let t_large = measure_total(&large);
        assert!(!t_small.is_zero(), "timer resolution too coarse for test");
        assert!(
            t_large <= t_small.saturating_mul(24),
            "expected near-linear comment scan; t_small={t_small:?} t_large={t_large:?}"
        );
    }

    #[test]
    #[should_panic(expected = "after finish")]
    fn push_after_finish_panics() {
        let mut tokenizer = Tokenizer::default();
        tokenizer.finish();
        tokenizer.push_str("x");
    }
}
