#![no_main]

use html::{Token, Tokenizer, TokenizerConfig, tokenize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split_seed, rest)) = data.split_first() else {
        return;
    };
    let input = String::from_utf8_lossy(rest);

    let whole = tokenize(&input);
    let rebuilt: String = whole.iter().map(Token::source).collect();
    assert_eq!(rebuilt, input, "tokens must reproduce the input");

    let step = usize::from(split_seed % 16) + 1;
    let mut tokenizer = Tokenizer::new(TokenizerConfig::default());
    let mut chunked = Vec::new();
    let mut offset = 0usize;
    while offset < input.len() {
        let mut end = (offset + step).min(input.len());
        while !input.is_char_boundary(end) {
            end += 1;
        }
        tokenizer.push_str(&input[offset..end]);
        chunked.extend(tokenizer.drain());
        offset = end;
    }
    tokenizer.finish();
    chunked.extend(tokenizer.drain());
    assert_eq!(chunked, whole, "chunking changed the token stream (step={step})");
});
