#![no_main]

use libfuzzer_sys::fuzz_target;
use rewrite::{
    CaptureAndExport, MetaTagExport, ReplaceTextFilter, RewriteSession, RuleSet, TagRename,
};

fn rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.add_basic("b", TagRename::new("strong")).expect("rule");
    rules.add_basic("meta", MetaTagExport::new("meta")).expect("rule");
    rules.add_block("title", CaptureAndExport::new("title")).expect("rule");
    rules.add_block("div", CaptureAndExport::new("div")).expect("rule");
    rules
        .add_block("aside", CaptureAndExport::new("aside").include_in_output(false))
        .expect("rule");
    rules.add_text_filter(ReplaceTextFilter::new("x", "y").expect("filter"));
    rules
}

fn run(rules: &RuleSet, data: &[u8], step: usize) -> (Vec<u8>, Vec<(String, String)>) {
    let mut session = RewriteSession::new(rules, Vec::new());
    for chunk in data.chunks(step) {
        session.push_bytes(chunk).expect("built-in rules keep buffers balanced");
    }
    let outcome = session.finish().expect("built-in rules keep buffers balanced");
    let properties = outcome
        .properties
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    (outcome.writer, properties)
}

fuzz_target!(|data: &[u8]| {
    let Some((&split_seed, rest)) = data.split_first() else {
        return;
    };
    let rules = rules();
    let whole = run(&rules, rest, rest.len().max(1));
    let chunked = run(&rules, rest, usize::from(split_seed % 16) + 1);
    assert_eq!(whole, chunked, "chunking changed the rewrite result");
});
