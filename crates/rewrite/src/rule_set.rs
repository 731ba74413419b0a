//! Rule registration.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use crate::error::ConfigError;
use crate::rule::{BasicRule, BlockRule, Rule};

/// Rewrites text runs between tags.
pub trait TextFilter: Send + Sync {
    fn filter<'t>(&self, text: &'t str) -> Cow<'t, str>;
}

/// Index of a registered rule; also keys the per-rule pending block stacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RuleSlot(pub(crate) usize);

/// Mapping from tag name to rule, plus text filters.
///
/// Built before a pass and only borrowed immutably by sessions, so one set can
/// serve many passes (including concurrent ones). Tag names match ASCII
/// case-insensitively; at most one rule per tag name.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    names: Vec<String>,
    by_name: HashMap<String, RuleSlot>,
    text_filters: Vec<Box<dyn TextFilter>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule fired once per occurrence of `tag`.
    pub fn add_basic(
        &mut self,
        tag: &str,
        rule: impl BasicRule + 'static,
    ) -> Result<&mut Self, ConfigError> {
        self.insert(tag, Rule::Basic(Box::new(rule)))
    }

    /// Register a rule bracketing `<tag>...</tag>` blocks.
    pub fn add_block<R>(&mut self, tag: &str, rule: R) -> Result<&mut Self, ConfigError>
    where
        R: BlockRule + 'static,
    {
        self.insert(tag, Rule::Block(Box::new(rule)))
    }

    /// Append a text filter; filters run in registration order.
    pub fn add_text_filter(&mut self, filter: impl TextFilter + 'static) -> &mut Self {
        self.text_filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.text_filters.is_empty()
    }

    /// Registered tag names (lowercase) in registration order.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn has_rule_for(&self, tag: &str) -> bool {
        self.by_name.contains_key(&tag.to_ascii_lowercase())
    }

    /// Look up by an already lowercased name.
    pub(crate) fn slot_for_folded(&self, folded: &str) -> Option<RuleSlot> {
        self.by_name.get(folded).copied()
    }

    pub(crate) fn rule(&self, slot: RuleSlot) -> &Rule {
        &self.rules[slot.0]
    }

    pub(crate) fn text_filters(&self) -> &[Box<dyn TextFilter>] {
        &self.text_filters
    }

    fn insert(&mut self, tag: &str, rule: Rule) -> Result<&mut Self, ConfigError> {
        validate_tag_name(tag)?;
        let folded = tag.to_ascii_lowercase();
        if self.by_name.contains_key(&folded) {
            return Err(ConfigError::DuplicateRule { tag: folded });
        }
        log::debug!(
            target: "rewrite.config",
            "register {} rule for <{folded}>",
            match rule {
                Rule::Basic(_) => "basic",
                Rule::Block(_) => "block",
            }
        );
        let slot = RuleSlot(self.rules.len());
        self.rules.push(rule);
        self.names.push(folded.clone());
        self.by_name.insert(folded, slot);
        Ok(self)
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("tags", &self.names)
            .field("text_filters", &self.text_filters.len())
            .finish()
    }
}

/// Tag names use the tokenizer's name class: ASCII letter, then `[A-Za-z0-9:_-]`.
fn validate_tag_name(name: &str) -> Result<(), ConfigError> {
    let bytes = name.as_bytes();
    let valid = bytes.first().is_some_and(u8::is_ascii_alphabetic)
        && bytes
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTagName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::RuleSet;
    use crate::error::ConfigError;
    use crate::rules::{CaptureAndExport, TagRename};

    #[test]
    fn lookup_is_case_insensitive() {
        let mut rules = RuleSet::new();
        rules.add_basic("B", TagRename::new("strong")).expect("register");
        assert!(rules.has_rule_for("b"));
        assert!(rules.has_rule_for("B"));
        assert_eq!(rules.tag_names().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn second_rule_for_same_tag_is_rejected() {
        let mut rules = RuleSet::new();
        rules.add_basic("foo", TagRename::new("bar")).expect("register");
        let err = rules
            .add_block("FOO", CaptureAndExport::new("foo"))
            .expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateRule { tag } if tag == "foo"));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn invalid_tag_names_are_rejected() {
        let mut rules = RuleSet::new();
        for name in ["", "1a", "a b", "-x"] {
            assert!(
                matches!(
                    rules.add_basic(name, TagRename::new("x")),
                    Err(ConfigError::InvalidTagName { .. })
                ),
                "{name:?}"
            );
        }
    }
}
