//! TOML rule configuration.
//!
//! ```toml
//! [[rule]]
//! kind = "rename"
//! tag = "b"
//! to = "strong"
//!
//! [[rule]]
//! kind = "export"
//! tag = "title"
//! property = "title"
//! include_in_output = true
//!
//! [[rule]]
//! kind = "meta"
//! prefix = "meta"
//!
//! [[text_filter]]
//! find = "(c)"
//! replace = "©"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::rule_set::RuleSet;
use crate::rules::{CaptureAndExport, MetaTagExport, ReplaceTextFilter, TagRename};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    #[serde(default)]
    pub rule: Vec<RuleConfig>,
    #[serde(default)]
    pub text_filter: Vec<TextFilterConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum RuleConfig {
    Rename {
        tag: String,
        to: String,
    },
    Export {
        tag: String,
        property: String,
        #[serde(default = "default_include_in_output")]
        include_in_output: bool,
    },
    Meta {
        #[serde(default = "default_meta_tag")]
        tag: String,
        #[serde(default = "default_meta_prefix")]
        prefix: String,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TextFilterConfig {
    pub find: String,
    pub replace: String,
}

fn default_include_in_output() -> bool {
    true
}

fn default_meta_tag() -> String {
    "meta".to_string()
}

fn default_meta_prefix() -> String {
    "meta".to_string()
}

impl RewriteConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        log::debug!(
            target: "rewrite.config",
            "loaded {} rules and {} text filters from {}",
            config.rule.len(),
            config.text_filter.len(),
            path.display()
        );
        Ok(config)
    }

    /// Instantiate every configured rule and filter, in file order.
    pub fn build_rule_set(&self) -> Result<RuleSet, ConfigError> {
        let mut rules = RuleSet::new();
        for rule in &self.rule {
            match rule {
                RuleConfig::Rename { tag, to } => {
                    rules.add_basic(tag, TagRename::new(to.as_str()))?;
                }
                RuleConfig::Export {
                    tag,
                    property,
                    include_in_output,
                } => {
                    let rule = CaptureAndExport::new(property.as_str())
                        .include_in_output(*include_in_output);
                    rules.add_block(tag, rule)?;
                }
                RuleConfig::Meta { tag, prefix } => {
                    rules.add_basic(tag, MetaTagExport::new(prefix.as_str()))?;
                }
            }
        }
        for filter in &self.text_filter {
            rules.add_text_filter(ReplaceTextFilter::new(
                filter.find.as_str(),
                filter.replace.as_str(),
            )?);
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::{RewriteConfig, RuleConfig};
    use crate::error::ConfigError;
    use crate::session::rewrite_str;

    const SAMPLE: &str = r#"
[[rule]]
kind = "rename"
tag = "b"
to = "strong"

[[rule]]
kind = "export"
tag = "title"
property = "title"

[[rule]]
kind = "export"
tag = "aside"
property = "aside"
include_in_output = false

[[rule]]
kind = "meta"

[[text_filter]]
find = "(c)"
replace = "©"
"#;

    #[test]
    fn parses_every_rule_kind_with_defaults() {
        let config = RewriteConfig::from_toml_str(SAMPLE).expect("parse");
        assert_eq!(config.rule.len(), 4);
        assert_eq!(
            config.rule[1],
            RuleConfig::Export {
                tag: "title".to_string(),
                property: "title".to_string(),
                include_in_output: true,
            }
        );
        assert_eq!(
            config.rule[3],
            RuleConfig::Meta {
                tag: "meta".to_string(),
                prefix: "meta".to_string(),
            }
        );
        assert_eq!(config.text_filter[0].replace, "\u{a9}");
    }

    #[test]
    fn built_rule_set_rewrites_a_document() {
        let rules = RewriteConfig::from_toml_str(SAMPLE)
            .and_then(|config| config.build_rule_set())
            .expect("rules");
        let out = rewrite_str(
            "<title>T</title><aside>x</aside><b>(c)</b><meta name=k content=v>",
            &rules,
        )
        .expect("rewrite");
        assert_eq!(
            out.document,
            "<title>T</title><strong>\u{a9}</strong><meta name=k content=v>"
        );
        let props: Vec<_> = out.properties.iter().collect();
        assert_eq!(props, vec![("title", "T"), ("aside", "x"), ("meta.k", "v")]);
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let err = RewriteConfig::from_toml_str("[[rule]]\nkind = \"drop\"\ntag = \"x\"\n")
            .expect_err("unknown kind");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn misspelled_rule_field_is_a_parse_error() {
        let err = RewriteConfig::from_toml_str(
            "[[rule]]\nkind = \"export\"\ntag = \"aside\"\nproperty = \"aside\"\n\
             include_in_ouput = false\n",
        )
        .expect_err("misspelled field");
        match err {
            ConfigError::Parse(inner) => {
                assert!(inner.to_string().contains("include_in_ouput"), "{inner}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_tags_fail_at_build_time() {
        let config = RewriteConfig::from_toml_str(
            "[[rule]]\nkind = \"rename\"\ntag = \"b\"\nto = \"x\"\n\n\
             [[rule]]\nkind = \"export\"\ntag = \"B\"\nproperty = \"b\"\n",
        )
        .expect("parse");
        assert!(matches!(
            config.build_rule_set(),
            Err(ConfigError::DuplicateRule { .. })
        ));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = RewriteConfig::load("/nonexistent/retag/rules.toml").expect_err("missing");
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("rules.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
