use std::borrow::Cow;

use crate::error::ConfigError;
use crate::rule_set::TextFilter;

/// Literal find/replace over text runs.
#[derive(Clone, Debug)]
pub struct ReplaceTextFilter {
    find: String,
    replace: String,
}

impl ReplaceTextFilter {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Result<Self, ConfigError> {
        let find = find.into();
        if find.is_empty() {
            return Err(ConfigError::EmptyTextFilter);
        }
        Ok(Self {
            find,
            replace: replace.into(),
        })
    }
}

impl TextFilter for ReplaceTextFilter {
    fn filter<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if text.contains(self.find.as_str()) {
            Cow::Owned(text.replace(self.find.as_str(), &self.replace))
        } else {
            Cow::Borrowed(text)
        }
    }
}
