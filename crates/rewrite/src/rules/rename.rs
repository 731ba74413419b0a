use crate::context::ProcessingContext;
use crate::error::RewriteError;
use crate::rule::BasicRule;
use crate::tag::Tag;

/// Rename every occurrence of a tag; kind and attributes pass through.
///
/// `<b class="x">` with `TagRename::new("strong")` becomes `<strong class="x">`,
/// and `</b>` becomes `</strong>`.
#[derive(Clone, Debug)]
pub struct TagRename {
    to: String,
}

impl TagRename {
    pub fn new(to: impl Into<String>) -> Self {
        Self { to: to.into() }
    }

    pub fn to(&self) -> &str {
        &self.to
    }
}

impl BasicRule for TagRename {
    fn process(&self, tag: &Tag<'_>, ctx: &mut ProcessingContext<'_>) -> Result<(), RewriteError> {
        tag.with_name(self.to.as_str()).write_to(ctx.current_buffer());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TagRename;
    use crate::rule_set::RuleSet;
    use crate::session::rewrite_str;

    #[test]
    fn renames_open_close_and_empty_occurrences() {
        let mut rules = RuleSet::new();
        rules.add_basic("b", TagRename::new("strong")).expect("register");
        let out = rewrite_str(r#"<b class="x">hi</B><b/>"#, &rules).expect("rewrite");
        assert_eq!(out.document, r#"<strong class="x">hi</strong><strong/>"#);
        assert!(out.properties.is_empty());
    }

    #[test]
    fn unrelated_tags_are_untouched() {
        let mut rules = RuleSet::new();
        rules.add_basic("b", TagRename::new("strong")).expect("register");
        let input = "<br><bdi>x</bdi><!-- <b> -->";
        assert_eq!(rewrite_str(input, &rules).expect("rewrite").document, input);
    }
}
