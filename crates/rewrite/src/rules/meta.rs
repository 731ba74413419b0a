use crate::context::ProcessingContext;
use crate::error::RewriteError;
use crate::rule::BasicRule;
use crate::tag::Tag;

/// Attributes naming a `<meta>` entry, in lookup order.
const NAME_ATTRIBUTES: [&str; 3] = ["name", "http-equiv", "property"];

/// Export `<meta name="n" content="c">` as `prefix.n = c`.
///
/// `http-equiv` and `property` are accepted in place of `name`. The tag is
/// always written through unchanged; a meta tag without a name or a content
/// attribute exports nothing.
#[derive(Clone, Debug)]
pub struct MetaTagExport {
    prefix: String,
}

impl MetaTagExport {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl BasicRule for MetaTagExport {
    fn process(&self, tag: &Tag<'_>, ctx: &mut ProcessingContext<'_>) -> Result<(), RewriteError> {
        tag.write_to(ctx.current_buffer());
        let name = NAME_ATTRIBUTES.iter().find_map(|attr| tag.attribute(attr));
        if let (Some(name), Some(content)) = (name, tag.attribute("content")) {
            ctx.add_property(&format!("{}.{}", self.prefix, name), content);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MetaTagExport;
    use crate::rule_set::RuleSet;
    use crate::session::rewrite_str;

    #[test]
    fn exports_named_meta_content() {
        let mut rules = RuleSet::new();
        rules.add_basic("meta", MetaTagExport::new("meta")).expect("register");
        let input = concat!(
            r#"<meta name="description" content="A page">"#,
            r#"<META HTTP-EQUIV="refresh" CONTENT="5">"#,
            r#"<meta property="og:title" content="T"/>"#,
            r#"<meta charset="utf-8">"#,
        );
        let out = rewrite_str(input, &rules).expect("rewrite");
        assert_eq!(out.document, input);
        let props: Vec<_> = out.properties.iter().collect();
        assert_eq!(
            props,
            vec![
                ("meta.description", "A page"),
                ("meta.refresh", "5"),
                ("meta.og:title", "T"),
            ]
        );
    }
}
