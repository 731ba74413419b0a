//! Capture a block's inner markup and export it as a property.

use crate::context::ProcessingContext;
use crate::error::RewriteError;
use crate::rule::BlockRule;
use crate::tag::Tag;

/// Export a block's attributes and body.
///
/// On the open tag every attribute is exported as `property.<attr>` in source
/// order and a buffer is pushed to capture the body. On the close tag the
/// captured body is exported as `property`.
///
/// By default the block stays in the output unchanged (a tap). With
/// `include_in_output(false)` the tags and body are removed from the output
/// and only exported.
#[derive(Clone, Debug)]
pub struct CaptureAndExport {
    property: String,
    include_in_output: bool,
}

impl CaptureAndExport {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            include_in_output: true,
        }
    }

    pub fn include_in_output(mut self, include: bool) -> Self {
        self.include_in_output = include;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn includes_output(&self) -> bool {
        self.include_in_output
    }

    fn export_attributes(&self, tag: &Tag<'_>, ctx: &mut ProcessingContext<'_>) {
        let mut key = String::with_capacity(self.property.len() + 16);
        for i in 0..tag.attribute_count() {
            key.clear();
            key.push_str(&self.property);
            key.push('.');
            key.push_str(tag.attribute_name(i));
            ctx.add_property(&key, tag.attribute_value(i));
        }
    }
}

impl BlockRule for CaptureAndExport {
    type State = ();

    fn process_start(
        &self,
        tag: &Tag<'_>,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), RewriteError> {
        if self.include_in_output {
            tag.write_to(ctx.current_buffer());
        }
        self.export_attributes(tag, ctx);
        ctx.push_buffer();
        Ok(())
    }

    fn process_end(
        &self,
        tag: &Tag<'_>,
        _state: (),
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), RewriteError> {
        let head = ctx.current_buffer_contents().to_string();
        ctx.add_property(&self.property, &head);
        ctx.pop_buffer()?;
        if self.include_in_output {
            let current = ctx.current_buffer();
            current.append(&head);
            tag.write_to(current);
        }
        Ok(())
    }

    fn process_empty(
        &self,
        tag: &Tag<'_>,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), RewriteError> {
        if self.include_in_output {
            tag.write_to(ctx.current_buffer());
        }
        self.export_attributes(tag, ctx);
        ctx.add_property(&self.property, "");
        Ok(())
    }
}
