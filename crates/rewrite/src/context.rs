//! Per-pass state handed to rules.

use crate::buffer::{Buffer, BufferStack};
use crate::error::RewriteError;
use crate::properties::PropertySink;

/// Processing context for one rule invocation.
///
/// Borrows the pass-scoped buffer stack and property sink; a rule never keeps
/// a buffer past the call that gave it access and always asks for "current".
pub struct ProcessingContext<'p> {
    buffers: &'p mut BufferStack,
    sink: &'p mut dyn PropertySink,
}

impl<'p> ProcessingContext<'p> {
    pub fn new(buffers: &'p mut BufferStack, sink: &'p mut dyn PropertySink) -> Self {
        Self { buffers, sink }
    }

    pub fn current_buffer(&mut self) -> &mut Buffer {
        self.buffers.current_mut()
    }

    /// Redirect subsequent output into a new empty buffer.
    pub fn push_buffer(&mut self) {
        self.buffers.push();
    }

    /// Drop the current buffer and its contents, restoring the one beneath.
    ///
    /// Popping the root buffer is a rule bug and fails with
    /// [`RewriteError::PopRootBuffer`].
    pub fn pop_buffer(&mut self) -> Result<(), RewriteError> {
        self.buffers.pop()
    }

    pub fn current_buffer_contents(&self) -> &str {
        self.buffers.current_contents()
    }

    pub fn buffer_depth(&self) -> usize {
        self.buffers.depth()
    }

    pub fn add_property(&mut self, key: &str, value: &str) {
        log::trace!(target: "rewrite.rules", "export {key}={value:?}");
        self.sink.add_property(key, value);
    }
}
