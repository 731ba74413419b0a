//! Nested output buffers.

use std::fmt;

use crate::error::RewriteError;

/// Append-only text accumulator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}

/// Stack of output buffers.
///
/// Invariant: never empty. The bottom buffer is the root (final output) and
/// the top one is "current"; pushes and pops are strictly nested.
#[derive(Debug)]
pub struct BufferStack {
    buffers: Vec<Buffer>,
    max_depth: usize,
}

impl BufferStack {
    pub fn new() -> Self {
        Self {
            buffers: vec![Buffer::new()],
            max_depth: 1,
        }
    }

    pub fn current_mut(&mut self) -> &mut Buffer {
        let last = self.buffers.len() - 1;
        &mut self.buffers[last]
    }

    pub fn current(&self) -> &Buffer {
        &self.buffers[self.buffers.len() - 1]
    }

    /// Read the current buffer without popping it.
    pub fn current_contents(&self) -> &str {
        self.current().as_str()
    }

    /// Push a new empty buffer, which becomes current.
    pub fn push(&mut self) {
        self.buffers.push(Buffer::new());
        self.max_depth = self.max_depth.max(self.buffers.len());
    }

    /// Remove the current buffer, discarding its contents.
    pub fn pop(&mut self) -> Result<(), RewriteError> {
        self.pop_contents().map(drop)
    }

    /// Remove the current buffer and hand its contents to the caller.
    pub fn pop_contents(&mut self) -> Result<String, RewriteError> {
        if self.buffers.len() == 1 {
            return Err(RewriteError::PopRootBuffer);
        }
        let mut top = self.buffers.pop().ok_or(RewriteError::PopRootBuffer)?;
        Ok(top.take())
    }

    /// Number of buffers, root included.
    pub fn depth(&self) -> usize {
        self.buffers.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_at_root(&self) -> bool {
        self.buffers.len() == 1
    }

    /// Take whatever the root buffer holds so far (streaming flush).
    ///
    /// Only meaningful at root depth; nested buffers are left untouched.
    pub(crate) fn take_root(&mut self) -> String {
        self.buffers[0].take()
    }

    /// Fold buffers above `depth` into the buffer beneath them, preserving
    /// their contents in order.
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        let depth = depth.max(1);
        while self.buffers.len() > depth {
            if let Some(mut top) = self.buffers.pop() {
                let text = top.take();
                self.current_mut().append(&text);
            }
        }
    }
}

impl Default for BufferStack {
    fn default() -> Self {
        Self::new()
    }
}
