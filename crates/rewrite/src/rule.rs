//! Rule traits.
//!
//! A rule is registered for one tag name and comes in one of two shapes,
//! chosen at registration:
//!
//! - [`BasicRule`]: fired once for every occurrence (open, close or empty) and
//!   responsible for that occurrence's entire output.
//! - [`BlockRule`]: `process_start` on the open tag and `process_end` on the
//!   matching close tag, with everything in between already processed. The
//!   value returned by `process_start` is handed to the matching `process_end`
//!   and is the only state a block rule carries across the pair.
//!
//! Rules take `&self`: per-occurrence state must travel through the start/end
//! state value, never through fields, so nested occurrences of the same tag
//! stay independent and one rule set can serve concurrent passes.

use std::any::Any;

use crate::context::ProcessingContext;
use crate::error::RewriteError;
use crate::tag::Tag;

/// Rule fired once per tag occurrence.
pub trait BasicRule: Send + Sync {
    fn process(&self, tag: &Tag<'_>, ctx: &mut ProcessingContext<'_>) -> Result<(), RewriteError>;
}

/// Rule bracketing the content between an open tag and its matching close tag.
pub trait BlockRule: Send + Sync {
    type State: 'static;

    fn process_start(
        &self,
        tag: &Tag<'_>,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<Self::State, RewriteError>;

    fn process_end(
        &self,
        tag: &Tag<'_>,
        state: Self::State,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), RewriteError>;

    /// Self-closing occurrence (`<name/>`). Written verbatim by default.
    fn process_empty(
        &self,
        tag: &Tag<'_>,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), RewriteError> {
        tag.write_to(ctx.current_buffer());
        Ok(())
    }
}

/// Opaque block state threaded from `process_start` to `process_end`.
pub(crate) type PendingState = Box<dyn Any>;

/// Object-safe form of [`BlockRule`] with the state type erased.
pub(crate) trait DynBlockRule: Send + Sync {
    fn start(
        &self,
        tag: &Tag<'_>,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<PendingState, RewriteError>;

    fn end(
        &self,
        tag: &Tag<'_>,
        state: PendingState,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), RewriteError>;

    fn empty(&self, tag: &Tag<'_>, ctx: &mut ProcessingContext<'_>) -> Result<(), RewriteError>;
}

impl<R: BlockRule> DynBlockRule for R {
    fn start(
        &self,
        tag: &Tag<'_>,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<PendingState, RewriteError> {
        let state = self.process_start(tag, ctx)?;
        Ok(Box::new(state))
    }

    fn end(
        &self,
        tag: &Tag<'_>,
        state: PendingState,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), RewriteError> {
        match state.downcast::<R::State>() {
            Ok(state) => self.process_end(tag, *state, ctx),
            // States are keyed by rule slot, so a foreign state type is an engine bug.
            Err(_) => unreachable!("block state type mismatch for <{}>", tag.name()),
        }
    }

    fn empty(&self, tag: &Tag<'_>, ctx: &mut ProcessingContext<'_>) -> Result<(), RewriteError> {
        self.process_empty(tag, ctx)
    }
}

/// A registered rule in one of its two shapes.
pub(crate) enum Rule {
    Basic(Box<dyn BasicRule>),
    Block(Box<dyn DynBlockRule>),
}
