//! Built-in rules and text filters.

mod export;
mod meta;
mod rename;
mod text;

pub use export::CaptureAndExport;
pub use meta::MetaTagExport;
pub use rename::TagRename;
pub use text::ReplaceTextFilter;
