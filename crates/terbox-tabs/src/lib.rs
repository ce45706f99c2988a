//! terbox-tabs: the scrollable tab strip for terbox.
//!
//! Provides the [`TabViewport`] (which tabs are visible, click hit-testing)
//! and the immutable [`Theme`] value used to color it.

pub mod text;
pub mod theme;
pub mod viewport;

pub use theme::{Theme, THEME_NAMES};
pub use viewport::{RenderedStrip, TabError, TabViewport};
