//! Paragraph-aware rich-text editing engine.
//!
//! The engine segments a [`buffer::StyledTextBuffer`] into paragraphs, keeps
//! their geometry current and runs the gesture controllers that restructure
//! them: pinch-to-relate spacing, drag-to-reorder, swipe-to-reply/delete and
//! magnetic scroll snapping. [`editor::EditorSession`] ties everything
//! together and is the entry point for hosts.

use smartstring::{LazyCompact, SmartString};

pub mod animation;
pub mod buffer;
pub mod config;
pub mod document;
pub mod editor;
pub mod geometry;
pub mod gesture;
pub mod haptics;
pub mod layout;
pub mod overlay;
pub mod paragraph;
pub mod persistence;
pub mod reorder;
pub mod scroll_snap;
pub mod spacing;
pub mod style;
pub mod swipe;

#[cfg(test)]
mod testing;

pub type Tendril = SmartString<LazyCompact>;
