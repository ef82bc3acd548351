//! Leaf primitives shared by the note engine: easing curves, interpolation,
//! planar geometry and paragraph separator handling.

pub mod easing;
pub mod geometry;
pub mod line_ending;
