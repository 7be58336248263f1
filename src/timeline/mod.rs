//! Timeline geometry.
//!
//! Everything here is synchronous and pure: a [`Viewport`] is owned by its
//! caller, and converters, layouts and ticks are recomputed from it.

pub mod coords;
pub mod layout;
pub mod ticks;
pub mod viewport;

pub use coords::CoordinateConverter;
pub use layout::{assign_tracks, layout, LayoutConfig, PlacedItem, Span, TimelineLayout};
pub use ticks::{generate_ticks, granularity, Tick, TickUnit};
pub use viewport::{Viewport, ViewportError, ZoomBounds, ZoomLevel, ZoomOutcome};
