//! tg-core: stable foundation for tilegraph.
//!
//! Contains:
//! - ids (compact arena handles for runtime node tables)
//! - geometry (pixel rectangles, tile sizes and tile grids)
//! - value (scalar parameter and property values)
//! - progress (progress monitors and cooperative cancellation)
//! - timing (phase timers)
//! - error (shared error types)

pub mod error;
pub mod geometry;
pub mod ids;
pub mod progress;
pub mod timing;
pub mod value;

pub use error::{TgError, TgResult};
pub use geometry::{Rect, TileGrid, TileSize};
pub use ids::*;
pub use progress::{CancelToken, CountingProgressMonitor, NullProgressMonitor, ProgressMonitor};
pub use timing::PhaseTimings;
pub use value::ParamValue;
