//! Execution observers.

use tg_core::Rect;
use tracing::{debug, info};

use crate::context::GraphContext;

/// Receives notifications while a graph executes.
///
/// Calls are synchronous and made from the sweep loop; implementations
/// should return quickly.
pub trait GraphProcessingObserver {
    fn graph_processing_started(&mut self, _context: &GraphContext<'_>) {}

    fn graph_processing_stopped(&mut self, _context: &GraphContext<'_>) {}

    fn tile_processing_started(&mut self, _context: &GraphContext<'_>, _tile: Rect) {}

    fn tile_processing_stopped(&mut self, _context: &GraphContext<'_>, _tile: Rect) {}
}

/// Logs every notification through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl GraphProcessingObserver for TracingObserver {
    fn graph_processing_started(&mut self, context: &GraphContext<'_>) {
        info!(graph = context.graph().id(), sinks = ?context.sink_ids(), "graph processing started");
    }

    fn graph_processing_stopped(&mut self, context: &GraphContext<'_>) {
        info!(graph = context.graph().id(), state = ?context.state(), "graph processing stopped");
    }

    fn tile_processing_started(&mut self, _context: &GraphContext<'_>, tile: Rect) {
        debug!(%tile, "tile started");
    }

    fn tile_processing_stopped(&mut self, _context: &GraphContext<'_>, tile: Rect) {
        debug!(%tile, "tile stopped");
    }
}
