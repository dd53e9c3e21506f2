//! Graph execution: wire, initialize, sweep the tile grid, tear down.

use std::sync::Arc;

use tg_core::timing::Timer;
use tg_core::{PhaseTimings, ProgressMonitor, Rect, TileGrid, TileSize};
use tg_graph::Graph;
use tracing::{debug, info, warn};

use crate::context::{ExecutionState, ExternalInputs, GraphContext};
use crate::error::{EngineError, EngineResult};
use crate::observer::GraphProcessingObserver;
use crate::raster::RasterImage;
use crate::registry::TransformRegistry;
use crate::tile::{CachingTileEngine, DEFAULT_TILE_SIZE, TileEngine};

/// Processor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub tile_size: TileSize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            tile_size: TileSize {
                width: DEFAULT_TILE_SIZE,
                height: DEFAULT_TILE_SIZE,
            },
        }
    }
}

/// Result of sweeping one context.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub state: ExecutionState,
    pub tiles_completed: usize,
    pub tiles_total: usize,
    pub bounds: Option<Rect>,
    /// Node ids in the order they were disposed.
    pub disposal_order: Vec<String>,
    pub teardown_s: f64,
}

/// Summary of a full graph execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub graph_id: String,
    pub state: ExecutionState,
    pub tiles_completed: usize,
    pub tiles_total: usize,
    pub bounds: Option<Rect>,
    /// Sink node ids in graph order.
    pub outputs: Vec<String>,
    pub disposal_order: Vec<String>,
    pub timings: PhaseTimings,
}

/// Drives graphs through the tile engine.
pub struct GraphProcessor {
    registry: Arc<TransformRegistry>,
    engine: Arc<dyn TileEngine>,
    observers: Vec<Box<dyn GraphProcessingObserver>>,
}

impl GraphProcessor {
    pub fn new(registry: Arc<TransformRegistry>, engine: Arc<dyn TileEngine>) -> Self {
        Self {
            registry,
            engine,
            observers: Vec::new(),
        }
    }

    /// Processor over a [`CachingTileEngine`] configured by `config`.
    pub fn from_config(registry: Arc<TransformRegistry>, config: ProcessorConfig) -> Self {
        Self::new(registry, Arc::new(CachingTileEngine::new(config.tile_size)))
    }

    /// Built-in transforms on a default caching engine.
    pub fn with_builtins() -> Self {
        Self::from_config(Arc::new(TransformRegistry::with_builtins()), ProcessorConfig::default())
    }

    pub fn add_observer(&mut self, observer: Box<dyn GraphProcessingObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<dyn TileEngine> {
        &self.engine
    }

    /// Wire and initialize `graph`.
    pub fn create_context<'g>(&self, graph: &'g Graph, externals: ExternalInputs) -> EngineResult<GraphContext<'g>> {
        GraphContext::new(graph, &self.registry, externals)
    }

    /// Sweep the tile grid of an initialized context, then tear it down.
    ///
    /// Teardown runs exactly once whether the sweep completes, is canceled or
    /// fails on a tile.
    pub fn execute_context(
        &mut self,
        context: &mut GraphContext<'_>,
        pm: &mut dyn ProgressMonitor,
    ) -> EngineResult<SweepOutcome> {
        context.expect_state(ExecutionState::Initialized)?;

        let tile_size = self.engine.tile_size();
        let bounds = context.sink_bounds();
        let grid = bounds.map(|b| TileGrid::new(b, tile_size));
        let tiles_total = grid.as_ref().map_or(0, TileGrid::tile_count);
        let sinks: Vec<Arc<RasterImage>> = context
            .sinks()
            .flat_map(|n| n.outputs().iter().cloned())
            .collect();

        pm.begin_task(&format!("Processing graph '{}'", context.graph().id()), tiles_total);
        context.set_state(ExecutionState::Executing);
        for observer in &mut self.observers {
            observer.graph_processing_started(context);
        }

        let mut tiles_completed = 0;
        let mut failure = None;
        for (column, row, tile) in grid.iter().flat_map(|g| g.cells()) {
            if pm.is_canceled() {
                info!(graph = context.graph().id(), tiles_completed, "graph processing canceled");
                context.set_state(ExecutionState::Canceled);
                break;
            }
            for observer in &mut self.observers {
                observer.tile_processing_started(context, tile);
            }
            let result = self.force_sinks(&sinks, tile, tiles_completed);
            for observer in &mut self.observers {
                observer.tile_processing_stopped(context, tile);
            }
            if let Err(err) = result {
                warn!(graph = context.graph().id(), column, row, error = %err, "tile computation failed");
                failure = Some(err);
                break;
            }
            tiles_completed += 1;
            pm.worked(1);
        }

        if failure.is_some() {
            context.set_state(ExecutionState::Failed);
        } else if context.state() == ExecutionState::Executing {
            context.set_state(ExecutionState::Completed);
        }
        pm.done();
        for observer in &mut self.observers {
            observer.graph_processing_stopped(context);
        }

        let timer = Timer::start("teardown");
        let disposal_order = context.dispose(Some(self.engine.as_ref()));
        let teardown_s = timer.stop().unwrap_or_default();
        debug!(graph = context.graph().id(), ?disposal_order, "tore down graph context");

        match failure {
            Some(err) => Err(err),
            None => Ok(SweepOutcome {
                state: context.state(),
                tiles_completed,
                tiles_total,
                bounds,
                disposal_order,
                teardown_s,
            }),
        }
    }

    fn force_sinks(&self, sinks: &[Arc<RasterImage>], tile: Rect, tiles_completed: usize) -> EngineResult<()> {
        let tile_size = self.engine.tile_size();
        for image in sinks {
            let Some(overlap) = image.bounds().intersection(&tile) else {
                continue;
            };
            let channels = if image.computes_tile_stack() {
                image.channel_count().min(1)
            } else {
                image.channel_count()
            };
            for (tile_x, tile_y) in tile_size.tiles_covering(&overlap) {
                for channel in 0..channels {
                    self.engine
                        .force_tile(image, channel, tile_x, tile_y)
                        .map_err(|source| EngineError::TileCompute {
                            node_id: image.producer().to_string(),
                            tile_x,
                            tile_y,
                            tiles_completed,
                            source,
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Wire, initialize and execute `graph`.
    pub fn execute_graph(
        &mut self,
        graph: &Graph,
        externals: ExternalInputs,
        pm: &mut dyn ProgressMonitor,
    ) -> EngineResult<ExecutionReport> {
        let mut timings = PhaseTimings::default();

        let timer = Timer::start("wire");
        let mut context = GraphContext::wire(graph, externals)?;
        timings.wire_s = timer.stop().unwrap_or_default();

        let timer = Timer::start("initialize");
        context.initialize(&self.registry)?;
        timings.initialize_s = timer.stop().unwrap_or_default();

        let outputs = context.sink_ids();
        let timer = Timer::start("sweep");
        let outcome = self.execute_context(&mut context, pm)?;
        timings.teardown_s = outcome.teardown_s;
        timings.sweep_s = (timer.stop().unwrap_or_default() - outcome.teardown_s).max(0.0);

        info!(
            graph = graph.id(),
            state = ?outcome.state,
            tiles = outcome.tiles_completed,
            total = outcome.tiles_total,
            "graph processing finished"
        );

        Ok(ExecutionReport {
            graph_id: graph.id().to_string(),
            state: outcome.state,
            tiles_completed: outcome.tiles_completed,
            tiles_total: outcome.tiles_total,
            bounds: outcome.bounds,
            outputs,
            disposal_order: outcome.disposal_order,
            timings,
        })
    }
}

impl std::fmt::Debug for GraphProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphProcessor")
            .field("registry", &self.registry)
            .field("tile_size", &self.engine.tile_size())
            .field("observers", &self.observers.len())
            .finish()
    }
}
