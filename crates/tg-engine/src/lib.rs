//! tg-engine: graph-to-runtime resolution and tile-sweep execution.
//!
//! Provides:
//! - Transform SPI and a name-indexed registry of transform factories
//! - Lazy raster handles and the tile engine boundary, with a caching engine
//! - Reference resolution for node configurations
//! - Graph contexts (wiring, post-order initialization, teardown)
//! - The graph processor driving the tile sweep, with observers
//! - A handful of built-in transforms
//!
//! # Example
//!
//! ```
//! use tg_core::NullProgressMonitor;
//! use tg_engine::{ExecutionState, ExternalInputs, GraphProcessor};
//! use tg_graph::{Graph, Node};
//!
//! let mut graph = Graph::new("demo");
//! graph
//!     .add_node(Node::new("a", "Constant").with_parameter("width", "100").with_parameter("height", "100"))
//!     .unwrap();
//! graph
//!     .add_node(Node::new("b", "Scale").with_source("source", "a").with_parameter("factor", "2"))
//!     .unwrap();
//!
//! let mut processor = GraphProcessor::with_builtins();
//! let report = processor
//!     .execute_graph(&graph, ExternalInputs::new(), &mut NullProgressMonitor::new())
//!     .unwrap();
//! assert_eq!(report.state, ExecutionState::Completed);
//! assert_eq!(report.outputs, ["b"]);
//! ```

pub mod builtin;
pub mod configuration;
pub mod context;
pub mod error;
pub mod observer;
pub mod processor;
pub mod raster;
pub mod registry;
pub mod tile;
pub mod transform;

pub use configuration::{PropertyRef, Reference, ReferenceLookup, ResolvedConfig, ResolvedParam};
pub use context::{ExecutionState, ExternalInputs, GraphContext, NodeContext, ResolvedSource, SourceRef};
pub use error::{EngineError, EngineResult, ReferenceError, TileError, TransformError, TransformResult};
pub use observer::{GraphProcessingObserver, TracingObserver};
pub use processor::{ExecutionReport, GraphProcessor, ProcessorConfig, SweepOutcome};
pub use raster::{BoundSource, RasterImage, RasterInfo, Tile};
pub use registry::TransformRegistry;
pub use tile::{CachingTileEngine, TileCacheStats, TileEngine};
pub use transform::{FnTransformFactory, SourceImages, SourceTiles, TargetTile, Transform, TransformFactory};
