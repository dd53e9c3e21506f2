//! tg-graph: graph description layer for tilegraph.
//!
//! Provides:
//! - Graph data structures (Graph, Node, NodeSource, Header, ConfigElement)
//! - Incremental graph builder with validation
//! - Case-insensitive node index used when wiring a graph
//!
//! # Example
//!
//! ```
//! use tg_graph::{GraphBuilder, Node};
//!
//! let mut builder = GraphBuilder::new("chain");
//! builder
//!     .add_node(Node::new("read", "Constant").with_parameter("value", "1"))
//!     .add_node(Node::new("scale", "Scale").with_source("source", "read"));
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.node_count(), 2);
//! assert!(graph.node("SCALE").is_some());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod header;
pub mod indexing;
pub mod validate;

pub use builder::GraphBuilder;
pub use config::{ConfigElement, PARAMETERS_ELEMENT, REFID_ATTRIBUTE};
pub use error::{GraphError, GraphResult};
pub use graph::{Graph, Node, NodeSource};
pub use header::{Header, HeaderParameter, HeaderSource};
pub use indexing::{NodeIndex, normalize_id, same_id};
pub use validate::validate_graph;
