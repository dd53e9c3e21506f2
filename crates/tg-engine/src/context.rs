//! Per-execution runtime context of a graph.
//!
//! A [`GraphContext`] is built in two phases:
//!
//! 1. [`GraphContext::wire`] resolves every source edge against the graph,
//!    counts references and finds the sinks (nodes nobody consumes).
//! 2. [`GraphContext::initialize`] walks the graph post-order from every sink,
//!    creating each node's transform exactly once.
//!
//! Disposal runs along the completion list, head-first, so consumers are
//! released before the nodes they depend on.

use std::collections::VecDeque;
use std::sync::Arc;

use tg_core::{NodeId, ParamValue, Rect};
use tg_graph::{Graph, Node, NodeIndex, same_id};
use tracing::{debug, info};

use crate::configuration::{ReferenceLookup, ResolvedConfig, references, resolve_config};
use crate::error::{EngineError, EngineResult, ReferenceError, TransformError};
use crate::raster::{BoundSource, RasterImage};
use crate::registry::TransformRegistry;
use crate::tile::TileEngine;
use crate::transform::{SourceImages, Transform};

/// Lifecycle of a graph context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    Unwired,
    Wired,
    Initialized,
    Executing,
    Completed,
    Failed,
    Canceled,
}

impl ExecutionState {
    /// Whether execution has ended, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed | ExecutionState::Canceled)
    }
}

/// Where a source edge points after wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Another node of the graph.
    Node(NodeId),
    /// An image supplied by the caller under this name.
    External(String),
    /// An optional header source the caller did not supply.
    Unbound,
}

/// A node source after wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub role: String,
    pub source: SourceRef,
    pub output: Option<String>,
}

/// Images and values supplied from outside the graph.
///
/// Names of both kinds match case-insensitively, the same rule as node ids.
#[derive(Debug, Clone, Default)]
pub struct ExternalInputs {
    sources: Vec<(String, Arc<RasterImage>)>,
    values: Vec<(String, ParamValue)>,
}

impl ExternalInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, name: impl Into<String>, image: Arc<RasterImage>) -> Self {
        self.add_source(name, image);
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set_value(name, value);
        self
    }

    pub fn add_source(&mut self, name: impl Into<String>, image: Arc<RasterImage>) {
        self.sources.push((name.into(), image));
    }

    /// Set a value, replacing any previous value of the same name.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| same_id(n, &name)) {
            Some((_, v)) => *v = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn source(&self, name: &str) -> Option<&Arc<RasterImage>> {
        self.sources.iter().find(|(n, _)| same_id(n, name)).map(|(_, img)| img)
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.values.iter().find(|(n, _)| same_id(n, name)).map(|(_, v)| v)
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(n, _)| n.as_str())
    }
}

/// Runtime state of one node.
pub struct NodeContext {
    handle: NodeId,
    node_id: String,
    reference_count: usize,
    sources: Vec<ResolvedSource>,
    initialized: bool,
    initializing: bool,
    bound_inputs: Vec<BoundSource>,
    config: Option<ResolvedConfig>,
    transform: Option<Arc<dyn Transform>>,
    outputs: Vec<Arc<RasterImage>>,
    disposed: bool,
}

impl NodeContext {
    fn new(handle: NodeId, node: &Node) -> Self {
        Self {
            handle,
            node_id: node.id.clone(),
            reference_count: 0,
            sources: Vec::with_capacity(node.sources.len()),
            initialized: false,
            initializing: false,
            bound_inputs: Vec::new(),
            config: None,
            transform: None,
            outputs: Vec::new(),
            disposed: false,
        }
    }

    pub fn handle(&self) -> NodeId {
        self.handle
    }

    pub fn id(&self) -> &str {
        &self.node_id
    }

    /// Number of source edges across the graph that resolve to this node.
    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    pub fn is_sink(&self) -> bool {
        self.reference_count == 0
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn sources(&self) -> &[ResolvedSource] {
        &self.sources
    }

    pub fn bound_inputs(&self) -> &[BoundSource] {
        &self.bound_inputs
    }

    /// Image bound under `role`.
    pub fn bound_input(&self, role: &str) -> Option<&Arc<RasterImage>> {
        self.bound_inputs.iter().find(|b| b.role == role).map(|b| &b.image)
    }

    pub fn config(&self) -> Option<&ResolvedConfig> {
        self.config.as_ref()
    }

    pub fn transform(&self) -> Option<&Arc<dyn Transform>> {
        self.transform.as_ref()
    }

    pub fn outputs(&self) -> &[Arc<RasterImage>] {
        &self.outputs
    }

    pub fn primary_output(&self) -> Option<&Arc<RasterImage>> {
        self.outputs.first()
    }

    /// Output named `name`.
    pub fn output(&self, name: &str) -> Option<&Arc<RasterImage>> {
        self.outputs.iter().find(|o| o.name() == name)
    }

    fn dispose(&mut self, engine: Option<&dyn TileEngine>) {
        if let Some(transform) = self.transform.take() {
            transform.dispose();
        }
        if let Some(engine) = engine {
            for output in &self.outputs {
                engine.release(output);
            }
        }
        self.outputs.clear();
        self.bound_inputs.clear();
        self.config = None;
        self.disposed = true;
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("node_id", &self.node_id)
            .field("reference_count", &self.reference_count)
            .field("initialized", &self.initialized)
            .field("sources", &self.sources)
            .field("outputs", &self.outputs.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Runtime instantiation of a [`Graph`] for one execution.
pub struct GraphContext<'g> {
    graph: &'g Graph,
    index: NodeIndex,
    nodes: Vec<NodeContext>,
    sinks: Vec<NodeId>,
    completed: VecDeque<NodeId>,
    state: ExecutionState,
    externals: ExternalInputs,
    disposal_order: Option<Vec<String>>,
}

impl<'g> GraphContext<'g> {
    /// Wire and initialize `graph`.
    pub fn new(graph: &'g Graph, registry: &TransformRegistry, externals: ExternalInputs) -> EngineResult<Self> {
        let mut context = Self::wire(graph, externals)?;
        context.initialize(registry)?;
        Ok(context)
    }

    /// Resolve every source edge and count references.
    ///
    /// Fails with [`EngineError::EmptyGraph`] before looking at any edge when
    /// the graph has no nodes.
    pub fn wire(graph: &'g Graph, externals: ExternalInputs) -> EngineResult<Self> {
        if graph.is_empty() {
            return Err(EngineError::EmptyGraph {
                graph_id: graph.id().to_string(),
            });
        }
        graph.validate()?;
        let index = NodeIndex::from_graph(graph)?;

        let mut nodes: Vec<NodeContext> = graph
            .nodes()
            .iter()
            .zip(index.handles())
            .map(|(node, handle)| NodeContext::new(handle, node))
            .collect();

        for (consumer, node) in graph.nodes().iter().enumerate() {
            for source in &node.sources {
                let resolved = if let Some(producer) = index.get(&source.source_node_id) {
                    nodes[producer.slot()].reference_count += 1;
                    SourceRef::Node(producer)
                } else if externals.source(&source.source_node_id).is_some() {
                    SourceRef::External(source.source_node_id.clone())
                } else if is_optional_header_source(graph, &source.source_node_id) {
                    SourceRef::Unbound
                } else {
                    return Err(EngineError::MissingSource {
                        consumer_id: node.id.clone(),
                        source_node_id: source.source_node_id.clone(),
                    });
                };
                nodes[consumer].sources.push(ResolvedSource {
                    role: source.role.clone(),
                    source: resolved,
                    output: source.output.clone(),
                });
            }
        }

        check_acyclic(&nodes)?;

        let sinks: Vec<NodeId> = nodes.iter().filter(|n| n.is_sink()).map(|n| n.handle).collect();
        debug!(
            graph = graph.id(),
            nodes = nodes.len(),
            sinks = sinks.len(),
            "wired graph"
        );

        Ok(Self {
            graph,
            index,
            nodes,
            sinks,
            completed: VecDeque::new(),
            state: ExecutionState::Wired,
            externals,
            disposal_order: None,
        })
    }

    /// Initialize every sink and, through them, everything they depend on.
    ///
    /// On failure every node initialized so far is disposed and the context
    /// is left in [`ExecutionState::Failed`].
    pub fn initialize(&mut self, registry: &TransformRegistry) -> EngineResult<()> {
        self.expect_state(ExecutionState::Wired)?;
        for sink in self.sinks.clone() {
            if let Err(err) = self.init_node(sink, registry) {
                self.state = ExecutionState::Failed;
                self.dispose(None);
                return Err(err);
            }
        }
        self.state = ExecutionState::Initialized;
        info!(
            graph = self.graph.id(),
            initialized = self.completed.len(),
            "initialized graph"
        );
        Ok(())
    }

    fn init_node(&mut self, handle: NodeId, registry: &TransformRegistry) -> EngineResult<()> {
        let slot = handle.slot();
        if self.nodes[slot].initialized {
            return Ok(());
        }
        if self.nodes[slot].initializing {
            return Err(EngineError::CyclicDependency {
                node_id: self.nodes[slot].node_id.clone(),
            });
        }
        self.nodes[slot].initializing = true;
        let result = self.init_node_unguarded(handle, registry);
        self.nodes[slot].initializing = false;
        result
    }

    fn init_node_unguarded(&mut self, handle: NodeId, registry: &TransformRegistry) -> EngineResult<()> {
        let graph = self.graph;
        let node = &graph.nodes()[handle.slot()];

        let mut bound = Vec::with_capacity(node.sources.len());
        for source in self.nodes[handle.slot()].sources.clone() {
            let image = match &source.source {
                SourceRef::Node(producer) => {
                    self.init_node(*producer, registry)?;
                    self.producer_output(node, &source, *producer)?
                }
                SourceRef::External(name) => match self.externals.source(name) {
                    Some(image) => Arc::clone(image),
                    None => {
                        return Err(EngineError::MissingSource {
                            consumer_id: node.id.clone(),
                            source_node_id: name.clone(),
                        });
                    }
                },
                SourceRef::Unbound => continue,
            };
            bound.push(BoundSource {
                role: source.role,
                image,
            });
        }

        // Peers named by property references may be declared anywhere; make
        // sure they are up before resolving.
        for reference in references(&node.config).into_iter().flatten() {
            if let Some(peer) = reference.peer().and_then(|id| self.index.get(id)) {
                self.init_node(peer, registry)?;
            }
        }
        let config = resolve_config(&node.id, &node.config, &*self)?;

        let factory = registry.get(&node.transform).ok_or_else(|| EngineError::UnknownTransform {
            node_id: node.id.clone(),
            transform: node.transform.clone(),
        })?;
        let init_err = |source| EngineError::TransformInit {
            node_id: node.id.clone(),
            source,
        };
        let source_images = SourceImages::new(bound);
        let mut transform = factory.create(&config, &source_images).map_err(init_err)?;
        let infos = transform.initialize().map_err(init_err)?;
        if infos.is_empty() {
            return Err(init_err(TransformError::failed("transform declares no outputs")));
        }

        let transform: Arc<dyn Transform> = Arc::from(transform);
        let bound: Arc<[BoundSource]> = source_images.into_bound().into();
        let outputs = infos
            .into_iter()
            .enumerate()
            .map(|(i, info)| {
                Arc::new(RasterImage::new(
                    node.id.clone(),
                    i,
                    info,
                    Arc::clone(&transform),
                    Arc::clone(&bound),
                ))
            })
            .collect();

        let ctx = &mut self.nodes[handle.slot()];
        ctx.bound_inputs = bound.to_vec();
        ctx.config = Some(config);
        ctx.transform = Some(transform);
        ctx.outputs = outputs;
        ctx.initialized = true;
        self.completed.push_front(handle);
        debug!(node = node.id.as_str(), transform = node.transform.as_str(), "initialized node");
        Ok(())
    }

    fn producer_output(&self, node: &Node, source: &ResolvedSource, producer: NodeId) -> EngineResult<Arc<RasterImage>> {
        let ctx = &self.nodes[producer.slot()];
        let image = match &source.output {
            Some(name) => ctx.output(name),
            None => ctx.primary_output(),
        };
        image.cloned().ok_or_else(|| EngineError::UnknownOutput {
            node_id: node.id.clone(),
            role: source.role.clone(),
            producer_id: ctx.node_id.clone(),
            output: source.output.clone().unwrap_or_else(|| "<primary>".to_string()),
        })
    }

    /// Release every initialized node, head-first along the completion list.
    ///
    /// Runs once; later calls return the order recorded by the first.
    pub fn dispose(&mut self, engine: Option<&dyn TileEngine>) -> Vec<String> {
        if let Some(order) = &self.disposal_order {
            return order.clone();
        }
        let mut order = Vec::with_capacity(self.completed.len());
        for handle in &self.completed {
            let ctx = &mut self.nodes[handle.slot()];
            ctx.dispose(engine);
            order.push(ctx.node_id.clone());
        }
        debug!(graph = self.graph.id(), disposed = order.len(), "disposed graph context");
        self.disposal_order = Some(order.clone());
        order
    }

    pub fn is_disposed(&self) -> bool {
        self.disposal_order.is_some()
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ExecutionState) {
        self.state = state;
    }

    pub(crate) fn expect_state(&self, expected: ExecutionState) -> EngineResult<()> {
        if self.state != expected {
            return Err(EngineError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    pub fn nodes(&self) -> &[NodeContext] {
        &self.nodes
    }

    pub fn node(&self, handle: NodeId) -> &NodeContext {
        &self.nodes[handle.slot()]
    }

    /// Node context by id, case-insensitive.
    pub fn node_by_id(&self, id: &str) -> Option<&NodeContext> {
        self.index.get(id).map(|h| &self.nodes[h.slot()])
    }

    /// Nodes with a zero reference count, in graph order.
    pub fn sinks(&self) -> impl Iterator<Item = &NodeContext> {
        self.sinks.iter().map(|h| &self.nodes[h.slot()])
    }

    pub fn sink_ids(&self) -> Vec<String> {
        self.sinks().map(|n| n.node_id.clone()).collect()
    }

    /// Node ids in completion order, most recently completed first.
    pub fn completion_order(&self) -> Vec<&str> {
        self.completed.iter().map(|h| self.nodes[h.slot()].node_id.as_str()).collect()
    }

    /// Pixel-space extent of every sink output, anchored at the origin.
    ///
    /// The sweep grid built on this rectangle lines up with the engine's tile
    /// grid, so each sweep cell is exactly one engine tile.
    pub fn sink_bounds(&self) -> Option<Rect> {
        self.sinks()
            .flat_map(|n| n.outputs.iter())
            .map(|o| o.bounds())
            .filter(|b| !b.is_empty())
            .map(|b| (b.right(), b.bottom()))
            .reduce(|(r0, b0), (r1, b1)| (r0.max(r1), b0.max(b1)))
            .map(|(right, bottom)| {
                let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
                Rect::from_size(clamp(right), clamp(bottom))
            })
    }

    pub fn externals(&self) -> &ExternalInputs {
        &self.externals
    }
}

impl ReferenceLookup for GraphContext<'_> {
    fn external_value(&self, name: &str) -> Option<ParamValue> {
        if let Some(value) = self.externals.value(name) {
            return Some(value.clone());
        }
        self.graph
            .header()
            .and_then(|h| h.parameter(name))
            .and_then(|p| p.default_value.as_deref())
            .map(ParamValue::from)
    }

    fn peer_transform(&self, node_id: &str) -> Result<Arc<dyn Transform>, ReferenceError> {
        let handle = self.index.get(node_id).ok_or_else(|| ReferenceError::UnknownPeer {
            node_id: node_id.to_string(),
        })?;
        let ctx = &self.nodes[handle.slot()];
        match &ctx.transform {
            Some(transform) => Ok(Arc::clone(transform)),
            None if ctx.disposed => Err(ReferenceError::PeerDisposed {
                node_id: ctx.node_id.clone(),
            }),
            None => Err(ReferenceError::UnknownPeer {
                node_id: ctx.node_id.clone(),
            }),
        }
    }
}

impl Drop for GraphContext<'_> {
    fn drop(&mut self) {
        if !self.is_disposed() {
            self.dispose(None);
        }
    }
}

impl std::fmt::Debug for GraphContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphContext")
            .field("graph", &self.graph.id())
            .field("state", &self.state)
            .field("nodes", &self.nodes)
            .field("completed", &self.completion_order())
            .finish()
    }
}

fn is_optional_header_source(graph: &Graph, name: &str) -> bool {
    graph
        .header()
        .and_then(|h| h.sources.iter().find(|s| same_id(&s.name, name)))
        .is_some_and(|s| s.optional)
}

/// Kahn's algorithm over the source edges; fails on the first node left in a cycle.
fn check_acyclic(nodes: &[NodeContext]) -> EngineResult<()> {
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0_usize; nodes.len()];
    for (consumer, ctx) in nodes.iter().enumerate() {
        for source in &ctx.sources {
            if let SourceRef::Node(producer) = source.source {
                consumers[producer.slot()].push(consumer);
                in_degree[consumer] += 1;
            }
        }
    }

    let mut queue: Vec<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut visited = 0;
    while let Some(producer) = queue.pop() {
        visited += 1;
        for &consumer in &consumers[producer] {
            in_degree[consumer] -= 1;
            if in_degree[consumer] == 0 {
                queue.push(consumer);
            }
        }
    }

    if visited != nodes.len() {
        let stuck = in_degree.iter().position(|&d| d > 0).unwrap_or(0);
        return Err(EngineError::CyclicDependency {
            node_id: nodes[stuck].node_id.clone(),
        });
    }
    Ok(())
}
