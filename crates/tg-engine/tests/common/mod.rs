//! Shared fixtures for tg-engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tg_core::{CancelToken, Rect};
use tg_engine::{
    ExecutionState, GraphContext, GraphProcessingObserver, RasterInfo, SourceTiles, TargetTile, Transform,
    TransformError, TransformRegistry, TransformResult,
};

/// Observer notification, as recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    GraphStarted,
    GraphStopped(ExecutionState),
    TileStarted(Rect),
    TileStopped(Rect),
}

/// Records notifications; optionally cancels after a number of tiles.
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Arc<Mutex<Vec<Event>>>,
    cancel_after: Option<(usize, CancelToken)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canceling_after(tiles: usize, token: CancelToken) -> Self {
        Self {
            events: Arc::default(),
            cancel_after: Some((tiles, token)),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn tiles_stopped(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::TileStopped(_)))
            .count()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl GraphProcessingObserver for Recorder {
    fn graph_processing_started(&mut self, _context: &GraphContext<'_>) {
        self.push(Event::GraphStarted);
    }

    fn graph_processing_stopped(&mut self, context: &GraphContext<'_>) {
        self.push(Event::GraphStopped(context.state()));
    }

    fn tile_processing_started(&mut self, _context: &GraphContext<'_>, tile: Rect) {
        self.push(Event::TileStarted(tile));
    }

    fn tile_processing_stopped(&mut self, _context: &GraphContext<'_>, tile: Rect) {
        self.push(Event::TileStopped(tile));
        if let Some((tiles, token)) = &self.cancel_after {
            if self.tiles_stopped() >= *tiles {
                token.cancel();
            }
        }
    }
}

/// Shared log written by [`Probe`] transforms.
#[derive(Clone, Default)]
pub struct ProbeLog {
    pub created: Arc<Mutex<Vec<String>>>,
    pub computed: Arc<Mutex<Vec<(String, Rect)>>>,
    pub disposed: Arc<Mutex<Vec<String>>>,
    pub creations: Arc<AtomicUsize>,
}

impl ProbeLog {
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn disposed(&self) -> Vec<String> {
        self.disposed.lock().unwrap().clone()
    }

    pub fn computed_by(&self, tag: &str) -> Vec<Rect> {
        self.computed
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == tag)
            .map(|(_, r)| *r)
            .collect()
    }
}

/// Transform that sums its sources (or yields its `value` when it has none)
/// and logs its life cycle under its `tag` parameter.
pub struct Probe {
    tag: String,
    bounds: Rect,
    bands: usize,
    value: f32,
    inputs: usize,
    fail_at: Option<(u32, u32)>,
    log: ProbeLog,
}

impl Transform for Probe {
    fn initialize(&mut self) -> TransformResult<Vec<RasterInfo>> {
        Ok(vec![
            RasterInfo::new(self.tag.clone(), self.bounds.width, self.bounds.height)
                .with_bounds(self.bounds)
                .with_channel_count(self.bands),
        ])
    }

    fn target_property(&self, name: &str) -> Option<tg_core::ParamValue> {
        (name == "value").then(|| tg_core::ParamValue::Float(self.value as f64))
    }

    fn compute_tile(&self, target: &TargetTile, sources: &SourceTiles<'_>) -> TransformResult<Vec<f32>> {
        if self.fail_at == Some((target.region.x, target.region.y)) {
            return Err(TransformError::failed(format!("{} refuses {}", self.tag, target.region)));
        }
        self.log
            .computed
            .lock()
            .unwrap()
            .push((self.tag.clone(), target.region));
        let mut out = vec![self.value; target.region.area()];
        for index in 0..self.inputs {
            let tile = sources.tile_at(index, target.channel, target.region)?;
            for (o, v) in out.iter_mut().zip(tile.samples()) {
                *o += v;
            }
        }
        Ok(out)
    }

    fn dispose(&self) {
        self.log.disposed.lock().unwrap().push(self.tag.clone());
    }
}

/// Builtins plus a `Probe` transform writing to `log`.
///
/// Parameters: `tag`, `x`, `y`, `width`, `height` (default 64), `bands`,
/// `value`, `fail_x`/`fail_y` (tile origin at which computing fails).
/// Without explicit bounds a probe with sources covers its first source.
pub fn registry_with_probe(log: &ProbeLog) -> TransformRegistry {
    let mut registry = TransformRegistry::with_builtins();
    let log = log.clone();
    registry
        .register_fn("Probe", move |config, sources| {
            let tag = config.text("tag")?.unwrap_or_else(|| "probe".to_string());
            let default_bounds = sources.first().map(|s| s.bounds()).unwrap_or(Rect::from_size(64, 64));
            let bounds = if config.contains("width") || sources.is_empty() {
                Rect::new(
                    config.u32_or("x", 0)?,
                    config.u32_or("y", 0)?,
                    config.u32_or("width", 64)?,
                    config.u32_or("height", 64)?,
                )
            } else {
                default_bounds
            };
            let fail_at = if config.contains("fail_x") {
                Some((config.u32_or("fail_x", 0)?, config.u32_or("fail_y", 0)?))
            } else {
                None
            };
            log.created.lock().unwrap().push(tag.clone());
            log.creations.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Probe {
                tag,
                bounds,
                bands: config.u32_or("bands", 1)? as usize,
                value: config.f64_or("value", 1.0)? as f32,
                inputs: sources.len(),
                fail_at,
                log: log.clone(),
            }))
        })
        .unwrap();
    registry
}

/// Position of `id` in `order`.
pub fn position(order: &[impl AsRef<str>], id: &str) -> usize {
    order
        .iter()
        .position(|o| o.as_ref() == id)
        .unwrap_or_else(|| panic!("{id} missing from {:?}", order.iter().map(|o| o.as_ref()).collect::<Vec<_>>()))
}
