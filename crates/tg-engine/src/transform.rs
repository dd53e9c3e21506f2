//! Transform SPI: what the engine needs from a pluggable processing step.

use std::sync::Arc;

use tg_core::{ParamValue, Rect};

use crate::configuration::ResolvedConfig;
use crate::error::{TransformError, TransformResult};
use crate::raster::{BoundSource, RasterImage, RasterInfo, Tile};
use crate::tile::TileEngine;

/// One tile request: which output, which channel, which pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetTile {
    pub output: usize,
    pub channel: usize,
    pub region: Rect,
}

/// A processing step bound to its inputs and configuration.
///
/// Instances are created by a [`TransformFactory`] during graph
/// initialization. `initialize` describes the outputs without computing any
/// pixel; pixels are produced on demand by `compute_tile`.
pub trait Transform: Send + Sync {
    /// Describe the outputs. The first entry is the primary output.
    fn initialize(&mut self) -> TransformResult<Vec<RasterInfo>>;

    /// Read a named scalar property, used by peer references.
    fn target_property(&self, _name: &str) -> Option<ParamValue> {
        None
    }

    /// Names of the properties `target_property` answers for.
    fn target_property_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether all channels of a tile are computed in one call.
    fn can_compute_tile_stack(&self) -> bool {
        false
    }

    /// Compute one channel of one tile, row-major over `target.region`.
    fn compute_tile(&self, target: &TargetTile, sources: &SourceTiles<'_>) -> TransformResult<Vec<f32>>;

    /// Compute every channel of one tile.
    fn compute_tile_stack(
        &self,
        output: usize,
        channels: usize,
        region: Rect,
        sources: &SourceTiles<'_>,
    ) -> TransformResult<Vec<Vec<f32>>> {
        (0..channels)
            .map(|channel| {
                let target = TargetTile {
                    output,
                    channel,
                    region,
                };
                self.compute_tile(&target, sources)
            })
            .collect()
    }

    /// Release resources held outside the tile cache.
    fn dispose(&self) {}
}

/// Creates transforms by name; registered in a [`crate::TransformRegistry`].
pub trait TransformFactory: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn create(&self, config: &ResolvedConfig, sources: &SourceImages) -> TransformResult<Box<dyn Transform>>;
}

type CreateFn = dyn Fn(&ResolvedConfig, &SourceImages) -> TransformResult<Box<dyn Transform>> + Send + Sync;

/// Factory backed by a closure.
pub struct FnTransformFactory {
    name: String,
    description: String,
    create: Box<CreateFn>,
}

impl FnTransformFactory {
    pub fn new<F>(name: impl Into<String>, create: F) -> Self
    where
        F: Fn(&ResolvedConfig, &SourceImages) -> TransformResult<Box<dyn Transform>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            create: Box::new(create),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl TransformFactory for FnTransformFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn create(&self, config: &ResolvedConfig, sources: &SourceImages) -> TransformResult<Box<dyn Transform>> {
        (self.create)(config, sources)
    }
}

/// Inputs bound to a node, in source declaration order.
#[derive(Debug, Clone, Default)]
pub struct SourceImages {
    bound: Vec<BoundSource>,
}

impl SourceImages {
    pub fn new(bound: Vec<BoundSource>) -> Self {
        Self { bound }
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Image bound under `role`.
    pub fn get(&self, role: &str) -> Option<&Arc<RasterImage>> {
        self.bound.iter().find(|b| b.role == role).map(|b| &b.image)
    }

    pub fn require(&self, role: &str) -> TransformResult<&Arc<RasterImage>> {
        self.get(role).ok_or_else(|| TransformError::MissingSource { role: role.to_string() })
    }

    /// First bound input, for transforms that accept any role name.
    pub fn first(&self) -> Option<&Arc<RasterImage>> {
        self.bound.first().map(|b| &b.image)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundSource> {
        self.bound.iter()
    }

    pub(crate) fn into_bound(self) -> Vec<BoundSource> {
        self.bound
    }
}

/// Pull access to upstream tiles while computing a tile.
pub struct SourceTiles<'a> {
    engine: &'a dyn TileEngine,
    sources: &'a [BoundSource],
}

impl<'a> SourceTiles<'a> {
    pub fn new(engine: &'a dyn TileEngine, sources: &'a [BoundSource]) -> Self {
        Self { engine, sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Pixels of `channel` over `region` from the input bound under `role`.
    pub fn tile(&self, role: &str, channel: usize, region: Rect) -> TransformResult<Tile> {
        let source = self
            .sources
            .iter()
            .find(|b| b.role == role)
            .ok_or_else(|| TransformError::MissingSource { role: role.to_string() })?;
        Ok(self.engine.region(&source.image, channel, region)?)
    }

    /// Same as [`SourceTiles::tile`], addressing the input by position.
    pub fn tile_at(&self, index: usize, channel: usize, region: Rect) -> TransformResult<Tile> {
        let source = self.sources.get(index).ok_or_else(|| TransformError::MissingSource {
            role: format!("#{index}"),
        })?;
        Ok(self.engine.region(&source.image, channel, region)?)
    }
}
