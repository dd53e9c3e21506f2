//! Lazy raster handles and computed tiles.
//!
//! A [`RasterImage`] is the output handle a transform exposes: it knows its
//! shape and how to compute any tile, but holds no pixels. Pixels live in the
//! tile engine's cache, keyed by the image's [`RasterImage::key`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tg_core::Rect;

use crate::error::TransformResult;
use crate::transform::Transform;

static NEXT_IMAGE_KEY: AtomicU64 = AtomicU64::new(1);

/// Shape of one transform output: name, pixel bounds and channel names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterInfo {
    pub name: String,
    pub bounds: Rect,
    pub channels: Vec<String>,
}

impl RasterInfo {
    /// Single-channel raster anchored at the origin.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            bounds: Rect::from_size(width, height),
            channels: vec!["band_1".to_string()],
        }
    }

    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// `count` channels named `band_1..band_n`.
    pub fn with_channel_count(self, count: usize) -> Self {
        self.with_channels((1..=count).map(|i| format!("band_{i}")))
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn width(&self) -> u32 {
        self.bounds.width
    }

    pub fn height(&self) -> u32 {
        self.bounds.height
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == name)
    }
}

/// An input slot bound to a producer's output.
#[derive(Clone)]
pub struct BoundSource {
    pub role: String,
    pub image: Arc<RasterImage>,
}

impl fmt::Debug for BoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSource")
            .field("role", &self.role)
            .field("image", &self.image.producer())
            .finish()
    }
}

/// Lazy, tile-addressable output of a transform.
pub struct RasterImage {
    key: u64,
    producer: String,
    output: usize,
    info: RasterInfo,
    transform: Arc<dyn Transform>,
    sources: Arc<[BoundSource]>,
}

impl RasterImage {
    /// Wrap output `output` of an initialized transform.
    pub fn new(
        producer: impl Into<String>,
        output: usize,
        info: RasterInfo,
        transform: Arc<dyn Transform>,
        sources: Arc<[BoundSource]>,
    ) -> Self {
        Self {
            key: NEXT_IMAGE_KEY.fetch_add(1, Ordering::Relaxed),
            producer: producer.into(),
            output,
            info,
            transform,
            sources,
        }
    }

    /// Initialize a source-less transform and wrap its primary output.
    ///
    /// This is how callers supply external inputs, e.g. a reader for a file on disk.
    pub fn from_transform(
        name: impl Into<String>,
        mut transform: Box<dyn Transform>,
    ) -> TransformResult<Arc<RasterImage>> {
        let name = name.into();
        let info = transform
            .initialize()?
            .into_iter()
            .next()
            .ok_or_else(|| crate::TransformError::failed(format!("'{name}' has no output")))?;
        let transform: Arc<dyn Transform> = Arc::from(transform);
        Ok(Arc::new(RasterImage::new(name, 0, info, transform, Arc::from(Vec::new()))))
    }

    /// Unique cache key of this image.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Id of the node (or external source) producing this image.
    pub fn producer(&self) -> &str {
        &self.producer
    }

    /// Position of this image among the producer's outputs.
    pub fn output(&self) -> usize {
        self.output
    }

    pub fn info(&self) -> &RasterInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn bounds(&self) -> Rect {
        self.info.bounds
    }

    pub fn channel_count(&self) -> usize {
        self.info.channel_count()
    }

    pub fn transform(&self) -> &Arc<dyn Transform> {
        &self.transform
    }

    pub fn sources(&self) -> &[BoundSource] {
        &self.sources
    }

    /// Whether all channels of a tile are computed together.
    pub fn computes_tile_stack(&self) -> bool {
        self.transform.can_compute_tile_stack()
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("key", &self.key)
            .field("producer", &self.producer)
            .field("output", &self.output)
            .field("info", &self.info)
            .field("sources", &self.sources)
            .finish()
    }
}

/// Computed samples of one channel over a region, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    region: Rect,
    samples: Vec<f32>,
}

impl Tile {
    pub fn new(region: Rect, samples: Vec<f32>) -> Self {
        debug_assert_eq!(region.area(), samples.len());
        Self { region, samples }
    }

    /// Tile with every sample set to `value`.
    pub fn filled(region: Rect, value: f32) -> Self {
        Self {
            region,
            samples: vec![value; region.area()],
        }
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Sample at absolute pixel position `(x, y)`.
    pub fn sample(&self, x: u32, y: u32) -> Option<f32> {
        if !self.region.contains(x, y) {
            return None;
        }
        let col = (x - self.region.x) as usize;
        let row = (y - self.region.y) as usize;
        self.samples.get(row * self.region.width as usize + col).copied()
    }

    /// Copy the overlapping part of `other` into this tile.
    pub fn copy_from(&mut self, other: &Tile) {
        let Some(overlap) = self.region.intersection(&other.region) else {
            return;
        };
        let width = overlap.width as usize;
        for y in overlap.y..overlap.y + overlap.height {
            let src_row = (y - other.region.y) as usize * other.region.width as usize;
            let dst_row = (y - self.region.y) as usize * self.region.width as usize;
            let src_col = (overlap.x - other.region.x) as usize;
            let dst_col = (overlap.x - self.region.x) as usize;
            self.samples[dst_row + dst_col..dst_row + dst_col + width]
                .copy_from_slice(&other.samples[src_row + src_col..src_row + src_col + width]);
        }
    }
}
