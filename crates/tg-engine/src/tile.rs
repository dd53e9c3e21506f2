//! Tile engine boundary and the caching reference implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tg_core::timing::{AccumulatingTimer, Timer};
use tg_core::{Rect, TileSize};
use tracing::trace;

use crate::error::TileError;
use crate::raster::{RasterImage, Tile};
use crate::transform::{SourceTiles, TargetTile};

/// Default edge length of a square tile.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Lazy, pull-computed access to the pixels of raster images.
///
/// Tile indices address a grid of [`TileEngine::tile_size`] cells anchored at
/// the pixel origin.
pub trait TileEngine: Send + Sync {
    fn tile_size(&self) -> TileSize;

    /// Make sure tile `(tile_x, tile_y)` of `channel` is computed.
    fn force_tile(&self, image: &RasterImage, channel: usize, tile_x: u32, tile_y: u32) -> Result<(), TileError>;

    /// Pixels of `channel` over `rect`, pulling upstream tiles as needed.
    /// Pixels outside the image bounds read as zero.
    fn region(&self, image: &RasterImage, channel: usize, rect: Rect) -> Result<Tile, TileError>;

    /// Drop everything cached for `image`.
    fn release(&self, image: &RasterImage);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TileKey {
    image: u64,
    channel: usize,
    tile_x: u32,
    tile_y: u32,
}

/// Snapshot of cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TileCacheStats {
    pub cached_tiles: usize,
    pub computed_tiles: u64,
    pub compute_seconds: f64,
}

/// Tile engine computing tiles on first demand and caching them per
/// image, channel and tile index.
pub struct CachingTileEngine {
    tile_size: TileSize,
    cache: Mutex<HashMap<TileKey, Arc<Tile>>>,
    computed: AtomicU64,
    compute_time: AccumulatingTimer,
}

impl Default for CachingTileEngine {
    fn default() -> Self {
        Self::new(TileSize {
            width: DEFAULT_TILE_SIZE,
            height: DEFAULT_TILE_SIZE,
        })
    }
}

impl CachingTileEngine {
    pub fn new(tile_size: TileSize) -> Self {
        Self {
            tile_size,
            cache: Mutex::new(HashMap::new()),
            computed: AtomicU64::new(0),
            compute_time: AccumulatingTimer::new(),
        }
    }

    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            cached_tiles: self.lock().len(),
            computed_tiles: self.computed.load(Ordering::Relaxed),
            compute_seconds: self.compute_time.total_seconds(),
        }
    }

    /// Number of tile computations performed, counting a stack as one.
    pub fn computed_tiles(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }

    pub fn cached_tiles(&self) -> usize {
        self.lock().len()
    }

    /// Whether a tile is currently cached.
    pub fn is_cached(&self, image: &RasterImage, channel: usize, tile_x: u32, tile_y: u32) -> bool {
        self.lock().contains_key(&TileKey {
            image: image.key(),
            channel,
            tile_x,
            tile_y,
        })
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.compute_time.reset();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TileKey, Arc<Tile>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached tile, computing it (and its upstream tiles) on a miss.
    pub fn tile(&self, image: &RasterImage, channel: usize, tile_x: u32, tile_y: u32) -> Result<Arc<Tile>, TileError> {
        let count = image.channel_count();
        if channel >= count {
            return Err(TileError::ChannelOutOfRange {
                producer: image.producer().to_string(),
                channel,
                count,
            });
        }
        let key = TileKey {
            image: image.key(),
            channel,
            tile_x,
            tile_y,
        };
        if let Some(tile) = self.lock().get(&key) {
            return Ok(Arc::clone(tile));
        }

        let region = self
            .tile_size
            .tile_rect(tile_x, tile_y)
            .intersection(&image.bounds())
            .ok_or_else(|| TileError::OutOfBounds {
                producer: image.producer().to_string(),
                tile_x,
                tile_y,
            })?;

        // The cache lock is released here; computing pulls upstream tiles through `self`.
        let sources = SourceTiles::new(self, image.sources());
        let timer = Timer::start("tile");
        let compute_err = |source| TileError::Compute {
            producer: image.producer().to_string(),
            tile_x,
            tile_y,
            source,
        };

        let computed: Vec<(usize, Tile)> = if image.computes_tile_stack() {
            let stack = image
                .transform()
                .compute_tile_stack(image.output(), count, region, &sources)
                .map_err(compute_err)?;
            if stack.len() != count {
                return Err(TileError::SampleCount {
                    producer: image.producer().to_string(),
                    expected: count,
                    actual: stack.len(),
                });
            }
            stack
                .into_iter()
                .enumerate()
                .map(|(c, samples)| self.checked_tile(image, region, samples).map(|t| (c, t)))
                .collect::<Result<_, _>>()?
        } else {
            let target = TargetTile {
                output: image.output(),
                channel,
                region,
            };
            let samples = image.transform().compute_tile(&target, &sources).map_err(compute_err)?;
            vec![(channel, self.checked_tile(image, region, samples)?)]
        };

        if let Some(elapsed) = timer.stop() {
            self.compute_time.record(elapsed);
        }
        self.computed.fetch_add(1, Ordering::Relaxed);
        trace!(producer = image.producer(), tile_x, tile_y, channels = computed.len(), "computed tile");

        let mut cache = self.lock();
        let mut requested = None;
        for (c, tile) in computed {
            let tile = Arc::new(tile);
            if c == channel {
                requested = Some(Arc::clone(&tile));
            }
            cache.insert(TileKey { channel: c, ..key }, tile);
        }
        requested.ok_or(TileError::ChannelOutOfRange {
            producer: image.producer().to_string(),
            channel,
            count,
        })
    }

    fn checked_tile(&self, image: &RasterImage, region: Rect, samples: Vec<f32>) -> Result<Tile, TileError> {
        if samples.len() != region.area() {
            return Err(TileError::SampleCount {
                producer: image.producer().to_string(),
                expected: region.area(),
                actual: samples.len(),
            });
        }
        Ok(Tile::new(region, samples))
    }
}

impl TileEngine for CachingTileEngine {
    fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    fn force_tile(&self, image: &RasterImage, channel: usize, tile_x: u32, tile_y: u32) -> Result<(), TileError> {
        self.tile(image, channel, tile_x, tile_y).map(|_| ())
    }

    fn region(&self, image: &RasterImage, channel: usize, rect: Rect) -> Result<Tile, TileError> {
        let mut out = Tile::filled(rect, 0.0);
        let Some(inside) = rect.intersection(&image.bounds()) else {
            return Ok(out);
        };
        for (tile_x, tile_y) in self.tile_size.tiles_covering(&inside) {
            let tile = self.tile(image, channel, tile_x, tile_y)?;
            out.copy_from(&tile);
        }
        Ok(out)
    }

    fn release(&self, image: &RasterImage) {
        let key = image.key();
        self.lock().retain(|k, _| k.image != key);
    }
}

impl std::fmt::Debug for CachingTileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingTileEngine")
            .field("tile_size", &self.tile_size)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{ConstantTransform, RampTransform};

    fn engine(size: u32) -> CachingTileEngine {
        CachingTileEngine::new(TileSize::square(size).unwrap())
    }

    #[test]
    fn tiles_are_computed_once() {
        let engine = engine(4);
        let image = RasterImage::from_transform("c", Box::new(ConstantTransform::new(10, 10, 2.0))).unwrap();
        engine.force_tile(&image, 0, 1, 1).unwrap();
        engine.force_tile(&image, 0, 1, 1).unwrap();
        assert_eq!(engine.computed_tiles(), 1);
        assert!(engine.is_cached(&image, 0, 1, 1));
    }

    #[test]
    fn edge_tiles_are_clipped() {
        let engine = engine(4);
        let image = RasterImage::from_transform("c", Box::new(ConstantTransform::new(10, 10, 2.0))).unwrap();
        let tile = engine.tile(&image, 0, 2, 2).unwrap();
        assert_eq!(tile.region(), Rect::new(8, 8, 2, 2));
    }

    #[test]
    fn out_of_bounds_tile_is_a_fault() {
        let engine = engine(4);
        let image = RasterImage::from_transform("c", Box::new(ConstantTransform::new(4, 4, 2.0))).unwrap();
        let err = engine.force_tile(&image, 0, 5, 0).unwrap_err();
        assert!(matches!(err, TileError::OutOfBounds { tile_x: 5, .. }));
        let err = engine.force_tile(&image, 3, 0, 0).unwrap_err();
        assert!(matches!(err, TileError::ChannelOutOfRange { channel: 3, .. }));
    }

    #[test]
    fn region_spans_tiles_and_pads_outside() {
        let engine = engine(4);
        let image = RasterImage::from_transform("r", Box::new(RampTransform::new(8, 8))).unwrap();
        let region = engine.region(&image, 0, Rect::new(3, 0, 6, 1)).unwrap();
        assert_eq!(region.samples(), &[3.0, 4.0, 5.0, 6.0, 7.0, 0.0]);
        assert_eq!(engine.computed_tiles(), 2);
    }

    #[test]
    fn release_drops_cached_tiles() {
        let engine = engine(4);
        let image = RasterImage::from_transform("c", Box::new(ConstantTransform::new(8, 8, 1.0))).unwrap();
        engine.force_tile(&image, 0, 0, 0).unwrap();
        engine.force_tile(&image, 0, 1, 0).unwrap();
        assert_eq!(engine.cached_tiles(), 2);
        engine.release(&image);
        assert_eq!(engine.cached_tiles(), 0);
    }
}
