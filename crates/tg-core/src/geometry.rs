//! Pixel-space rectangles and tile grids.
//!
//! All coordinates are non-negative pixel positions; a raster's bounds normally
//! start at the origin and span its width and height.

use core::fmt;

use crate::error::{TgError, TgResult};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && (x as u64) < self.right() && y >= self.y && (y as u64) < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Overlapping part of two rectangles, `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if (x0 as u64) >= x1 || (y0 as u64) >= y1 {
            return None;
        }
        Some(Rect::new(x0, y0, (x1 - x0 as u64) as u32, (y1 - y0 as u64) as u32))
    }

    /// Smallest rectangle containing both. Empty rectangles do not contribute.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, (x1 - x0 as u64) as u32, (y1 - y0 as u64) as u32)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Width and height of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub fn new(width: u32, height: u32) -> TgResult<Self> {
        if width == 0 || height == 0 {
            return Err(TgError::InvalidTileSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn square(size: u32) -> TgResult<Self> {
        Self::new(size, size)
    }

    /// Region of tile `(tile_x, tile_y)` in a grid anchored at the pixel origin.
    pub fn tile_rect(&self, tile_x: u32, tile_y: u32) -> Rect {
        Rect::new(
            tile_x.saturating_mul(self.width),
            tile_y.saturating_mul(self.height),
            self.width,
            self.height,
        )
    }

    /// Tile indices (origin-anchored grid) of every tile touching `region`, row-major.
    pub fn tiles_covering(&self, region: &Rect) -> Vec<(u32, u32)> {
        if region.is_empty() {
            return Vec::new();
        }
        let tx0 = region.x / self.width;
        let ty0 = region.y / self.height;
        let tx1 = ((region.right() - 1) / self.width as u64) as u32;
        let ty1 = ((region.bottom() - 1) / self.height as u64) as u32;
        let mut out = Vec::with_capacity(((tx1 - tx0 + 1) * (ty1 - ty0 + 1)) as usize);
        for ty in ty0..=ty1 {
            for tx in tx0..=tx1 {
                out.push((tx, ty));
            }
        }
        out
    }
}

/// A fixed-size partition of a rectangle into tiles, anchored at the rectangle's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    bounds: Rect,
    tile_size: TileSize,
    columns: u32,
    rows: u32,
}

impl TileGrid {
    pub fn new(bounds: Rect, tile_size: TileSize) -> Self {
        let columns = bounds.width.div_ceil(tile_size.width);
        let rows = bounds.height.div_ceil(tile_size.height);
        Self {
            bounds,
            tile_size,
            columns,
            rows,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of grid cells.
    pub fn tile_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Region of grid cell `(column, row)`, clipped to the grid bounds.
    pub fn cell_rect(&self, column: u32, row: u32) -> Option<Rect> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let cell = Rect::new(
            self.bounds.x + column * self.tile_size.width,
            self.bounds.y + row * self.tile_size.height,
            self.tile_size.width,
            self.tile_size.height,
        );
        cell.intersection(&self.bounds)
    }

    /// Iterate `(column, row, region)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, Rect)> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns)
                .filter_map(move |column| self.cell_rect(column, row).map(|r| (column, row, r)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_and_union() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 200, 200);
        assert_eq!(a.intersection(&b), Some(Rect::new(50, 50, 50, 50)));
        assert_eq!(a.union(&b), Rect::new(0, 0, 250, 250));

        let c = Rect::new(100, 0, 10, 10);
        assert!(!a.intersects(&c));
        assert!(a.union(&Rect::default()) == a);
    }

    #[test]
    fn zero_tile_size_rejected() {
        assert!(TileSize::new(0, 64).is_err());
        assert!(TileSize::square(64).is_ok());
    }

    #[test]
    fn grid_cells_are_row_major_and_clipped() {
        let grid = TileGrid::new(Rect::from_size(250, 250), TileSize::square(64).unwrap());
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.rows(), 4);
        assert_eq!(grid.tile_count(), 16);

        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(cells.len(), 16);
        assert_eq!(cells[0], (0, 0, Rect::new(0, 0, 64, 64)));
        assert_eq!(cells[1].0, 1);
        assert_eq!(cells[4].1, 1);
        assert_eq!(cells[15].2, Rect::new(192, 192, 58, 58));
    }

    #[test]
    fn tiles_covering_region() {
        let ts = TileSize::square(64).unwrap();
        assert_eq!(ts.tiles_covering(&Rect::new(0, 0, 64, 64)), vec![(0, 0)]);
        assert_eq!(
            ts.tiles_covering(&Rect::new(60, 0, 10, 1)),
            vec![(0, 0), (1, 0)]
        );
        assert!(ts.tiles_covering(&Rect::default()).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn grid_cells_cover_bounds_exactly(w in 1_u32..600, h in 1_u32..600, t in 1_u32..128) {
            let grid = TileGrid::new(Rect::from_size(w, h), TileSize::square(t).unwrap());
            let covered: usize = grid.cells().map(|(_, _, r)| r.area()).sum();
            prop_assert_eq!(covered, w as usize * h as usize);
            prop_assert_eq!(grid.cells().count(), grid.tile_count());
        }
    }
}
