// engine_core/src/tiles/tile.rs
use crate::constants::MAX_GRID_SIDE;
use crate::error::TileError;
use serde::{Deserialize, Serialize};

/// One occupied cell of a tile grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Base index; also selects the autotile rule set.
    pub index: u32,
    #[serde(default)]
    pub collision: bool,
    #[serde(default)]
    pub height: f32,
    /// Atlas frame picked by the autotiler. `None` until computed.
    #[serde(skip)]
    pub frame: Option<u32>,
}

impl Tile {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            collision: false,
            height: 0.0,
            frame: None,
        }
    }

    pub fn solid(index: u32) -> Self {
        Self {
            collision: true,
            ..Self::new(index)
        }
    }
}

/// Dense `width × height` array of optional tiles, row major.
///
/// Persisted sparsely: only occupied cells are written, each with its
/// coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredGrid", into = "StoredGrid")]
pub struct TileGrid {
    width: usize,
    height: usize,
    cells: Vec<Option<Tile>>,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl TileGrid {
    /// Sides above `MAX_GRID_SIDE` are clamped.
    pub fn new(width: usize, height: usize) -> Self {
        if check_size(width, height).is_err() {
            log::warn!("Clamping {width}x{height} tile grid to {MAX_GRID_SIDE} cells per side.");
        }
        let width = width.min(MAX_GRID_SIDE);
        let height = height.min(MAX_GRID_SIDE);
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Flat index of `(x, y)`, or `None` when it lies outside the grid.
    fn slot(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.slot(x, y).is_some()
    }

    /// Retrieve a tile, returning `None` for empty or out of range cells.
    pub fn get(&self, x: i32, y: i32) -> Option<&Tile> {
        self.slot(x, y).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        self.slot(x, y).and_then(move |i| self.cells[i].as_mut())
    }

    /// Stores `tile` at `(x, y)`. Returns `false` when out of range.
    pub fn set(&mut self, x: i32, y: i32, tile: Tile) -> bool {
        match self.slot(x, y) {
            Some(i) => {
                self.cells[i] = Some(tile);
                true
            }
            None => false,
        }
    }

    /// Empties `(x, y)` and returns what was there.
    pub fn clear(&mut self, x: i32, y: i32) -> Option<Tile> {
        self.slot(x, y).and_then(|i| self.cells[i].take())
    }

    /// Changes the size, keeping the cells that still fit. Oversized
    /// requests leave the grid untouched.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), TileError> {
        check_size(width, height)?;
        let mut cells = vec![None; width * height];
        for y in 0..self.height.min(height) {
            for x in 0..self.width.min(width) {
                cells[y * width + x] = self.cells[y * self.width + x].take();
            }
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
        Ok(())
    }

    /// Occupied cells with their coordinates, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &Tile)> {
        let width = self.width.max(1);
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.as_ref()
                .map(|tile| ((i % width) as i32, (i / width) as i32, tile))
        })
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCell {
    x: usize,
    y: usize,
    #[serde(flatten)]
    tile: Tile,
}

#[derive(Serialize, Deserialize)]
struct StoredGrid {
    width: usize,
    height: usize,
    #[serde(default)]
    cells: Vec<StoredCell>,
}

fn check_size(width: usize, height: usize) -> Result<(), TileError> {
    if width > MAX_GRID_SIDE || height > MAX_GRID_SIDE {
        return Err(TileError::GridTooLarge {
            width,
            height,
            max: MAX_GRID_SIDE,
        });
    }
    Ok(())
}

impl TryFrom<StoredGrid> for TileGrid {
    type Error = TileError;

    fn try_from(stored: StoredGrid) -> Result<Self, Self::Error> {
        check_size(stored.width, stored.height)?;
        let mut grid = TileGrid::new(stored.width, stored.height);
        for cell in stored.cells {
            if cell.x >= stored.width || cell.y >= stored.height {
                log::warn!(
                    "Dropping tile at ({}, {}) outside the {}x{} grid.",
                    cell.x,
                    cell.y,
                    stored.width,
                    stored.height
                );
                continue;
            }
            grid.cells[cell.y * stored.width + cell.x] = Some(cell.tile);
        }
        Ok(grid)
    }
}

impl From<TileGrid> for StoredGrid {
    fn from(grid: TileGrid) -> Self {
        let cells = grid
            .iter()
            .map(|(x, y, tile)| StoredCell {
                x: x as usize,
                y: y as usize,
                tile: *tile,
            })
            .collect();
        StoredGrid {
            width: grid.width,
            height: grid.height,
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_out_of_bounds_access_is_a_no_op() {
        let mut grid = TileGrid::new(3, 2);

        assert!(!grid.set(-1, 0, Tile::new(1)));
        assert!(!grid.set(3, 0, Tile::new(1)));
        assert!(!grid.set(0, 2, Tile::new(1)));
        assert!(grid.get(5, 5).is_none());
        assert!(grid.clear(-3, 1).is_none());
        assert_eq!(grid.occupied(), 0);
    }

    #[test]
    fn test_resize_keeps_overlapping_cells() {
        let mut grid = TileGrid::new(4, 4);
        grid.set(1, 1, Tile::new(1));
        grid.set(3, 3, Tile::new(2));

        grid.resize(2, 5).unwrap();

        assert_eq!(grid.get(1, 1).map(|t| t.index), Some(1));
        assert!(grid.get(3, 3).is_none());
        assert_eq!(grid.occupied(), 1);
        assert_eq!((grid.width(), grid.height()), (2, 5));
    }

    #[test]
    fn test_oversized_grids_are_rejected() {
        let huge = json!({"width": 4611686018427387904u64, "height": 4, "cells": []});
        assert!(serde_json::from_value::<TileGrid>(huge).is_err());

        let wide = json!({"width": MAX_GRID_SIDE + 1, "height": 0});
        assert!(serde_json::from_value::<TileGrid>(wide).is_err());

        let mut grid = TileGrid::new(2, 2);
        grid.set(1, 1, Tile::new(3));
        let err = grid.resize(usize::MAX, 2).unwrap_err();
        assert!(matches!(err, TileError::GridTooLarge { .. }));
        assert_eq!((grid.width(), grid.height()), (2, 2));
        assert_eq!(grid.get(1, 1).map(|t| t.index), Some(3));

        let clamped = TileGrid::new(usize::MAX, 1);
        assert_eq!((clamped.width(), clamped.height()), (MAX_GRID_SIDE, 1));
    }

    #[test]
    fn test_grid_is_stored_sparsely() {
        let mut grid = TileGrid::new(8, 8);
        grid.set(2, 3, Tile::solid(5));

        let value = serde_json::to_value(&grid).unwrap();
        assert_eq!(
            value,
            json!({
                "width": 8,
                "height": 8,
                "cells": [{"x": 2, "y": 3, "index": 5, "collision": true, "height": 0.0}]
            })
        );

        let back: TileGrid = serde_json::from_value(value).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn test_cells_outside_the_stored_size_are_dropped() {
        let grid: TileGrid = serde_json::from_value(json!({
            "width": 2,
            "height": 2,
            "cells": [{"x": 1, "y": 1, "index": 1}, {"x": 4, "y": 0, "index": 1}]
        }))
        .unwrap();

        assert_eq!(grid.occupied(), 1);
        assert!(!grid.get(1, 1).unwrap().collision);
    }
}
