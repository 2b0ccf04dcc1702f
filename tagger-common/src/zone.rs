//! Pitch zone geometry
//!
//! Maps a pointer position inside a rectangular pitch surface to a cell of a
//! `rows x columns` grid. Zones are numbered row-major from the top-left:
//! `zone = row * columns + col`, both indices 0-based.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bounding box of the clickable pitch surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

/// Pointer position in the same coordinate space as [`Surface`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Grid partition of the pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: u32,
    columns: u32,
}

impl Grid {
    /// Both dimensions must be at least 1 and every zone index must fit `u32`
    pub fn new(rows: u32, columns: u32) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(Error::InvalidInput(format!(
                "Grid needs at least one row and one column (got {}x{})",
                rows, columns
            )));
        }
        if rows.checked_mul(columns).is_none() {
            return Err(Error::InvalidInput(format!(
                "Grid {}x{} has too many zones",
                rows, columns
            )));
        }
        Ok(Self { rows, columns })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn zone_count(&self) -> u32 {
        self.rows * self.columns
    }

    /// Zone index of a cell, `None` if the cell is outside the grid
    pub fn zone_at(&self, row: u32, col: u32) -> Option<u32> {
        (row < self.rows && col < self.columns).then(|| row * self.columns + col)
    }

    /// `(row, col)` of a zone index
    pub fn cell_of(&self, zone: u32) -> Option<(u32, u32)> {
        (zone < self.zone_count()).then(|| (zone / self.columns, zone % self.columns))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            rows: crate::model::DEFAULT_GRID_ROWS,
            columns: crate::model::DEFAULT_GRID_COLUMNS,
        }
    }
}

/// Compute the zone under `point`
///
/// Returns `None` ("no selection") when the point lies outside the surface,
/// including the exact right/bottom edge, or when the geometry is degenerate.
/// Out-of-range indices are never clamped.
pub fn select_zone(surface: Surface, point: Point, grid: Grid) -> Option<u32> {
    let values = [
        surface.left,
        surface.top,
        surface.width,
        surface.height,
        point.x,
        point.y,
    ];
    if values.iter().any(|v| !v.is_finite()) || surface.width <= 0.0 || surface.height <= 0.0 {
        return None;
    }

    let col_width = surface.width / grid.columns as f64;
    let row_height = surface.height / grid.rows as f64;

    let col = ((point.x - surface.left) / col_width).floor();
    let row = ((point.y - surface.top) / row_height).floor();

    if col < 0.0 || row < 0.0 || col >= grid.columns as f64 || row >= grid.rows as f64 {
        return None;
    }

    grid.zone_at(row as u32, col as u32)
}

/// Currently selected zone
///
/// Each click recomputes and overwrites the selection; clicking the selected
/// zone again does not toggle it off. The selection is cleared externally
/// after an event is saved and on reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneSelection {
    selected: Option<u32>,
}

impl ZoneSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the selection from a click; returns the new selection
    pub fn click(&mut self, surface: Surface, point: Point, grid: Grid) -> Option<u32> {
        self.selected = select_zone(surface, point, grid);
        self.selected
    }

    /// Select a zone by index; indices outside the grid clear the selection
    pub fn select(&mut self, zone: u32, grid: Grid) -> Option<u32> {
        self.selected = grid.cell_of(zone).map(|_| zone);
        self.selected
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}
