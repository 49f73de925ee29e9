//! Uniform-grid spatial index
//!
//! Items live in a central arena; each grid cell holds indices into it.
//! Cells are keyed by integer grid coordinates and created on first insert,
//! so the index has no fixed extent and never rebalances. A range query
//! visits only the cells overlapped by the query envelope, which keeps its
//! cost proportional to the queried area rather than to the item count.

use speedfield_core::{Envelope, Error, Result};
use std::collections::HashMap;

/// Largest number of cells a single inserted item may cover
pub const MAX_ITEM_CELLS: u128 = 1 << 20;

/// Inclusive range of cell coordinates covered by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellSpan {
    min_col: i64,
    min_row: i64,
    max_col: i64,
    max_row: i64,
}

impl CellSpan {
    fn cell_count(&self) -> u128 {
        // spans of saturated coordinates overflow i64
        let cols = (self.max_col as i128 - self.min_col as i128) as u128 + 1;
        let rows = (self.max_row as i128 - self.min_row as i128) as u128 + 1;
        cols.saturating_mul(rows)
    }

    fn contains(&self, (col, row): (i64, i64)) -> bool {
        col >= self.min_col && col <= self.max_col && row >= self.min_row && row <= self.max_row
    }
}

/// A uniform hash grid over planar coordinates.
#[derive(Debug, Clone)]
pub struct GridIndex<T> {
    cell_width: f64,
    cell_height: f64,
    items: Vec<T>,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl<T> GridIndex<T> {
    /// Create an empty grid with the given cell size.
    pub fn new(cell_width: f64, cell_height: f64) -> Result<Self> {
        for (name, value) in [("cell_width", cell_width), ("cell_height", cell_height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "grid cell size must be positive and finite".to_string(),
                });
            }
        }
        Ok(Self {
            cell_width,
            cell_height,
            items: Vec::new(),
            cells: HashMap::new(),
        })
    }

    /// Number of items in the index
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_size(&self) -> (f64, f64) {
        (self.cell_width, self.cell_height)
    }

    /// Item stored under `index` (the value returned by [`insert`](Self::insert))
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// All items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Insert an item covering `envelope`.
    ///
    /// The item is registered in every cell the envelope overlaps. Returns the
    /// arena index of the item, or `None` (nothing stored) if the envelope has
    /// non-finite bounds or covers more than [`MAX_ITEM_CELLS`] cells.
    pub fn insert(&mut self, envelope: &Envelope, item: T) -> Option<usize> {
        let span = self.span_of(envelope)?;
        if span.cell_count() > MAX_ITEM_CELLS {
            return None;
        }
        let index = self.items.len();
        self.items.push(item);
        for row in span.min_row..=span.max_row {
            for col in span.min_col..=span.max_col {
                self.cells.entry((col, row)).or_default().push(index);
            }
        }
        Some(index)
    }

    /// Arena indices of all items whose cells overlap `envelope`.
    ///
    /// Results are unique and sorted in insertion order. They may include
    /// items whose own envelope does not touch the query envelope; callers
    /// filter by exact geometry.
    pub fn query_indices(&self, envelope: &Envelope) -> Vec<usize> {
        let Some(span) = self.span_of(envelope) else {
            return Vec::new();
        };

        let mut found: Vec<usize> = Vec::new();
        if span.cell_count() > self.cells.len() as u128 {
            // Query wider than the populated area: scan occupied cells instead
            for (_, bucket) in self.cells.iter().filter(|(key, _)| span.contains(**key)) {
                found.extend_from_slice(bucket);
            }
        } else {
            for row in span.min_row..=span.max_row {
                for col in span.min_col..=span.max_col {
                    if let Some(bucket) = self.cells.get(&(col, row)) {
                        found.extend_from_slice(bucket);
                    }
                }
            }
        }

        found.sort_unstable();
        found.dedup();
        found
    }

    /// All items whose cells overlap `envelope`, in insertion order
    pub fn query(&self, envelope: &Envelope) -> Vec<&T> {
        self.query_indices(envelope)
            .into_iter()
            .map(|i| &self.items[i])
            .collect()
    }

    fn span_of(&self, env: &Envelope) -> Option<CellSpan> {
        let bounds = [env.min_x, env.min_y, env.max_x, env.max_y];
        if bounds.iter().any(|v| !v.is_finite()) || env.min_x > env.max_x || env.min_y > env.max_y {
            return None;
        }
        Some(CellSpan {
            min_col: (env.min_x / self.cell_width).floor() as i64,
            min_row: (env.min_y / self.cell_height).floor() as i64,
            max_col: (env.max_x / self.cell_width).floor() as i64,
            max_row: (env.max_y / self.cell_height).floor() as i64,
        })
    }
}
