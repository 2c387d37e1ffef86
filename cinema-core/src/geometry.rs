//! Grid geometry (C1): Manhattan distance, heatmap construction, and
//! safe-block enumeration.
//!
//! This module is pure — no I/O, no async — so it is exercised directly
//! with `proptest` rather than through the coordinator.

use crate::error::GeometryError;
use crate::model::SeatCoord;
use std::collections::HashSet;

/// A boolean grid marking cells that are reserved or within the
/// exclusion radius of a reserved cell.
///
/// `heatmap[r][c] == true` means placing a new seat at `(r, c)` would
/// violate I1 (already reserved) or I2 (too close to a reserved seat).
#[derive(Debug, Clone)]
pub struct Heatmap {
    rows: i32,
    columns: i32,
    unsafe_cells: Vec<Vec<bool>>,
}

impl Heatmap {
    /// Build a heatmap for a `rows` x `columns` grid given the set of
    /// already-reserved cells and the cinema's `min_distance`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::EmptyGrid`] if `rows` or `columns` is
    /// not positive.
    pub fn build(
        rows: i32,
        columns: i32,
        min_distance: i32,
        reserved: &[SeatCoord],
    ) -> Result<Self, GeometryError> {
        if rows <= 0 || columns <= 0 {
            return Err(GeometryError::EmptyGrid { rows, columns });
        }

        #[allow(clippy::cast_sign_loss)]
        let mut unsafe_cells = vec![vec![false; columns as usize]; rows as usize];

        // Mark (r, c) unsafe iff it equals a reserved cell or its
        // distance to one is below min_distance.
        for &reserved_cell in reserved {
            #[allow(clippy::cast_sign_loss)]
            let (r0, c0) = (reserved_cell.row, reserved_cell.column);
            for r in 0..rows {
                for c in 0..columns {
                    let candidate = SeatCoord::new(r, c);
                    let d = candidate.manhattan_distance(reserved_cell);
                    let marks_unsafe = d < min_distance || (r, c) == (r0, c0);
                    if marks_unsafe {
                        #[allow(clippy::cast_sign_loss)]
                        {
                            unsafe_cells[r as usize][c as usize] = true;
                        }
                    }
                }
            }
        }

        Ok(Self {
            rows,
            columns,
            unsafe_cells,
        })
    }

    /// Whether `(row, column)` is unsafe. Out-of-bounds coordinates are
    /// always unsafe (cannot be placed).
    #[must_use]
    pub fn is_unsafe(&self, row: i32, column: i32) -> bool {
        if row < 0 || column < 0 || row >= self.rows || column >= self.columns {
            return true;
        }
        #[allow(clippy::cast_sign_loss)]
        self.unsafe_cells[row as usize][column as usize]
    }

    /// Whether `(row, column)` is within the grid bounds (ignoring
    /// reservation state).
    #[must_use]
    pub const fn in_bounds(&self, row: i32, column: i32) -> bool {
        row >= 0 && column >= 0 && row < self.rows && column < self.columns
    }

    /// Enumerate every horizontal run of `group_size` consecutive seats
    /// with no unsafe cell, in row-major order. Overlapping windows may
    /// both be returned; that is intentional.
    ///
    /// Returns an empty vec if `group_size > columns` or `group_size < 1`.
    #[must_use]
    pub fn safe_blocks(&self, group_size: i32) -> Vec<Vec<SeatCoord>> {
        if group_size < 1 || group_size > self.columns {
            return Vec::new();
        }

        let mut blocks = Vec::new();
        for r in 0..self.rows {
            for c in 0..=(self.columns - group_size) {
                let window: Vec<SeatCoord> = (c..c + group_size).map(|cc| SeatCoord::new(r, cc)).collect();
                if window.iter().all(|seat| !self.is_unsafe(seat.row, seat.column)) {
                    blocks.push(window);
                }
            }
        }
        blocks
    }

    /// Filter `candidates` down to the subset that is not unsafe.
    /// Out-of-bounds candidates are silently dropped.
    #[must_use]
    pub fn filter_available(&self, candidates: &[SeatCoord]) -> Vec<SeatCoord> {
        candidates
            .iter()
            .copied()
            .filter(|seat| self.in_bounds(seat.row, seat.column) && !self.is_unsafe(seat.row, seat.column))
            .collect()
    }
}

/// Manhattan distance between two coordinates.
#[must_use]
pub const fn manhattan_distance(a: SeatCoord, b: SeatCoord) -> i32 {
    a.manhattan_distance(b)
}

/// Check whether a claim batch is internally compatible and compatible
/// with the existing members, returning the offending coordinates
/// (drawn from `batch`) if not.
///
/// This is the in-process mirror of the distance check the fast index
/// performs atomically; it is used by in-memory test doubles and by
/// callers wanting to pre-validate before round-tripping to Redis.
#[must_use]
pub fn violates_min_distance(existing: &[SeatCoord], batch: &[SeatCoord], min_distance: i32) -> bool {
    if min_distance <= 0 {
        return false;
    }

    let existing_set: HashSet<SeatCoord> = existing.iter().copied().collect();

    for (i, &a) in batch.iter().enumerate() {
        for &b in existing.iter() {
            if a.manhattan_distance(b) < min_distance {
                return true;
            }
        }
        for &b in &batch[i + 1..] {
            if a.manhattan_distance(b) < min_distance {
                return true;
            }
        }
        // A batch seat landing exactly on an existing member is a
        // conflict, not a distance violation; callers check conflicts
        // separately, but this guards against accidental double count.
        let _ = existing_set.contains(&a);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_basic() {
        assert_eq!(manhattan_distance(SeatCoord::new(0, 0), SeatCoord::new(3, 4)), 7);
        assert_eq!(manhattan_distance(SeatCoord::new(2, 2), SeatCoord::new(2, 2)), 0);
    }

    #[test]
    fn empty_grid_rejected() {
        let result = Heatmap::build(0, 5, 1, &[]);
        assert!(matches!(result, Err(GeometryError::EmptyGrid { .. })));
    }

    #[test]
    fn heatmap_marks_reserved_cell_unsafe_even_at_min_distance_zero() {
        let heatmap = Heatmap::build(3, 3, 0, &[SeatCoord::new(1, 1)]).unwrap();
        assert!(heatmap.is_unsafe(1, 1));
        assert!(!heatmap.is_unsafe(0, 0));
        assert!(!heatmap.is_unsafe(1, 0));
    }

    #[test]
    fn heatmap_exclusion_radius() {
        let heatmap = Heatmap::build(5, 5, 2, &[SeatCoord::new(2, 2)]).unwrap();
        // distance 1 neighbors are unsafe (< 2)
        assert!(heatmap.is_unsafe(2, 1));
        assert!(heatmap.is_unsafe(1, 2));
        // distance 2 neighbors are safe
        assert!(!heatmap.is_unsafe(2, 0));
        assert!(!heatmap.is_unsafe(0, 2));
    }

    #[test]
    fn safe_blocks_group_size_exceeds_columns_is_empty() {
        let heatmap = Heatmap::build(2, 3, 0, &[]).unwrap();
        assert!(heatmap.safe_blocks(4).is_empty());
    }

    #[test]
    fn safe_blocks_row_major_order() {
        let heatmap = Heatmap::build(2, 4, 0, &[]).unwrap();
        let blocks = heatmap.safe_blocks(2);
        // row 0 windows before row 1 windows
        assert_eq!(blocks[0][0], SeatCoord::new(0, 0));
        assert_eq!(blocks.last().unwrap()[0].row, 1);
    }

    #[test]
    fn filter_available_drops_out_of_bounds_silently() {
        let heatmap = Heatmap::build(2, 2, 0, &[]).unwrap();
        let candidates = [SeatCoord::new(0, 0), SeatCoord::new(5, 5), SeatCoord::new(-1, 0)];
        let available = heatmap.filter_available(&candidates);
        assert_eq!(available, vec![SeatCoord::new(0, 0)]);
    }

    #[test]
    fn violates_min_distance_zero_always_false() {
        let batch = [SeatCoord::new(0, 0), SeatCoord::new(0, 0)];
        assert!(!violates_min_distance(&[], &batch, 0));
    }

    #[test]
    fn violates_min_distance_detects_internal_conflict() {
        let batch = [SeatCoord::new(3, 3), SeatCoord::new(3, 4)];
        assert!(violates_min_distance(&[], &batch, 2));
    }

    proptest::proptest! {
        #[test]
        fn heatmap_never_marks_far_cells_unsafe(
            rows in 1i32..20,
            columns in 1i32..20,
            min_distance in 0i32..10,
            r0 in 0i32..20,
            c0 in 0i32..20,
        ) {
            let r0 = r0 % rows;
            let c0 = c0 % columns;
            let heatmap = Heatmap::build(rows, columns, min_distance, &[SeatCoord::new(r0, c0)]).unwrap();
            for r in 0..rows {
                for c in 0..columns {
                    let d = SeatCoord::new(r, c).manhattan_distance(SeatCoord::new(r0, c0));
                    if d >= min_distance && (r, c) != (r0, c0) {
                        prop_assert!(!heatmap.is_unsafe(r, c));
                    }
                }
            }
        }
    }
}
