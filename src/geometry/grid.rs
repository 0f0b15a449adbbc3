//! Uniform bucket grid over bounding boxes.
//!
//! Each box is registered in every cell its closed extent touches, so two
//! boxes for which `Box2D::does_intersect` holds always share a cell.

use crate::geometry::bbox::Box2D;
use std::ops::RangeInclusive;

/// Upper bound on cells per axis; the cell size grows to respect it.
const MAX_CELLS_PER_AXIS: i64 = 512;

pub(crate) struct BucketGrid {
    x0: i64,
    y0: i64,
    cell: i64,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl BucketGrid {
    /// Builds a grid over `boxes`, registering box `i` under index `i`.
    pub(crate) fn build(boxes: &[Box2D], cell: i64) -> Self {
        let mut grid = Self {
            x0: 0,
            y0: 0,
            cell: cell.max(1),
            cols: 0,
            rows: 0,
            cells: Vec::new(),
        };
        let Some(first) = boxes.first() else {
            return grid;
        };
        let (mut x0, mut x1, mut y0, mut y1) = (first.xmin(), first.xmax(), first.ymin(), first.ymax());
        for b in &boxes[1..] {
            x0 = x0.min(b.xmin());
            x1 = x1.max(b.xmax());
            y0 = y0.min(b.ymin());
            y1 = y1.max(b.ymax());
        }
        let span = (x1 - x0).max(y1 - y0) + 1;
        grid.cell = grid.cell.max((span + MAX_CELLS_PER_AXIS - 1) / MAX_CELLS_PER_AXIS);
        grid.x0 = x0;
        grid.y0 = y0;
        grid.cols = ((x1 - x0) / grid.cell + 1) as usize;
        grid.rows = ((y1 - y0) / grid.cell + 1) as usize;
        grid.cells = vec![Vec::new(); grid.cols * grid.rows];
        for (idx, b) in boxes.iter().enumerate() {
            for row in grid.span(b.ymin(), b.ymax(), grid.y0, grid.rows) {
                for col in grid.span(b.xmin(), b.xmax(), grid.x0, grid.cols) {
                    grid.cells[row * grid.cols + col].push(idx);
                }
            }
        }
        grid
    }

    fn span(&self, lo: i64, hi: i64, origin: i64, len: usize) -> RangeInclusive<usize> {
        let last = len as i64 - 1;
        let a = ((lo - origin).div_euclid(self.cell)).clamp(0, last);
        let b = ((hi - origin).div_euclid(self.cell)).clamp(0, last);
        a as usize..=b as usize
    }

    /// Calls `f` with every index registered in a cell touched by `b`.
    ///
    /// An index can be reported once per shared cell; callers dedupe.
    pub(crate) fn for_each_near(&self, b: &Box2D, mut f: impl FnMut(usize)) {
        if self.cells.is_empty() {
            return;
        }
        for row in self.span(b.ymin(), b.ymax(), self.y0, self.rows) {
            for col in self.span(b.xmin(), b.xmax(), self.x0, self.cols) {
                for &idx in &self.cells[row * self.cols + col] {
                    f(idx);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BucketGrid;
    use crate::geometry::bbox::Box2D;

    #[test]
    fn touching_boxes_share_a_cell() {
        let boxes = [
            Box2D::new(0, 8, 0, 8).unwrap(),
            Box2D::new(8, 16, 0, 8).unwrap(),
            Box2D::new(40, 48, 40, 48).unwrap(),
        ];
        let grid = BucketGrid::build(&boxes, 8);
        let mut near = Vec::new();
        grid.for_each_near(&boxes[0], |i| near.push(i));
        near.sort_unstable();
        near.dedup();
        assert_eq!(near, vec![0, 1]);
    }

    #[test]
    fn empty_grid_reports_nothing() {
        let grid = BucketGrid::build(&[], 8);
        let b = Box2D::new(0, 1, 0, 1).unwrap();
        let mut count = 0;
        grid.for_each_near(&b, |_| count += 1);
        assert_eq!(count, 0);
    }
}
