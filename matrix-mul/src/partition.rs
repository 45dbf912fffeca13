//! Row partitioning across ranks.

use std::ops::Range;

use rank_transport::Rank;

/// Half-open range of rows owned by one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Positions of these rows in a flat row-major buffer with `cols` columns.
    pub fn elements(&self, cols: usize) -> Range<usize> {
        self.start * cols..self.end * cols
    }
}

/// Rows per rank: `ceil(rows / rank_count)`.
pub fn chunk_size(rows: usize, rank_count: usize) -> usize {
    rows.div_ceil(rank_count)
}

/// Contiguous rows owned by `rank_id` when `rows` rows are split over
/// `rank_count` ranks.
///
/// Every rank gets `chunk_size` rows except at the tail, where ranges are
/// clamped to `rows`; trailing ranks may own nothing. Ranges for all ranks
/// tile `0..rows` in rank order.
pub fn plan(rows: usize, rank_count: usize, rank_id: Rank) -> RowRange {
    debug_assert!(rank_count >= 1, "a world has at least one rank");
    debug_assert!(rank_id < rank_count, "rank {rank_id} outside {rank_count}");

    let chunk = chunk_size(rows, rank_count);
    let start = (rank_id * chunk).min(rows);
    let end = ((rank_id + 1) * chunk).min(rows);
    RowRange { start, end }
}

/// Ranges for ranks `0..rank_count`, in rank order.
pub fn plan_all(rows: usize, rank_count: usize) -> Vec<RowRange> {
    (0..rank_count)
        .map(|rank| plan(rows, rank_count, rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(rows: usize, rank_count: usize) {
        let ranges = plan_all(rows, rank_count);
        assert_eq!(ranges.len(), rank_count);
        assert_eq!(ranges[0].start, 0, "rows {} ranks {}", rows, rank_count);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "rows {} ranks {}", rows, rank_count);
        }
        assert_eq!(ranges[rank_count - 1].end, rows);
        assert!(ranges.iter().all(|r| r.end >= r.start));
        assert!(ranges.iter().all(|r| r.len() <= chunk_size(rows, rank_count)));
    }

    #[test]
    fn ranges_tile_every_shape() {
        for rows in 0..40 {
            for rank_count in 1..=12 {
                assert_tiles(rows, rank_count);
            }
        }
    }

    #[test]
    fn chunk_size_rounds_up() {
        assert_eq!(chunk_size(4, 3), 2);
        assert_eq!(chunk_size(6, 3), 2);
        assert_eq!(chunk_size(7, 3), 3);
        assert_eq!(chunk_size(0, 5), 0);
        assert_eq!(chunk_size(3, 8), 1);
    }

    #[test]
    fn four_rows_over_three_ranks_uses_ceiling_chunks() {
        let ranges: Vec<_> = plan_all(4, 3).iter().map(RowRange::rows).collect();
        assert_eq!(ranges, vec![0..2, 2..4, 4..4]);
    }

    #[test]
    fn surplus_ranks_own_nothing() {
        let ranges = plan_all(2, 5);
        assert_eq!(ranges[0].rows(), 0..1);
        assert_eq!(ranges[1].rows(), 1..2);
        for range in &ranges[2..] {
            assert!(range.is_empty());
            assert_eq!(range.rows(), 2..2);
        }
    }

    #[test]
    fn single_rank_owns_everything() {
        assert_eq!(plan(9, 1, 0), RowRange { start: 0, end: 9 });
    }

    #[test]
    fn elements_scale_by_columns() {
        let range = plan(10, 3, 1);
        assert_eq!(range.rows(), 4..8);
        assert_eq!(range.elements(5), 20..40);
        assert_eq!(range.elements(0), 0..0);
    }
}
