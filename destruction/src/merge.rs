//! Greedy box merging for static structure colliders.
//!
//! A structure's static collider is a set of cuboids. Instead of one cuboid per
//! block, each `(y, z)` row is scanned along X and every maximal run of
//! contiguous cells becomes a single box.
//!
//! Example: a 10-block wall one cell thick and one row high → 1 box.
//!
//! Boxes are expressed in grid space scaled to meters: the cell `(x, y, z)`
//! spans `[x, x+1] * cell_size` on X (same for Y/Z). Callers shift the offsets
//! into their own frame.

use std::collections::BTreeMap;

use crate::grid::GridCoord;
use crate::types::Vec3;

/// One cuboid of a merged collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergedBox {
    pub half_extents: Vec3,
    /// Box center, grid space times cell size.
    pub local_offset: Vec3,
}

impl MergedBox {
    /// Number of cells this box covers along X.
    #[inline]
    pub fn run_length(&self, cell_size: f32) -> usize {
        ((self.half_extents.x * 2.0) / cell_size).round() as usize
    }
}

/// Merge `blocks` into a minimal-per-row set of boxes that exactly covers them.
///
/// Duplicate coordinates are collapsed. Output order is deterministic: rows
/// ascending by `(y, z)`, runs ascending by X.
pub fn merge(blocks: &[GridCoord], cell_size: f32) -> Vec<MergedBox> {
    let mut rows: BTreeMap<(i32, i32), Vec<i32>> = BTreeMap::new();
    for b in blocks {
        rows.entry((b.y, b.z)).or_default().push(b.x);
    }

    let half = cell_size * 0.5;
    let mut boxes = Vec::new();

    for ((y, z), mut xs) in rows {
        xs.sort_unstable();
        xs.dedup();

        let mut start = xs[0];
        let mut prev = start;
        for &x in xs.iter().skip(1) {
            if x == prev + 1 {
                prev = x;
                continue;
            }
            boxes.push(run_box(start, prev, y, z, cell_size, half));
            start = x;
            prev = x;
        }
        boxes.push(run_box(start, prev, y, z, cell_size, half));
    }

    if boxes.is_empty() {
        return per_block(blocks, cell_size);
    }
    boxes
}

/// One box per block, no merging.
pub fn per_block(blocks: &[GridCoord], cell_size: f32) -> Vec<MergedBox> {
    let half = cell_size * 0.5;
    blocks
        .iter()
        .map(|b| run_box(b.x, b.x, b.y, b.z, cell_size, half))
        .collect()
}

#[inline]
fn run_box(start: i32, end: i32, y: i32, z: i32, cell_size: f32, half: f32) -> MergedBox {
    let len = (end - start + 1) as f32;
    MergedBox {
        half_extents: Vec3::new(len * half, half, half),
        local_offset: Vec3::new(
            (start as f32 + len * 0.5) * cell_size,
            (y as f32 + 0.5) * cell_size,
            (z as f32 + 0.5) * cell_size,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn volume(boxes: &[MergedBox]) -> f32 {
        boxes
            .iter()
            .map(|b| 8.0 * b.half_extents.x * b.half_extents.y * b.half_extents.z)
            .sum()
    }

    #[test]
    fn contiguous_row_is_one_box() {
        let row: Vec<_> = (0..10).map(|x| GridCoord::new(x, 2, -1)).collect();
        let boxes = merge(&row, 0.5);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].half_extents, Vec3::new(2.5, 0.25, 0.25));
        assert_eq!(boxes[0].local_offset, Vec3::new(2.5, 1.25, -0.25));
        assert_eq!(boxes[0].run_length(0.5), 10);
    }

    #[test]
    fn two_adjacent_cells_share_a_box() {
        let boxes = merge(&[GridCoord::new(0, 0, 0), GridCoord::new(1, 0, 0)], 0.6);
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].half_extents.x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn gapped_row_splits_into_runs() {
        let xs = [-3, -2, 0, 4, 5, 6];
        let row: Vec<_> = xs.iter().map(|&x| GridCoord::new(x, 0, 0)).collect();
        let boxes = merge(&row, 1.0);
        let runs: Vec<_> = boxes.iter().map(|b| b.run_length(1.0)).collect();
        assert_eq!(runs, vec![2, 1, 3]);
    }

    #[test]
    fn no_adjacent_blocks_yield_one_box_each() {
        let blocks: Vec<_> = (0..7).map(|i| GridCoord::new(i * 2, i % 3, 0)).collect();
        let boxes = merge(&blocks, 1.0);
        assert_eq!(boxes.len(), blocks.len());
        assert_eq!(boxes, {
            let mut expected = per_block(&blocks, 1.0);
            expected.sort_by(|a, b| {
                (a.local_offset.y, a.local_offset.z, a.local_offset.x)
                    .partial_cmp(&(b.local_offset.y, b.local_offset.z, b.local_offset.x))
                    .unwrap()
            });
            expected
        });
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(merge(&[], 1.0).is_empty());
    }

    proptest! {
        #[test]
        fn boxes_cover_cells_exactly(
            coords in prop::collection::vec((-6i32..6, -3i32..3, -3i32..3), 1..120)
        ) {
            let blocks: Vec<_> = coords.iter().map(|&(x, y, z)| GridCoord::new(x, y, z)).collect();
            let unique: HashSet<_> = blocks.iter().copied().collect();
            let boxes = merge(&blocks, 1.0);

            prop_assert!((volume(&boxes) - unique.len() as f32).abs() < 1e-3);

            // Expand every box back into cells; each cell must appear once.
            let mut covered = HashSet::new();
            for b in &boxes {
                let len = b.run_length(1.0) as i32;
                let start = (b.local_offset.x - b.half_extents.x).round() as i32;
                let y = (b.local_offset.y - 0.5).round() as i32;
                let z = (b.local_offset.z - 0.5).round() as i32;
                for x in start..start + len {
                    prop_assert!(covered.insert(GridCoord::new(x, y, z)), "overlap at {x},{y},{z}");
                }
            }
            prop_assert_eq!(covered, unique);
        }
    }
}
