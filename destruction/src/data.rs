//! Structure data as handed over by the catalog, and its normalized form.
//!
//! The wire shape is camelCase JSON:
//!
//! ```json
//! { "name": "arch", "blockSize": 0.6, "scale": 1.0,
//!   "blocks": [ { "x": 0, "y": 0, "z": 0, "color": "#aa3322", "alpha": 1.0 } ] }
//! ```

use std::collections::HashSet;

use serde::Deserialize;

use crate::constants::MAX_GRID_COORD;
use crate::error::SpawnError;
use crate::grid::{GridBounds, GridCoord};
use crate::types::Rgb;

fn default_block_size() -> f32 {
    1.0
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_block_size")]
    pub block_size: f32,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub blocks: Vec<BlockData>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// `#RRGGBB`, `#RGB` or a basic CSS color name. Missing or unreadable
    /// means white.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub alpha: Option<f32>,
    /// Used when `alpha` is missing or not finite.
    #[serde(default)]
    pub opacity: Option<f32>,
}

impl BlockData {
    pub fn new(x: i32, y: i32, z: i32, color: &str) -> Self {
        Self {
            x: x as f64,
            y: y as f64,
            z: z as f64,
            color: Some(color.to_owned()),
            alpha: None,
            opacity: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }
}

/// One validated block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBlock {
    pub coord: GridCoord,
    pub color: Rgb,
    pub alpha: f32,
}

/// Validated, deduplicated structure ready for spawning.
#[derive(Clone, Debug)]
pub struct NormalizedStructure {
    pub name: Option<String>,
    pub block_size: f32,
    pub scale: f32,
    /// `block_size * scale`; the edge length of one cell in meters.
    pub cell_size: f32,
    pub blocks: Vec<NormalizedBlock>,
    pub bounds: GridBounds,
    pub has_translucent: bool,
}

impl NormalizedStructure {
    /// Footprint center on X/Z in grid space scaled to meters.
    pub fn footprint_center(&self) -> (f32, f32) {
        let cs = self.cell_size;
        let span = |min: i32, max: i32| (min as i64 + max as i64 + 1) as f32 * 0.5 * cs;
        let cx = span(self.bounds.min.x, self.bounds.max.x);
        let cz = span(self.bounds.min.z, self.bounds.max.z);
        (cx, cz)
    }

    /// Footprint `(width, depth)` in meters.
    pub fn footprint(&self) -> (f32, f32) {
        let (w, _, d) = self.bounds.cells();
        (w as f32 * self.cell_size, d as f32 * self.cell_size)
    }
}

impl StructureData {
    pub fn from_json(src: &str) -> Result<Self, SpawnError> {
        Ok(serde_json::from_str(src)?)
    }

    pub fn from_blocks(block_size: f32, blocks: Vec<BlockData>) -> Self {
        Self {
            name: None,
            block_size,
            scale: None,
            blocks,
        }
    }

    /// Round, deduplicate and validate.
    ///
    /// Coordinates are rounded to the nearest cell and must stay within
    /// [`MAX_GRID_COORD`] of the grid origin; the first block wins on
    /// duplicates. Unreadable colors fall back to white. Alpha is clamped
    /// into `0..=1`. A scale that is missing, non-positive or non-finite
    /// counts as `1`.
    pub fn normalize(&self) -> Result<NormalizedStructure, SpawnError> {
        if self.blocks.is_empty() {
            return Err(SpawnError::NoBlocks);
        }
        if !self.block_size.is_finite() || self.block_size <= 0.0 {
            return Err(SpawnError::InvalidBlockSize(self.block_size));
        }
        let scale = self
            .scale
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(1.0);

        let mut seen = HashSet::with_capacity(self.blocks.len());
        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut has_translucent = false;

        for (index, raw) in self.blocks.iter().enumerate() {
            let coord = GridCoord::new(
                grid_axis(raw.x).ok_or(SpawnError::InvalidCoordinate { index })?,
                grid_axis(raw.y).ok_or(SpawnError::InvalidCoordinate { index })?,
                grid_axis(raw.z).ok_or(SpawnError::InvalidCoordinate { index })?,
            );
            if !seen.insert(coord) {
                continue;
            }

            let color = match &raw.color {
                None => Rgb::WHITE,
                Some(c) => c.parse().unwrap_or_else(|_| {
                    log::warn!("block {index}: unreadable color {c:?}, using white");
                    Rgb::WHITE
                }),
            };
            let alpha = raw
                .alpha
                .filter(|a| a.is_finite())
                .or(raw.opacity.filter(|a| a.is_finite()))
                .map(|a| a.clamp(0.0, 1.0))
                .unwrap_or(1.0);
            has_translucent |= alpha < 1.0;

            blocks.push(NormalizedBlock {
                coord,
                color,
                alpha,
            });
        }

        let bounds = GridBounds::of(blocks.iter().map(|b| b.coord)).ok_or(SpawnError::NoBlocks)?;

        Ok(NormalizedStructure {
            name: self.name.clone(),
            block_size: self.block_size,
            scale,
            cell_size: self.block_size * scale,
            blocks,
            bounds,
            has_translucent,
        })
    }
}

/// Nearest cell on one axis, or `None` when non-finite or out of range.
fn grid_axis(v: f64) -> Option<i32> {
    let cell = v.round();
    let limit = MAX_GRID_COORD as f64;
    (cell.is_finite() && (-limit..=limit).contains(&cell)).then_some(cell as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_json() {
        let data = StructureData::from_json(
            r##"{ "name": "pillar", "blockSize": 0.5, "scale": 2,
                 "blocks": [ { "x": 0, "y": 0, "z": 0, "color": "#112233" },
                             { "x": 0, "y": 1, "z": 0, "color": "#112233", "opacity": 0.5 } ] }"##,
        )
        .unwrap();
        let n = data.normalize().unwrap();
        assert_eq!(n.name.as_deref(), Some("pillar"));
        assert_eq!(n.cell_size, 1.0);
        assert_eq!(n.blocks.len(), 2);
        assert_eq!(n.blocks[1].alpha, 0.5);
        assert!(n.has_translucent);
    }

    #[test]
    fn rounds_and_dedupes_first_wins() {
        let mut blocks = vec![
            BlockData::new(0, 0, 0, "#ff0000"),
            BlockData::new(0, 0, 0, "#00ff00"),
        ];
        blocks.push(BlockData {
            x: 0.9,
            y: -0.2,
            z: 0.4,
            color: Some("#0000ff".into()),
            alpha: Some(3.0),
            opacity: None,
        });
        let n = StructureData::from_blocks(1.0, blocks).normalize().unwrap();
        assert_eq!(n.blocks.len(), 2);
        assert_eq!(n.blocks[0].color, Rgb::new(255, 0, 0));
        assert_eq!(n.blocks[1].coord, GridCoord::new(1, 0, 0));
        assert_eq!(n.blocks[1].alpha, 1.0);
    }

    #[test]
    fn rejects_empty_and_invalid() {
        assert!(matches!(
            StructureData::from_blocks(1.0, vec![]).normalize(),
            Err(SpawnError::NoBlocks)
        ));
        assert!(matches!(
            StructureData::from_blocks(0.0, vec![BlockData::new(0, 0, 0, "#fff")]).normalize(),
            Err(SpawnError::InvalidBlockSize(_))
        ));
        let mut nan = BlockData::new(0, 0, 0, "#fff");
        nan.y = f64::NAN;
        assert!(matches!(
            StructureData::from_blocks(1.0, vec![BlockData::new(0, 0, 0, "#fff"), nan]).normalize(),
            Err(SpawnError::InvalidCoordinate { index: 1 })
        ));
        assert!(matches!(
            StructureData::from_json("{ \"blocks\": 3 }"),
            Err(SpawnError::Malformed(_))
        ));
    }

    #[test]
    fn footprint_center_spans_bounds() {
        let n = StructureData::from_blocks(
            0.5,
            vec![
                BlockData::new(-2, 3, 0, "#ffffff"),
                BlockData::new(1, 3, 3, "#ffffff"),
            ],
        )
        .normalize()
        .unwrap();
        assert_eq!(n.footprint_center(), (0.0, 1.0));
        assert_eq!(n.footprint(), (2.0, 2.0));
    }

    #[test]
    fn alpha_wins_over_opacity_when_both_are_present() {
        let data = StructureData::from_json(
            r##"{ "blocks": [
                { "x": 0, "y": 0, "z": 0, "color": "#112233", "alpha": 1, "opacity": 0.5 },
                { "x": 1, "y": 0, "z": 0, "color": "#112233", "opacity": 0.25 } ] }"##,
        )
        .unwrap();
        let n = data.normalize().unwrap();
        assert_eq!(n.blocks[0].alpha, 1.0);
        assert_eq!(n.blocks[1].alpha, 0.25);

        let nan_alpha = BlockData {
            alpha: Some(f32::NAN),
            opacity: Some(0.4),
            ..BlockData::new(0, 0, 0, "#112233")
        };
        let n = StructureData::from_blocks(1.0, vec![nan_alpha])
            .normalize()
            .unwrap();
        assert_eq!(n.blocks[0].alpha, 0.4);
    }

    #[test]
    fn unreadable_colors_fall_back_to_white_per_block() {
        let n = StructureData::from_blocks(
            1.0,
            vec![
                BlockData::new(0, 0, 0, "#102030"),
                BlockData::new(1, 0, 0, "red"),
                BlockData::new(2, 0, 0, "not a color"),
            ],
        )
        .normalize()
        .unwrap();
        assert_eq!(n.blocks.len(), 3);
        assert_eq!(n.blocks[0].color, Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(n.blocks[1].color, Rgb::new(255, 0, 0));
        assert_eq!(n.blocks[2].color, Rgb::WHITE);
    }

    #[test]
    fn far_coordinates_are_rejected_not_saturated() {
        for far in [i32::MAX, i32::MIN, MAX_GRID_COORD + 1] {
            let blocks = vec![
                BlockData::new(0, 0, 0, "#ffffff"),
                BlockData::new(far, 0, 0, "#ffffff"),
            ];
            assert!(matches!(
                StructureData::from_blocks(1.0, blocks).normalize(),
                Err(SpawnError::InvalidCoordinate { index: 1 })
            ));
        }

        let mut huge = BlockData::new(0, 0, 0, "#ffffff");
        huge.z = 1.0e12;
        assert!(matches!(
            StructureData::from_blocks(1.0, vec![huge]).normalize(),
            Err(SpawnError::InvalidCoordinate { index: 0 })
        ));

        let edge = StructureData::from_blocks(
            1.0,
            vec![
                BlockData::new(-MAX_GRID_COORD, 0, 0, "#ffffff"),
                BlockData::new(MAX_GRID_COORD, 0, 0, "#ffffff"),
            ],
        )
        .normalize()
        .unwrap();
        assert_eq!(edge.footprint_center(), (0.5, 0.5));
        assert_eq!(edge.bounds.cells().0, 2 * MAX_GRID_COORD as i64 + 1);
    }
}
