//! Logical-to-physical pixel mapping.
//!
//! Clients address the canvas as a raster grid: `(0, 0)` is the top-left
//! corner, `x` grows to the right and `y` grows downwards.  The hardware
//! behind it is rarely wired that way.  LED matrices built from a single
//! strip typically snake back and forth ("serpentine" or "zigzag" wiring),
//! and the first LED may sit in any corner.
//!
//! A [`Topology`] is computed once from the canvas size and wiring
//! description, and afterwards answers `index(x, y)` with a table lookup.
//!
//! # Example: 4×3 serpentine columns, first LED top-left
//!
//! ```text
//!   x→  0  1  2  3
//! y↓0   0  5  6 11
//!   1   1  4  7 10
//!   2   2  3  8  9
//! ```

use serde::{Deserialize, Serialize};

/// How consecutive physical indices walk the grid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WiringOrder {
    /// Every row runs in the same direction.
    #[default]
    RowMajor,
    /// Every column runs in the same direction.
    ColumnMajor,
    /// Rows alternate direction.
    SerpentineRows,
    /// Columns alternate direction.
    SerpentineColumns,
}

/// The corner holding physical index 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Origin {
    fn flips_x(self) -> bool {
        matches!(self, Origin::TopRight | Origin::BottomRight)
    }

    fn flips_y(self) -> bool {
        matches!(self, Origin::BottomLeft | Origin::BottomRight)
    }
}

/// Precomputed `(x, y) → physical index` table for one canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    width: u16,
    height: u16,
    order: WiringOrder,
    origin: Origin,
    /// `map[y * width + x]` is the physical index of `(x, y)`.
    map: Vec<u32>,
}

impl Topology {
    /// Builds the mapping table for a `width × height` canvas.
    pub fn new(width: u16, height: u16, order: WiringOrder, origin: Origin) -> Self {
        let mut map = Vec::with_capacity(usize::from(width) * usize::from(height));
        for y in 0..height {
            for x in 0..width {
                map.push(physical_index(width, height, order, origin, x, y));
            }
        }
        Self {
            width,
            height,
            order,
            origin,
            map,
        }
    }

    /// Plain raster order: index = `y * width + x`.
    pub fn row_major(width: u16, height: u16) -> Self {
        Self::new(width, height, WiringOrder::RowMajor, Origin::TopLeft)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn order(&self) -> WiringOrder {
        self.order
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns `true` when `(x, y)` lies on the canvas.
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Physical index of `(x, y)`, or `None` when it lies off the canvas.
    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        let logical = usize::from(y) * usize::from(self.width) + usize::from(x);
        Some(self.map[logical] as usize)
    }
}

fn physical_index(
    width: u16,
    height: u16,
    order: WiringOrder,
    origin: Origin,
    x: u16,
    y: u16,
) -> u32 {
    let (w, h) = (u32::from(width), u32::from(height));
    let fx = if origin.flips_x() { w - 1 - u32::from(x) } else { u32::from(x) };
    let fy = if origin.flips_y() { h - 1 - u32::from(y) } else { u32::from(y) };

    match order {
        WiringOrder::RowMajor => fy * w + fx,
        WiringOrder::ColumnMajor => fx * h + fy,
        WiringOrder::SerpentineRows => {
            let pos = if fy % 2 == 1 { w - 1 - fx } else { fx };
            fy * w + pos
        }
        WiringOrder::SerpentineColumns => {
            let pos = if fx % 2 == 1 { h - 1 - fy } else { fy };
            fx * h + pos
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ORDERS: [WiringOrder; 4] = [
        WiringOrder::RowMajor,
        WiringOrder::ColumnMajor,
        WiringOrder::SerpentineRows,
        WiringOrder::SerpentineColumns,
    ];

    const ALL_ORIGINS: [Origin; 4] = [
        Origin::TopLeft,
        Origin::TopRight,
        Origin::BottomLeft,
        Origin::BottomRight,
    ];

    fn table(topology: &Topology) -> Vec<Vec<usize>> {
        (0..topology.height())
            .map(|y| {
                (0..topology.width())
                    .map(|x| topology.index(x, y).unwrap())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_row_major_is_raster_order() {
        let t = Topology::row_major(3, 2);
        assert_eq!(table(&t), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_serpentine_columns_from_top_left_matches_strip_wiring() {
        let t = Topology::new(4, 3, WiringOrder::SerpentineColumns, Origin::TopLeft);
        assert_eq!(
            table(&t),
            vec![vec![0, 5, 6, 11], vec![1, 4, 7, 10], vec![2, 3, 8, 9]]
        );
    }

    #[test]
    fn test_serpentine_rows_from_top_right() {
        // First LED in the top-right corner, rows alternate direction.
        let t = Topology::new(3, 3, WiringOrder::SerpentineRows, Origin::TopRight);
        assert_eq!(
            table(&t),
            vec![vec![2, 1, 0], vec![3, 4, 5], vec![8, 7, 6]]
        );
    }

    #[test]
    fn test_column_major_from_bottom_left() {
        let t = Topology::new(2, 3, WiringOrder::ColumnMajor, Origin::BottomLeft);
        assert_eq!(table(&t), vec![vec![2, 5], vec![1, 4], vec![0, 3]]);
    }

    #[test]
    fn test_every_mapping_is_a_bijection() {
        for order in ALL_ORDERS {
            for origin in ALL_ORIGINS {
                let t = Topology::new(5, 4, order, origin);
                let mut seen: Vec<usize> = table(&t).into_iter().flatten().collect();
                seen.sort_unstable();
                assert_eq!(
                    seen,
                    (0..20).collect::<Vec<_>>(),
                    "{order:?}/{origin:?} must cover every index exactly once"
                );
            }
        }
    }

    #[test]
    fn test_index_off_canvas_is_none() {
        let t = Topology::row_major(4, 4);
        assert_eq!(t.index(4, 0), None);
        assert_eq!(t.index(0, 4), None);
        assert_eq!(t.index(u16::MAX, u16::MAX), None);
    }

    #[test]
    fn test_wiring_order_deserializes_from_kebab_case() {
        use serde::de::value::{Error, MapDeserializer};

        #[derive(Deserialize)]
        struct Wiring {
            order: WiringOrder,
            origin: Origin,
        }

        let fields = [("order", "serpentine-columns"), ("origin", "bottom-right")];
        let wiring = Wiring::deserialize(MapDeserializer::<_, Error>::new(fields.into_iter()))
            .unwrap();

        assert_eq!(wiring.order, WiringOrder::SerpentineColumns);
        assert_eq!(wiring.origin, Origin::BottomRight);
    }
}
