use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

/// Axis-aligned square cell.
#[derive(Clone, Copy, Debug)]
pub(super) struct Square {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl Square {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        if points.iter().any(|point| !point.is_finite()) {
            return None;
        }

        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    fn quadrant_of(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign = |bit: usize| if quadrant & bit == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(sign(1), sign(2)),
            half_extent: quarter,
        }
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half_extent && offset.y <= self.half_extent
    }

    pub(super) fn width(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two squares, zero when they touch or overlap.
    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = ((self.center - other.center).abs() - vec2(reach, reach)).max(Vec2::ZERO);
        gap.length_sq()
    }
}

/// Quadtree over node positions. Each cell carries the data both force passes
/// need: its node count and centre of mass for Barnes-Hut repulsion, and its
/// largest radius for collision pruning.
pub(super) struct Cell {
    pub(super) square: Square,
    pub(super) center_of_mass: Vec2,
    pub(super) count: usize,
    pub(super) max_radius: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<Cell>>; 4],
}

impl Cell {
    pub(super) fn build(positions: &[Vec2], radii: &[f32]) -> Option<Self> {
        let square = Square::enclosing(positions)?;
        let indices = (0..positions.len()).collect();
        Some(Self::subdivide(square, indices, positions, radii, 0))
    }

    fn subdivide(
        square: Square,
        indices: Vec<usize>,
        positions: &[Vec2],
        radii: &[f32],
        depth: usize,
    ) -> Self {
        let count = indices.len();
        let center_of_mass = if count > 0 {
            indices
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + positions[index])
                / count as f32
        } else {
            Vec2::ZERO
        };
        let max_radius = indices
            .iter()
            .map(|&index| radii.get(index).copied().unwrap_or(0.0))
            .fold(0.0_f32, f32::max);

        let mut cell = Self {
            square,
            center_of_mass,
            count,
            max_radius,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.indices.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &cell.indices {
            buckets[square.quadrant_of(positions[index])].push(index);
        }

        // Coincident points would otherwise recurse to MAX_DEPTH.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                cell.children[quadrant] = Some(Box::new(Self::subdivide(
                    square.child(quadrant),
                    bucket,
                    positions,
                    radii,
                    depth + 1,
                )));
            }
        }
        cell.indices.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &Cell> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

/// Flattened cell outline for the viewer's debug overlay.
#[derive(Clone, Copy, Debug)]
pub struct CellOutline {
    pub center: Vec2,
    pub half_extent: f32,
    pub depth: usize,
    pub is_leaf: bool,
}

pub(super) fn collect_outlines(cell: &Cell, depth: usize, outlines: &mut Vec<CellOutline>) {
    outlines.push(CellOutline {
        center: cell.square.center,
        half_extent: cell.square.half_extent,
        depth,
        is_leaf: cell.is_leaf(),
    });
    for child in cell.children() {
        collect_outlines(child, depth + 1, outlines);
    }
}
