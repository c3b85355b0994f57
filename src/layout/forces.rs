use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::Cell;

/// Squared distances below this are clamped so near-coincident nodes don't
/// receive unbounded pushes.
const MIN_DISTANCE_SQ: f32 = 1.0;

/// Deterministic unit vector for the pair `(a, b)`, used when two centres
/// coincide and the separating direction is undefined.
pub(super) fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let (low, high) = (a.min(b), a.max(b));
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if a <= b { direction } else { -direction }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) alpha: f32,
    pub(super) theta_sq: f32,
}

impl ChargeParams {
    fn push(self, away: Vec2, weight: f32) -> Vec2 {
        away * (self.strength * self.alpha * weight / away.length_sq().max(MIN_DISTANCE_SQ))
    }
}

/// Velocity change for `index` from an inverse-distance push away from every
/// other node. Distant cells are folded into their centre of mass.
pub(super) fn charge_on(
    cell: &Cell,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
) -> Vec2 {
    let mut velocity = Vec2::ZERO;
    accumulate_charge(cell, index, positions, params, &mut velocity);
    velocity
}

fn accumulate_charge(
    cell: &Cell,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if cell.count == 0 {
        return;
    }

    let point = positions[index];

    if cell.is_leaf() {
        for &other in &cell.indices {
            if other == index {
                continue;
            }
            let mut away = point - positions[other];
            if away.length_sq() <= f32::EPSILON {
                away = fallback_direction(index, other);
            }
            *velocity += params.push(away, 1.0);
        }
        return;
    }

    let away = point - cell.center_of_mass;
    let width = cell.square.width();
    let far_enough = width * width / params.theta_sq < away.length_sq();
    if far_enough && !cell.square.contains(point) {
        *velocity += params.push(away, cell.count as f32);
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, positions, params, velocity);
    }
}

/// Appends every pair `(i, j)` whose circles overlap. Cell pairs further apart
/// than their largest radii allow are skipped.
pub(super) fn overlapping_pairs(
    a: &Cell,
    b: &Cell,
    same_cell: bool,
    positions: &[Vec2],
    radii: &[f32],
    pairs: &mut Vec<(usize, usize)>,
) {
    let reach = a.max_radius + b.max_radius;
    if a.square.gap_sq(b.square) >= reach * reach {
        return;
    }

    let overlapping = |i: usize, j: usize| {
        let reach = radii[i] + radii[j];
        (positions[i] - positions[j]).length_sq() < reach * reach
    };

    if a.is_leaf() && b.is_leaf() {
        if same_cell {
            for (offset, &i) in a.indices.iter().enumerate() {
                for &j in &a.indices[offset + 1..] {
                    if overlapping(i, j) {
                        pairs.push((i, j));
                    }
                }
            }
        } else {
            for &i in &a.indices {
                for &j in &b.indices {
                    if overlapping(i, j) {
                        pairs.push((i, j));
                    }
                }
            }
        }
        return;
    }

    if same_cell {
        let children = a.children().collect::<Vec<_>>();
        for (offset, first) in children.iter().enumerate() {
            overlapping_pairs(first, first, true, positions, radii, pairs);
            for second in &children[offset + 1..] {
                overlapping_pairs(first, second, false, positions, radii, pairs);
            }
        }
        return;
    }

    let split_a = if a.is_leaf() {
        false
    } else if b.is_leaf() {
        true
    } else {
        a.square.half_extent >= b.square.half_extent
    };

    if split_a {
        for child in a.children() {
            overlapping_pairs(child, b, false, positions, radii, pairs);
        }
    } else {
        for child in b.children() {
            overlapping_pairs(a, child, false, positions, radii, pairs);
        }
    }
}

/// Pushes `i` and `j` apart by `strength` times their overlap. Each side moves in
/// proportion to the other's area, so the larger circle moves less. Returns the
/// overlap before correction.
pub(super) fn separate(
    positions: &mut [Vec2],
    radii: &[f32],
    (i, j): (usize, usize),
    strength: f32,
) -> f32 {
    let reach = radii[i] + radii[j];
    let delta = positions[i] - positions[j];
    let distance = delta.length();
    if distance >= reach {
        return 0.0;
    }

    let direction = if distance > 1e-6 {
        delta / distance
    } else {
        fallback_direction(i, j)
    };

    let overlap = reach - distance;
    let area_i = radii[i] * radii[i];
    let area_j = radii[j] * radii[j];
    let share_i = if area_i + area_j > 0.0 {
        area_j / (area_i + area_j)
    } else {
        0.5
    };

    let correction = direction * (overlap * strength);
    positions[i] += correction * share_i;
    positions[j] -= correction * (1.0 - share_i);
    overlap
}

/// One Gauss-Seidel sweep over all currently overlapping pairs. Returns the
/// largest overlap found at the start of the sweep.
pub(super) fn collision_sweep(
    positions: &mut [Vec2],
    radii: &[f32],
    strength: f32,
    pairs: &mut Vec<(usize, usize)>,
) -> f32 {
    pairs.clear();
    let Some(root) = Cell::build(positions, radii) else {
        return 0.0;
    };
    overlapping_pairs(&root, &root, true, positions, radii, pairs);

    let mut worst = 0.0_f32;
    for &pair in pairs.iter() {
        worst = worst.max(separate(positions, radii, pair, strength));
    }
    worst
}

pub(super) fn largest_overlap(positions: &[Vec2], radii: &[f32]) -> f32 {
    let Some(root) = Cell::build(positions, radii) else {
        return 0.0;
    };
    let mut pairs = Vec::new();
    overlapping_pairs(&root, &root, true, positions, radii, &mut pairs);
    pairs
        .into_iter()
        .map(|(i, j)| radii[i] + radii[j] - (positions[i] - positions[j]).length())
        .fold(0.0_f32, f32::max)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn brute_force_pairs(positions: &[Vec2], radii: &[f32]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if (positions[i] - positions[j]).length() < radii[i] + radii[j] {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    #[test]
    fn quadtree_pairs_match_brute_force() {
        let positions = (0..60)
            .map(|i| vec2(((i * 37) % 101) as f32 * 3.0, ((i * 53) % 97) as f32 * 2.0))
            .collect::<Vec<_>>();
        let radii = (0..60).map(|i| 4.0 + (i % 5) as f32 * 3.0).collect::<Vec<_>>();

        let root = Cell::build(&positions, &radii).expect("finite positions");
        let mut pairs = Vec::new();
        overlapping_pairs(&root, &root, true, &positions, &radii, &mut pairs);
        let mut normalized = pairs
            .into_iter()
            .map(|(i, j)| (i.min(j), i.max(j)))
            .collect::<Vec<_>>();
        normalized.sort_unstable();

        assert_eq!(normalized, brute_force_pairs(&positions, &radii));
    }

    #[test]
    fn separation_moves_the_smaller_circle_further() {
        let mut positions = vec![vec2(0.0, 0.0), vec2(5.0, 0.0)];
        let radii = [10.0, 15.0];

        let overlap = separate(&mut positions, &radii, (0, 1), 1.0);
        assert_abs_diff_eq!(overlap, 20.0, epsilon = 1e-4);
        assert_abs_diff_eq!((positions[1] - positions[0]).length(), 25.0, epsilon = 1e-4);

        let moved_small = positions[0].length();
        let moved_large = (positions[1] - vec2(5.0, 0.0)).length();
        assert!(moved_small > moved_large);
        assert_abs_diff_eq!(moved_small, 20.0 * 225.0 / 325.0, epsilon = 1e-3);
    }

    #[test]
    fn coincident_centres_separate_deterministically() {
        let radii = [5.0, 5.0];
        let mut first = vec![vec2(1.0, 1.0), vec2(1.0, 1.0)];
        let mut second = first.clone();
        separate(&mut first, &radii, (0, 1), 1.0);
        separate(&mut second, &radii, (0, 1), 1.0);

        assert_eq!(first, second);
        assert_abs_diff_eq!((first[0] - first[1]).length(), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn charge_pushes_nodes_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let radii = [1.0, 1.0];
        let root = Cell::build(&positions, &radii).expect("finite positions");
        let params = ChargeParams {
            strength: 1.0,
            alpha: 1.0,
            theta_sq: 0.81,
        };

        let left = charge_on(&root, 0, &positions, params);
        let right = charge_on(&root, 1, &positions, params);
        assert!(left.x < 0.0 && right.x > 0.0);
        assert_abs_diff_eq!(left.length(), 0.1, epsilon = 1e-5);
        assert_abs_diff_eq!(left.x, -right.x, epsilon = 1e-6);
    }

    #[test]
    fn sweeps_drive_overlap_to_zero() {
        let mut positions = (0..12)
            .map(|i| vec2((i % 4) as f32 * 6.0, (i / 4) as f32 * 6.0))
            .collect::<Vec<_>>();
        let radii = vec![8.0; 12];
        let mut pairs = Vec::new();

        let initial = largest_overlap(&positions, &radii);
        assert!(initial > 0.0);
        for _ in 0..500 {
            if collision_sweep(&mut positions, &radii, 1.0, &mut pairs) <= 1e-3 {
                break;
            }
        }
        assert!(largest_overlap(&positions, &radii) <= 0.01);
    }
}
