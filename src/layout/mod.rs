mod forces;
mod quadtree;

use eframe::egui::Vec2;
use log::{debug, info, trace};

use crate::config::SimulationConfig;
use crate::session::Node;
use forces::{ChargeParams, charge_on, collision_sweep, largest_overlap};
use quadtree::{Cell, collect_outlines};
pub use quadtree::CellOutline;

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    impulses: Vec<Vec2>,
    pairs: Vec<(usize, usize)>,
}

impl Scratch {
    fn load(&mut self, nodes: &[Node]) {
        self.positions.clear();
        self.positions.extend(nodes.iter().map(|node| node.position));
        self.radii.clear();
        self.radii.extend(nodes.iter().map(|node| node.radius));
    }
}

/// Force relaxation of circles around fixed anchors.
///
/// Every tick cools `alpha` towards `alpha_target`, applies the alpha-scaled
/// anchor pull and many-body push to velocities, integrates with velocity decay,
/// then resolves circle overlaps positionally. Once alpha drops below
/// `alpha_min` the remaining overlap is swept out and the simulation stops.
pub struct Simulation {
    config: SimulationConfig,
    alpha: f32,
    alpha_decay: f32,
    ticks: u64,
    running: bool,
    scratch: Scratch,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            alpha_decay: config.effective_alpha_decay(),
            config,
            alpha: 1.0,
            ticks: 0,
            running: true,
            scratch: Scratch::default(),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Reheats the simulation. Callers are responsible for resetting node state.
    pub fn restart(&mut self) {
        self.alpha = 1.0;
        self.ticks = 0;
        self.running = true;
    }

    /// Advances one step. Returns `false` without touching `nodes` once converged.
    pub fn tick(&mut self, nodes: &mut [Node]) -> bool {
        if !self.running {
            return false;
        }

        self.alpha += (self.config.alpha_target - self.alpha) * self.alpha_decay;
        self.scratch.load(nodes);
        self.accumulate_impulses(nodes);

        let retain = 1.0 - self.config.velocity_decay;
        for (node, impulse) in nodes.iter_mut().zip(&self.scratch.impulses) {
            node.velocity = (node.velocity + *impulse) * retain;
            node.position += node.velocity;
        }

        self.scratch.load(nodes);
        for _ in 0..self.config.collision_iterations {
            collision_sweep(
                &mut self.scratch.positions,
                &self.scratch.radii,
                self.config.collision_strength,
                &mut self.scratch.pairs,
            );
        }
        self.store_positions(nodes);

        self.ticks += 1;
        trace!("tick {} alpha {:.5}", self.ticks, self.alpha);

        if self.alpha < self.config.alpha_min {
            self.settle(nodes);
            self.running = false;
            let overlap = self.largest_overlap(nodes);
            info!(
                "layout converged after {} ticks, largest overlap {overlap:.4}px",
                self.ticks
            );
        }

        true
    }

    pub fn largest_overlap(&mut self, nodes: &[Node]) -> f32 {
        self.scratch.load(nodes);
        largest_overlap(&self.scratch.positions, &self.scratch.radii)
    }

    fn accumulate_impulses(&mut self, nodes: &[Node]) {
        let scratch = &mut self.scratch;
        scratch.impulses.clear();
        scratch.impulses.resize(nodes.len(), Vec2::ZERO);

        let pull = self.config.anchor_strength * self.alpha;
        for (impulse, node) in scratch.impulses.iter_mut().zip(nodes) {
            *impulse += (node.anchor() - node.position) * pull;
        }

        if self.config.charge_strength == 0.0 || nodes.len() < 2 {
            return;
        }

        let Some(root) = Cell::build(&scratch.positions, &scratch.radii) else {
            return;
        };
        let params = ChargeParams {
            strength: self.config.charge_strength,
            alpha: self.alpha,
            theta_sq: self.config.theta * self.config.theta,
        };
        for (index, impulse) in scratch.impulses.iter_mut().enumerate() {
            *impulse += charge_on(&root, index, &scratch.positions, params);
        }
    }

    fn settle(&mut self, nodes: &mut [Node]) {
        self.scratch.load(nodes);
        let mut passes = 0;
        while passes < self.config.settle_max_passes {
            passes += 1;
            let worst = collision_sweep(
                &mut self.scratch.positions,
                &self.scratch.radii,
                self.config.collision_strength,
                &mut self.scratch.pairs,
            );
            if worst <= self.config.settle_tolerance {
                break;
            }
        }
        self.store_positions(nodes);

        for node in nodes.iter_mut() {
            node.velocity = Vec2::ZERO;
        }
        debug!("settled remaining overlap in {passes} sweeps");
    }

    fn store_positions(&self, nodes: &mut [Node]) {
        for (node, position) in nodes.iter_mut().zip(&self.scratch.positions) {
            node.position = *position;
        }
    }
}

/// Quadtree cells over the current node positions, for the debug overlay.
pub fn quadtree_outlines(nodes: &[Node], outlines: &mut Vec<CellOutline>) {
    outlines.clear();
    let positions = nodes.iter().map(|node| node.position).collect::<Vec<_>>();
    let radii = nodes.iter().map(|node| node.radius).collect::<Vec<_>>();
    if let Some(root) = Cell::build(&positions, &radii) {
        collect_outlines(&root, 0, outlines);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use eframe::egui::vec2;

    use super::*;

    const MAX_TICKS: u64 = 10_000;

    fn run(simulation: &mut Simulation, nodes: &mut [Node]) -> u64 {
        let mut count = 0;
        while count < MAX_TICKS && simulation.tick(nodes) {
            count += 1;
        }
        count
    }

    fn node(index: usize, anchor: Vec2, radius: f32) -> Node {
        Node::new(
            format!("{index:02}"),
            format!("Region {index}"),
            format!("R{index}"),
            anchor,
            radius as f64,
            radius,
        )
    }

    /// Small linear congruential generator so fixtures are reproducible.
    fn scattered_nodes(count: usize, seed: u64) -> Vec<Node> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 33) as f32) / (u32::MAX >> 1) as f32
        };
        (0..count)
            .map(|index| {
                let anchor = vec2(next() * 400.0, next() * 250.0);
                node(index, anchor, 5.0 + next() * 25.0)
            })
            .collect()
    }

    fn assert_no_overlap(nodes: &[Node], epsilon: f32) {
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let distance = (a.position - b.position).length();
                assert!(
                    distance >= a.radius + b.radius - epsilon,
                    "{} and {} overlap: distance {distance}, radii {} + {}",
                    a.id,
                    b.id,
                    a.radius,
                    b.radius
                );
            }
        }
    }

    #[test]
    fn two_overlapping_nodes_end_at_least_their_radii_apart() {
        let mut nodes = vec![
            node(0, vec2(100.0, 100.0), 10.0),
            node(1, vec2(105.0, 100.0), 15.0),
        ];
        let mut simulation = Simulation::new(SimulationConfig::default());

        let ticks = run(&mut simulation, &mut nodes);
        assert!(!simulation.is_running());
        assert!(ticks < MAX_TICKS);

        let distance = (nodes[0].position - nodes[1].position).length();
        assert!(distance >= 25.0 - 0.05, "distance {distance}");
        assert_eq!(nodes[0].anchor(), vec2(100.0, 100.0));
    }

    #[test]
    fn converged_layout_has_no_significant_overlap() {
        let mut nodes = scattered_nodes(40, 7);
        let mut simulation = Simulation::new(SimulationConfig::default());

        run(&mut simulation, &mut nodes);
        assert!(!simulation.is_running());
        assert!(simulation.alpha() < SimulationConfig::default().alpha_min);
        assert_no_overlap(&nodes, 0.05);
    }

    #[test]
    fn separated_nodes_stay_near_their_anchors() {
        let mut nodes = vec![node(0, vec2(0.0, 0.0), 5.0), node(1, vec2(200.0, 0.0), 5.0)];
        let mut simulation = Simulation::new(SimulationConfig::default());
        run(&mut simulation, &mut nodes);

        for node in &nodes {
            assert!((node.position - node.anchor()).length() < 1.0);
        }
    }

    #[test]
    fn alpha_cools_monotonically_and_ticking_stops() {
        let mut nodes = scattered_nodes(5, 3);
        let mut simulation = Simulation::new(SimulationConfig::default());

        let mut previous = simulation.alpha();
        while simulation.tick(&mut nodes) {
            assert!(simulation.alpha() < previous);
            previous = simulation.alpha();
        }
        let frozen = nodes.iter().map(|node| node.position).collect::<Vec<_>>();
        assert!(!simulation.tick(&mut nodes));
        assert_eq!(frozen, nodes.iter().map(|node| node.position).collect::<Vec<_>>());
        assert!(simulation.ticks() >= 290 && simulation.ticks() <= 310);
    }

    #[test]
    fn identical_inputs_give_identical_layouts() {
        let mut first = scattered_nodes(25, 11);
        let mut second = scattered_nodes(25, 11);
        run(&mut Simulation::new(SimulationConfig::default()), &mut first);
        run(&mut Simulation::new(SimulationConfig::default()), &mut second);

        for (a, b) in first.iter().zip(&second) {
            assert_abs_diff_eq!(a.position.x, b.position.x, epsilon = 1e-4);
            assert_abs_diff_eq!(a.position.y, b.position.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn restart_reheats_a_converged_simulation() {
        let mut nodes = scattered_nodes(5, 5);
        let mut simulation = Simulation::new(SimulationConfig::default());
        run(&mut simulation, &mut nodes);
        assert!(!simulation.is_running());

        simulation.restart();
        assert!(simulation.is_running());
        assert_eq!(simulation.ticks(), 0);
        assert_abs_diff_eq!(simulation.alpha(), 1.0);
        assert!(simulation.tick(&mut nodes));
    }

    #[test]
    fn outlines_cover_every_node() {
        let nodes = scattered_nodes(30, 9);
        let mut outlines = Vec::new();
        quadtree_outlines(&nodes, &mut outlines);

        assert!(!outlines.is_empty());
        assert_eq!(outlines[0].depth, 0);
        let root = outlines[0];
        for node in &nodes {
            let offset = (node.position - root.center).abs();
            assert!(offset.x <= root.half_extent && offset.y <= root.half_extent);
        }
    }
}
