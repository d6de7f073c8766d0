//! Bridge between the store and the force-directed solver.
//!
//! The solver itself lives in the render host; this module defines the
//! `ForceSolver` seam and drives it once per frame. The bridge watches the
//! store's generation counter and reseeds the solver whenever the structure
//! changed (papers added or removed, active link type switched, connections
//! edited). Fresh insertions ask for a settling reseed: every node is handed
//! to the solver as fixed for exactly one tick so the new batch registers
//! without flinging the existing layout, then the next tick reseeds with the
//! real pin flags.

use std::time::Instant;

use crate::links::LinkType;
use crate::model::Vec3;
use crate::store::GraphStore;

/// Node snapshot handed to the solver on reseed. `fixed` carries the pinned
/// position, if any; the solver must not move fixed nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    pub id: String,
    pub position: Vec3,
    pub fixed: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimLink {
    pub source: String,
    pub target: String,
}

/// The force-directed solver seam. Only the displayed link set feeds the
/// forces, so switching link type reshapes the layout.
pub trait ForceSolver {
    /// Replace the solver's node and link sets.
    fn reseed(&mut self, nodes: &[SimNode], links: &[SimLink]);

    /// Raise the solver's energy so a local change propagates.
    fn nudge(&mut self, alpha: f32);

    /// Advance one step and report the new position of every node.
    fn step(&mut self) -> Vec<(String, Vec3)>;
}

/// Everything the renderer needs to draw one frame.
#[derive(Debug, Clone)]
pub struct TickFrame {
    pub positions: Vec<(String, Vec3)>,
    /// Endpoint pairs of the active link set, at current node positions.
    pub edges: Vec<(Vec3, Vec3)>,
    pub link_type: LinkType,
    /// Ids of nodes currently pulsing from a recent merge.
    pub highlights: Vec<String>,
}

pub struct SimulationBridge<F: ForceSolver> {
    solver: F,
    seen_generation: u64,
    settle_pending: bool,
}

impl<F: ForceSolver> SimulationBridge<F> {
    pub fn new(solver: F) -> Self {
        SimulationBridge { solver, seen_generation: 0, settle_pending: false }
    }

    pub fn solver(&self) -> &F {
        &self.solver
    }

    /// Drive one frame: advance node animations, reseed the solver if the
    /// structure changed, forward any pending energy nudge, step the solver,
    /// write positions back (pins win), and expire highlight pulses.
    pub fn tick(&mut self, store: &mut GraphStore, now: Instant) -> TickFrame {
        store.advance_animations(now);

        let generation = store.generation();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            let settle = store.take_settle();
            self.reseed(store, settle);
            self.settle_pending = settle;
        } else if self.settle_pending {
            // second half of the settling protocol: real pin flags
            self.settle_pending = false;
            self.reseed(store, false);
        }

        let alpha = store.take_alpha_nudge();
        if alpha > 0.0 {
            self.solver.nudge(alpha);
        }

        for (id, pos) in self.solver.step() {
            store.apply_position(&id, pos);
        }
        store.expire_highlights(now);

        let positions = store
            .all()
            .iter()
            .map(|p| (p.paper_id.clone(), p.position))
            .collect();
        let edges = store
            .active_links()
            .iter()
            .filter_map(|l| {
                let a = store.find(&l.source)?.position;
                let b = store.find(&l.target)?.position;
                Some((a, b))
            })
            .collect();

        TickFrame {
            positions,
            edges,
            link_type: store.link_type(),
            highlights: store.active_highlights(),
        }
    }

    fn reseed(&mut self, store: &GraphStore, pin_all: bool) {
        let nodes: Vec<SimNode> = store
            .all()
            .iter()
            .map(|p| SimNode {
                id: p.paper_id.clone(),
                position: p.position,
                fixed: if pin_all { Some(p.position) } else { p.fixed },
            })
            .collect();
        let links: Vec<SimLink> = store
            .active_links()
            .iter()
            .map(|l| SimLink { source: l.source.clone(), target: l.target.clone() })
            .collect();
        println!(
            "[Sim] Reseeding solver: {} nodes, {} {} links{}",
            nodes.len(),
            links.len(),
            store.link_type().as_str(),
            if pin_all { " (settling)" } else { "" }
        );
        self.solver.reseed(&nodes, &links);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::model::Paper;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    /// Moves every unpinned node by a constant drift each step.
    #[derive(Default)]
    struct StubSolver {
        nodes: Vec<SimNode>,
        links: Vec<SimLink>,
        reseeds: usize,
        last_alpha: f32,
        drift: f32,
    }

    impl ForceSolver for StubSolver {
        fn reseed(&mut self, nodes: &[SimNode], links: &[SimLink]) {
            self.nodes = nodes.to_vec();
            self.links = links.to_vec();
            self.reseeds += 1;
        }

        fn nudge(&mut self, alpha: f32) {
            self.last_alpha = alpha;
        }

        fn step(&mut self) -> Vec<(String, Vec3)> {
            let drift = self.drift;
            self.nodes
                .iter_mut()
                .map(|n| {
                    if n.fixed.is_none() {
                        n.position = Vec3::new(n.position.x + drift, n.position.y, n.position.z);
                    }
                    (n.id.clone(), n.position)
                })
                .collect()
        }
    }

    fn seeded_store(ids: &[&str]) -> GraphStore {
        let mut store = GraphStore::with_rng(GraphConfig::default(), StdRng::seed_from_u64(7));
        store.upsert_many(ids.iter().map(|id| Paper::bare(id)).collect(), 0.2, false);
        store
    }

    fn bridge() -> SimulationBridge<StubSolver> {
        SimulationBridge::new(StubSolver { drift: 0.01, ..Default::default() })
    }

    #[test]
    fn test_insert_triggers_settling_then_normal_reseed() {
        let mut store = seeded_store(&["p1", "p2"]);
        let mut bridge = bridge();
        let now = Instant::now();

        // first tick after the insert: everything handed over fixed
        bridge.tick(&mut store, now);
        assert_eq!(bridge.solver().reseeds, 1);
        assert!(bridge.solver().nodes.iter().all(|n| n.fixed.is_some()));

        // second tick: real pin flags (none pinned here)
        bridge.tick(&mut store, now);
        assert_eq!(bridge.solver().reseeds, 2);
        assert!(bridge.solver().nodes.iter().all(|n| n.fixed.is_none()));

        // steady state: no further reseeds
        bridge.tick(&mut store, now);
        assert_eq!(bridge.solver().reseeds, 2);
    }

    #[test]
    fn test_positions_flow_back_except_pinned() {
        let mut store = seeded_store(&["p1", "p2"]);
        let mut bridge = bridge();
        let now = Instant::now();
        bridge.tick(&mut store, now);
        bridge.tick(&mut store, now);

        store.pin("p1");
        let pinned_at = store.find("p1").unwrap().position;
        let free_at = store.find("p2").unwrap().position;

        bridge.tick(&mut store, now);
        assert_eq!(store.find("p1").unwrap().position, pinned_at);
        assert!((store.find("p2").unwrap().position.x - free_at.x - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_link_type_switch_reseeds_with_active_set() {
        let mut store = seeded_store(&["p1", "p2"]);
        store.connect("p1", "p2"); // activates custom
        let mut bridge = bridge();
        let now = Instant::now();

        bridge.tick(&mut store, now);
        bridge.tick(&mut store, now);
        assert_eq!(bridge.solver().links.len(), 1);

        store.set_link_type(LinkType::Citation);
        bridge.tick(&mut store, now);
        assert!(bridge.solver().links.is_empty());
    }

    #[test]
    fn test_frame_edges_use_current_positions() {
        let mut store = seeded_store(&["p1", "p2"]);
        store.connect("p1", "p2");
        let mut bridge = bridge();
        let now = Instant::now();
        bridge.tick(&mut store, now);
        bridge.tick(&mut store, now);

        let frame = bridge.tick(&mut store, now);
        assert_eq!(frame.link_type, LinkType::Custom);
        assert_eq!(frame.edges.len(), 1);
        let (a, b) = frame.edges[0];
        assert_eq!(a, store.find("p1").unwrap().position);
        assert_eq!(b, store.find("p2").unwrap().position);
        assert_eq!(frame.positions.len(), 2);
    }

    #[test]
    fn test_alpha_nudge_forwarded_once() {
        let mut store = seeded_store(&["p1"]);
        let mut bridge = bridge();
        let now = Instant::now();

        let frame = bridge.tick(&mut store, now);
        assert!(bridge.solver().last_alpha > 0.0); // insert heat
        assert!(!frame.positions.is_empty());

        let mut bridge2 = SimulationBridge::new(StubSolver::default());
        store.take_alpha_nudge();
        bridge2.tick(&mut store, now);
        bridge2.tick(&mut store, now);
        assert_eq!(bridge2.solver().last_alpha, 0.0);

        store.drag_started("p1");
        store.drag_position_changed("p1", Vec3::new(0.3, 0.0, 0.0));
        bridge2.tick(&mut store, now);
        assert!((bridge2.solver().last_alpha - store.config().drag_alpha).abs() < 1e-6);
    }

    #[test]
    fn test_highlights_expire_through_tick() {
        let mut store = seeded_store(&["p1"]);
        store.upsert_many(vec![Paper::bare("p2")], 0.2, true);
        let mut bridge = bridge();
        let now = Instant::now();

        let frame = bridge.tick(&mut store, now);
        assert_eq!(frame.highlights, vec!["p2".to_string()]);

        let later = now + Duration::from_secs(10);
        let frame = bridge.tick(&mut store, later);
        assert!(frame.highlights.is_empty());
    }

    #[test]
    fn test_animation_completes_within_ticks() {
        let mut store = seeded_store(&["p1"]);
        let mut bridge = bridge();
        let now = Instant::now();
        bridge.tick(&mut store, now);
        bridge.tick(&mut store, now);

        let target = Vec3::new(0.4, 0.0, 0.0);
        store.animate_to("p1", target, Duration::from_millis(100));
        bridge.tick(&mut store, now + Duration::from_millis(50));
        assert!(store.animations_running());

        bridge.tick(&mut store, now + Duration::from_millis(200));
        assert!(!store.animations_running());
        assert_eq!(store.find("p1").unwrap().position, target);
        assert!(store.find("p1").unwrap().is_pinned());
    }
}
