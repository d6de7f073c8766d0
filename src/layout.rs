//! Spatial placement for new nodes and cluster reassignment.
//!
//! Node seeding and cluster layout both use the Fibonacci lattice: n points
//! approximately evenly distributed on a sphere. Cluster reassignment uses a
//! two-level lattice (cluster centers on a major sphere, members on minor
//! spheres) and animates each node's fixed position toward its target.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::model::Vec3;

/// Golden-angle longitude step for the lattice. Two constants circulate for
/// this spiral (0.5(1+sqrt(5)) and pi(1+sqrt(5))); the layouts here were tuned
/// against the smaller one, so that is the one we keep.
pub const GOLDEN_ANGLE: f32 = 1.618_034; // 0.5 * (1 + sqrt(5))

const TAU: f32 = std::f32::consts::TAU;

/// Generate `n` points on a sphere of `radius` around `center` using the
/// Fibonacci lattice (https://observablehq.com/@meetamit/fibonacci-lattices).
///
/// A random longitude offset is drawn once per call so successive batches do
/// not land on identical spirals. Deterministic for a fixed `rng`.
pub fn lattice_positions<R: Rng>(n: usize, center: Vec3, radius: f32, rng: &mut R) -> Vec<Vec3> {
    let mut positions = Vec::with_capacity(n);
    if n == 0 {
        return positions;
    }
    let rand_offset: f32 = rng.gen_range(0.0..TAU);
    for i in 0..n {
        let phi = (1.0 - (2.0 * (i as f32 + 0.5)) / n as f32).acos(); // latitude
        let theta = (GOLDEN_ANGLE * i as f32 + rand_offset) % TAU; // longitude
        positions.push(Vec3::new(
            center.x + radius * phi.sin() * theta.cos(),
            center.y + radius * phi.sin() * theta.sin(),
            center.z + radius * phi.cos(),
        ));
    }
    positions
}

/// Target positions for a cluster assignment: one center per cluster on the
/// major sphere, then one lattice per cluster on a minor sphere around its
/// center. The first member of each cluster sits on the center itself (it is
/// the hub of the star topology).
pub fn cluster_layout<R: Rng>(
    cluster_sizes: &[usize],
    major_radius: f32,
    minor_radius: f32,
    rng: &mut R,
) -> (Vec<Vec3>, Vec<Vec<Vec3>>) {
    let centers = lattice_positions(cluster_sizes.len(), Vec3::ZERO, major_radius, rng);
    let members = cluster_sizes
        .iter()
        .zip(centers.iter())
        .map(|(&size, &center)| {
            let mut positions = lattice_positions(size, center, minor_radius, rng);
            if !positions.is_empty() {
                positions[0] = center;
            }
            positions
        })
        .collect();
    (centers, members)
}

/// Ease-out curve: fast start, settles smoothly. `t` is normalized time.
pub fn ease_out(t: f32) -> f32 {
    t * (2.0 - t)
}

/// In-flight animation of one node's pinned position.
///
/// While running, each tick writes the interpolated point into the paper's
/// `fixed` position so the solver holds the node on the animated path.
#[derive(Debug, Clone)]
pub struct NodeAnimation {
    pub paper_id: String,
    start: Vec3,
    target: Vec3,
    started: Instant,
    duration: Duration,
}

impl NodeAnimation {
    pub fn new(paper_id: &str, start: Vec3, target: Vec3, duration: Duration) -> Self {
        NodeAnimation {
            paper_id: paper_id.to_string(),
            start,
            target,
            started: Instant::now(),
            duration,
        }
    }

    /// Position at `now`, and whether the animation has finished.
    pub fn sample(&self, now: Instant) -> (Vec3, bool) {
        let elapsed = now.saturating_duration_since(self.started);
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        };
        (self.start.lerp(&self.target, ease_out(t)), t >= 1.0)
    }
}
