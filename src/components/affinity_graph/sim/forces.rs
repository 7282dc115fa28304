use super::quadtree::QuadTree;
use crate::components::affinity_graph::types::Point;

#[derive(Clone, Copy)]
pub struct ChargeParams {
	/// Negative for repulsion.
	pub strength: f64,
	pub distance_max_sq: f64,
	/// Barnes-Hut accuracy: larger accepts coarser approximations.
	pub theta_sq: f64,
	pub alpha: f64,
}

#[derive(Clone, Copy)]
pub struct CollideParams {
	pub radius: f64,
	pub strength: f64,
}

/// Deterministic jitter direction for coincident points, so overlapping
/// nodes separate instead of dividing by zero.
fn jitter(index: usize) -> (f64, f64) {
	let angle = (index as f64 * 0.618_034).fract() * std::f64::consts::TAU;
	(angle.cos(), angle.sin())
}

/// Accumulate many-body repulsion on one node by walking the quadtree,
/// replacing far cells with their aggregate center of mass.
pub fn accumulate_charge(
	tree: &QuadTree,
	index: usize,
	positions: &[Point],
	params: ChargeParams,
	velocity: &mut (f64, f64),
) {
	if tree.mass <= 0.0 {
		return;
	}

	let p = positions[index];
	let dx = tree.center_of_mass.x - p.x;
	let dy = tree.center_of_mass.y - p.y;
	let dist_sq = (dx * dx + dy * dy).max(1.0);

	if !tree.is_leaf() {
		let side = tree.bounds.side_length();
		let can_approximate = !tree.bounds.contains(p) && side * side < params.theta_sq * dist_sq;
		if can_approximate {
			if dist_sq < params.distance_max_sq {
				let w = params.strength * tree.mass * params.alpha / dist_sq;
				velocity.0 += dx * w;
				velocity.1 += dy * w;
			}
			return;
		}
		for child in tree.children.iter().flatten() {
			accumulate_charge(child, index, positions, params, velocity);
		}
		return;
	}

	for &other in &tree.indices {
		if other == index {
			continue;
		}
		let (mut dx, mut dy) = (positions[other].x - p.x, positions[other].y - p.y);
		let mut dist_sq = dx * dx + dy * dy;
		if dist_sq >= params.distance_max_sq {
			continue;
		}
		if dist_sq < 1.0 {
			let (jx, jy) = jitter(index.wrapping_add(other));
			dx = jx;
			dy = jy;
			dist_sq = 1.0;
		}
		let w = params.strength * params.alpha / dist_sq;
		velocity.0 += dx * w;
		velocity.1 += dy * w;
	}
}

/// One relaxation pass pushing overlapping discs apart. Pairs are pruned
/// through the quadtree so far-apart regions never interact. Overlap is
/// measured at `position + velocity`, so a later pass sees the separation
/// already accumulated by earlier ones.
pub fn relax_collisions(
	tree: &QuadTree,
	positions: &[Point],
	params: CollideParams,
	velocities: &mut [(f64, f64)],
) {
	collide_pair(tree, tree, true, positions, params, velocities);
}

fn collide_pair(
	a: &QuadTree,
	b: &QuadTree,
	same: bool,
	positions: &[Point],
	params: CollideParams,
	velocities: &mut [(f64, f64)],
) {
	let min_dist = params.radius * 2.0;
	// Closest possible approach between the two cells.
	let gap_x = (a.bounds.center.x - b.bounds.center.x).abs()
		- (a.bounds.half_extent + b.bounds.half_extent);
	let gap_y = (a.bounds.center.y - b.bounds.center.y).abs()
		- (a.bounds.half_extent + b.bounds.half_extent);
	if gap_x.max(0.0) > min_dist || gap_y.max(0.0) > min_dist {
		return;
	}

	if a.is_leaf() && b.is_leaf() {
		if same {
			for i in 0..a.indices.len() {
				for j in (i + 1)..a.indices.len() {
					resolve_overlap(a.indices[i], a.indices[j], positions, params, velocities);
				}
			}
		} else {
			for &i in &a.indices {
				for &j in &b.indices {
					resolve_overlap(i, j, positions, params, velocities);
				}
			}
		}
		return;
	}

	if same {
		for first in 0..4 {
			let Some(child_a) = a.children[first].as_ref() else {
				continue;
			};
			collide_pair(child_a, child_a, true, positions, params, velocities);
			for second in (first + 1)..4 {
				let Some(child_b) = a.children[second].as_ref() else {
					continue;
				};
				collide_pair(child_a, child_b, false, positions, params, velocities);
			}
		}
		return;
	}

	let split_a = if a.is_leaf() {
		false
	} else if b.is_leaf() {
		true
	} else {
		a.bounds.half_extent >= b.bounds.half_extent
	};

	if split_a {
		for child in a.children.iter().flatten() {
			collide_pair(child, b, false, positions, params, velocities);
		}
	} else {
		for child in b.children.iter().flatten() {
			collide_pair(a, child, false, positions, params, velocities);
		}
	}
}

fn resolve_overlap(
	i: usize,
	j: usize,
	positions: &[Point],
	params: CollideParams,
	velocities: &mut [(f64, f64)],
) {
	let min_dist = params.radius * 2.0;
	let (mut dx, mut dy) = (
		positions[i].x + velocities[i].0 - positions[j].x - velocities[j].0,
		positions[i].y + velocities[i].1 - positions[j].y - velocities[j].1,
	);
	let mut dist = (dx * dx + dy * dy).sqrt();
	if dist >= min_dist {
		return;
	}
	if dist < 1e-4 {
		let (jx, jy) = jitter(i.wrapping_mul(31).wrapping_add(j));
		dx = jx;
		dy = jy;
		dist = 1.0;
	}

	let push = (min_dist - dist) / dist * params.strength * 0.5;
	velocities[i].0 += dx * push;
	velocities[i].1 += dy * push;
	velocities[j].0 -= dx * push;
	velocities[j].1 -= dy * push;
}
