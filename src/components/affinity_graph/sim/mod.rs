mod forces;
mod quadtree;

use std::collections::{HashMap, HashSet};

use log::debug;

use super::types::{GraphData, Member, Point};
use forces::{ChargeParams, CollideParams, accumulate_charge, relax_collisions};
use quadtree::QuadTree;

/// Visual node disc radius in world units; collision and hit-testing key
/// off it.
pub const NODE_RADIUS: f64 = 40.0;

const LINK_DISTANCE: f64 = 150.0;
const LINK_STRENGTH: f64 = 0.5;
const CHARGE_STRENGTH: f64 = -300.0;
const CHARGE_DISTANCE_MAX: f64 = 400.0;
const COLLIDE_RADIUS: f64 = 60.0;
const COLLIDE_STRENGTH: f64 = 0.7;
const RADIAL_RADIUS: f64 = 200.0;
const RADIAL_STRENGTH: f64 = 0.1;
const VELOCITY_DECAY: f64 = 0.6;
const ALPHA_MIN: f64 = 0.001;
// 1 - pow(ALPHA_MIN, 1/300): settles in roughly 300 unhindered steps.
const ALPHA_DECAY: f64 = 0.022_760_624_580_717_5;

/// Alpha assigned while a node is being dragged.
pub const ALPHA_DRAG: f64 = 0.3;
/// Alpha assigned after a viewport resize moves the centering target.
pub const ALPHA_RESIZE: f64 = 0.1;

const GRID_COLUMNS: usize = 6;
const GRID_SPACING: f64 = 140.0;

/// Force accuracy and iteration counts chosen from the measured node count
/// rather than any user-agent sniffing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerfTier {
	High,
	Medium,
	Low,
}

impl PerfTier {
	pub fn for_node_count(n: usize) -> Self {
		match n {
			0..=50 => Self::High,
			51..=200 => Self::Medium,
			_ => Self::Low,
		}
	}

	fn theta_sq(self) -> f64 {
		match self {
			Self::High => 0.64,
			Self::Medium => 0.81,
			Self::Low => 1.21,
		}
	}

	fn collide_iterations(self) -> usize {
		match self {
			Self::High => 2,
			_ => 1,
		}
	}

	/// Skip shadows, glow and tag callouts above this tier's budget.
	pub fn simplified_render(self) -> bool {
		matches!(self, Self::Low)
	}
}

/// Mutable simulation state for one member. Owned exclusively by the
/// [`Simulation`]; outside code mutates it only through `set_pin`,
/// `clear_pin` and the drag entry points on the graph state.
#[derive(Clone, Debug)]
pub struct SimNode {
	pub id: String,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	pub fx: Option<f64>,
	pub fy: Option<f64>,
	pub degree: usize,
	pub member: Member,
}

impl SimNode {
	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}

	pub fn pinned(&self) -> bool {
		self.fx.is_some() && self.fy.is_some()
	}
}

/// Edge resolved to node indices. `bias` distributes the spring correction
/// between endpoints in proportion to their degrees, so hubs move less.
#[derive(Clone, Copy, Debug)]
pub struct Link {
	pub source: usize,
	pub target: usize,
	pub weight: f64,
	bias: f64,
}

/// Deterministic scatter for initial placement, same LCG family the sample
/// data generator uses.
struct Lcg(u64);

impl Lcg {
	fn next(&mut self) -> f64 {
		self.0 = (self.0.wrapping_mul(9301).wrapping_add(49297)) % 233_280;
		self.0 as f64 / 233_280.0
	}
}

/// Force-directed layout over the member graph. Runs one velocity-Verlet
/// style tick per `step` call, decaying alpha toward zero until settled.
pub struct Simulation {
	nodes: Vec<SimNode>,
	index: HashMap<String, usize>,
	links: Vec<Link>,
	width: f64,
	height: f64,
	alpha: f64,
	tier: PerfTier,
	rng: Lcg,
	grid_slots: usize,
	scratch_positions: Vec<Point>,
	scratch_velocities: Vec<(f64, f64)>,
}

impl Simulation {
	pub fn new(data: &GraphData, width: f64, height: f64) -> Self {
		let mut sim = Self {
			nodes: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			width,
			height,
			alpha: 1.0,
			tier: PerfTier::High,
			rng: Lcg(49_297),
			grid_slots: 0,
			scratch_positions: Vec::new(),
			scratch_velocities: Vec::new(),
		};
		sim.update_inputs(data);
		sim.alpha = 1.0;
		sim
	}

	/// Reconcile a new node/edge list against the running simulation.
	/// Nodes whose ids persist keep position, velocity and pin so the
	/// layout does not jump; removed ids are dropped, new ids placed per
	/// the initial-placement policy. Reheats to full energy.
	pub fn update_inputs(&mut self, data: &GraphData) {
		let degrees = incident_degrees(data);

		let mut nodes = Vec::with_capacity(data.members.len());
		let mut index = HashMap::with_capacity(data.members.len());
		for member in &data.members {
			if index.contains_key(&member.id) {
				// Duplicate id: first occurrence wins.
				continue;
			}
			let degree = degrees.get(member.id.as_str()).copied().unwrap_or(0);
			let node = match self.index.get(&member.id) {
				Some(&old) => {
					let prev = &self.nodes[old];
					SimNode {
						id: member.id.clone(),
						x: prev.x,
						y: prev.y,
						vx: prev.vx,
						vy: prev.vy,
						fx: prev.fx,
						fy: prev.fy,
						degree,
						member: member.clone(),
					}
				}
				None => self.place_new(member, degree),
			};
			index.insert(member.id.clone(), nodes.len());
			nodes.push(node);
		}

		let mut links = Vec::with_capacity(data.edges.len());
		for edge in &data.edges {
			let (Some(&source), Some(&target)) =
				(index.get(&edge.source), index.get(&edge.target))
			else {
				// Dangling endpoint: drop silently.
				continue;
			};
			let (ds, dt) = (
				nodes[source].degree.max(1) as f64,
				nodes[target].degree.max(1) as f64,
			);
			links.push(Link {
				source,
				target,
				weight: edge.weight_or_default().clamp(0.0, 1.0),
				bias: ds / (ds + dt),
			});
		}

		debug!(
			"simulation inputs: {} nodes, {} links ({} edges supplied)",
			nodes.len(),
			links.len(),
			data.edges.len()
		);

		self.nodes = nodes;
		self.index = index;
		self.links = links;
		self.tier = PerfTier::for_node_count(self.nodes.len());
		self.alpha = 1.0;
	}

	/// Placement for an id never seen before: connected nodes scatter over
	/// the central 60% of the viewport, isolated nodes go on a fixed grid
	/// so they start without total overlap.
	fn place_new(&mut self, member: &Member, degree: usize) -> SimNode {
		let (cx, cy) = (self.width / 2.0, self.height / 2.0);
		let (x, y) = if degree > 0 {
			(
				cx + (self.rng.next() - 0.5) * self.width * 0.6,
				cy + (self.rng.next() - 0.5) * self.height * 0.6,
			)
		} else {
			let slot = self.grid_slots;
			self.grid_slots += 1;
			let col = slot % GRID_COLUMNS;
			let row = slot / GRID_COLUMNS;
			(
				cx + (col as f64 - (GRID_COLUMNS - 1) as f64 / 2.0) * GRID_SPACING,
				cy + row as f64 * GRID_SPACING - self.height * 0.2,
			)
		};
		SimNode {
			id: member.id.clone(),
			x,
			y,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
			degree,
			member: member.clone(),
		}
	}

	/// Advance one tick. Returns false without touching state once alpha
	/// has decayed below the stop threshold.
	pub fn step(&mut self) -> bool {
		if self.alpha < ALPHA_MIN || self.nodes.is_empty() {
			return false;
		}
		self.alpha += (0.0 - self.alpha) * ALPHA_DECAY;

		self.apply_link_force();
		self.apply_charge_and_collision();
		self.apply_centering();
		self.apply_radial_grouping();
		self.integrate();
		true
	}

	fn apply_link_force(&mut self) {
		for link in &self.links {
			let (s, t) = (link.source, link.target);
			let mut dx =
				self.nodes[t].x + self.nodes[t].vx - self.nodes[s].x - self.nodes[s].vx;
			let mut dy =
				self.nodes[t].y + self.nodes[t].vy - self.nodes[s].y - self.nodes[s].vy;
			if dx == 0.0 && dy == 0.0 {
				dx = 1e-6;
				dy = 1e-6;
			}
			let len = (dx * dx + dy * dy).sqrt();
			let l = (len - LINK_DISTANCE) / len * self.alpha * LINK_STRENGTH;
			let (fx, fy) = (dx * l, dy * l);

			self.nodes[t].vx -= fx * link.bias;
			self.nodes[t].vy -= fy * link.bias;
			self.nodes[s].vx += fx * (1.0 - link.bias);
			self.nodes[s].vy += fy * (1.0 - link.bias);
		}
	}

	fn apply_charge_and_collision(&mut self) {
		if self.nodes.len() < 2 {
			return;
		}

		self.scratch_positions.clear();
		self.scratch_positions
			.extend(self.nodes.iter().map(SimNode::position));
		let Some(tree) = QuadTree::build(&self.scratch_positions) else {
			return;
		};

		let charge = ChargeParams {
			strength: CHARGE_STRENGTH,
			distance_max_sq: CHARGE_DISTANCE_MAX * CHARGE_DISTANCE_MAX,
			theta_sq: self.tier.theta_sq(),
			alpha: self.alpha,
		};
		for (i, node) in self.nodes.iter_mut().enumerate() {
			let mut v = (node.vx, node.vy);
			accumulate_charge(&tree, i, &self.scratch_positions, charge, &mut v);
			node.vx = v.0;
			node.vy = v.1;
		}

		self.scratch_velocities.clear();
		self.scratch_velocities
			.extend(self.nodes.iter().map(|n| (n.vx, n.vy)));
		let collide = CollideParams {
			radius: COLLIDE_RADIUS,
			strength: COLLIDE_STRENGTH,
		};
		for _ in 0..self.tier.collide_iterations() {
			relax_collisions(
				&tree,
				&self.scratch_positions,
				collide,
				&mut self.scratch_velocities,
			);
		}
		for (node, &(vx, vy)) in self.nodes.iter_mut().zip(&self.scratch_velocities) {
			node.vx = vx;
			node.vy = vy;
		}
	}

	/// Translate every node so the centroid sits on the viewport center.
	fn apply_centering(&mut self) {
		let n = self.nodes.len() as f64;
		let (mut sx, mut sy) = (0.0, 0.0);
		for node in &self.nodes {
			sx += node.x;
			sy += node.y;
		}
		let (dx, dy) = (sx / n - self.width / 2.0, sy / n - self.height / 2.0);
		for node in &mut self.nodes {
			node.x -= dx;
			node.y -= dy;
		}
	}

	/// Pull isolated nodes toward a ring around center so they cluster
	/// apart from the connected subgraph instead of overlapping it.
	fn apply_radial_grouping(&mut self) {
		let (cx, cy) = (self.width / 2.0, self.height / 2.0);
		for node in &mut self.nodes {
			if node.degree > 0 {
				continue;
			}
			let (dx, dy) = (node.x - cx, node.y - cy);
			let r = (dx * dx + dy * dy).sqrt().max(1e-6);
			let k = (RADIAL_RADIUS - r) * RADIAL_STRENGTH * self.alpha / r;
			node.vx += dx * k;
			node.vy += dy * k;
		}
	}

	fn integrate(&mut self) {
		for node in &mut self.nodes {
			if let (Some(fx), Some(fy)) = (node.fx, node.fy) {
				node.x = fx;
				node.y = fy;
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx *= 1.0 - VELOCITY_DECAY;
			node.vy *= 1.0 - VELOCITY_DECAY;
			node.x += node.vx;
			node.y += node.vy;
		}
	}

	/// Pin a node, snapping its position to the pin.
	pub fn set_pin(&mut self, id: &str, x: f64, y: f64) {
		if let Some(&i) = self.index.get(id) {
			let node = &mut self.nodes[i];
			node.fx = Some(x);
			node.fy = Some(y);
			node.x = x;
			node.y = y;
			node.vx = 0.0;
			node.vy = 0.0;
		}
	}

	pub fn clear_pin(&mut self, id: &str) {
		if let Some(&i) = self.index.get(id) {
			self.nodes[i].fx = None;
			self.nodes[i].fy = None;
		}
	}

	/// Unpin everything and reheat to full energy for a complete re-layout.
	pub fn reset_all_pins(&mut self) {
		for node in &mut self.nodes {
			node.fx = None;
			node.fy = None;
		}
		self.alpha = 1.0;
	}

	/// Bump alpha so the solver keeps (or resumes) running. Never cools.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
	}

	pub fn set_center(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn settled(&self) -> bool {
		self.alpha < ALPHA_MIN
	}

	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}

	pub fn links(&self) -> &[Link] {
		&self.links
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn tier(&self) -> PerfTier {
		self.tier
	}

	pub fn node_by_id(&self, id: &str) -> Option<&SimNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Axis-aligned bounding box over all node positions.
	pub fn bounding_box(&self) -> Option<(Point, Point)> {
		let first = self.nodes.first()?;
		let (mut min, mut max) = (first.position(), first.position());
		for node in &self.nodes[1..] {
			min.x = min.x.min(node.x);
			min.y = min.y.min(node.y);
			max.x = max.x.max(node.x);
			max.y = max.y.max(node.y);
		}
		Some((min, max))
	}
}

fn incident_degrees(data: &GraphData) -> HashMap<&str, usize> {
	let ids: HashSet<&str> = data.members.iter().map(|m| m.id.as_str()).collect();
	let mut degrees = HashMap::new();
	for edge in &data.edges {
		if !ids.contains(edge.source.as_str()) || !ids.contains(edge.target.as_str()) {
			continue;
		}
		*degrees.entry(edge.source.as_str()).or_insert(0) += 1;
		*degrees.entry(edge.target.as_str()).or_insert(0) += 1;
	}
	degrees
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::affinity_graph::types::GraphEdge;

	fn pair_data(weight: f64) -> GraphData {
		GraphData {
			members: vec![Member::new("a", "A", "IT"), Member::new("b", "B", "IT")],
			edges: vec![GraphEdge::weighted("a", "b", weight)],
		}
	}

	#[test]
	fn empty_simulation_steps_trivially() {
		let mut sim = Simulation::new(&GraphData::default(), 800.0, 600.0);
		assert!(!sim.step());
		assert!(sim.is_empty());
	}

	#[test]
	fn pinned_node_never_moves() {
		let mut sim = Simulation::new(&pair_data(0.5), 800.0, 600.0);
		sim.set_pin("a", 120.0, 80.0);
		for _ in 0..200 {
			sim.step();
		}
		let a = sim.node_by_id("a").unwrap();
		assert_eq!((a.x, a.y), (120.0, 80.0));
		assert_eq!((a.vx, a.vy), (0.0, 0.0));
	}

	#[test]
	fn linked_pair_converges_to_link_distance() {
		let mut sim = Simulation::new(&pair_data(0.9), 800.0, 600.0);
		for _ in 0..100 {
			sim.step();
		}
		let a = sim.node_by_id("a").unwrap().position();
		let b = sim.node_by_id("b").unwrap().position();
		let dist = a.distance_to(b);
		assert!(
			(dist - LINK_DISTANCE).abs() <= LINK_DISTANCE * 0.1,
			"pair settled at {dist}, expected {LINK_DISTANCE} +/- 10%"
		);
	}

	#[test]
	fn dangling_edges_are_filtered() {
		let data = GraphData {
			members: vec![Member::new("a", "A", "IT")],
			edges: vec![GraphEdge::new("a", "gone")],
		};
		let sim = Simulation::new(&data, 800.0, 600.0);
		assert!(sim.links().is_empty());
		assert_eq!(sim.nodes().len(), 1);
	}

	#[test]
	fn update_inputs_drops_edges_of_removed_nodes() {
		let mut sim = Simulation::new(&pair_data(0.5), 800.0, 600.0);
		assert_eq!(sim.links().len(), 1);

		let shrunk = GraphData {
			members: vec![Member::new("a", "A", "IT")],
			edges: vec![GraphEdge::new("a", "b")],
		};
		sim.update_inputs(&shrunk);
		assert!(sim.links().is_empty());
		assert_eq!(sim.nodes().len(), 1);
	}

	#[test]
	fn update_inputs_preserves_surviving_state() {
		let mut sim = Simulation::new(&pair_data(0.5), 800.0, 600.0);
		sim.set_pin("a", 33.0, 44.0);
		for _ in 0..10 {
			sim.step();
		}
		let b_before = sim.node_by_id("b").unwrap().position();

		let mut data = pair_data(0.5);
		data.members.push(Member::new("c", "C", "Art"));
		sim.update_inputs(&data);

		let a = sim.node_by_id("a").unwrap();
		assert_eq!((a.fx, a.fy), (Some(33.0), Some(44.0)));
		assert_eq!(sim.node_by_id("b").unwrap().position(), b_before);
		assert!(sim.node_by_id("c").is_some());
		assert_eq!(sim.alpha(), 1.0);
	}

	#[test]
	fn duplicate_ids_keep_first_occurrence() {
		let data = GraphData {
			members: vec![
				Member::new("a", "First", "IT"),
				Member::new("a", "Second", "Art"),
			],
			edges: vec![],
		};
		let sim = Simulation::new(&data, 800.0, 600.0);
		assert_eq!(sim.nodes().len(), 1);
		assert_eq!(sim.node_by_id("a").unwrap().member.name, "First");
	}

	#[test]
	fn connected_nodes_start_in_central_region() {
		let sim = Simulation::new(&pair_data(0.5), 1000.0, 1000.0);
		for node in sim.nodes() {
			assert!(node.x >= 200.0 && node.x <= 800.0, "x = {}", node.x);
			assert!(node.y >= 200.0 && node.y <= 800.0, "y = {}", node.y);
		}
	}

	#[test]
	fn isolated_nodes_start_on_distinct_grid_slots() {
		let data = GraphData {
			members: (0..8).map(|i| Member::new(format!("n{i}"), "N", "IT")).collect(),
			edges: vec![],
		};
		let sim = Simulation::new(&data, 800.0, 600.0);
		let mut seen = std::collections::HashSet::new();
		for node in sim.nodes() {
			assert!(
				seen.insert((node.x.round() as i64, node.y.round() as i64)),
				"grid slot reused at ({}, {})",
				node.x,
				node.y
			);
		}
	}

	#[test]
	fn isolated_nodes_drift_toward_ring() {
		let data = GraphData {
			members: vec![Member::new("lone1", "L", "IT"), Member::new("lone2", "L", "IT")],
			edges: vec![],
		};
		let mut sim = Simulation::new(&data, 800.0, 600.0);
		for _ in 0..400 {
			sim.step();
		}
		let center = Point::new(400.0, 300.0);
		for node in sim.nodes() {
			let r = node.position().distance_to(center);
			assert!(
				(150.0..=300.0).contains(&r),
				"isolated node settled at radius {r}, expected near {RADIAL_RADIUS}"
			);
		}
	}

	#[test]
	fn alpha_decays_until_settled_and_reheats() {
		let mut sim = Simulation::new(&pair_data(0.5), 800.0, 600.0);
		let mut steps = 0;
		while sim.step() {
			steps += 1;
			assert!(steps < 1000, "simulation failed to settle");
		}
		assert!(sim.settled());

		sim.reheat(ALPHA_DRAG);
		assert!(!sim.settled());
		assert!(sim.step());
	}

	#[test]
	fn reset_all_pins_unpins_and_reheats_fully() {
		let mut sim = Simulation::new(&pair_data(0.5), 800.0, 600.0);
		sim.set_pin("a", 10.0, 10.0);
		sim.set_pin("b", 700.0, 500.0);
		sim.reset_all_pins();
		assert!(sim.nodes().iter().all(|n| !n.pinned()));
		assert_eq!(sim.alpha(), 1.0);
	}

	#[test]
	fn perf_tier_tracks_node_count() {
		assert_eq!(PerfTier::for_node_count(10), PerfTier::High);
		assert_eq!(PerfTier::for_node_count(120), PerfTier::Medium);
		assert_eq!(PerfTier::for_node_count(500), PerfTier::Low);
		assert!(PerfTier::Low.simplified_render());
		assert!(!PerfTier::High.simplified_render());
	}
}
