use log::info;

use super::hittest::{self, is_visible};
use super::sim::{ALPHA_DRAG, ALPHA_RESIZE, Simulation};
use super::types::{GraphData, Member, Point};
use super::viewport::{
	BUTTON_ZOOM_STEP, ViewTransform, Viewport, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};

/// Net screen displacement below which a press-release pair counts as a
/// click instead of a drag.
pub const CLICK_THRESHOLD_PX: f64 = 5.0;
/// Drag/pan moves are coalesced to roughly one per display frame.
const MOVE_THROTTLE_MS: f64 = 16.0;
const TRANSITION_MS: f64 = 600.0;
const FIT_PADDING: f64 = 80.0;

/// A qualifying click: the member payload plus a canvas-relative screen
/// anchor for the consumer's popup.
#[derive(Clone, Debug)]
pub struct NodeClick {
	pub member: Member,
	pub screen: Point,
}

/// Pointer gesture in progress.
#[derive(Clone, Debug, PartialEq)]
enum Gesture {
	Idle,
	Dragging { id: String, press: Point },
	Panning { offset: Point },
}

/// The one owned mutable store behind the graph view: simulation, viewport
/// and interaction state, with defined mutation entry points. The renderer
/// and host component only read from it or call these methods.
pub struct GraphState {
	pub sim: Simulation,
	pub viewport: Viewport,
	gesture: Gesture,
	hovered: Option<String>,
	cluster_filter: Option<String>,
	width: f64,
	height: f64,
	last_move_ms: f64,
	needs_draw: bool,
}

impl GraphState {
	pub fn new(data: &GraphData, width: f64, height: f64) -> Self {
		info!(
			"graph state initialized: {} members, {} edges, {}x{}",
			data.members.len(),
			data.edges.len(),
			width,
			height
		);
		Self {
			sim: Simulation::new(data, width, height),
			viewport: Viewport::default(),
			gesture: Gesture::Idle,
			hovered: None,
			cluster_filter: None,
			width,
			height,
			last_move_ms: f64::NEG_INFINITY,
			needs_draw: true,
		}
	}

	/// Swap in a new node/edge list, preserving surviving node state.
	pub fn set_data(&mut self, data: &GraphData) {
		self.sim.update_inputs(data);
		if let Some(id) = &self.hovered
			&& self.sim.node_by_id(id).is_none()
		{
			self.hovered = None;
		}
		self.needs_draw = true;
	}

	/// Restrict visibility to one cluster (`None` shows all). Filtered
	/// nodes stay in the simulation; only drawing and hit-testing skip
	/// them.
	pub fn set_cluster_filter(&mut self, cluster: Option<String>) {
		self.cluster_filter = cluster;
		if let Some(id) = &self.hovered {
			let hidden = self
				.sim
				.node_by_id(id)
				.is_none_or(|n| !is_visible(n, self.cluster_filter.as_deref()));
			if hidden {
				self.hovered = None;
			}
		}
		self.needs_draw = true;
	}

	pub fn cluster_filter(&self) -> Option<&str> {
		self.cluster_filter.as_deref()
	}

	pub fn hovered_id(&self) -> Option<&str> {
		self.hovered.as_deref()
	}

	pub fn dragged_id(&self) -> Option<&str> {
		match &self.gesture {
			Gesture::Dragging { id, .. } => Some(id),
			_ => None,
		}
	}

	/// CSS cursor matching the current gesture/hover state.
	pub fn cursor(&self) -> &'static str {
		match self.gesture {
			Gesture::Dragging { .. } | Gesture::Panning { .. } => "grabbing",
			Gesture::Idle if self.hovered.is_some() => "pointer",
			Gesture::Idle => "grab",
		}
	}

	// --- pointer state machine -------------------------------------------

	/// Pointer pressed at a canvas-relative screen point: start a drag on a
	/// node (pinning it in place so physics cannot fight the drag) or a pan
	/// on empty space.
	pub fn pointer_down(&mut self, screen: Point) {
		let world = self.viewport.screen_to_world(screen);
		let hit = hittest::node_at(world, self.sim.nodes(), self.cluster_filter.as_deref())
			.map(|n| (n.id.clone(), n.position()));

		match hit {
			Some((id, pos)) => {
				self.sim.set_pin(&id, pos.x, pos.y);
				self.sim.reheat(ALPHA_DRAG);
				self.gesture = Gesture::Dragging { id, press: screen };
			}
			None => {
				// Record the pointer-to-pan offset so each move computes an
				// absolute pan, avoiding accumulated-delta drift.
				let t = self.viewport.transform();
				self.gesture = Gesture::Panning {
					offset: Point::new(screen.x - t.x, screen.y - t.y),
				};
			}
		}
		self.needs_draw = true;
	}

	pub fn pointer_move(&mut self, screen: Point, now_ms: f64) {
		match &self.gesture {
			Gesture::Dragging { id, .. } => {
				if now_ms - self.last_move_ms < MOVE_THROTTLE_MS {
					return;
				}
				self.last_move_ms = now_ms;
				let id = id.clone();
				let world = self.viewport.screen_to_world(screen);
				self.sim.set_pin(&id, world.x, world.y);
				self.sim.reheat(ALPHA_DRAG);
				self.needs_draw = true;
			}
			Gesture::Panning { offset } => {
				if now_ms - self.last_move_ms < MOVE_THROTTLE_MS {
					return;
				}
				self.last_move_ms = now_ms;
				let (x, y) = (screen.x - offset.x, screen.y - offset.y);
				self.viewport.set_pan(x, y);
				self.needs_draw = true;
			}
			Gesture::Idle => self.update_hover(screen),
		}
	}

	/// Pointer released. A sub-threshold drag resolves as a click and
	/// reports the node's payload with its current screen anchor; anything
	/// longer keeps the pin where the node was dropped.
	pub fn pointer_up(&mut self, screen: Point) -> Option<NodeClick> {
		let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
		self.needs_draw = true;

		let Gesture::Dragging { id, press } = gesture else {
			return None;
		};

		let node = self.sim.node_by_id(&id)?;
		if press.distance_to(screen) < CLICK_THRESHOLD_PX {
			return Some(NodeClick {
				member: node.member.clone(),
				screen: self.viewport.world_to_screen(node.position()),
			});
		}
		// Completed drag: the pin already tracks the drop position.
		None
	}

	/// Pointer left the canvas: commit any in-progress drag (no click) and
	/// clear hover so the node is not stuck highlighted.
	pub fn pointer_leave(&mut self) {
		self.gesture = Gesture::Idle;
		self.hovered = None;
		self.needs_draw = true;
	}

	fn update_hover(&mut self, screen: Point) {
		let world = self.viewport.screen_to_world(screen);
		let id = hittest::node_at(world, self.sim.nodes(), self.cluster_filter.as_deref())
			.map(|n| n.id.clone());
		if id != self.hovered {
			self.hovered = id;
			self.needs_draw = true;
		}
	}

	/// Wheel zoom about the cursor position.
	pub fn wheel(&mut self, delta_y: f64, pivot: Point) {
		let factor = if delta_y < 0.0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
		self.viewport.zoom_by(factor, pivot);
		self.needs_draw = true;
	}

	// --- imperative control surface --------------------------------------

	pub fn zoom_in(&mut self) {
		self.viewport
			.zoom_by(BUTTON_ZOOM_STEP, Point::new(self.width / 2.0, self.height / 2.0));
		self.needs_draw = true;
	}

	pub fn zoom_out(&mut self) {
		self.viewport.zoom_by(
			1.0 / BUTTON_ZOOM_STEP,
			Point::new(self.width / 2.0, self.height / 2.0),
		);
		self.needs_draw = true;
	}

	pub fn reset_view(&mut self) {
		self.viewport.reset();
		self.needs_draw = true;
	}

	/// Unpin every node and reheat fully for a complete re-layout.
	pub fn reset_layout(&mut self) {
		self.sim.reset_all_pins();
		self.needs_draw = true;
	}

	/// Animate the pan so the node sits at the viewport center, keeping the
	/// current zoom.
	pub fn center_on_node(&mut self, id: &str, now_ms: f64) {
		let Some(node) = self.sim.node_by_id(id) else {
			return;
		};
		let k = self.viewport.zoom();
		let target = ViewTransform {
			x: self.width / 2.0 - node.x * k,
			y: self.height / 2.0 - node.y * k,
			k,
		};
		self.viewport.animate_to(target, TRANSITION_MS, now_ms);
	}

	/// Animate to a transform fitting every node inside the viewport.
	pub fn fit_to_view(&mut self, now_ms: f64) {
		let Some((min, max)) = self.sim.bounding_box() else {
			return;
		};
		let target = Viewport::fit_transform(min, max, self.width, self.height, FIT_PADDING);
		self.viewport.animate_to(target, TRANSITION_MS, now_ms);
	}

	pub fn node_by_id(&self, id: &str) -> Option<&super::sim::SimNode> {
		self.sim.node_by_id(id)
	}

	// --- frame scheduling -------------------------------------------------

	/// Viewport resized: recenter the simulation target and give it a small
	/// energy bump so the layout drifts toward the new center.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.sim.set_center(width, height);
		self.sim.reheat(ALPHA_RESIZE);
		self.needs_draw = true;
	}

	pub fn size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	/// One animation-frame tick: advance the viewport tween and the
	/// simulation, and report whether anything needs repainting. Redundant
	/// draw requests between frames collapse into the single flag.
	pub fn frame(&mut self, now_ms: f64) -> bool {
		let mut dirty = self.viewport.tick(now_ms);
		if self.sim.step() {
			dirty = true;
		}
		if self.needs_draw {
			self.needs_draw = false;
			dirty = true;
		}
		dirty
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::affinity_graph::types::GraphEdge;

	fn two_node_state() -> GraphState {
		let data = GraphData {
			members: vec![Member::new("a", "A", "IT"), Member::new("b", "B", "Art")],
			edges: vec![GraphEdge::new("a", "b")],
		};
		let mut state = GraphState::new(&data, 800.0, 600.0);
		// Park the nodes at known spots; the identity transform makes
		// screen and world coincide.
		state.sim.set_pin("a", 100.0, 100.0);
		state.sim.set_pin("b", 500.0, 400.0);
		state
	}

	#[test]
	fn short_press_on_node_fires_exactly_one_click() {
		let mut state = two_node_state();
		state.pointer_down(Point::new(102.0, 101.0));
		state.pointer_move(Point::new(103.0, 101.0), 100.0);
		let click = state.pointer_up(Point::new(103.0, 101.0));

		let click = click.expect("sub-threshold release must click");
		assert_eq!(click.member.id, "a");
		// Release again without a press: no further events.
		assert!(state.pointer_up(Point::new(103.0, 101.0)).is_none());
	}

	#[test]
	fn click_reports_node_screen_anchor() {
		let mut state = two_node_state();
		state.viewport.set_pan(50.0, -20.0);
		state.pointer_down(Point::new(150.0, 80.0)); // world (100, 100)
		let click = state.pointer_up(Point::new(150.0, 80.0)).unwrap();
		assert!((click.screen.x - 150.0).abs() < 1e-9);
		assert!((click.screen.y - 80.0).abs() < 1e-9);
	}

	#[test]
	fn long_drag_pins_at_drop_point_without_click() {
		let mut state = two_node_state();
		state.pointer_down(Point::new(100.0, 100.0));
		state.pointer_move(Point::new(300.0, 100.0), 100.0);
		let click = state.pointer_up(Point::new(300.0, 100.0));

		assert!(click.is_none(), "a 200px drag must not click");
		let a = state.node_by_id("a").unwrap();
		assert_eq!((a.fx, a.fy), (Some(300.0), Some(100.0)));
		assert_eq!((a.x, a.y), (300.0, 100.0));
	}

	#[test]
	fn drag_reheats_the_simulation() {
		let mut state = two_node_state();
		while state.sim.step() {}
		assert!(state.sim.settled());

		state.pointer_down(Point::new(100.0, 100.0));
		assert!(!state.sim.settled());
	}

	#[test]
	fn drag_moves_are_throttled() {
		let mut state = two_node_state();
		state.pointer_down(Point::new(100.0, 100.0));
		state.pointer_move(Point::new(200.0, 100.0), 100.0);
		// 5ms later: dropped by the throttle.
		state.pointer_move(Point::new(250.0, 100.0), 105.0);
		let a = state.node_by_id("a").unwrap();
		assert_eq!(a.x, 200.0);
		// Past the frame budget: applied.
		state.pointer_move(Point::new(250.0, 100.0), 120.0);
		assert_eq!(state.node_by_id("a").unwrap().x, 250.0);
	}

	#[test]
	fn pan_computes_absolute_offset_without_drift() {
		let mut state = two_node_state();
		state.pointer_down(Point::new(700.0, 500.0)); // empty space
		state.pointer_move(Point::new(720.0, 510.0), 100.0);
		let t = state.viewport.transform();
		assert_eq!((t.x, t.y), (20.0, 10.0));

		// Jumping straight to a far point lands exactly, no accumulation.
		state.pointer_move(Point::new(800.0, 400.0), 200.0);
		let t = state.viewport.transform();
		assert_eq!((t.x, t.y), (100.0, -100.0));

		assert!(state.pointer_up(Point::new(800.0, 400.0)).is_none());
	}

	#[test]
	fn pointer_leave_commits_drag_and_clears_hover() {
		let mut state = two_node_state();
		state.pointer_move(Point::new(100.0, 100.0), 100.0);
		assert_eq!(state.hovered_id(), Some("a"));

		state.pointer_down(Point::new(100.0, 100.0));
		state.pointer_move(Point::new(260.0, 140.0), 200.0);
		state.pointer_leave();

		assert!(state.dragged_id().is_none());
		assert!(state.hovered_id().is_none());
		let a = state.node_by_id("a").unwrap();
		assert_eq!((a.fx, a.fy), (Some(260.0), Some(140.0)));
	}

	#[test]
	fn hover_ignores_filtered_clusters_and_clears_on_filter_change() {
		let mut state = two_node_state();
		state.pointer_move(Point::new(100.0, 100.0), 100.0);
		assert_eq!(state.hovered_id(), Some("a"));

		// Hiding A's cluster drops the hover and makes A unpickable.
		state.set_cluster_filter(Some("Art".into()));
		assert!(state.hovered_id().is_none());
		state.pointer_move(Point::new(100.0, 100.0), 200.0);
		assert!(state.hovered_id().is_none());
		assert_eq!(state.sim.nodes().len(), 2);
	}

	#[test]
	fn hover_does_not_update_while_dragging() {
		let mut state = two_node_state();
		state.pointer_down(Point::new(100.0, 100.0));
		// Drag across B's position: hover must stay untouched.
		state.pointer_move(Point::new(500.0, 400.0), 100.0);
		assert!(state.hovered_id().is_none());
		assert_eq!(state.dragged_id(), Some("a"));
	}

	#[test]
	fn wheel_zooms_about_cursor() {
		let mut state = two_node_state();
		let pivot = Point::new(250.0, 180.0);
		let before = state.viewport.screen_to_world(pivot);
		state.wheel(-100.0, pivot);
		assert!(state.viewport.zoom() > 1.0);
		let after = state.viewport.screen_to_world(pivot);
		assert!((before.x - after.x).abs() < 1e-9);
		assert!((before.y - after.y).abs() < 1e-9);
	}

	#[test]
	fn frame_coalesces_draw_requests() {
		let mut state = two_node_state();
		while state.sim.step() {}
		assert!(state.frame(0.0), "initial dirty flag draws once");
		assert!(!state.frame(16.0), "nothing changed, nothing to draw");

		state.wheel(-100.0, Point::new(0.0, 0.0));
		state.wheel(-100.0, Point::new(0.0, 0.0));
		assert!(state.frame(32.0), "interaction marks the frame dirty");
		assert!(!state.frame(48.0));
	}

	#[test]
	fn center_on_node_animates_node_to_viewport_center() {
		let mut state = two_node_state();
		state.center_on_node("b", 1000.0);
		assert!(state.viewport.animating());
		state.viewport.tick(2000.0); // past the transition
		let screen = state.viewport.world_to_screen(Point::new(500.0, 400.0));
		assert!((screen.x - 400.0).abs() < 1e-9);
		assert!((screen.y - 300.0).abs() < 1e-9);
	}

	#[test]
	fn controls_are_noops_on_empty_graph() {
		let mut state = GraphState::new(&GraphData::default(), 800.0, 600.0);
		state.center_on_node("missing", 0.0);
		state.fit_to_view(0.0);
		state.reset_layout();
		assert!(!state.viewport.animating());
		assert!(state.node_by_id("missing").is_none());
	}

	#[test]
	fn resize_recenters_and_reheats() {
		let mut state = two_node_state();
		while state.sim.step() {}
		state.resize(1024.0, 768.0);
		assert_eq!(state.size(), (1024.0, 768.0));
		assert!(!state.sim.settled());
	}
}
