use std::collections::HashMap;

/// Fallback color for clusters missing from the color map.
pub const FALLBACK_COLOR: &str = "#ea580c";

/// A community member attached to a graph node. Owned by the data layer;
/// the graph treats it as read-only payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
	pub id: String,
	pub name: String,
	pub avatar: String,
	pub description: String,
	pub tags: Vec<String>,
	pub cluster: String,
	pub role: Option<String>,
	pub post_url: Option<String>,
	pub goal: Option<String>,
}

impl Member {
	/// Minimal member for wiring and tests.
	pub fn new(id: impl Into<String>, name: impl Into<String>, cluster: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			avatar: "\u{1F60A}".into(),
			description: String::new(),
			tags: Vec::new(),
			cluster: cluster.into(),
			role: None,
			post_url: None,
			goal: None,
		}
	}
}

/// An unordered affinity edge between two member ids. Weight in [0, 1]
/// drives edge thickness and opacity; the layout spring uses a fixed
/// strength regardless of weight.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	pub source: String,
	pub target: String,
	pub weight: Option<f64>,
}

impl GraphEdge {
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			weight: None,
		}
	}

	pub fn weighted(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			weight: Some(weight),
		}
	}

	/// Effective weight; edges without one count as 0.5.
	pub fn weight_or_default(&self) -> f64 {
		self.weight.unwrap_or(0.5)
	}
}

/// Input bundle supplied by the data layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	pub members: Vec<Member>,
	pub edges: Vec<GraphEdge>,
}

/// Cluster name → CSS color token.
pub type ClusterColors = HashMap<String, String>;

/// Resolve a cluster's color, falling back for unmapped clusters.
pub fn cluster_color<'a>(colors: &'a ClusterColors, cluster: &str) -> &'a str {
	colors.get(cluster).map(String::as_str).unwrap_or(FALLBACK_COLOR)
}

/// A point in either world or screen space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance_to(self, other: Self) -> f64 {
		let (dx, dy) = (self.x - other.x, self.y - other.y);
		(dx * dx + dy * dy).sqrt()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn edge_weight_defaults_to_half() {
		assert_eq!(GraphEdge::new("a", "b").weight_or_default(), 0.5);
		assert_eq!(GraphEdge::weighted("a", "b", 0.9).weight_or_default(), 0.9);
	}

	#[test]
	fn unmapped_cluster_falls_back() {
		let mut colors = ClusterColors::new();
		colors.insert("IT".into(), "#38bdf8".into());
		assert_eq!(cluster_color(&colors, "IT"), "#38bdf8");
		assert_eq!(cluster_color(&colors, "Unknown"), FALLBACK_COLOR);
	}
}
