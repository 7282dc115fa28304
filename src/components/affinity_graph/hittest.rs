use super::sim::SimNode;
use super::types::Point;

/// Pick radius in world units, matching the visual node footprint.
pub const HIT_RADIUS: f64 = 45.0;

/// Whether a node passes the current cluster filter. Filtered-out nodes
/// stay in the simulation but are invisible to hit-testing and drawing.
pub fn is_visible(node: &SimNode, cluster_filter: Option<&str>) -> bool {
	match cluster_filter {
		Some(cluster) => node.member.cluster == cluster,
		None => true,
	}
}

/// Topmost visible node whose footprint contains the world point. Ties
/// between overlapping candidates resolve to the node whose center is
/// nearest the query point, so the pick matches what the cursor appears
/// to be over.
pub fn node_at<'a>(
	world: Point,
	nodes: &'a [SimNode],
	cluster_filter: Option<&str>,
) -> Option<&'a SimNode> {
	let mut best: Option<(&SimNode, f64)> = None;
	for node in nodes {
		if !is_visible(node, cluster_filter) {
			continue;
		}
		let dist = node.position().distance_to(world);
		if dist >= HIT_RADIUS {
			continue;
		}
		match best {
			Some((_, best_dist)) if best_dist <= dist => {}
			_ => best = Some((node, dist)),
		}
	}
	best.map(|(node, _)| node)
}
