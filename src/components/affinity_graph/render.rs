use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::hittest::is_visible;
use super::sim::{NODE_RADIUS, SimNode};
use super::state::GraphState;
use super::types::{ClusterColors, cluster_color};

const BACKGROUND: &str = "#0a0a0a";
const GRID_SPACING: f64 = 50.0;
const MAX_CALLOUT_TAGS: usize = 3;

/// Edge visual style as a monotonic function of affinity weight.
pub fn edge_style(weight: f64) -> (f64, f64) {
	(0.4 + weight * 0.4, 1.5 + weight * 3.0)
}

/// Paint one frame. Reads simulation positions, the viewport transform and
/// interaction state; never mutates any of them. Draw order back to front:
/// background and grid, edges, nodes with labels, then tag callouts for the
/// hovered or dragged node.
pub fn render(state: &GraphState, ctx: &CanvasRenderingContext2d, colors: &ClusterColors) {
	let (width, height) = state.size();
	if width <= 0.0 || height <= 0.0 {
		return;
	}

	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, width, height);
	draw_grid(ctx, width, height);

	let t = state.viewport.transform();
	ctx.save();
	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);

	let filter = state.cluster_filter();
	let simplified = state.sim.tier().simplified_render();

	draw_edges(state, ctx, filter);

	let mut active: Option<&SimNode> = None;
	for node in state.sim.nodes() {
		if !is_visible(node, filter) {
			continue;
		}
		let is_hovered = state.hovered_id() == Some(node.id.as_str());
		let is_dragged = state.dragged_id() == Some(node.id.as_str());
		if is_hovered || is_dragged {
			active = Some(node);
		}
		draw_node(ctx, node, colors, is_hovered || is_dragged, simplified);
	}

	// Callouts go above every other node.
	if let Some(node) = active
		&& !simplified
	{
		draw_tag_callouts(ctx, node, colors);
	}

	ctx.restore();
}

/// Faint screen-space line grid under the scene.
fn draw_grid(ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.03)");
	ctx.set_line_width(1.0);
	let mut x = 0.0;
	while x < width {
		ctx.begin_path();
		ctx.move_to(x, 0.0);
		ctx.line_to(x, height);
		ctx.stroke();
		x += GRID_SPACING;
	}
	let mut y = 0.0;
	while y < height {
		ctx.begin_path();
		ctx.move_to(0.0, y);
		ctx.line_to(width, y);
		ctx.stroke();
		y += GRID_SPACING;
	}
}

fn draw_edges(state: &GraphState, ctx: &CanvasRenderingContext2d, filter: Option<&str>) {
	let nodes = state.sim.nodes();
	for link in state.sim.links() {
		let (source, target) = (&nodes[link.source], &nodes[link.target]);
		if !is_visible(source, filter) || !is_visible(target, filter) {
			continue;
		}
		let (opacity, width) = edge_style(link.weight);
		ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {opacity})"));
		ctx.set_line_width(width);
		ctx.begin_path();
		ctx.move_to(source.x, source.y);
		ctx.line_to(target.x, target.y);
		ctx.stroke();
	}
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	node: &SimNode,
	colors: &ClusterColors,
	active: bool,
	simplified: bool,
) {
	let color = cluster_color(colors, &node.member.cluster);
	let (x, y) = (node.x, node.y);

	if active && !simplified {
		if let Ok(glow) = ctx.create_radial_gradient(x, y, 0.0, x, y, NODE_RADIUS * 2.0) {
			let _ = glow.add_color_stop(0.0, &format!("{color}33"));
			let _ = glow.add_color_stop(1.0, "transparent");
			ctx.begin_path();
			let _ = ctx.arc(x, y, NODE_RADIUS * 2.0, 0.0, 2.0 * PI);
			ctx.set_fill_style_canvas_gradient(&glow);
			ctx.fill();
		}
	}

	if !simplified {
		ctx.set_shadow_color("rgba(0, 0, 0, 0.5)");
		ctx.set_shadow_blur(10.0);
		ctx.set_shadow_offset_x(2.0);
		ctx.set_shadow_offset_y(2.0);
	}

	// Cluster-colored ring fading outward.
	ctx.begin_path();
	let _ = ctx.arc(x, y, NODE_RADIUS + 2.0, 0.0, 2.0 * PI);
	match ctx.create_radial_gradient(x, y, 0.0, x, y, NODE_RADIUS) {
		Ok(gradient) => {
			let _ = gradient.add_color_stop(0.0, color);
			let _ = gradient.add_color_stop(1.0, &format!("{color}88"));
			ctx.set_fill_style_canvas_gradient(&gradient);
		}
		Err(_) => ctx.set_fill_style_str(color),
	}
	ctx.fill();

	ctx.set_shadow_color("transparent");
	ctx.set_shadow_blur(0.0);
	ctx.set_shadow_offset_x(0.0);
	ctx.set_shadow_offset_y(0.0);

	// Dark disc behind the avatar glyph.
	ctx.set_fill_style_str("#1a1a1a");
	ctx.begin_path();
	let _ = ctx.arc(x, y, NODE_RADIUS, 0.0, 2.0 * PI);
	ctx.fill();

	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	ctx.set_font(&format!("{}px Arial, sans-serif", NODE_RADIUS * 0.7));
	ctx.set_fill_style_str("#ffffff");
	let _ = ctx.fill_text(&node.member.avatar, x, y + 2.0);

	ctx.set_fill_style_str("#ffffff");
	ctx.set_font(if active { "bold 14px Inter" } else { "12px Inter" });
	let _ = ctx.fill_text(&node.member.name, x, y + NODE_RADIUS + 20.0);
}

/// Up to three tag pills below the active node.
fn draw_tag_callouts(ctx: &CanvasRenderingContext2d, node: &SimNode, colors: &ClusterColors) {
	if node.member.tags.is_empty() {
		return;
	}
	let color = cluster_color(colors, &node.member.cluster);

	ctx.set_font("12px Inter");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	for (i, tag) in node.member.tags.iter().take(MAX_CALLOUT_TAGS).enumerate() {
		let tag_y = node.y + NODE_RADIUS + 40.0 + i as f64 * 25.0;
		let Ok(metrics) = ctx.measure_text(tag) else {
			continue;
		};
		let padding = 8.0;
		let half = metrics.width() / 2.0 + padding;

		ctx.set_fill_style_str("rgba(26, 26, 26, 0.95)");
		pill_path(ctx, node.x - half, tag_y - 10.0, half * 2.0, 20.0, 6.0);
		ctx.fill();

		ctx.set_stroke_style_str(color);
		ctx.set_line_width(2.0);
		pill_path(ctx, node.x - half, tag_y - 10.0, half * 2.0, 20.0, 6.0);
		ctx.stroke();

		ctx.set_fill_style_str("#ffffff");
		let _ = ctx.fill_text(tag, node.x, tag_y);
	}
}

/// Rounded-rectangle path for the tag pills.
fn pill_path(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
	let r = r.min(w / 2.0).min(h / 2.0);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	ctx.line_to(x + w - r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + r, r);
	ctx.line_to(x + w, y + h - r);
	let _ = ctx.arc_to(x + w, y + h, x + w - r, y + h, r);
	ctx.line_to(x + r, y + h);
	let _ = ctx.arc_to(x, y + h, x, y + h - r, r);
	ctx.line_to(x, y + r);
	let _ = ctx.arc_to(x, y, x + r, y, r);
	ctx.close_path();
}
