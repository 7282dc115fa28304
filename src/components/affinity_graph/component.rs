use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent, WheelEvent, Window};

use super::render;
use super::state::GraphState;
use super::types::{ClusterColors, GraphData, Member, Point};

/// Device pixel ratio cap; beyond this the backing store cost outweighs
/// the sharpness gain.
const MAX_DPR: f64 = 3.0;

type SharedState = Rc<RefCell<Option<GraphState>>>;

/// Imperative control surface over a mounted graph. It is `Copy`: move it
/// into as many toolbar callbacks as needed and hand one to
/// [`AffinityGraphCanvas`]. Every method is a no-op until the canvas
/// mounts, after it unmounts, or when the simulation has no nodes.
///
/// The graph state itself is `!Send`; the controller holds it behind a
/// thread-local [`StoredValue`] so the handle still satisfies the
/// `Send + Sync` bounds leptos places on view children.
#[derive(Clone, Copy)]
pub struct GraphController {
	inner: StoredValue<Option<SharedState>, LocalStorage>,
}

impl GraphController {
	/// Create a detached controller. Must run inside a reactive owner,
	/// i.e. a component body.
	pub fn new() -> Self {
		Self {
			inner: StoredValue::new_local(None),
		}
	}

	fn attach(&self, state: SharedState) {
		self.inner.set_value(Some(state));
	}

	fn with<R>(&self, f: impl FnOnce(&mut GraphState) -> R) -> Option<R> {
		self.inner
			.try_with_value(|inner| {
				let state = inner.as_ref()?;
				let mut state = state.borrow_mut();
				state.as_mut().map(f)
			})
			.flatten()
	}

	pub fn zoom_in(&self) {
		self.with(|s| s.zoom_in());
	}

	pub fn zoom_out(&self) {
		self.with(|s| s.zoom_out());
	}

	pub fn reset_view(&self) {
		self.with(|s| s.reset_view());
	}

	/// Unpin every node and rerun the layout from full energy.
	pub fn reset_layout(&self) {
		self.with(|s| s.reset_layout());
	}

	pub fn center_on_node(&self, id: &str) {
		let now = now_ms();
		self.with(|s| s.center_on_node(id, now));
	}

	pub fn fit_to_view(&self) {
		let now = now_ms();
		self.with(|s| s.fit_to_view(now));
	}

	pub fn node_member(&self, id: &str) -> Option<Member> {
		self.with(|s| s.node_by_id(id).map(|n| n.member.clone()))
			.flatten()
	}
}

impl Default for GraphController {
	fn default() -> Self {
		Self::new()
	}
}

fn now_ms() -> f64 {
	web_sys::window()
		.and_then(|w| w.performance())
		.map(|p| p.now())
		.unwrap_or(0.0)
}

fn canvas_point(canvas: &HtmlCanvasElement, client_x: f64, client_y: f64) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(client_x - rect.left(), client_y - rect.top())
}

fn apply_cursor(canvas: &HtmlCanvasElement, state: &GraphState) {
	// Qualified: with the prelude in scope, `.style()` resolves to tachys's
	// one-argument ElementExt::style before the web-sys accessor.
	let _ = web_sys::HtmlElement::style(canvas).set_property("cursor", state.cursor());
}

/// Size the backing store for the device pixel ratio so strokes stay
/// crisp; CSS size stays in logical pixels. This is the only place
/// display-density correction happens.
fn size_canvas(canvas: &HtmlCanvasElement, width: f64, height: f64) -> Option<CanvasRenderingContext2d> {
	let dpr = web_sys::window()
		.map(|w| w.device_pixel_ratio())
		.unwrap_or(1.0)
		.clamp(1.0, MAX_DPR);
	canvas.set_width((width * dpr) as u32);
	canvas.set_height((height * dpr) as u32);
	let style = web_sys::HtmlElement::style(canvas);
	let _ = style.set_property("width", &format!("{width}px"));
	let _ = style.set_property("height", &format!("{height}px"));

	let ctx: CanvasRenderingContext2d = canvas.get_context("2d").ok()??.dyn_into().ok()?;
	// Resizing reset the context transform, so the scale applies once.
	let _ = ctx.scale(dpr, dpr);
	Some(ctx)
}

/// Interactive force-directed canvas over the community graph. Renders
/// continuously while the simulation has energy, and forwards qualifying
/// clicks (press-release under 5 px of travel) to `on_node_click` with the
/// member payload and a page-space anchor for the detail popup.
#[component]
pub fn AffinityGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(into)] colors: Signal<ClusterColors>,
	#[prop(into, default = Signal::derive(|| None))] cluster_filter: Signal<Option<String>>,
	#[prop(into)] on_node_click: Callback<(Member, Point)>,
	#[prop(optional, into)] controller: Option<GraphController>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let raf_handle: Rc<RefCell<Option<i32>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, raf_init) = (
		state.clone(),
		animate.clone(),
		resize_cb.clone(),
		raf_handle.clone(),
	);

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = container_size(&canvas);
		if w <= 0.0 || h <= 0.0 {
			// Zero-size container: not ready yet, the resize listener
			// below picks it up once layout settles.
			log::debug!("graph canvas mounted with zero-size container");
		}
		let Some(ctx) = size_canvas(&canvas, w.max(1.0), h.max(1.0)) else {
			return;
		};

		*state_init.borrow_mut() = Some(GraphState::new(&data.get_untracked(), w, h));
		if let Some(controller) = &controller {
			controller.attach(state_init.clone());
		}

		// Window resize keeps the canvas matched to its container.
		{
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let (nw, nh) = container_size(&canvas_resize);
				if nw <= 0.0 || nh <= 0.0 {
					return;
				}
				let _ = size_canvas(&canvas_resize, nw, nh);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ = window
					.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		// One frame callback drives tween, simulation and paint; redundant
		// draw requests inside a frame collapse into the dirty flag.
		let (state_anim, animate_inner, raf_inner) =
			(state_init.clone(), animate_init.clone(), raf_init.clone());
		let colors_anim = colors;
		*animate_init.borrow_mut() = Some(Closure::new(move |now: f64| {
			if let Some(ref mut s) = *state_anim.borrow_mut()
				&& s.frame(now)
			{
				render::render(s, &ctx, &colors_anim.get_untracked());
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let handle = web_sys::window()
					.and_then(|w: Window| w.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
				*raf_inner.borrow_mut() = handle;
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			*raf_init.borrow_mut() = window
				.request_animation_frame(cb.as_ref().unchecked_ref())
				.ok();
		}
	});

	// Reconcile simulation inputs whenever the data source changes.
	let state_data = state.clone();
	Effect::new(move |_| {
		let data = data.get();
		if let Some(ref mut s) = *state_data.borrow_mut() {
			s.set_data(&data);
		}
	});

	let state_filter = state.clone();
	Effect::new(move |_| {
		let filter = cluster_filter.get();
		if let Some(ref mut s) = *state_filter.borrow_mut() {
			s.set_cluster_filter(filter);
		}
	});

	// Stop the frame loop and drop the resize listener on unmount. The
	// cleanup closure has to be Send, so the Rc handles travel through a
	// thread-local stored value instead of being captured directly.
	let cleanup_handles =
		StoredValue::new_local((animate.clone(), resize_cb.clone(), raf_handle.clone()));
	on_cleanup(move || {
		cleanup_handles.try_with_value(|(animate, resize_cb, raf_handle)| {
			if let Some(window) = web_sys::window() {
				if let Some(handle) = raf_handle.borrow_mut().take() {
					let _ = window.cancel_animation_frame(handle);
				}
				if let Some(cb) = resize_cb.borrow_mut().take() {
					let _ = window.remove_event_listener_with_callback(
						"resize",
						cb.as_ref().unchecked_ref(),
					);
				}
			}
			animate.borrow_mut().take();
		});
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let p = canvas_point(&canvas, ev.client_x() as f64, ev.client_y() as f64);
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(p);
			apply_cursor(&canvas, s);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let p = canvas_point(&canvas, ev.client_x() as f64, ev.client_y() as f64);
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(p, ev.time_stamp());
			apply_cursor(&canvas, s);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let p = canvas_point(&canvas, ev.client_x() as f64, ev.client_y() as f64);
		let click = {
			let mut state = state_mu.borrow_mut();
			let Some(ref mut s) = *state else {
				return;
			};
			let click = s.pointer_up(p);
			apply_cursor(&canvas, s);
			click
		};
		if let Some(click) = click {
			let rect = canvas.get_bounding_client_rect();
			on_node_click.run((
				click.member,
				Point::new(rect.left() + click.screen.x, rect.top() + click.screen.y),
			));
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let p = canvas_point(&canvas, ev.client_x() as f64, ev.client_y() as f64);
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.wheel(ev.delta_y(), p);
		}
	};

	// Single-touch mirrors the mouse gestures one to one.
	let state_ts = state.clone();
	let on_touchstart = move |ev: TouchEvent| {
		let Some(touch) = ev.touches().get(0) else {
			return;
		};
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let p = canvas_point(&canvas, touch.client_x() as f64, touch.client_y() as f64);
		if let Some(ref mut s) = *state_ts.borrow_mut() {
			s.pointer_down(p);
		}
	};

	let state_tm = state.clone();
	let on_touchmove = move |ev: TouchEvent| {
		// Keep a drag or pan from scrolling the page.
		ev.prevent_default();
		let Some(touch) = ev.touches().get(0) else {
			return;
		};
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let p = canvas_point(&canvas, touch.client_x() as f64, touch.client_y() as f64);
		if let Some(ref mut s) = *state_tm.borrow_mut() {
			s.pointer_move(p, ev.time_stamp());
		}
	};

	let state_te = state.clone();
	let on_touchend = move |ev: TouchEvent| {
		let Some(touch) = ev.changed_touches().get(0) else {
			return;
		};
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let p = canvas_point(&canvas, touch.client_x() as f64, touch.client_y() as f64);
		let click = {
			let mut state = state_te.borrow_mut();
			let Some(ref mut s) = *state else {
				return;
			};
			s.pointer_up(p)
		};
		if let Some(click) = click {
			let rect = canvas.get_bounding_client_rect();
			on_node_click.run((
				click.member,
				Point::new(rect.left() + click.screen.x, rect.top() + click.screen.y),
			));
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="affinity-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			on:touchstart=on_touchstart
			on:touchmove=on_touchmove
			on:touchend=on_touchend
			style="display: block; cursor: grab;"
		/>
	}
}

fn container_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	match canvas.parent_element() {
		Some(parent) => (
			parent.client_width() as f64,
			parent.client_height() as f64,
		),
		None => (0.0, 0.0),
	}
}
