use super::types::Point;

pub const ZOOM_MIN: f64 = 0.3;
pub const ZOOM_MAX: f64 = 3.0;
/// Multiplicative zoom step per wheel notch.
pub const WHEEL_ZOOM_IN: f64 = 1.05;
pub const WHEEL_ZOOM_OUT: f64 = 0.95;
/// Step used by the zoom buttons on the control surface.
pub const BUTTON_ZOOM_STEP: f64 = 1.15;

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Pan/zoom mapping between world and screen space:
/// `screen = pan + world * k`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	pub fn screen_to_world(&self, p: Point) -> Point {
		Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
	}

	pub fn world_to_screen(&self, p: Point) -> Point {
		Point::new(self.x + p.x * self.k, self.y + p.y * self.k)
	}
}

/// In-flight animated transition, sampled once per frame by the scheduler.
/// Replaces nested self-rescheduling animation closures with explicit
/// `(start, end, start_time, duration)` state.
#[derive(Clone, Copy, Debug)]
struct Tween {
	from: ViewTransform,
	to: ViewTransform,
	start_ms: f64,
	duration_ms: f64,
}

/// The single authoritative pan/zoom store. All reads are synchronous; any
/// manual mutation cancels an in-flight animation.
#[derive(Debug, Default)]
pub struct Viewport {
	transform: ViewTransform,
	tween: Option<Tween>,
}

impl Viewport {
	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	pub fn zoom(&self) -> f64 {
		self.transform.k
	}

	pub fn screen_to_world(&self, p: Point) -> Point {
		self.transform.screen_to_world(p)
	}

	pub fn world_to_screen(&self, p: Point) -> Point {
		self.transform.world_to_screen(p)
	}

	/// Set pan to an absolute offset (used by the pan gesture, which
	/// recomputes from the pointer-down offset instead of accumulating
	/// deltas).
	pub fn set_pan(&mut self, x: f64, y: f64) {
		self.tween = None;
		self.transform.x = x;
		self.transform.y = y;
	}

	/// Rescale about a screen-space pivot so the world point under the
	/// pivot stays put.
	pub fn zoom_by(&mut self, factor: f64, pivot: Point) {
		self.tween = None;
		let new_k = (self.transform.k * factor).clamp(ZOOM_MIN, ZOOM_MAX);
		let ratio = new_k / self.transform.k;
		self.transform.x = pivot.x - (pivot.x - self.transform.x) * ratio;
		self.transform.y = pivot.y - (pivot.y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn reset(&mut self) {
		self.tween = None;
		self.transform = ViewTransform::default();
	}

	/// Begin an ease-out-cubic transition toward the target transform.
	/// Any previous animation is replaced.
	pub fn animate_to(&mut self, target: ViewTransform, duration_ms: f64, now_ms: f64) {
		let to = ViewTransform {
			k: target.k.clamp(ZOOM_MIN, ZOOM_MAX),
			..target
		};
		if duration_ms <= 0.0 {
			self.tween = None;
			self.transform = to;
			return;
		}
		self.tween = Some(Tween {
			from: self.transform,
			to,
			start_ms: now_ms,
			duration_ms,
		});
	}

	/// Advance the animation, snapping exactly onto the target at or after
	/// the duration so repeated sampling cannot drift. Returns true while
	/// the transform changed this frame.
	pub fn tick(&mut self, now_ms: f64) -> bool {
		let Some(tween) = self.tween else {
			return false;
		};
		let t = ((now_ms - tween.start_ms) / tween.duration_ms).clamp(0.0, 1.0);
		if t >= 1.0 {
			self.transform = tween.to;
			self.tween = None;
			return true;
		}
		let e = ease_out_cubic(t);
		self.transform = ViewTransform {
			x: tween.from.x + (tween.to.x - tween.from.x) * e,
			y: tween.from.y + (tween.to.y - tween.from.y) * e,
			k: tween.from.k + (tween.to.k - tween.from.k) * e,
		};
		true
	}

	pub fn animating(&self) -> bool {
		self.tween.is_some()
	}

	/// Transform that fits the world rect `min..max` inside a
	/// `width` x `height` viewport with uniform padding, clamped to the
	/// zoom range and centered.
	pub fn fit_transform(
		min: Point,
		max: Point,
		width: f64,
		height: f64,
		padding: f64,
	) -> ViewTransform {
		let span_x = (max.x - min.x).max(1.0);
		let span_y = (max.y - min.y).max(1.0);
		let inner_w = (width - padding * 2.0).max(1.0);
		let inner_h = (height - padding * 2.0).max(1.0);
		let k = (inner_w / span_x).min(inner_h / span_y).clamp(ZOOM_MIN, ZOOM_MAX);

		let cx = (min.x + max.x) / 2.0;
		let cy = (min.y + max.y) / 2.0;
		ViewTransform {
			x: width / 2.0 - cx * k,
			y: height / 2.0 - cy * k,
			k,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn screen_world_round_trip() {
		let mut vp = Viewport::default();
		vp.set_pan(120.0, -40.0);
		vp.zoom_by(2.0, Point::new(0.0, 0.0));
		let w = Point::new(37.5, -19.25);
		let back = vp.screen_to_world(vp.world_to_screen(w));
		assert!((back.x - w.x).abs() < 1e-9);
		assert!((back.y - w.y).abs() < 1e-9);
	}

	#[test]
	fn zoom_stays_clamped_under_any_sequence() {
		let mut vp = Viewport::default();
		let pivot = Point::new(400.0, 300.0);
		for _ in 0..100 {
			vp.zoom_by(WHEEL_ZOOM_IN, pivot);
		}
		assert_eq!(vp.zoom(), ZOOM_MAX);
		for _ in 0..300 {
			vp.zoom_by(WHEEL_ZOOM_OUT, pivot);
		}
		assert_eq!(vp.zoom(), ZOOM_MIN);
	}

	#[test]
	fn zoom_about_cursor_keeps_pivot_world_point_fixed() {
		let mut vp = Viewport::default();
		vp.set_pan(57.0, -12.0);
		let pivot = Point::new(210.0, 140.0);
		let before = vp.screen_to_world(pivot);
		vp.zoom_by(1.05, pivot);
		let after = vp.screen_to_world(pivot);
		assert!((before.x - after.x).abs() < 1e-9);
		assert!((before.y - after.y).abs() < 1e-9);
	}

	#[test]
	fn fit_centers_and_scales_with_padding() {
		let t = Viewport::fit_transform(
			Point::new(0.0, 0.0),
			Point::new(1000.0, 1000.0),
			500.0,
			500.0,
			50.0,
		);
		assert!((t.k - 0.4).abs() < 1e-9);
		// The rect center lands on the viewport center.
		let screen_center = t.world_to_screen(Point::new(500.0, 500.0));
		assert!((screen_center.x - 250.0).abs() < 1e-9);
		assert!((screen_center.y - 250.0).abs() < 1e-9);
	}

	#[test]
	fn fit_clamps_to_zoom_range() {
		let t = Viewport::fit_transform(
			Point::new(0.0, 0.0),
			Point::new(100_000.0, 100_000.0),
			500.0,
			500.0,
			50.0,
		);
		assert_eq!(t.k, ZOOM_MIN);
	}

	#[test]
	fn tween_eases_out_and_snaps_to_target() {
		let mut vp = Viewport::default();
		let target = ViewTransform { x: 100.0, y: 50.0, k: 2.0 };
		vp.animate_to(target, 400.0, 1000.0);

		assert!(vp.tick(1200.0));
		let halfway = vp.transform();
		// Ease-out covers more than half the distance by half time.
		assert!(halfway.x > 50.0 && halfway.x < 100.0);

		assert!(vp.tick(1400.0));
		assert_eq!(vp.transform(), target);
		assert!(!vp.animating());
		assert!(!vp.tick(1500.0));
	}

	#[test]
	fn manual_mutation_cancels_animation() {
		let mut vp = Viewport::default();
		vp.animate_to(ViewTransform { x: 500.0, y: 0.0, k: 1.0 }, 1000.0, 0.0);
		assert!(vp.animating());
		vp.set_pan(5.0, 5.0);
		assert!(!vp.animating());
		assert!(!vp.tick(100.0));
		assert_eq!(vp.transform().x, 5.0);
	}

	#[test]
	fn zero_duration_jumps_immediately() {
		let mut vp = Viewport::default();
		vp.animate_to(ViewTransform { x: 9.0, y: 9.0, k: 0.5 }, 0.0, 0.0);
		assert!(!vp.animating());
		assert_eq!(vp.transform().x, 9.0);
	}
}
