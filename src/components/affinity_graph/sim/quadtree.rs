use crate::components::affinity_graph::types::Point;

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

/// Square region covering a subset of node positions.
#[derive(Clone, Copy, Debug)]
pub struct Bounds {
	pub center: Point,
	pub half_extent: f64,
}

impl Bounds {
	fn from_points(points: &[Point]) -> Option<Self> {
		let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
		let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
		for p in points {
			min_x = min_x.min(p.x);
			min_y = min_y.min(p.y);
			max_x = max_x.max(p.x);
			max_y = max_y.max(p.y);
		}
		if !min_x.is_finite() || !min_y.is_finite() || !max_x.is_finite() || !max_y.is_finite() {
			return None;
		}

		let center = Point::new((min_x + max_x) * 0.5, (min_y + max_y) * 0.5);
		let span = (max_x - min_x).max(max_y - min_y).max(1.0);
		Some(Self {
			center,
			half_extent: span * 0.5 + 1.0,
		})
	}

	pub fn contains(self, p: Point) -> bool {
		(p.x - self.center.x).abs() <= self.half_extent
			&& (p.y - self.center.y).abs() <= self.half_extent
	}

	pub fn side_length(self) -> f64 {
		self.half_extent * 2.0
	}

	fn child(self, quadrant: usize) -> Self {
		let quarter = self.half_extent * 0.5;
		let (sx, sy) = match quadrant {
			0 => (-1.0, -1.0),
			1 => (1.0, -1.0),
			2 => (-1.0, 1.0),
			_ => (1.0, 1.0),
		};
		Self {
			center: Point::new(self.center.x + sx * quarter, self.center.y + sy * quarter),
			half_extent: quarter,
		}
	}

	fn quadrant_for(self, p: Point) -> usize {
		match (p.x >= self.center.x, p.y >= self.center.y) {
			(false, false) => 0,
			(true, false) => 1,
			(false, true) => 2,
			(true, true) => 3,
		}
	}
}

/// Barnes-Hut quadtree over node positions. Interior cells carry an
/// aggregate mass and center of mass so distant regions can be approximated
/// by a single interaction.
pub struct QuadTree {
	pub bounds: Bounds,
	pub center_of_mass: Point,
	pub mass: f64,
	pub indices: Vec<usize>,
	pub children: [Option<Box<QuadTree>>; 4],
}

impl QuadTree {
	pub fn build(positions: &[Point]) -> Option<Self> {
		let bounds = Bounds::from_points(positions)?;
		let indices = (0..positions.len()).collect::<Vec<_>>();
		Some(Self::build_cell(bounds, indices, positions, 0))
	}

	fn build_cell(bounds: Bounds, indices: Vec<usize>, positions: &[Point], depth: usize) -> Self {
		let mut com = Point::default();
		for &i in &indices {
			com.x += positions[i].x;
			com.y += positions[i].y;
		}
		let mass = indices.len() as f64;
		if mass > 0.0 {
			com.x /= mass;
			com.y /= mass;
		}

		let mut cell = Self {
			bounds,
			center_of_mass: com,
			mass,
			indices,
			children: std::array::from_fn(|_| None),
		};

		if depth >= MAX_DEPTH || cell.indices.len() <= LEAF_CAPACITY {
			return cell;
		}

		let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
		for &i in &cell.indices {
			buckets[bounds.quadrant_for(positions[i])].push(i);
		}

		// All points in one quadrant (coincident positions): keep as leaf.
		if buckets.iter().filter(|b| !b.is_empty()).count() <= 1 {
			return cell;
		}

		for (quadrant, bucket) in buckets.into_iter().enumerate() {
			if bucket.is_empty() {
				continue;
			}
			cell.children[quadrant] = Some(Box::new(Self::build_cell(
				bounds.child(quadrant),
				bucket,
				positions,
				depth + 1,
			)));
		}
		cell.indices.clear();
		cell
	}

	pub fn is_leaf(&self) -> bool {
		self.children.iter().all(|c| c.is_none())
	}
}
