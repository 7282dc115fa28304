mod component;
mod hittest;
mod render;
mod sim;
mod state;
mod types;
mod viewport;

pub use component::{AffinityGraphCanvas, GraphController};
pub use types::{ClusterColors, GraphData, GraphEdge, Member, Point};
