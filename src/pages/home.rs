use leptos::prelude::*;

use crate::components::affinity_graph::{
	AffinityGraphCanvas, ClusterColors, GraphController, GraphData, GraphEdge, Member, Point,
};

const CLUSTERS: &[(&str, &str)] = &[
	("IT", "#38bdf8"),
	("Business", "#f59e0b"),
	("Creative", "#a78bfa"),
	("Science", "#34d399"),
];

const AVATARS: &[&str] = &[
	"\u{1F9D1}\u{200D}\u{1F4BB}",
	"\u{1F469}\u{200D}\u{1F3A8}",
	"\u{1F468}\u{200D}\u{1F52C}",
	"\u{1F9D1}\u{200D}\u{1F4BC}",
	"\u{1F469}\u{200D}\u{1F680}",
];

const TAGS: &[&str] = &[
	"startups",
	"design",
	"machine learning",
	"marketing",
	"biotech",
	"product",
	"photography",
	"investing",
];

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Generate a sample community: members spread over the clusters, with
/// affinity edges of varying weight between most of them.
fn generate_sample_data(n: usize) -> GraphData {
	let members: Vec<Member> = (0..n)
		.map(|i| {
			let (cluster, _) = CLUSTERS[i % CLUSTERS.len()];
			let mut member = Member::new(format!("m{i}"), format!("Member {i}"), cluster);
			member.avatar = AVATARS[i % AVATARS.len()].to_string();
			member.description = format!("Community member #{i} from the {cluster} cluster");
			member.tags = (0..3)
				.map(|t| TAGS[(i * 3 + t) % TAGS.len()].to_string())
				.collect();
			member
		})
		.collect();

	// Random tree plus varying weights; every fifth member stays isolated
	// to exercise the radial grouping ring.
	let mut edges = Vec::new();
	for i in 1..n {
		if i % 5 == 0 {
			continue;
		}
		let target = (rand_simple(i) * i as f64) as usize;
		if target % 5 == 0 && target != 0 {
			continue;
		}
		edges.push(GraphEdge::weighted(
			format!("m{i}"),
			format!("m{target}"),
			0.3 + rand_simple(i * 7) * 0.7,
		));
	}

	GraphData { members, edges }
}

fn cluster_colors() -> ClusterColors {
	CLUSTERS
		.iter()
		.map(|(name, color)| (name.to_string(), color.to_string()))
		.collect()
}

/// Default Home Page: fullscreen community graph with zoom/layout controls,
/// a cluster filter and a click-to-inspect popup.
#[component]
pub fn Home() -> impl IntoView {
	let graph_data = Signal::derive(move || generate_sample_data(60));
	let colors = Signal::derive(cluster_colors);
	let filter = RwSignal::new(None::<String>);
	let selected = RwSignal::new(None::<(Member, Point)>);

	let controller = GraphController::new();
	let on_click = Callback::new(move |(member, position): (Member, Point)| {
		selected.set(Some((member, position)));
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<AffinityGraphCanvas
					data=graph_data
					colors=colors
					cluster_filter=filter
					on_node_click=on_click
					controller=controller
				/>

				<div class="graph-overlay">
					<h1>"Community Graph"</h1>
					<p class="subtitle">
						"Drag members to reposition. Scroll to zoom. Drag background to pan. Click a member to inspect."
					</p>
				</div>

				<div class="graph-controls">
					<button on:click=move |_| controller.zoom_in()>"+"</button>
					<button on:click=move |_| controller.zoom_out()>"-"</button>
					<button on:click=move |_| controller.reset_view()>"Reset view"</button>
					<button on:click=move |_| controller.reset_layout()>"Reset layout"</button>
					<button on:click=move |_| controller.fit_to_view()>"Fit"</button>
					<select on:change:target=move |ev| {
						let value = ev.target().value();
						filter.set((value != "all").then_some(value));
					}>
						<option value="all">"All clusters"</option>
						{CLUSTERS
							.iter()
							.map(|(name, _)| view! { <option value=*name>{*name}</option> })
							.collect_view()}
					</select>
				</div>

				{move || {
					selected.get().map(|(member, position)| {
						view! {
							<div
								class="member-popup"
								style=format!(
									"position: fixed; left: {}px; top: {}px;",
									position.x,
									position.y,
								)
							>
								<button on:click=move |_| selected.set(None)>"x"</button>
								<h2>{member.name.clone()}</h2>
								<p>{member.description.clone()}</p>
								<ul>
									{member
										.tags
										.iter()
										.map(|tag| view! { <li>{tag.clone()}</li> })
										.collect_view()}
								</ul>
							</div>
						}
					})
				}}
			</div>
		</ErrorBoundary>
	}
}
