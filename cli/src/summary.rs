use serde::Serialize;

use road_model::Map;
use roadutil::prettyprint_usize;

#[derive(Serialize)]
struct RoadSummary {
    id: i64,
    name: String,
    length: f64,
    lane_sections: usize,
    connecting: bool,
}

pub fn summarize(map: &Map) -> String {
    let roads: Vec<RoadSummary> = map
        .all_roads()
        .map(|r| RoadSummary {
            id: r.id.0,
            name: r.name.clone(),
            length: r.length(),
            lane_sections: r.lane_sections().len(),
            connecting: r.is_connecting_road(),
        })
        .collect();
    let total: f64 = roads.iter().map(|r| r.length).sum();

    let mut out = format!(
        "{}: {} roads, {} junctions, {:.1}m of reference line\n",
        if map.get_name().is_empty() {
            "unnamed network"
        } else {
            map.get_name().as_str()
        },
        prettyprint_usize(roads.len()),
        prettyprint_usize(map.all_junctions().count()),
        total
    );
    out.push_str(&roadutil::to_json(&roads));
    out
}
