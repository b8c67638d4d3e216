use anyhow::Result;

use road_model::{synthesize_all, Map, SequentialIds};
use roadutil::Timer;

pub fn run(map: &mut Map, output: &str, timer: &mut Timer) -> Result<()> {
    let mut ids = SequentialIds::for_map(map);
    let results = synthesize_all(map, &mut ids, timer);

    let mut connections = 0;
    for result in &results {
        if let Some(j) = result.junction {
            info!(
                "{}: {} new connections, {} new roads",
                j,
                result.connections.len(),
                result.new_roads.len()
            );
        }
        connections += result.connections.len();
    }
    println!(
        "{} batches of road ends produced {} new connections",
        results.len(),
        connections
    );

    roadutil::write_json(output, &map.to_raw())?;
    println!("Wrote {}", output);
    Ok(())
}
