//! Tools for inspecting road network files and synthesizing their junctions. Every subcommand
//! reads the JSON records of one network.

#[macro_use]
extern crate log;

mod summary;
mod synthesize_junctions;

use anyhow::{Context, Result};
use structopt::StructOpt;

use geom::Pt2D;
use road_model::raw::RawMap;
use road_model::{LaneRef, Map, MapConfig, RoadID};
use roadutil::Timer;

#[derive(StructOpt)]
#[structopt(name = "odrcli", about = "Road geometry and junction tools")]
enum Command {
    /// Print the number of roads and junctions, and the length of every road
    Summary {
        #[structopt(flatten)]
        input: Input,
    },
    /// Print the pose at a curvilinear position along a road
    Pose {
        #[structopt(flatten)]
        input: Input,
        #[structopt(long)]
        road: i64,
        #[structopt(long)]
        s: f64,
        /// Lateral offset, positive to the left of the reference line
        #[structopt(long, default_value = "0.0", allow_hyphen_values = true)]
        t: f64,
    },
    /// Print the world position of the middle of a lane
    LanePos {
        #[structopt(flatten)]
        input: Input,
        #[structopt(long)]
        road: i64,
        /// Negative on the right of the reference line, positive on the left
        #[structopt(long, allow_hyphen_values = true)]
        lane: i32,
        #[structopt(long)]
        s: f64,
    },
    /// Print the middle of a lane across one lane section as JSON points
    LaneLine {
        #[structopt(flatten)]
        input: Input,
        #[structopt(long)]
        road: i64,
        /// Index of the lane section, counting from the start of the road
        #[structopt(long, default_value = "0")]
        section: usize,
        #[structopt(long, allow_hyphen_values = true)]
        lane: i32,
        /// Maximum distance between points along the reference line
        #[structopt(long, default_value = "1.0")]
        step: f64,
    },
    /// Find the closest road to a world position
    Project {
        #[structopt(flatten)]
        input: Input,
        #[structopt(long, allow_hyphen_values = true)]
        x: f64,
        #[structopt(long, allow_hyphen_values = true)]
        y: f64,
    },
    /// Connect the lanes at free road ends through new junctions, then write the whole network
    SynthesizeJunctions {
        #[structopt(flatten)]
        input: Input,
        /// The path to write the updated network
        #[structopt(long)]
        output: String,
    },
}

#[derive(StructOpt)]
struct Input {
    /// The path to a JSON road network
    #[structopt(long)]
    input: String,
    /// The path to a JSON map config. Defaults apply if omitted.
    #[structopt(long)]
    config: Option<String>,
}

impl Input {
    fn load(&self, timer: &mut Timer) -> Result<Map> {
        let config: MapConfig = match self.config {
            Some(ref path) => {
                roadutil::read_json(path).with_context(|| format!("loading config {}", path))?
            }
            None => MapConfig::default(),
        };
        timer.start(format!("load {}", self.input));
        let raw: RawMap = roadutil::read_json(&self.input)
            .with_context(|| format!("loading network {}", self.input))?;
        let map = Map::create_from_raw(&raw, config, timer);
        timer.stop(format!("load {}", self.input));
        Ok(map)
    }
}

fn main() -> Result<()> {
    roadutil::logger::setup();

    let mut timer = Timer::new("odrcli");
    match Command::from_args() {
        Command::Summary { input } => {
            let map = input.load(&mut timer)?;
            println!("{}", summary::summarize(&map));
        }
        Command::Pose { input, road, s, t } => {
            let map = input.load(&mut timer)?;
            let pose = map.road_to_world(RoadID(road), s, t, false)?;
            println!(
                "({:.3}, {:.3}) heading {:.3} rad, z {:.3}",
                pose.pt.x(),
                pose.pt.y(),
                pose.heading.normalized_radians(),
                map.get_r(RoadID(road))?.elevation_at(s)
            );
        }
        Command::LanePos {
            input,
            road,
            lane,
            s,
        } => {
            let map = input.load(&mut timer)?;
            let pt = map.lane_to_world(RoadID(road), lane, s)?;
            println!("({:.3}, {:.3})", pt.x(), pt.y());
        }
        Command::LaneLine {
            input,
            road,
            section,
            lane,
            step,
        } => {
            let map = input.load(&mut timer)?;
            let line = map.lane_center_line(
                LaneRef {
                    road: RoadID(road),
                    section,
                    lane,
                },
                step,
            )?;
            println!("{}", roadutil::to_json(line.points()));
        }
        Command::Project { input, x, y } => {
            let map = input.load(&mut timer)?;
            match map.world_to_road(Pt2D::new(x, y)) {
                Some(pos) => println!(
                    "{} at s={:.3}, t={:.3}, {:.3}m away",
                    pos.road, pos.s, pos.t, pos.dist
                ),
                None => println!("The network has no roads"),
            }
        }
        Command::SynthesizeJunctions { input, output } => {
            let mut map = input.load(&mut timer)?;
            synthesize_junctions::run(&mut map, &output, &mut timer)?;
        }
    }
    Ok(())
}
