//! Small utilities shared by every crate in the workspace: phase timing with warning collection,
//! a typed string map for user data, logging setup, and JSON I/O.

mod io;
pub mod logger;
mod logs;
mod tags;
mod time;

pub use crate::io::{from_json, read_json, to_json, write_json};
pub use crate::logs::Warn;
pub use crate::tags::{SignShape, Tags};
pub use crate::time::{elapsed_seconds, prettyprint_time, prettyprint_usize, Timer};
