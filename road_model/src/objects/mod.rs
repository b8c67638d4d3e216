pub mod junction;
pub mod lane;
pub mod road;
