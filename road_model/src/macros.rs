// Call the log crate, but pre-set the target.

macro_rules! debug {
    ( $( $x:expr ),* ) => {
        log::log!(target: "road_model", log::Level::Debug, $( $x, )* )
    }
}

macro_rules! info {
    ( $( $x:expr ),* ) => {
        log::log!(target: "road_model", log::Level::Info, $( $x, )* )
    }
}
