pub mod adapt;
pub mod distributions;
pub mod error;
pub mod io;
pub mod ladder;
pub mod parallel_tempering;
pub mod random_walk;
pub mod stats;
pub mod swap;
