pub mod board;
pub mod constants;
pub mod depot;
pub mod error;
pub mod ghost;
pub mod grid;
pub mod mover;
pub mod pursuit;
pub mod ranking_store;
pub mod recorder;
pub mod rng;
pub mod sample_buffer;
pub mod server_protocol;
pub mod server_utils;
pub mod session;
pub mod types;
