#[macro_use]
extern crate tracing;

pub mod backend;
pub mod cli;
pub mod geometry;
pub mod tracking;
pub mod utils;
pub mod wheel;
