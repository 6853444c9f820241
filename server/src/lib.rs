#![warn(rust_2018_idioms)]

mod client;
mod server;
pub mod settings;

pub use server::{run, Stats};
