#![warn(rust_2018_idioms)]

//! Table rules and round coordination for the netjack server.

pub mod barrier;
pub mod card;
pub mod hand;
pub mod model;
pub mod protocol;
pub mod session;
pub mod settle;
pub mod shoe;
pub mod table;

pub use session::{Session, SessionError};
pub use table::{seat, Decision, Seat, Settings, Table, TableStats};
