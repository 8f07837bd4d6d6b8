pub mod contract;
pub mod game;

pub use contract::{history, info, watch, withdraw};
pub use game::{connect, jackpot, play};
