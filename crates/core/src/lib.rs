//! Core game logic. Keep this crate free of IO and platform concerns.

pub mod cards;
pub mod config;
pub mod dice;
pub mod events;
pub mod policy;
pub mod rng;
pub mod session;
pub mod turn;

pub use cards::*;
pub use config::*;
pub use dice::*;
pub use events::*;
pub use policy::*;
pub use rng::*;
pub use session::*;
pub use turn::*;
