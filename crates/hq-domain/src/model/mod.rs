//! Domain Models - The vocabulary of HQ
//!
//! These types represent the "Ubiquitous Language" of the game.
//! Every name here should match how game masters talk about a mission.

pub mod agent;
pub mod location;
pub mod mission;
pub mod player;
pub mod stage;
pub mod tool;
