pub mod agent;
pub mod constants;
pub mod decision;
pub mod engine;
pub mod error;
pub mod ghosts;
pub mod maze;
pub mod mazedata;
pub mod modes;
pub mod pellets;
pub mod rng;
pub mod types;
