//! Track an Age of Empires IV player on aoe4world.com: follow their current
//! game as it starts and ends, and summarize who they team up with.

pub mod analysis;
pub mod aoe4;
pub mod commands;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod logging;
pub mod poller;
pub mod profile;
