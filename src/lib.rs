//! Client core of the memory-matching card game: flip resolution, session control and the live
//! countdown channel, on top of a remote authoritative game gateway.

pub mod api;
pub mod cache;
pub mod config;
pub mod dto;
pub mod error;
pub mod flip;
pub mod gateway;
pub mod model;
pub mod preferences;
pub mod presets;
pub mod session;
pub mod timer;
