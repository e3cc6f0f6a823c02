//! Real-time room session coordinator for a multi-user AI chat service.
//!
//! This library tracks which participants are connected to which room,
//! relays messages and presence/typing events to the correct set of
//! connections in order, and drives the request/response cycle with an
//! external text-generation service without blocking room state.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// shared library
pub mod common;
