//! Transcript store implementations.
//!
//! - `sqlite`: SQLite-backed durable store (production)
//! - `memory`: in-memory store used by tests

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryTranscriptStore;
pub use sqlite::SqliteTranscriptStore;
