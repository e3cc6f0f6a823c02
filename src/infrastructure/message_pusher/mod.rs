//! Message pusher implementations.
//!
//! This module provides the concrete implementations of the
//! `MessagePusher` trait. Currently only the WebSocket-backed one.

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
