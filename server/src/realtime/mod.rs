//! Realtime chat transport.

pub mod websocket;

pub use websocket::chat_ws;
