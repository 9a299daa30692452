//! Studio client
//!
//! Client core for the multi-specialist creative chat backend: REST calls,
//! the streamed specialist turn protocol, and the chat state it drives.

pub mod api;
pub mod config;
pub mod generation;
pub mod reducer;
pub mod specialist;
pub mod stream;
