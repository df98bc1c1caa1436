//! API module for HTTP and WebSocket endpoints
//!
//! This module provides the WebSocket feed and the REST endpoints around it.

pub mod http;
pub mod rest;
pub mod websocket;
