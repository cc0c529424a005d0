//! HTTP API: router, middleware, handlers and service wiring.

pub mod app;
pub mod context;
pub mod middleware;
