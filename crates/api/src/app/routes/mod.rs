//! Route handlers, one file per area.

pub mod auth;
pub mod chat;
pub mod license;
pub mod system;
pub mod users;
