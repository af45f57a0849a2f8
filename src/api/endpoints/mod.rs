//! API endpoint handlers.

pub mod health;
pub mod memo;
pub mod schemas;
