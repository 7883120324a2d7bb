//! Data models for the Kion client.

pub mod api;
pub mod auth;
pub mod cache;
