//! Agora - A discussion board backend
//!
//! Members write posts and comments; moderators lock, remove, ban and handle
//! content reports; administrators manage members and moderators. Every
//! moderation action lands in an append-only audit log.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
