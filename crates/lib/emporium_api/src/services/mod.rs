//! Business logic shared by handlers.

pub mod auth;
