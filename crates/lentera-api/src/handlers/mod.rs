//! API handlers

pub mod auth;
pub mod blogs;
pub mod classes;
pub mod health;
pub mod meeting_sessions;
pub mod static_assets;
pub mod testimonies;
pub mod users;
