pub mod admin;
pub mod analytics;
pub mod auth;
pub mod config;
pub mod core;
pub mod dashboards;
pub mod drive;
pub mod email;
pub mod forms;
pub mod main_module;
pub mod profile;
pub mod queries;
pub mod security;
pub mod social;

pub use crate::core::shared;
