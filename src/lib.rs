// src/lib.rs

pub mod app_state;
pub mod auth;
pub mod client;
pub mod config;
pub mod employees;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod project_feed;
pub mod projects;
pub mod routes;
pub mod store;
pub mod token;
pub mod uploads;
pub mod validate;
