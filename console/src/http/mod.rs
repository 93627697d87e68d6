//! Backend API client

pub mod auth;
pub mod client;
pub mod deployments;
pub mod logs;
pub mod projects;
