//! Buildzy Console Library
//!
//! Deployment client for the Buildzy platform: sessions, projects,
//! deployment actions and live log tailing.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod storage;
pub mod tail;
pub mod utils;
pub mod workers;
