//! Project deployment actions

pub mod dispatcher;
pub mod domain;
