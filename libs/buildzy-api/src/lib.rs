//! Wire models for the Buildzy backend API

pub mod models;
