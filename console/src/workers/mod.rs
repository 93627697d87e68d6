//! Background poll loops

pub mod log_tail;
pub mod status;
