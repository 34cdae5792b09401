//! HTTP route handlers

pub mod detect;
pub mod status;
