//! API route handlers

pub mod system;
pub mod ws;
