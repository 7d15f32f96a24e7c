//! Cross-component flows

pub mod lifecycle;
pub mod persistence;
