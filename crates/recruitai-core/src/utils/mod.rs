//! Formatting helpers shared by front ends.

pub mod format;

pub use format::{age_display, mask_token};
