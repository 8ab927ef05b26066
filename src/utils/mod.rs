//! Internal utility helpers for atomic file writes and serde shapes.

pub(crate) mod fs;
pub(crate) mod serde;
