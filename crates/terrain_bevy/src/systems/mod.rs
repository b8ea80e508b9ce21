//! Bevy systems for terrain streaming.

pub mod drive;
pub mod entities;
