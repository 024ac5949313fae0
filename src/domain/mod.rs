//! Domain layer - Pure business logic.

pub mod due;
pub mod video;
