//! Ports - Trait definitions for the collaborators the scheduler drives.

pub mod clock;
pub mod publisher;
pub mod repository;
