//! # BreedVision Common Library
//!
//! Shared code for the BreedVision crates including:
//! - Error type used by configuration and storage code
//! - Bootstrap configuration loading and root folder resolution
//! - Event types (BreedVisionEvent enum) and the EventBus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{BreedVisionEvent, EventBus};
