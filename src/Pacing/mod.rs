mod builder;
mod calibrate;
mod engine;

pub mod stats;

pub use builder::EngineBuilder;
pub use calibrate::{calibrate, SyncThreshold};
pub use engine::PacingEngine;

pub mod Structs {
    pub mod Engine_Structs;
    pub use Engine_Structs::{RateConfig, RateUnit, WindowStats}; // re-export for stable path
}
