// Module naming follows project convention (Pacing = rate engine, Control = retune protocol)
#[allow(non_snake_case)]
pub mod Pacing;
#[allow(non_snake_case)]
pub mod Control;
#[allow(non_snake_case)]
pub mod Core;

pub mod error;

pub use error::EngineError;
