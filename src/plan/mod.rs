//! Plan synthesis: catalogs plus the winning detector's callbacks

pub mod catalog;
mod synthesizer;

pub use catalog::{Catalog, DEFAULT_PORT};
pub use synthesizer::PlanSynthesizer;
