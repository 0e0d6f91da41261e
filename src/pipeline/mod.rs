mod orchestrator;

pub use orchestrator::{Analysis, Detection, PlanPipeline, PlanRequest};
