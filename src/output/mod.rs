pub mod schema;

pub use schema::{Commands, ExecutionPlan, PlanOptions, PlanWarning, RuntimeSpec};
