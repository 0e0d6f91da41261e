//! File snapshot and read-only content access used by the detectors

mod mock;
mod real;
mod snapshot;
mod r#trait;

pub use mock::MockContent;
pub use r#trait::{ContentAccessor, JsonObject};
pub use real::LocalContent;
pub use snapshot::{FileEntry, FileSnapshot};
