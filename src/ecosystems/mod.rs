//! Built-in ecosystem detectors
//!
//! Each module declares one [`EcosystemSpec`](crate::detection::EcosystemSpec)
//! table and a unit struct implementing [`Detector`](crate::detection::Detector)
//! that overrides only the hooks the table cannot express.

pub mod deno;
pub mod go;
pub mod java;
pub mod node;
pub mod parsers;
pub mod php;
pub mod python;
pub mod ruby;
pub mod rust;
pub mod shell;
pub mod staticfile;

pub use deno::DenoDetector;
pub use go::GoDetector;
pub use java::JavaDetector;
pub use node::NodeDetector;
pub use php::PhpDetector;
pub use python::PythonDetector;
pub use ruby::RubyDetector;
pub use rust::RustDetector;
pub use shell::ShellDetector;
pub use staticfile::StaticfileDetector;
