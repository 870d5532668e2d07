// Language handler architecture: the Sdk trait, the registration
// table and the dispatch facade.

pub mod base;
pub mod facade;
pub mod python;
pub mod registry;
pub mod traits;

pub use facade::SdkDispatch;
pub use python::PythonSdk;
pub use registry::{language_dirs, SdkRegistry};
pub use traits::{Language, Platform, ProjectProperties, Sdk};
