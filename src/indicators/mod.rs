pub mod registry;

pub use registry::{IndicatorMetadata, Registry, SourceType};
