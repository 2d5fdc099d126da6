pub mod assertions;
pub mod comparator;
pub mod config;
pub mod files_reader;
pub mod ops;
pub mod path_resolver;
pub mod shape;



// Re-export commonly used types
pub use assertions::{
    AssertionError, Assertions, BlankChecks, Content, Direction, KeyEntry, Outcome, Reporter,
    RunReport,
};
pub use comparator::{
    CompareOptions, ComparisonMode, Violation, ViolationKind, compare, compare_values, compare_with,
};
pub use config::{ConfigError, DescriptorFields, ShapeConfig};
pub use files_reader::{CaseFileError, CaseFileReader, ComparisonCase, LoadedCases, load_document};
pub use ops::{CaseRunResult, CompareResult, ShapeOps};
pub use path_resolver::{JsonPathResolver, resolve};
pub use shape::{Descriptor, Shape, ShapeError, ValueType};
