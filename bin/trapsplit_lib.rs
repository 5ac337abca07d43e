//! The harness as a library, for the fuzz targets.

pub mod fuzzing;
pub mod parser;
pub mod test_cases;
pub mod test_framework;
pub mod validator;
