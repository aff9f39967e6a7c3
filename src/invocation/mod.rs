//! The invocation descriptor model: command, arguments and an environment
//! snapshot captured at one well-defined instant.

pub mod descriptor;
pub mod environment;
pub mod fields;

pub use descriptor::InvocationDescriptor;
pub use environment::EnvSnapshot;
pub use fields::{parse_assignment, FieldValue, PassthroughFields};
