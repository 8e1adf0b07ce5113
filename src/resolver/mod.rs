// ABOUTME: Variable source resolution for the entrypoint run
// ABOUTME: Environment snapshot, reserved-name validation and the external vars document

pub mod document;
pub mod snapshot;
pub mod validation;

pub use document::{load_vars_document, VarsDocument, VarsLocation};
pub use snapshot::VariableSnapshot;
pub use validation::{is_control_variable, validate_control_variables, CONTROL_VARIABLES};
