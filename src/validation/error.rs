//! Error report produced by the invariant checks.
use crate::store::Uid;

/// The specific category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorType {
    /// The root is missing, duplicated, or not at depth 1 / scope 1.
    RootInvariant,
    /// A branch does not run from the root to its own node without repeats.
    BranchShape,
    /// A supply, intensity, or burden value is NaN or infinite.
    NonFinite,
    /// A supply amount or intensity is negative.
    Negative,
    /// `burden_direct` differs from `supply_amount * burden_intensity`.
    ProductMismatch,
}

/// A structured error report from the invariant checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The node where the error was detected.
    pub uid: Uid,
    /// The category of the error.
    pub error_type: ValidationErrorType,
    /// A human-readable message explaining the error.
    pub message: String,
}
