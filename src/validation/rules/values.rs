//! Validation rules for the numeric columns of a node.

use crate::store::Node;
use crate::validation::error::{ValidationError, ValidationErrorType};

/// No NaN or infinity anywhere; supply and intensity are non-negative.
pub(crate) fn validate_values(node: &Node) -> Option<ValidationError> {
    let columns = [
        ("supply_amount", node.supply_amount),
        ("burden_intensity", node.burden_intensity),
        ("burden_direct", node.burden_direct),
    ];
    if let Some((name, value)) = columns.iter().find(|(_, v)| !v.is_finite()) {
        return Some(ValidationError {
            uid: node.uid,
            error_type: ValidationErrorType::NonFinite,
            message: format!("Value Error: {} is {}.", name, value),
        });
    }
    if let Some((name, value)) = columns[..2].iter().find(|(_, v)| *v < 0.0) {
        return Some(ValidationError {
            uid: node.uid,
            error_type: ValidationErrorType::Negative,
            message: format!("Value Error: {} is negative ({}).", name, value),
        });
    }
    None
}

/// `burden_direct` must be exactly the product of its factors. Only holds
/// for tables that went through an override application with overrides.
pub(crate) fn validate_product(node: &Node) -> Option<ValidationError> {
    if node.burden_direct == node.product() {
        return None;
    }
    Some(ValidationError {
        uid: node.uid,
        error_type: ValidationErrorType::ProductMismatch,
        message: format!(
            "Product Error: burden {} != supply {} * intensity {}.",
            node.burden_direct, node.supply_amount, node.burden_intensity
        ),
    })
}
