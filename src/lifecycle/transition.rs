//! Status transition tables
//!
//! Each entity's actions declare which statuses they may start from and
//! which status they lead to. Anything outside the table is refused with
//! `InvalidTransition` before the record is touched.

use std::fmt;

use crate::error::AppError;

/// A status-changing action on one kind of record
pub trait Transition {
    type Status: Copy + PartialEq + fmt::Display + 'static;

    /// Entity name used in errors and metrics
    const ENTITY: &'static str;

    /// Statuses this action may be applied from
    fn allowed_from(&self) -> &'static [Self::Status];

    /// Status after the action
    fn target(&self) -> Self::Status;

    /// Check the action against the current status and return the new one
    fn apply_to(&self, current: Self::Status) -> Result<Self::Status, AppError> {
        let target = self.target();
        if self.allowed_from().contains(&current) {
            Ok(target)
        } else {
            Err(AppError::InvalidTransition {
                entity: Self::ENTITY,
                from: current.to_string(),
                to: target.to_string(),
            })
        }
    }
}

/// Reject blank free-text input that an action requires
pub fn require_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text, treating blank as absent
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
