pub mod admin;
pub mod auth;
pub mod owner;
pub mod password;
pub mod ratings;
pub mod stores;

use crate::error::AppError;

/// 400 with `message` if any field is empty or whitespace.
fn require_fields(fields: &[&str], message: &str) -> Result<(), AppError> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        Err(AppError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}
