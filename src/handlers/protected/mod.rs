pub mod attachments;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod tickets;
pub mod users;
pub mod votes;

use crate::error::ApiError;
use crate::models::{Role, User};

/// Admin gate for user and category management.
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.role != Role::Admin {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(())
}
