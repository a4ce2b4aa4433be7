//! Profile reads and updates for the signed-in account.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::{ProfileChanges, UpdateProfileRequest, UserResponse},
    store::UserStore,
};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserResponse, AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok(user.into())
    }

    /// Apply the non-empty fields of `request`.
    ///
    /// A request with nothing to change returns the current profile untouched.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse, AppError> {
        let changes = ProfileChanges::from(request);
        if changes.is_empty() {
            return self.profile(user_id).await;
        }

        if let Some(full_name) = &changes.full_name {
            if full_name.chars().count() < 2 {
                return Err(AppError::InvalidRequest(
                    "Full name must be at least 2 characters".to_string(),
                ));
            }
        }

        let user = self
            .users
            .update_profile(user_id, changes)
            .await?
            .ok_or(AppError::UserNotFound)?;

        tracing::info!(user_id = %user.id, "Profile updated");

        Ok(user.into())
    }
}
