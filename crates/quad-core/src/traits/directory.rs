// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User directory collaborator.

use async_trait::async_trait;

use crate::error::QuadError;
use crate::types::{Role, UserId};

/// Looks up users by role, optionally scoped to a department.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    /// Returns the user holding `role`, if any.
    async fn find_user_by_role(
        &self,
        role: Role,
        department: Option<&str>,
    ) -> Result<Option<UserId>, QuadError>;
}
