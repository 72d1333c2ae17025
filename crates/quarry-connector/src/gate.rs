//! Membership checks run before any connector work

use std::sync::Arc;

use crate::{ConnectorResult, DirectoryStore, Role, Unauthorized, UnauthorizedReason};

/// Decides whether a caller may act on an organization's data sources.
///
/// Memberships are read from the directory on every call. Refusals are
/// logged at `warn` with the specific reason; the error itself only ever
/// says "Unauthorized".
#[derive(Clone)]
pub struct AuthorizationGate {
    directory: Arc<dyn DirectoryStore>,
}

impl AuthorizationGate {
    pub fn new(directory: Arc<dyn DirectoryStore>) -> Self {
        Self { directory }
    }

    /// Any role will do
    #[tracing::instrument(skip(self))]
    pub async fn authorize(&self, caller: &str, organization_id: i64) -> ConnectorResult<Role> {
        match self.directory.find_membership(caller, organization_id).await? {
            Some(role) => Ok(role),
            None => Err(refuse(caller, organization_id, Unauthorized::not_a_member()).into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn require_admin(&self, caller: &str, organization_id: i64) -> ConnectorResult<Role> {
        let role = self.authorize(caller, organization_id).await?;
        if !role.is_admin() {
            return Err(refuse(caller, organization_id, Unauthorized::insufficient_role(role)).into());
        }
        Ok(role)
    }
}

fn refuse(caller: &str, organization_id: i64, denied: Unauthorized) -> Unauthorized {
    match denied.reason {
        UnauthorizedReason::NotAMember => {
            tracing::warn!(caller, organization_id, reason = "not_a_member", "access denied");
        }
        UnauthorizedReason::InsufficientRole { role } => {
            tracing::warn!(
                caller,
                organization_id,
                role = %role,
                reason = "insufficient_role",
                "access denied"
            );
        }
    }
    denied
}
