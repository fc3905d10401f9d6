//! Admin authorization and the triggerable-job boundary.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use colloquy_types::error::{AdminError, NewsError};
use colloquy_types::identity::UserId;

/// Authorizes callers against the configured admin set.
///
/// The set is fixed at startup; there is no runtime admin management.
pub struct AdminGate {
    admins: BTreeSet<UserId>,
}

impl AdminGate {
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_admin(&self, identity: &UserId) -> bool {
        self.admins.contains(identity)
    }

    /// Check before any admin side effect runs. The error is a flat
    /// denial carrying no information about the admin surface.
    pub fn authorize(&self, identity: &UserId) -> Result<(), AdminError> {
        if self.is_admin(identity) {
            Ok(())
        } else {
            Err(AdminError::NotAuthorized)
        }
    }
}

/// A scheduled job that admins can also fire on demand.
///
/// Object-safe by construction: the router holds it as `Arc<dyn
/// JobTrigger>` next to the scheduler's own handle.
pub trait JobTrigger: Send + Sync {
    fn trigger(&self) -> Pin<Box<dyn Future<Output = Result<(), NewsError>> + Send + '_>>;
}
