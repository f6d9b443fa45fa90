//! Visibility decision engine.
//!
//! # Responsibility
//! - Resolve a requester's household, extended-family and group memberships.
//! - Decide whether the requester may view a shareable record.
//!
//! # Invariants
//! - Owners always see their own records; private records are owner-only.
//! - Every other path fails closed: unknown overrides, empty group grants and
//!   groups from other households all deny.
//! - One decision reads one registry snapshot.
//! - Denials carry no information about whether the record exists.

use crate::model::household::HouseholdId;
use crate::model::visibility::InvalidOverrideError;
use crate::registry::RegistryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod evaluator;
pub mod membership;

pub use evaluator::{AllowReason, Decision, DenyReason, VisibilityEvaluator};
pub use membership::{MembershipInfo, MembershipResolver};

pub type VisibilityResult<T> = Result<T, VisibilityError>;

/// Error surfaced by visibility resolution and evaluation.
#[derive(Debug)]
pub enum VisibilityError {
    /// Referenced household does not exist in the registry.
    HouseholdNotFound(HouseholdId),
    /// Override value outside the supported set.
    InvalidOverride(InvalidOverrideError),
    /// Registry transport or data failure.
    Registry(RegistryError),
}

impl Display for VisibilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HouseholdNotFound(id) => write!(f, "household not found: {id}"),
            Self::InvalidOverride(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VisibilityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::HouseholdNotFound(_) => None,
            Self::InvalidOverride(err) => Some(err),
            Self::Registry(err) => Some(err),
        }
    }
}

impl From<RegistryError> for VisibilityError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::HouseholdNotFound(id) => Self::HouseholdNotFound(id),
            other => Self::Registry(other),
        }
    }
}

impl From<InvalidOverrideError> for VisibilityError {
    fn from(value: InvalidOverrideError) -> Self {
        Self::InvalidOverride(value)
    }
}
