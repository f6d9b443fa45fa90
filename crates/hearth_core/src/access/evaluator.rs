//! Visibility evaluator.
//!
//! Decision order:
//! 1. requester is the owner -> allow
//! 2. record is private to owner -> deny
//! 3. resolve membership, then branch on the override mode
//!
//! Steps 1 and 2 never touch the registry.

use crate::access::membership::{MembershipInfo, MembershipResolver};
use crate::access::VisibilityResult;
use crate::logging::sanitize_message;
use crate::model::household::{HouseholdId, UserId};
use crate::model::visibility::{GroupId, Shareable, VisibilityContext, VisibilityOverride};
use crate::registry::HouseholdRegistry;
use log::warn;

const MAX_LOGGED_OVERRIDE_CHARS: usize = 64;

/// Why a requester was allowed to view a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    Owner,
    HouseholdMember,
    ExtendedFamily,
    /// First shared group, in id order.
    GroupGrant(GroupId),
}

/// Why a requester was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    PrivateToOwner,
    NotHouseholdMember,
    NotExtendedFamily,
    /// Custom-groups-only record with no groups assigned.
    NoGroupsAssigned,
    NoSharedGroup,
    /// Override outside the known set. Callers should surface this as a
    /// warning; the record was written by something this build does not
    /// understand.
    InvalidOverride(String),
}

impl DenyReason {
    /// Stable snake_case code for logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PrivateToOwner => "private_to_owner",
            Self::NotHouseholdMember => "not_household_member",
            Self::NotExtendedFamily => "not_extended_family",
            Self::NoGroupsAssigned => "no_groups_assigned",
            Self::NoSharedGroup => "no_shared_group",
            Self::InvalidOverride(_) => "invalid_override",
        }
    }
}

/// Outcome of one visibility evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Returns the warning carried by this decision, if any.
    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Deny(DenyReason::InvalidOverride(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Decides the owner/private steps that need no membership data.
///
/// Returns `None` when membership must be resolved.
pub fn decide_without_membership(
    context: &VisibilityContext,
    requester: UserId,
) -> Option<Decision> {
    if context.is_owned_by(requester) {
        return Some(Decision::Allow(AllowReason::Owner));
    }
    if context.private_to_owner {
        return Some(Decision::Deny(DenyReason::PrivateToOwner));
    }
    None
}

/// Evaluates one record against an already-resolved membership.
///
/// Pure: the same inputs always produce the same decision.
pub fn decide(
    context: &VisibilityContext,
    requester: UserId,
    membership: &MembershipInfo,
) -> Decision {
    if let Some(decision) = decide_without_membership(context, requester) {
        return decision;
    }

    match &context.visibility_override {
        VisibilityOverride::HouseholdDefault => {
            if membership.is_member {
                Decision::Allow(AllowReason::HouseholdMember)
            } else {
                Decision::Deny(DenyReason::NotHouseholdMember)
            }
        }
        VisibilityOverride::ExtendedFamily => {
            if membership.is_extended_family {
                Decision::Allow(AllowReason::ExtendedFamily)
            } else {
                Decision::Deny(DenyReason::NotExtendedFamily)
            }
        }
        VisibilityOverride::CustomGroupsOnly => {
            if context.visibility_groups.is_empty() {
                return Decision::Deny(DenyReason::NoGroupsAssigned);
            }
            match context
                .visibility_groups
                .intersection(&membership.custom_groups)
                .next()
            {
                Some(group) => Decision::Allow(AllowReason::GroupGrant(*group)),
                None => Decision::Deny(DenyReason::NoSharedGroup),
            }
        }
        VisibilityOverride::Unrecognized(value) => {
            Decision::Deny(DenyReason::InvalidOverride(value.clone()))
        }
    }
}

/// Registry-backed evaluator.
pub struct VisibilityEvaluator<R: HouseholdRegistry> {
    resolver: MembershipResolver<R>,
}

impl<R: HouseholdRegistry> VisibilityEvaluator<R> {
    pub fn new(registry: R) -> Self {
        Self {
            resolver: MembershipResolver::new(registry),
        }
    }

    pub fn resolver(&self) -> &MembershipResolver<R> {
        &self.resolver
    }

    /// Returns whether `requester` may view `record` in `household_id`.
    ///
    /// # Errors
    /// - Propagates `HouseholdNotFound` and registry failures from membership
    ///   resolution. Owner and private-record decisions never fail.
    pub fn can_view<T: Shareable + ?Sized>(
        &self,
        record: &T,
        household_id: HouseholdId,
        requester: UserId,
    ) -> VisibilityResult<bool> {
        Ok(self.evaluate(record, household_id, requester)?.is_allowed())
    }

    /// Same as `can_view` but returns the reasoned decision.
    pub fn evaluate<T: Shareable + ?Sized>(
        &self,
        record: &T,
        household_id: HouseholdId,
        requester: UserId,
    ) -> VisibilityResult<Decision> {
        let context = record.visibility();
        if let Some(decision) = decide_without_membership(context, requester) {
            return Ok(decision);
        }

        let membership = self.resolver.resolve(requester, household_id)?;
        let decision = decide(context, requester, &membership);
        log_warning(&decision, household_id);
        Ok(decision)
    }
}

/// Emits the warning-level signal for fail-closed decisions on unknown input.
pub(crate) fn log_warning(decision: &Decision, household_id: HouseholdId) {
    if let Some(line) = warning_line(decision, household_id) {
        warn!("{line}");
    }
}

fn warning_line(decision: &Decision, household_id: HouseholdId) -> Option<String> {
    let Decision::Deny(reason @ DenyReason::InvalidOverride(value)) = decision else {
        return None;
    };
    Some(format!(
        "event=visibility_evaluate module=access status=deny reason={} household_id={} override={}",
        reason.code(),
        household_id,
        sanitize_message(value, MAX_LOGGED_OVERRIDE_CHARS)
    ))
}
