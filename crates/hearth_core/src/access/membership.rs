//! Identity and membership resolution.
//!
//! # Invariants
//! - The household owner is a member even when absent from `members`.
//! - Every direct member counts as extended family.
//! - `custom_groups` only ever contains groups scoped to the resolved
//!   household.
//! - A user with no relation resolves to an empty `MembershipInfo`, not an
//!   error. Only a missing household is an error.

use crate::access::VisibilityResult;
use crate::model::household::{HouseholdId, UserId};
use crate::model::visibility::GroupId;
use crate::registry::{HouseholdRegistry, HouseholdSnapshot};
use std::collections::BTreeSet;

/// A user's resolved relation to one household.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipInfo {
    pub is_owner: bool,
    pub is_member: bool,
    pub is_extended_family: bool,
    pub custom_groups: BTreeSet<GroupId>,
}

impl MembershipInfo {
    /// Computes membership of `user` from one registry snapshot.
    pub fn from_snapshot(snapshot: &HouseholdSnapshot, user: UserId) -> Self {
        let household = &snapshot.household;
        let is_owner = household.is_owner(user);
        let is_member = household.is_member(user);

        let is_linked_relative = snapshot.extended_family.iter().any(|relative| {
            household.extended_family.contains(&relative.id) && relative.is_linked_to(user)
        });

        let custom_groups = snapshot
            .visibility_groups
            .iter()
            .filter(|group| group.household_id == household.id && group.includes(user))
            .map(|group| group.id)
            .collect();

        Self {
            is_owner,
            is_member,
            is_extended_family: is_member || is_linked_relative,
            custom_groups,
        }
    }

    /// Returns whether the user has any relation to the household.
    pub fn is_related(&self) -> bool {
        self.is_member || self.is_extended_family || !self.custom_groups.is_empty()
    }
}

/// Resolves memberships through a registry read contract.
pub struct MembershipResolver<R: HouseholdRegistry> {
    registry: R,
}

impl<R: HouseholdRegistry> MembershipResolver<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Resolves `user` against `household_id` from a single snapshot.
    ///
    /// # Errors
    /// - `VisibilityError::HouseholdNotFound` when the household is unknown.
    /// - `VisibilityError::Registry` on registry transport/data failures.
    pub fn resolve(
        &self,
        user: UserId,
        household_id: HouseholdId,
    ) -> VisibilityResult<MembershipInfo> {
        let snapshot = self.registry.load_snapshot(household_id)?;
        Ok(MembershipInfo::from_snapshot(&snapshot, user))
    }
}
