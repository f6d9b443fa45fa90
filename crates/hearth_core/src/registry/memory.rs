//! In-process household registry.
//!
//! Used by embedders that keep membership data in memory and by tests that
//! do not need SQLite. All state lives behind one `RwLock`, so a snapshot
//! taken under a single read guard never mixes pre- and post-write data.

use crate::model::household::{FamilyMember, FamilyMemberId, Household, HouseholdId, UserId};
use crate::model::visibility::{GroupId, VisibilityGroup};
use crate::registry::{HouseholdRegistry, HouseholdSnapshot, RegistryError, RegistryResult};
use log::info;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct MemoryState {
    households: BTreeMap<HouseholdId, Household>,
    family_members: BTreeMap<FamilyMemberId, FamilyMember>,
    groups: BTreeMap<GroupId, VisibilityGroup>,
}

impl MemoryState {
    fn household(&self, id: HouseholdId) -> RegistryResult<&Household> {
        self.households
            .get(&id)
            .ok_or(RegistryError::HouseholdNotFound(id))
    }

    fn household_mut(&mut self, id: HouseholdId) -> RegistryResult<&mut Household> {
        self.households
            .get_mut(&id)
            .ok_or(RegistryError::HouseholdNotFound(id))
    }

    fn family_members_of(&self, household_id: HouseholdId) -> Vec<FamilyMember> {
        self.family_members
            .values()
            .filter(|member| member.household_id == household_id)
            .cloned()
            .collect()
    }

    fn extended_family_of(&self, household: &Household) -> Vec<FamilyMember> {
        household
            .extended_family
            .iter()
            .filter_map(|id| self.family_members.get(id))
            .cloned()
            .collect()
    }

    fn groups_of(&self, household_id: HouseholdId) -> Vec<VisibilityGroup> {
        self.groups
            .values()
            .filter(|group| group.household_id == household_id)
            .cloned()
            .collect()
    }

    fn snapshot(&self, household_id: HouseholdId) -> RegistryResult<HouseholdSnapshot> {
        let household = self.household(household_id)?;
        Ok(HouseholdSnapshot {
            family_members: self.family_members_of(household_id),
            extended_family: self.extended_family_of(household),
            visibility_groups: self.groups_of(household_id),
            household: household.clone(),
        })
    }
}

/// `RwLock`-guarded registry keyed by entity id.
#[derive(Debug, Default)]
pub struct MemoryHouseholdRegistry {
    state: RwLock<MemoryState>,
}

impl MemoryHouseholdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RegistryResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn write(&self) -> RegistryResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| RegistryError::LockPoisoned)
    }

    /// Inserts a household together with its member and extended-family sets.
    pub fn create_household(&self, household: &Household) -> RegistryResult<HouseholdId> {
        household.validate()?;
        let mut state = self.write()?;
        if state.households.contains_key(&household.id) {
            return Err(RegistryError::Duplicate(household.id));
        }
        if let Some(unknown) = household
            .extended_family
            .iter()
            .find(|id| !state.family_members.contains_key(*id))
        {
            return Err(RegistryError::FamilyMemberNotFound(*unknown));
        }
        state.households.insert(household.id, household.clone());
        info!(
            "event=household_create module=registry status=ok backend=memory household_id={}",
            household.id
        );
        Ok(household.id)
    }

    pub fn add_member(&self, household_id: HouseholdId, user: UserId) -> RegistryResult<()> {
        self.write()?.household_mut(household_id)?.members.insert(user);
        Ok(())
    }

    pub fn remove_member(&self, household_id: HouseholdId, user: UserId) -> RegistryResult<()> {
        self.write()?.household_mut(household_id)?.members.remove(&user);
        Ok(())
    }

    pub fn create_family_member(&self, member: &FamilyMember) -> RegistryResult<FamilyMemberId> {
        member.validate()?;
        let mut state = self.write()?;
        state.household(member.household_id)?;
        if state.family_members.contains_key(&member.id) {
            return Err(RegistryError::Duplicate(member.id));
        }
        state.family_members.insert(member.id, member.clone());
        Ok(member.id)
    }

    /// Adds one family member to the household's extended-family set.
    pub fn link_extended_family(
        &self,
        household_id: HouseholdId,
        family_member_id: FamilyMemberId,
    ) -> RegistryResult<()> {
        let mut state = self.write()?;
        if !state.family_members.contains_key(&family_member_id) {
            return Err(RegistryError::FamilyMemberNotFound(family_member_id));
        }
        state
            .household_mut(household_id)?
            .extended_family
            .insert(family_member_id);
        Ok(())
    }

    pub fn unlink_extended_family(
        &self,
        household_id: HouseholdId,
        family_member_id: FamilyMemberId,
    ) -> RegistryResult<()> {
        self.write()?
            .household_mut(household_id)?
            .extended_family
            .remove(&family_member_id);
        Ok(())
    }

    pub fn create_visibility_group(&self, group: &VisibilityGroup) -> RegistryResult<GroupId> {
        group.validate()?;
        let mut state = self.write()?;
        state.household(group.household_id)?;
        if state.groups.contains_key(&group.id) {
            return Err(RegistryError::Duplicate(group.id));
        }
        state.groups.insert(group.id, group.clone());
        Ok(group.id)
    }

    pub fn add_group_member(&self, group_id: GroupId, user: UserId) -> RegistryResult<()> {
        let mut state = self.write()?;
        let group = state
            .groups
            .get_mut(&group_id)
            .ok_or(RegistryError::GroupNotFound(group_id))?;
        group.members.insert(user);
        Ok(())
    }

    pub fn remove_group_member(&self, group_id: GroupId, user: UserId) -> RegistryResult<()> {
        let mut state = self.write()?;
        let group = state
            .groups
            .get_mut(&group_id)
            .ok_or(RegistryError::GroupNotFound(group_id))?;
        group.members.remove(&user);
        Ok(())
    }

    pub fn delete_visibility_group(&self, group_id: GroupId) -> RegistryResult<()> {
        self.write()?
            .groups
            .remove(&group_id)
            .map(|_| ())
            .ok_or(RegistryError::GroupNotFound(group_id))
    }

    /// Deletes a household with its family members, groups and links.
    pub fn delete_household(&self, household_id: HouseholdId) -> RegistryResult<()> {
        let mut state = self.write()?;
        if state.households.remove(&household_id).is_none() {
            return Err(RegistryError::HouseholdNotFound(household_id));
        }

        let removed_members: Vec<FamilyMemberId> = state
            .family_members
            .values()
            .filter(|member| member.household_id == household_id)
            .map(|member| member.id)
            .collect();
        for id in &removed_members {
            state.family_members.remove(id);
        }
        for household in state.households.values_mut() {
            for id in &removed_members {
                household.extended_family.remove(id);
            }
        }
        state
            .groups
            .retain(|_, group| group.household_id != household_id);

        info!(
            "event=household_delete module=registry status=ok backend=memory household_id={household_id} family_members_removed={}",
            removed_members.len()
        );
        Ok(())
    }
}

impl HouseholdRegistry for MemoryHouseholdRegistry {
    fn get_household(&self, id: HouseholdId) -> RegistryResult<Household> {
        self.read()?.household(id).cloned()
    }

    fn get_family_members(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        let state = self.read()?;
        state.household(household_id)?;
        Ok(state.family_members_of(household_id))
    }

    fn get_extended_family(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        let state = self.read()?;
        let household = state.household(household_id)?;
        Ok(state.extended_family_of(household))
    }

    fn get_visibility_groups(
        &self,
        household_id: HouseholdId,
    ) -> RegistryResult<Vec<VisibilityGroup>> {
        let state = self.read()?;
        state.household(household_id)?;
        Ok(state.groups_of(household_id))
    }

    fn load_snapshot(&self, household_id: HouseholdId) -> RegistryResult<HouseholdSnapshot> {
        self.read()?.snapshot(household_id)
    }
}
