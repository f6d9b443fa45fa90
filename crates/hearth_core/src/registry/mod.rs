//! Household/group registry contracts and implementations.
//!
//! # Responsibility
//! - Define the read contract the membership resolver depends on.
//! - Provide SQLite-backed and in-memory registries.
//!
//! # Invariants
//! - Reads for an unknown household fail with `HouseholdNotFound`; they never
//!   return an empty result in its place.
//! - `load_snapshot` returns data from one consistent read. Implementations
//!   override the default composition to guarantee that.
//! - Write paths validate models before mutating state.

use crate::db::DbError;
use crate::model::household::{FamilyMember, FamilyMemberId, Household, HouseholdId};
use crate::model::visibility::{GroupId, VisibilityGroup};
use crate::model::ModelValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryHouseholdRegistry;
pub use sqlite::SqliteHouseholdRegistry;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry error for lookups, writes and storage transport.
#[derive(Debug)]
pub enum RegistryError {
    HouseholdNotFound(HouseholdId),
    FamilyMemberNotFound(FamilyMemberId),
    GroupNotFound(GroupId),
    /// Entity with the same id already exists.
    Duplicate(uuid::Uuid),
    Validation(ModelValidationError),
    Db(DbError),
    InvalidData(String),
    /// A writer panicked while holding the in-memory registry lock.
    LockPoisoned,
}

impl RegistryError {
    /// Returns whether this error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::HouseholdNotFound(_) | Self::FamilyMemberNotFound(_) | Self::GroupNotFound(_)
        )
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HouseholdNotFound(id) => write!(f, "household not found: {id}"),
            Self::FamilyMemberNotFound(id) => write!(f, "family member not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "visibility group not found: {id}"),
            Self::Duplicate(id) => write!(f, "registry entry already exists: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted registry data: {message}"),
            Self::LockPoisoned => write!(f, "registry lock poisoned"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for RegistryError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RegistryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One consistent view of a household's membership data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseholdSnapshot {
    pub household: Household,
    /// Family members belonging to the household.
    pub family_members: Vec<FamilyMember>,
    /// Family member records referenced by `household.extended_family`.
    ///
    /// These may belong to another household.
    pub extended_family: Vec<FamilyMember>,
    pub visibility_groups: Vec<VisibilityGroup>,
}

/// Read contract consumed by the membership resolver.
pub trait HouseholdRegistry {
    fn get_household(&self, id: HouseholdId) -> RegistryResult<Household>;

    /// Family members whose `household_id` is `household_id`.
    fn get_family_members(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>>;

    /// Family member records linked into the household's extended-family set.
    fn get_extended_family(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>>;

    fn get_visibility_groups(
        &self,
        household_id: HouseholdId,
    ) -> RegistryResult<Vec<VisibilityGroup>>;

    /// Loads household, family and group data for one decision.
    ///
    /// The default composes the individual reads and is only consistent when
    /// the registry is not mutated concurrently.
    fn load_snapshot(&self, household_id: HouseholdId) -> RegistryResult<HouseholdSnapshot> {
        let household = self.get_household(household_id)?;
        Ok(HouseholdSnapshot {
            family_members: self.get_family_members(household_id)?,
            extended_family: self.get_extended_family(household_id)?,
            visibility_groups: self.get_visibility_groups(household_id)?,
            household,
        })
    }
}

impl<R: HouseholdRegistry + ?Sized> HouseholdRegistry for &R {
    fn get_household(&self, id: HouseholdId) -> RegistryResult<Household> {
        (**self).get_household(id)
    }

    fn get_family_members(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        (**self).get_family_members(household_id)
    }

    fn get_extended_family(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        (**self).get_extended_family(household_id)
    }

    fn get_visibility_groups(
        &self,
        household_id: HouseholdId,
    ) -> RegistryResult<Vec<VisibilityGroup>> {
        (**self).get_visibility_groups(household_id)
    }

    fn load_snapshot(&self, household_id: HouseholdId) -> RegistryResult<HouseholdSnapshot> {
        (**self).load_snapshot(household_id)
    }
}

impl<R: HouseholdRegistry + ?Sized> HouseholdRegistry for Arc<R> {
    fn get_household(&self, id: HouseholdId) -> RegistryResult<Household> {
        (**self).get_household(id)
    }

    fn get_family_members(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        (**self).get_family_members(household_id)
    }

    fn get_extended_family(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        (**self).get_extended_family(household_id)
    }

    fn get_visibility_groups(
        &self,
        household_id: HouseholdId,
    ) -> RegistryResult<Vec<VisibilityGroup>> {
        (**self).get_visibility_groups(household_id)
    }

    fn load_snapshot(&self, household_id: HouseholdId) -> RegistryResult<HouseholdSnapshot> {
        (**self).load_snapshot(household_id)
    }
}
