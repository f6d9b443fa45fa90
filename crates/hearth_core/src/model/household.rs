//! Household, family member, pet and profile models.
//!
//! # Invariants
//! - The household owner is implicitly a member, whether or not it appears in
//!   `members`.
//! - A `FamilyMember` belongs to exactly one household; its optional
//!   `linked_user` ties it to a platform account.
//! - `extended_family` stores family member ids, not user ids.

use crate::model::location::LocationId;
use crate::model::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Platform user account identifier.
pub type UserId = Uuid;
/// Stable household identifier.
pub type HouseholdId = Uuid;
/// Stable family member identifier.
pub type FamilyMemberId = Uuid;
/// Stable pet identifier.
pub type PetId = Uuid;

/// Top-level tenant grouping users, locations and tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    pub owner: UserId,
    #[serde(default)]
    pub members: BTreeSet<UserId>,
    /// Family member records granted extended-family visibility.
    #[serde(default)]
    pub extended_family: BTreeSet<FamilyMemberId>,
}

impl Household {
    /// Creates a household with a generated id and no explicit members.
    pub fn new(name: impl Into<String>, owner: UserId) -> Self {
        Self::with_id(Uuid::new_v4(), name, owner)
    }

    pub fn with_id(id: HouseholdId, name: impl Into<String>, owner: UserId) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            members: BTreeSet::new(),
            extended_family: BTreeSet::new(),
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// Owner or explicit member.
    pub fn is_member(&self, user: UserId) -> bool {
        self.is_owner(user) || self.members.contains(&user)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("household.name", &self.name)
    }
}

/// Person tracked by a household, optionally linked to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: FamilyMemberId,
    pub household_id: HouseholdId,
    pub linked_user: Option<UserId>,
    pub full_name: String,
    pub relationship_to_household: String,
    #[serde(default)]
    pub is_elder: bool,
    pub primary_location: Option<LocationId>,
}

impl FamilyMember {
    pub fn new(
        household_id: HouseholdId,
        full_name: impl Into<String>,
        relationship_to_household: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            linked_user: None,
            full_name: full_name.into(),
            relationship_to_household: relationship_to_household.into(),
            is_elder: false,
            primary_location: None,
        }
    }

    pub fn linked_to(mut self, user: UserId) -> Self {
        self.linked_user = Some(user);
        self
    }

    pub fn is_linked_to(&self, user: UserId) -> bool {
        self.linked_user == Some(user)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("family_member.full_name", &self.full_name)?;
        require_text(
            "family_member.relationship_to_household",
            &self.relationship_to_household,
        )
    }
}

/// Household pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    pub household_id: HouseholdId,
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub breed: String,
    /// Epoch milliseconds at day precision.
    pub date_of_birth: Option<i64>,
    pub primary_location: Option<LocationId>,
    pub primary_caregiver_user: Option<UserId>,
    pub primary_caregiver_family_member: Option<FamilyMemberId>,
}

impl Pet {
    pub fn new(
        household_id: HouseholdId,
        name: impl Into<String>,
        species: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            name: name.into(),
            species: species.into(),
            breed: String::new(),
            date_of_birth: None,
            primary_location: None,
            primary_caregiver_user: None,
            primary_caregiver_family_member: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("pet.name", &self.name)?;
        require_text("pet.species", &self.species)
    }
}

/// Unit system preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredUnits {
    Metric,
    #[default]
    Us,
}

impl PreferredUnits {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Us => "us",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "metric" => Some(Self::Metric),
            "us" => Some(Self::Us),
            _ => None,
        }
    }
}

const DEFAULT_TIMEZONE: &str = "UTC";

/// Per-user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user: UserId,
    pub default_household: Option<HouseholdId>,
    pub timezone: String,
    #[serde(default)]
    pub preferred_units: PreferredUnits,
    #[serde(default)]
    pub notification_preferences: BTreeMap<String, String>,
}

impl Profile {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            default_household: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            preferred_units: PreferredUnits::default(),
            notification_preferences: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("profile.timezone", &self.timezone)
    }
}
