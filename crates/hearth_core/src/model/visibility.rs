//! Visibility/sharing domain model.
//!
//! # Responsibility
//! - Define the visibility fields every shareable record carries.
//! - Define household-scoped visibility groups.
//!
//! # Invariants
//! - `VisibilityContext::owner` is always set; ownership is never optional.
//! - Override values outside the known set are preserved verbatim as
//!   `VisibilityOverride::Unrecognized` so evaluation can fail closed instead
//!   of silently coercing them to a default.
//! - A `VisibilityGroup` belongs to exactly one household.

use crate::model::household::{HouseholdId, UserId};
use crate::model::ModelValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a visibility group.
pub type GroupId = Uuid;

/// Stored value for household-default visibility.
pub const VISIBILITY_HOUSEHOLD_DEFAULT: &str = "HOUSEHOLD_DEFAULT";
/// Stored value for extended-family visibility.
pub const VISIBILITY_EXTENDED_FAMILY: &str = "EXTENDED_FAMILY";
/// Stored value for custom-groups-only visibility.
pub const VISIBILITY_CUSTOM_GROUPS_ONLY: &str = "CUSTOM_GROUPS_ONLY";

const SUPPORTED_VISIBILITY_OVERRIDES: &[&str] = &[
    VISIBILITY_HOUSEHOLD_DEFAULT,
    VISIBILITY_EXTENDED_FAMILY,
    VISIBILITY_CUSTOM_GROUPS_ONLY,
];

/// Returns supported override strings in declaration order.
pub fn supported_visibility_overrides() -> &'static [&'static str] {
    SUPPORTED_VISIBILITY_OVERRIDES
}

/// Visibility override mode of one shareable record.
///
/// Serialized as its stored string value. Unknown strings deserialize into
/// `Unrecognized` rather than failing, because records may come from storage
/// written by a newer schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VisibilityOverride {
    /// Visible to household owner and members.
    #[default]
    HouseholdDefault,
    /// Visible to members plus linked extended-family users.
    ExtendedFamily,
    /// Visible only to members of the assigned visibility groups.
    CustomGroupsOnly,
    /// Value outside the known set. Always evaluated as deny.
    Unrecognized(String),
}

impl VisibilityOverride {
    /// Stored string form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::HouseholdDefault => VISIBILITY_HOUSEHOLD_DEFAULT,
            Self::ExtendedFamily => VISIBILITY_EXTENDED_FAMILY,
            Self::CustomGroupsOnly => VISIBILITY_CUSTOM_GROUPS_ONLY,
            Self::Unrecognized(value) => value.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Lenient conversion used by storage and wire decoding.
    ///
    /// Never fails; unknown values are kept as `Unrecognized`.
    pub fn from_stored(value: &str) -> Self {
        match value {
            VISIBILITY_HOUSEHOLD_DEFAULT => Self::HouseholdDefault,
            VISIBILITY_EXTENDED_FAMILY => Self::ExtendedFamily,
            VISIBILITY_CUSTOM_GROUPS_ONLY => Self::CustomGroupsOnly,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl Display for VisibilityOverride {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for VisibilityOverride {
    fn from(value: String) -> Self {
        Self::from_stored(value.as_str())
    }
}

impl From<VisibilityOverride> for String {
    fn from(value: VisibilityOverride) -> Self {
        match value {
            VisibilityOverride::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Strictly parses one override value from caller input.
///
/// Unlike `VisibilityOverride::from_stored`, unknown values are rejected.
pub fn parse_visibility_override(
    value: &str,
) -> Result<VisibilityOverride, InvalidOverrideError> {
    let normalized = value.trim();
    match VisibilityOverride::from_stored(normalized) {
        VisibilityOverride::Unrecognized(other) => Err(InvalidOverrideError(other)),
        known => Ok(known),
    }
}

/// Override value outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOverrideError(pub String);

impl Display for InvalidOverrideError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "visibility override `{}` is unsupported; expected one of {}",
            self.0,
            SUPPORTED_VISIBILITY_OVERRIDES.join("|")
        )
    }
}

impl Error for InvalidOverrideError {}

/// Owner and visibility fields embedded in every shareable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityContext {
    pub owner: UserId,
    #[serde(default)]
    pub private_to_owner: bool,
    #[serde(default)]
    pub visibility_override: VisibilityOverride,
    /// Groups granted access when the override is `CustomGroupsOnly`.
    #[serde(default)]
    pub visibility_groups: BTreeSet<GroupId>,
}

impl VisibilityContext {
    /// Household-default, non-private context owned by `owner`.
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner,
            private_to_owner: false,
            visibility_override: VisibilityOverride::HouseholdDefault,
            visibility_groups: BTreeSet::new(),
        }
    }

    /// Marks the record as visible to its owner only.
    pub fn private(mut self) -> Self {
        self.private_to_owner = true;
        self
    }

    pub fn with_override(mut self, visibility_override: VisibilityOverride) -> Self {
        self.visibility_override = visibility_override;
        self
    }

    /// Switches to custom-groups-only sharing with the given groups.
    pub fn shared_with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.visibility_override = VisibilityOverride::CustomGroupsOnly;
        self.visibility_groups = groups.into_iter().collect();
        self
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }
}

/// Capability implemented by every record subject to visibility evaluation.
pub trait Shareable {
    fn visibility(&self) -> &VisibilityContext;

    fn owner(&self) -> UserId {
        self.visibility().owner
    }
}

impl Shareable for VisibilityContext {
    fn visibility(&self) -> &VisibilityContext {
        self
    }
}

/// Named, household-scoped subset of users used for fine-grained sharing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityGroup {
    pub id: GroupId,
    pub household_id: HouseholdId,
    pub owner: UserId,
    pub name: String,
    #[serde(default)]
    pub members: BTreeSet<UserId>,
}

impl VisibilityGroup {
    pub fn new(household_id: HouseholdId, owner: UserId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            owner,
            name: name.into(),
            members: BTreeSet::new(),
        }
    }

    /// Returns whether `user` owns or belongs to this group.
    pub fn includes(&self, user: UserId) -> bool {
        self.owner == user || self.members.contains(&user)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::EmptyField("visibility_group.name"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_visibility_override, supported_visibility_overrides, InvalidOverrideError,
        VisibilityContext, VisibilityGroup, VisibilityOverride,
    };
    use uuid::Uuid;

    #[test]
    fn parses_all_supported_overrides() {
        assert_eq!(
            parse_visibility_override("HOUSEHOLD_DEFAULT").expect("household default parse"),
            VisibilityOverride::HouseholdDefault
        );
        assert_eq!(
            parse_visibility_override(" EXTENDED_FAMILY ").expect("extended family parse"),
            VisibilityOverride::ExtendedFamily
        );
        assert_eq!(
            parse_visibility_override("CUSTOM_GROUPS_ONLY").expect("custom groups parse"),
            VisibilityOverride::CustomGroupsOnly
        );
    }

    #[test]
    fn strict_parse_rejects_unknown_and_lowercase_values() {
        let err = parse_visibility_override("PUBLIC").expect_err("unknown override must fail");
        assert_eq!(err, InvalidOverrideError("PUBLIC".to_string()));

        let err = parse_visibility_override("household_default")
            .expect_err("lowercase override must fail");
        assert_eq!(err, InvalidOverrideError("household_default".to_string()));
    }

    #[test]
    fn stored_values_round_trip_including_unknown() {
        for value in supported_visibility_overrides() {
            let parsed = VisibilityOverride::from_stored(value);
            assert!(parsed.is_recognized());
            assert_eq!(parsed.as_str(), *value);
        }

        let unknown = VisibilityOverride::from_stored("FRIENDS_OF_FRIENDS");
        assert!(!unknown.is_recognized());
        assert_eq!(String::from(unknown), "FRIENDS_OF_FRIENDS");
    }

    #[test]
    fn context_defaults_to_household_visibility() {
        let owner = Uuid::new_v4();
        let context = VisibilityContext::owned_by(owner);
        assert!(context.is_owned_by(owner));
        assert!(!context.private_to_owner);
        assert_eq!(context.visibility_override, VisibilityOverride::default());
        assert!(context.visibility_groups.is_empty());
    }

    #[test]
    fn group_includes_owner_and_members_only() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let mut group = VisibilityGroup::new(Uuid::new_v4(), owner, "caregivers");
        group.members.insert(member);

        assert!(group.includes(owner));
        assert!(group.includes(member));
        assert!(!group.includes(Uuid::new_v4()));
    }

    #[test]
    fn group_with_blank_name_is_invalid() {
        let group = VisibilityGroup::new(Uuid::new_v4(), Uuid::new_v4(), "  ");
        assert!(group.validate().is_err());
    }
}
