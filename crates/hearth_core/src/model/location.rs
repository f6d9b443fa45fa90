//! Location, property note and maintenance schedule models.
//!
//! All three are shareable: they embed a `VisibilityContext` that is
//! independent of their household/location parent link.

use crate::model::household::HouseholdId;
use crate::model::visibility::{Shareable, VisibilityContext};
use crate::model::{require_range, require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LocationId = Uuid;
pub type PropertyNoteId = Uuid;
pub type MaintenanceScheduleId = Uuid;

/// Kind of place a location describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    #[default]
    PrimaryHome,
    ElderHome,
    Other,
}

impl LocationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryHome => "PRIMARY_HOME",
            Self::ElderHome => "ELDER_HOME",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PRIMARY_HOME" => Some(Self::PrimaryHome),
            "ELDER_HOME" => Some(Self::ElderHome),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Postal address of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Physical place belonging to a household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub household_id: HouseholdId,
    pub name: String,
    #[serde(default)]
    pub location_type: LocationType,
    pub address: Address,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(flatten)]
    pub visibility: VisibilityContext,
}

impl Location {
    pub fn new(
        household_id: HouseholdId,
        name: impl Into<String>,
        address: Address,
        visibility: VisibilityContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            name: name.into(),
            location_type: LocationType::default(),
            address,
            notes: String::new(),
            is_primary: false,
            visibility,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("location.name", &self.name)?;
        require_text("location.address_line1", &self.address.line1)?;
        require_text("location.city", &self.address.city)?;
        require_text("location.state", &self.address.state)?;
        require_text("location.postal_code", &self.address.postal_code)?;
        require_text("location.country", &self.address.country)
    }
}

impl Shareable for Location {
    fn visibility(&self) -> &VisibilityContext {
        &self.visibility
    }
}

/// Free-form note pinned to a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyNote {
    pub id: PropertyNoteId,
    pub location_id: LocationId,
    pub title: String,
    pub body: String,
    /// Comma-separated tags.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(flatten)]
    pub visibility: VisibilityContext,
}

impl PropertyNote {
    pub fn new(
        location_id: LocationId,
        title: impl Into<String>,
        body: impl Into<String>,
        visibility: VisibilityContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            location_id,
            title: title.into(),
            body: body.into(),
            tags: String::new(),
            pinned: false,
            visibility,
        }
    }

    /// Returns trimmed, non-empty tags in declaration order.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("property_note.title", &self.title)
    }
}

impl Shareable for PropertyNote {
    fn visibility(&self) -> &VisibilityContext {
        &self.visibility
    }
}

/// Recurrence cadence of a maintenance schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceRecurrence {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Custom,
}

impl MaintenanceRecurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Recurring upkeep attached to a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceSchedule {
    pub id: MaintenanceScheduleId,
    pub location_id: LocationId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub recurrence_type: MaintenanceRecurrence,
    pub interval: u32,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: Option<u8>,
    pub day_of_month: Option<u8>,
    /// Epoch milliseconds at day precision.
    pub next_due: i64,
    pub last_completed: Option<i64>,
    #[serde(default)]
    pub auto_create_task: bool,
    #[serde(flatten)]
    pub visibility: VisibilityContext,
}

impl MaintenanceSchedule {
    pub fn new(
        location_id: LocationId,
        name: impl Into<String>,
        description: impl Into<String>,
        next_due: i64,
        visibility: VisibilityContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            location_id,
            name: name.into(),
            description: description.into(),
            recurrence_type: MaintenanceRecurrence::default(),
            interval: 1,
            day_of_week: None,
            day_of_month: None,
            next_due,
            last_completed: None,
            auto_create_task: false,
            visibility,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("maintenance_schedule.name", &self.name)?;
        require_range(
            "maintenance_schedule.interval",
            i64::from(self.interval),
            1,
            i64::from(u32::MAX),
        )?;
        if let Some(day) = self.day_of_week {
            require_range("maintenance_schedule.day_of_week", i64::from(day), 0, 6)?;
        }
        if let Some(day) = self.day_of_month {
            require_range("maintenance_schedule.day_of_month", i64::from(day), 1, 31)?;
        }
        Ok(())
    }
}

impl Shareable for MaintenanceSchedule {
    fn visibility(&self) -> &VisibilityContext {
        &self.visibility
    }
}
