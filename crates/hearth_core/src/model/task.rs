//! Task, recurrence, completion and bill reminder models.
//!
//! # Invariants
//! - `RecurrenceRule::end_date` is never earlier than `start_date`.
//! - `Task::is_completed` and `last_completed_at` move together through
//!   `Task::complete`.
//! - Tasks and bill reminder templates are shareable; completions and
//!   recurrence rules are not.

use crate::model::household::{HouseholdId, PetId, UserId};
use crate::model::location::{LocationId, MaintenanceScheduleId};
use crate::model::visibility::{GroupId, Shareable, VisibilityContext};
use crate::model::{require_range, require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;
pub type RecurrenceRuleId = Uuid;
pub type TaskCompletionId = Uuid;
pub type BillReminderTemplateId = Uuid;

/// Recurrence rule frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Calendar recurrence definition shared by tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: RecurrenceRuleId,
    pub frequency: Frequency,
    pub interval: u32,
    /// Weekday numbers, 0 = Monday .. 6 = Sunday.
    pub by_weekday: Option<Vec<u8>>,
    pub by_monthday: Option<i32>,
    pub start_date: i64,
    pub end_date: Option<i64>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, start_date: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            frequency,
            interval: 1,
            by_weekday: None,
            by_monthday: None,
            start_date,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_range(
            "recurrence_rule.interval",
            i64::from(self.interval),
            1,
            i64::from(u32::MAX),
        )?;
        if let Some(weekdays) = &self.by_weekday {
            for day in weekdays {
                require_range("recurrence_rule.by_weekday", i64::from(*day), 0, 6)?;
            }
        }
        if let Some(day) = self.by_monthday {
            require_range("recurrence_rule.by_monthday", i64::from(day), 1, 31)?;
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ModelValidationError::InvertedRange {
                    start_field: "recurrence_rule.start_date",
                    end_field: "recurrence_rule.end_date",
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Recurrence {} every {}",
            self.frequency.as_str(),
            self.interval
        )
    }
}

/// Task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    #[default]
    Household,
    ElderCare,
    Maintenance,
    Pet,
    BillReminder,
    Vehicle,
    Appliance,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Household => "HOUSEHOLD",
            Self::ElderCare => "ELDER_CARE",
            Self::Maintenance => "MAINTENANCE",
            Self::Pet => "PET",
            Self::BillReminder => "BILL_REMINDER",
            Self::Vehicle => "VEHICLE",
            Self::Appliance => "APPLIANCE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HOUSEHOLD" => Some(Self::Household),
            "ELDER_CARE" => Some(Self::ElderCare),
            "MAINTENANCE" => Some(Self::Maintenance),
            "PET" => Some(Self::Pet),
            "BILL_REMINDER" => Some(Self::BillReminder),
            "VEHICLE" => Some(Self::Vehicle),
            "APPLIANCE" => Some(Self::Appliance),
            _ => None,
        }
    }
}

/// Simple task recurrence selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRecurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl TaskRecurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Actionable household task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub household_id: HouseholdId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: TaskCategory,
    pub location_id: Option<LocationId>,
    pub pet_id: Option<PetId>,
    pub related_maintenance_schedule: Option<MaintenanceScheduleId>,
    pub due_date: Option<i64>,
    pub due_datetime: Option<i64>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_completed: bool,
    pub last_completed_at: Option<i64>,
    pub assigned_to_user: Option<UserId>,
    pub assigned_to_group: Option<GroupId>,
    #[serde(default)]
    pub recurrence_type: TaskRecurrence,
    pub recurrence_rule: Option<RecurrenceRuleId>,
    #[serde(flatten)]
    pub visibility: VisibilityContext,
}

impl Task {
    pub fn new(
        household_id: HouseholdId,
        title: impl Into<String>,
        visibility: VisibilityContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            title: title.into(),
            description: String::new(),
            category: TaskCategory::default(),
            location_id: None,
            pet_id: None,
            related_maintenance_schedule: None,
            due_date: None,
            due_datetime: None,
            priority: 0,
            is_completed: false,
            last_completed_at: None,
            assigned_to_user: None,
            assigned_to_group: None,
            recurrence_type: TaskRecurrence::default(),
            recurrence_rule: None,
            visibility,
        }
    }

    /// Marks the task completed and returns the completion record.
    pub fn complete(
        &mut self,
        completed_by: Option<UserId>,
        completed_at: i64,
        source: impl Into<String>,
    ) -> TaskCompletion {
        self.is_completed = true;
        self.last_completed_at = Some(completed_at);
        TaskCompletion {
            id: Uuid::new_v4(),
            task_id: self.id,
            completed_by,
            completed_at,
            notes: String::new(),
            source: source.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("task.title", &self.title)
    }
}

impl Shareable for Task {
    fn visibility(&self) -> &VisibilityContext {
        &self.visibility
    }
}

/// Audit record of one task completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub id: TaskCompletionId,
    pub task_id: TaskId,
    pub completed_by: Option<UserId>,
    pub completed_at: i64,
    #[serde(default)]
    pub notes: String,
    pub source: String,
}

/// Bill reminder recurrence. Only monthly reminders exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillRecurrence {
    #[default]
    Monthly,
}

impl BillRecurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Template for generating recurring bill reminder tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillReminderTemplate {
    pub id: BillReminderTemplateId,
    pub household_id: HouseholdId,
    pub name: String,
    pub description: String,
    pub day_of_month_due: u8,
    #[serde(default)]
    pub recurrence_type: BillRecurrence,
    #[serde(default = "default_active")]
    pub active: bool,
    pub last_generated: Option<i64>,
    #[serde(flatten)]
    pub visibility: VisibilityContext,
}

fn default_active() -> bool {
    true
}

impl BillReminderTemplate {
    pub fn new(
        household_id: HouseholdId,
        name: impl Into<String>,
        description: impl Into<String>,
        day_of_month_due: u8,
        visibility: VisibilityContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            name: name.into(),
            description: description.into(),
            day_of_month_due,
            recurrence_type: BillRecurrence::default(),
            active: true,
            last_generated: None,
            visibility,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("bill_reminder_template.name", &self.name)?;
        require_range(
            "bill_reminder_template.day_of_month_due",
            i64::from(self.day_of_month_due),
            1,
            31,
        )
    }
}

impl Shareable for BillReminderTemplate {
    fn visibility(&self) -> &VisibilityContext {
        &self.visibility
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BillReminderTemplate, Frequency, RecurrenceRule, Task, TaskCategory, TaskRecurrence,
    };
    use crate::model::visibility::VisibilityContext;
    use crate::model::ModelValidationError;
    use uuid::Uuid;

    #[test]
    fn task_defaults_match_schema() {
        let task = Task::new(
            Uuid::new_v4(),
            "Refill pill organizer",
            VisibilityContext::owned_by(Uuid::new_v4()),
        );
        assert_eq!(task.category, TaskCategory::Household);
        assert_eq!(task.recurrence_type, TaskRecurrence::None);
        assert_eq!(task.priority, 0);
        assert!(!task.is_completed);
    }

    #[test]
    fn complete_sets_flag_and_returns_completion() {
        let user = Uuid::new_v4();
        let mut task = Task::new(
            Uuid::new_v4(),
            "Walk dog",
            VisibilityContext::owned_by(user),
        );

        let completion = task.complete(Some(user), 1_700_000_000_000, "manual");
        assert!(task.is_completed);
        assert_eq!(task.last_completed_at, Some(1_700_000_000_000));
        assert_eq!(completion.task_id, task.id);
        assert_eq!(completion.completed_by, Some(user));
        assert_eq!(completion.source, "manual");
    }

    #[test]
    fn recurrence_rule_rejects_inverted_dates_and_bad_weekdays() {
        let mut rule = RecurrenceRule::new(Frequency::Weekly, 2_000);
        rule.validate().expect("default rule should validate");
        assert_eq!(rule.to_string(), "Recurrence weekly every 1");

        rule.end_date = Some(1_000);
        assert!(matches!(
            rule.validate(),
            Err(ModelValidationError::InvertedRange { .. })
        ));

        rule.end_date = None;
        rule.by_weekday = Some(vec![0, 9]);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn bill_reminder_due_day_must_be_calendar_day() {
        let mut template = BillReminderTemplate::new(
            Uuid::new_v4(),
            "Electric",
            "Utility bill",
            15,
            VisibilityContext::owned_by(Uuid::new_v4()),
        );
        assert!(template.active);
        template.validate().expect("day 15 is valid");

        template.day_of_month_due = 0;
        assert!(template.validate().is_err());
        template.day_of_month_due = 32;
        assert!(template.validate().is_err());
    }

    #[test]
    fn task_category_parses_stored_values() {
        assert_eq!(
            TaskCategory::parse("ELDER_CARE"),
            Some(TaskCategory::ElderCare)
        );
        assert_eq!(TaskCategory::BillReminder.as_str(), "BILL_REMINDER");
        assert_eq!(TaskCategory::parse("elder_care"), None);
        assert_eq!(TaskRecurrence::parse("none"), Some(TaskRecurrence::None));
    }
}
