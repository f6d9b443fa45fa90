//! Core domain logic for hearth household management.
//! This crate owns the household schema and the visibility rules that decide
//! who may see which shareable record.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod service;

pub use access::{
    AllowReason, Decision, DenyReason, MembershipInfo, MembershipResolver, VisibilityError,
    VisibilityEvaluator, VisibilityResult,
};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::household::{
    FamilyMember, FamilyMemberId, Household, HouseholdId, Pet, PreferredUnits, Profile, UserId,
};
pub use model::location::{Address, Location, LocationType, MaintenanceSchedule, PropertyNote};
pub use model::task::{BillReminderTemplate, RecurrenceRule, Task, TaskCategory, TaskCompletion};
pub use model::visibility::{
    parse_visibility_override, GroupId, InvalidOverrideError, Shareable, VisibilityContext,
    VisibilityGroup, VisibilityOverride,
};
pub use model::ModelValidationError;
pub use registry::{
    HouseholdRegistry, HouseholdSnapshot, MemoryHouseholdRegistry, RegistryError,
    RegistryResult, SqliteHouseholdRegistry,
};
pub use service::visibility_service::VisibilityService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
