use hearth_core::db::open_db_in_memory;
use hearth_core::{
    Address, FamilyMember, Household, HouseholdRegistry, Location, MemoryHouseholdRegistry,
    PropertyNote, SqliteHouseholdRegistry, Task, VisibilityContext, VisibilityError,
    VisibilityGroup, VisibilityOverride, VisibilityService,
};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

fn address() -> Address {
    Address {
        line1: "12 Elm Street".to_string(),
        line2: String::new(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        postal_code: "62701".to_string(),
        country: "US".to_string(),
    }
}

#[test]
fn filter_visible_keeps_allowed_records_in_order() {
    let registry = MemoryHouseholdRegistry::new();
    let owner = Uuid::new_v4();
    let member = Uuid::new_v4();
    let mut household = Household::new("Home", owner);
    household.members.insert(member);
    registry.create_household(&household).unwrap();

    let service = VisibilityService::new(&registry);
    let tasks = vec![
        Task::new(household.id, "water plants", VisibilityContext::owned_by(owner)),
        Task::new(household.id, "surprise party", VisibilityContext::owned_by(owner).private()),
        Task::new(household.id, "own chore", VisibilityContext::owned_by(member).private()),
        Task::new(
            household.id,
            "groups only",
            VisibilityContext::owned_by(owner).with_override(VisibilityOverride::CustomGroupsOnly),
        ),
        Task::new(household.id, "take out trash", VisibilityContext::owned_by(owner)),
    ];

    let visible = service.filter_visible(&tasks, household.id, member).unwrap();
    let titles: Vec<&str> = visible.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles, vec!["water plants", "own chore", "take out trash"]);
}

#[test]
fn filter_visible_matches_single_record_checks() {
    let conn = open_db_in_memory().unwrap();
    let registry = SqliteHouseholdRegistry::new(&conn);
    let owner = Uuid::new_v4();
    let household = Household::new("Home", owner);
    registry.create_household(&household).unwrap();

    let grandpa_user = Uuid::new_v4();
    let grandpa = FamilyMember::new(household.id, "Walt", "grandfather").linked_to(grandpa_user);
    registry.create_family_member(&grandpa).unwrap();
    registry.link_extended_family(household.id, grandpa.id).unwrap();

    let service = VisibilityService::new(&registry);
    let location = Location::new(
        household.id,
        "Main house",
        address(),
        VisibilityContext::owned_by(owner),
    );
    let notes = vec![
        PropertyNote::new(location.id, "Wifi", "hunter2", VisibilityContext::owned_by(owner)),
        PropertyNote::new(
            location.id,
            "Spare key",
            "under the mat",
            VisibilityContext::owned_by(owner).with_override(VisibilityOverride::ExtendedFamily),
        ),
    ];

    let visible = service.filter_visible(&notes, household.id, grandpa_user).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "Spare key");
    for note in &notes {
        let included = visible.iter().any(|kept| kept.id == note.id);
        assert_eq!(
            service.can_view(note, household.id, grandpa_user).unwrap(),
            included
        );
    }
    assert!(!service.can_view(&location, household.id, grandpa_user).unwrap());
}

#[test]
fn filter_visible_skips_registry_when_membership_not_needed() {
    let registry = MemoryHouseholdRegistry::new();
    let service = VisibilityService::new(&registry);
    let requester = Uuid::new_v4();
    let missing_household = Uuid::new_v4();

    let records = vec![
        VisibilityContext::owned_by(requester),
        VisibilityContext::owned_by(Uuid::new_v4()).private(),
    ];
    let visible = service
        .filter_visible(&records, missing_household, requester)
        .unwrap();
    assert_eq!(visible, vec![&records[0]]);

    let empty: Vec<VisibilityContext> = Vec::new();
    assert!(service
        .filter_visible(&empty, missing_household, requester)
        .unwrap()
        .is_empty());
}

#[test]
fn filter_visible_reports_missing_household_when_resolution_needed() {
    let registry = MemoryHouseholdRegistry::new();
    let service = VisibilityService::new(&registry);
    let missing = Uuid::new_v4();

    let records = vec![VisibilityContext::owned_by(Uuid::new_v4())];
    let err = service
        .filter_visible(&records, missing, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, VisibilityError::HouseholdNotFound(id) if id == missing));
}

#[test]
fn resolve_membership_reports_group_scope() {
    let registry = MemoryHouseholdRegistry::new();
    let owner = Uuid::new_v4();
    let sitter = Uuid::new_v4();
    let household = Household::new("Home", owner);
    registry.create_household(&household).unwrap();
    let mut sitters = VisibilityGroup::new(household.id, owner, "sitters");
    sitters.members.insert(sitter);
    registry.create_visibility_group(&sitters).unwrap();

    let service = VisibilityService::new(&registry);
    let info = service.resolve_membership(household.id, sitter).unwrap();
    assert!(!info.is_member);
    assert!(!info.is_extended_family);
    assert!(info.custom_groups.contains(&sitters.id));
    assert!(info.is_related());

    let owner_info = service.resolve_membership(household.id, owner).unwrap();
    assert!(owner_info.is_owner && owner_info.is_member);
    assert!(owner_info.custom_groups.contains(&sitters.id));
}

#[test]
fn service_is_shareable_across_threads() {
    let registry = Arc::new(MemoryHouseholdRegistry::new());
    let owner = Uuid::new_v4();
    let member = Uuid::new_v4();
    let mut household = Household::new("Home", owner);
    household.members.insert(member);
    registry.create_household(&household).unwrap();
    let household_id = household.id;

    let service = Arc::new(VisibilityService::new(Arc::clone(&registry)));
    let record = VisibilityContext::owned_by(owner);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let record = record.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|_| service.can_view(&record, household_id, member).unwrap())
                    .all(|allowed| allowed)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert!(service.registry().get_household(household_id).is_ok());
}

#[test]
fn preview_override_parses_strictly_and_leaves_record_untouched() {
    let registry = MemoryHouseholdRegistry::new();
    let owner = Uuid::new_v4();
    let household = Household::new("Home", owner);
    registry.create_household(&household).unwrap();
    let cousin_user = Uuid::new_v4();
    let cousin = FamilyMember::new(household.id, "Kim", "cousin").linked_to(cousin_user);
    registry.create_family_member(&cousin).unwrap();
    registry.link_extended_family(household.id, cousin.id).unwrap();

    let service = VisibilityService::new(&registry);
    let record = VisibilityContext::owned_by(owner);

    assert!(!service.can_view(&record, household.id, cousin_user).unwrap());
    let preview = service
        .preview_override(&record, " EXTENDED_FAMILY ", household.id, cousin_user)
        .unwrap();
    assert!(preview.is_allowed());
    assert_eq!(record.visibility_override, VisibilityOverride::HouseholdDefault);

    let err = service
        .preview_override(&record, "EVERYONE", household.id, cousin_user)
        .unwrap_err();
    assert!(matches!(err, VisibilityError::InvalidOverride(ref inner) if inner.0 == "EVERYONE"));
}
