use hearth_core::db::open_db_in_memory;
use hearth_core::{
    AllowReason, Decision, DenyReason, FamilyMember, Household, HouseholdId, HouseholdRegistry,
    MemoryHouseholdRegistry, SqliteHouseholdRegistry, UserId, VisibilityContext, VisibilityError,
    VisibilityEvaluator, VisibilityGroup, VisibilityOverride,
};
use uuid::Uuid;

/// Household H: owner O, members {A, B}, extended family {C}, group G = {B}.
struct Family {
    household: HouseholdId,
    a: UserId,
    b: UserId,
    c: UserId,
    group: Uuid,
}

impl Family {
    fn users() -> (UserId, UserId, UserId, UserId) {
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }
}

fn seed_memory(registry: &MemoryHouseholdRegistry) -> Family {
    let (owner, a, b, c) = Family::users();
    let mut household = Household::new("H", owner);
    household.members.extend([a, b]);
    registry.create_household(&household).unwrap();

    let relative = FamilyMember::new(household.id, "C", "cousin").linked_to(c);
    registry.create_family_member(&relative).unwrap();
    registry.link_extended_family(household.id, relative.id).unwrap();

    let mut group = VisibilityGroup::new(household.id, owner, "G");
    group.members.insert(b);
    registry.create_visibility_group(&group).unwrap();

    Family {
        household: household.id,
        a,
        b,
        c,
        group: group.id,
    }
}

fn seed_sqlite(registry: &SqliteHouseholdRegistry<'_>) -> Family {
    let (owner, a, b, c) = Family::users();
    let mut household = Household::new("H", owner);
    household.members.extend([a, b]);
    registry.create_household(&household).unwrap();

    let relative = FamilyMember::new(household.id, "C", "cousin").linked_to(c);
    registry.create_family_member(&relative).unwrap();
    registry.link_extended_family(household.id, relative.id).unwrap();

    let mut group = VisibilityGroup::new(household.id, owner, "G");
    group.members.insert(b);
    registry.create_visibility_group(&group).unwrap();

    Family {
        household: household.id,
        a,
        b,
        c,
        group: group.id,
    }
}

fn assert_scenarios<R: HouseholdRegistry>(evaluator: &VisibilityEvaluator<R>, family: &Family) {
    let h = family.household;

    let r = VisibilityContext::owned_by(family.a);
    assert!(evaluator.can_view(&r, h, family.b).unwrap());
    assert!(!evaluator.can_view(&r, h, family.c).unwrap());

    let r2 =
        VisibilityContext::owned_by(family.a).with_override(VisibilityOverride::ExtendedFamily);
    assert!(evaluator.can_view(&r2, h, family.c).unwrap());
    assert!(evaluator.can_view(&r2, h, family.b).unwrap());

    let r3 = VisibilityContext::owned_by(family.a).shared_with_groups([family.group]);
    assert!(evaluator.can_view(&r3, h, family.b).unwrap());
    assert!(!evaluator.can_view(&r3, h, family.c).unwrap());

    let r4 =
        VisibilityContext::owned_by(family.a).with_override(VisibilityOverride::CustomGroupsOnly);
    assert!(evaluator.can_view(&r4, h, family.a).unwrap());
    for requester in [family.b, family.c, Uuid::new_v4()] {
        assert!(!evaluator.can_view(&r4, h, requester).unwrap());
    }
}

#[test]
fn scenarios_hold_for_memory_registry() {
    let registry = MemoryHouseholdRegistry::new();
    let family = seed_memory(&registry);
    assert_scenarios(&VisibilityEvaluator::new(&registry), &family);
}

#[test]
fn scenarios_hold_for_sqlite_registry() {
    let conn = open_db_in_memory().unwrap();
    let registry = SqliteHouseholdRegistry::new(&conn);
    let family = seed_sqlite(&registry);
    assert_scenarios(&VisibilityEvaluator::new(&registry), &family);
}

#[test]
fn owner_always_sees_own_records() {
    let registry = MemoryHouseholdRegistry::new();
    let family = seed_memory(&registry);
    let evaluator = VisibilityEvaluator::new(&registry);

    let modes = [
        VisibilityOverride::HouseholdDefault,
        VisibilityOverride::ExtendedFamily,
        VisibilityOverride::CustomGroupsOnly,
        VisibilityOverride::from_stored("SOMETHING_NEW"),
    ];
    for owner in [family.a, family.c, Uuid::new_v4()] {
        for mode in &modes {
            for private in [false, true] {
                let mut record = VisibilityContext::owned_by(owner).with_override(mode.clone());
                record.private_to_owner = private;
                assert_eq!(
                    evaluator.evaluate(&record, family.household, owner).unwrap(),
                    Decision::Allow(AllowReason::Owner)
                );
            }
        }
    }
}

#[test]
fn owner_check_precedes_household_lookup() {
    let registry = MemoryHouseholdRegistry::new();
    let evaluator = VisibilityEvaluator::new(&registry);
    let owner = Uuid::new_v4();

    let record = VisibilityContext::owned_by(owner);
    assert!(evaluator.can_view(&record, Uuid::new_v4(), owner).unwrap());
    let private = VisibilityContext::owned_by(owner).private();
    assert!(!evaluator
        .can_view(&private, Uuid::new_v4(), Uuid::new_v4())
        .unwrap());
}

#[test]
fn private_records_hide_from_everyone_but_owner() {
    let registry = MemoryHouseholdRegistry::new();
    let family = seed_memory(&registry);
    let evaluator = VisibilityEvaluator::new(&registry);
    let household_owner = registry.get_household(family.household).unwrap().owner;

    let record = VisibilityContext::owned_by(family.a)
        .shared_with_groups([family.group])
        .private();
    for requester in [household_owner, family.b, family.c] {
        assert_eq!(
            evaluator.evaluate(&record, family.household, requester).unwrap(),
            Decision::Deny(DenyReason::PrivateToOwner)
        );
    }
}

#[test]
fn outsiders_never_see_household_default_records() {
    let registry = MemoryHouseholdRegistry::new();
    let family = seed_memory(&registry);
    let evaluator = VisibilityEvaluator::new(&registry);

    let record = VisibilityContext::owned_by(family.a);
    for _ in 0..5 {
        assert_eq!(
            evaluator
                .evaluate(&record, family.household, Uuid::new_v4())
                .unwrap(),
            Decision::Deny(DenyReason::NotHouseholdMember)
        );
    }
}

#[test]
fn repeated_evaluation_is_stable() {
    let conn = open_db_in_memory().unwrap();
    let registry = SqliteHouseholdRegistry::new(&conn);
    let family = seed_sqlite(&registry);
    let evaluator = VisibilityEvaluator::new(&registry);

    let record = VisibilityContext::owned_by(family.a).shared_with_groups([family.group]);
    let first = evaluator.evaluate(&record, family.household, family.b).unwrap();
    for _ in 0..3 {
        assert_eq!(
            evaluator.evaluate(&record, family.household, family.b).unwrap(),
            first
        );
    }
    assert_eq!(first, Decision::Allow(AllowReason::GroupGrant(family.group)));
}

#[test]
fn unknown_household_surfaces_not_found() {
    let registry = MemoryHouseholdRegistry::new();
    let evaluator = VisibilityEvaluator::new(&registry);
    let missing = Uuid::new_v4();

    let record = VisibilityContext::owned_by(Uuid::new_v4());
    let err = evaluator
        .can_view(&record, missing, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, VisibilityError::HouseholdNotFound(id) if id == missing));
}

#[test]
fn unrecognized_override_fails_closed_for_members() {
    let registry = MemoryHouseholdRegistry::new();
    let family = seed_memory(&registry);
    let evaluator = VisibilityEvaluator::new(&registry);

    let record: VisibilityContext = serde_json::from_value(serde_json::json!({
        "owner": family.a,
        "visibility_override": "FRIENDS_OF_FRIENDS",
    }))
    .unwrap();

    let decision = evaluator.evaluate(&record, family.household, family.b).unwrap();
    assert!(!decision.is_allowed());
    assert_eq!(decision.warning(), Some("FRIENDS_OF_FRIENDS"));
}

#[test]
fn groups_from_another_household_never_grant_access() {
    let registry = MemoryHouseholdRegistry::new();
    let family = seed_memory(&registry);
    let evaluator = VisibilityEvaluator::new(&registry);

    // Same users, second household with its own group containing C.
    let other_owner = Uuid::new_v4();
    let mut other = Household::new("Other", other_owner);
    other.members.insert(family.c);
    registry.create_household(&other).unwrap();
    let mut foreign_group = VisibilityGroup::new(other.id, other_owner, "foreign");
    foreign_group.members.insert(family.c);
    registry.create_visibility_group(&foreign_group).unwrap();

    let record = VisibilityContext::owned_by(family.a).shared_with_groups([foreign_group.id]);
    assert_eq!(
        evaluator.evaluate(&record, family.household, family.c).unwrap(),
        Decision::Deny(DenyReason::NoSharedGroup)
    );
    assert!(evaluator.can_view(&record, other.id, family.c).unwrap());
}

#[test]
fn membership_changes_apply_to_next_decision() {
    let registry = MemoryHouseholdRegistry::new();
    let family = seed_memory(&registry);
    let evaluator = VisibilityEvaluator::new(&registry);
    let record = VisibilityContext::owned_by(family.a);

    assert!(evaluator.can_view(&record, family.household, family.b).unwrap());
    registry.remove_member(family.household, family.b).unwrap();
    assert!(!evaluator.can_view(&record, family.household, family.b).unwrap());
}
