//! SQLite-backed household registry.
//!
//! # Responsibility
//! - Persist households, membership links, family members and visibility
//!   groups.
//! - Serve the registry read contract, with snapshots read inside one
//!   transaction.
//!
//! # Invariants
//! - Multi-row writes run in a single transaction, or in a savepoint when the
//!   borrowed connection is already inside the caller's transaction.
//! - Read paths reject malformed persisted ids instead of skipping rows.
//! - Cascading deletes are delegated to `ON DELETE CASCADE` foreign keys.

use crate::model::household::{FamilyMember, FamilyMemberId, Household, HouseholdId, UserId};
use crate::model::visibility::{GroupId, VisibilityGroup};
use crate::registry::{HouseholdRegistry, HouseholdSnapshot, RegistryError, RegistryResult};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::BTreeSet;
use std::ops::Deref;
use uuid::Uuid;

const FAMILY_MEMBER_SELECT_SQL: &str = "SELECT
    fm.id,
    fm.household_id,
    fm.linked_user_id,
    fm.full_name,
    fm.relationship_to_household,
    fm.is_elder,
    fm.primary_location_id
FROM family_members fm";

/// Registry over a borrowed, migrated SQLite connection.
pub struct SqliteHouseholdRegistry<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHouseholdRegistry<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Number of stored households.
    pub fn count_households(&self) -> RegistryResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM households;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RegistryError::InvalidData(format!("negative household count {count}")))
    }

    /// Inserts a household together with its member and extended-family sets.
    pub fn create_household(&self, household: &Household) -> RegistryResult<HouseholdId> {
        household.validate()?;
        if household_exists(self.conn, household.id)? {
            return Err(RegistryError::Duplicate(household.id));
        }

        let tx = WriteScope::begin(self.conn)?;
        tx.execute(
            "INSERT INTO households (id, name, owner_id) VALUES (?1, ?2, ?3);",
            params![
                household.id.to_string(),
                household.name.as_str(),
                household.owner.to_string()
            ],
        )?;
        for user in &household.members {
            tx.execute(
                "INSERT OR IGNORE INTO household_members (household_id, user_id) VALUES (?1, ?2);",
                params![household.id.to_string(), user.to_string()],
            )?;
        }
        for family_member_id in &household.extended_family {
            if !family_member_exists(&tx, *family_member_id)? {
                return Err(RegistryError::FamilyMemberNotFound(*family_member_id));
            }
            tx.execute(
                "INSERT OR IGNORE INTO household_extended_family (household_id, family_member_id)
                 VALUES (?1, ?2);",
                params![household.id.to_string(), family_member_id.to_string()],
            )?;
        }
        tx.commit()?;

        info!(
            "event=household_create module=registry status=ok backend=sqlite household_id={} members={}",
            household.id,
            household.members.len()
        );
        Ok(household.id)
    }

    pub fn add_member(&self, household_id: HouseholdId, user: UserId) -> RegistryResult<()> {
        ensure_household(self.conn, household_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO household_members (household_id, user_id) VALUES (?1, ?2);",
            params![household_id.to_string(), user.to_string()],
        )?;
        Ok(())
    }

    pub fn remove_member(&self, household_id: HouseholdId, user: UserId) -> RegistryResult<()> {
        ensure_household(self.conn, household_id)?;
        self.conn.execute(
            "DELETE FROM household_members WHERE household_id = ?1 AND user_id = ?2;",
            params![household_id.to_string(), user.to_string()],
        )?;
        Ok(())
    }

    pub fn create_family_member(&self, member: &FamilyMember) -> RegistryResult<FamilyMemberId> {
        member.validate()?;
        ensure_household(self.conn, member.household_id)?;
        if family_member_exists(self.conn, member.id)? {
            return Err(RegistryError::Duplicate(member.id));
        }

        self.conn.execute(
            "INSERT INTO family_members (
                id,
                household_id,
                linked_user_id,
                full_name,
                relationship_to_household,
                is_elder,
                primary_location_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                member.id.to_string(),
                member.household_id.to_string(),
                member.linked_user.map(|user| user.to_string()),
                member.full_name.as_str(),
                member.relationship_to_household.as_str(),
                bool_to_int(member.is_elder),
                member.primary_location.map(|id| id.to_string()),
            ],
        )?;
        Ok(member.id)
    }

    /// Adds one family member to the household's extended-family set.
    ///
    /// The family member may belong to a different household.
    pub fn link_extended_family(
        &self,
        household_id: HouseholdId,
        family_member_id: FamilyMemberId,
    ) -> RegistryResult<()> {
        ensure_household(self.conn, household_id)?;
        if !family_member_exists(self.conn, family_member_id)? {
            return Err(RegistryError::FamilyMemberNotFound(family_member_id));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO household_extended_family (household_id, family_member_id)
             VALUES (?1, ?2);",
            params![household_id.to_string(), family_member_id.to_string()],
        )?;
        Ok(())
    }

    pub fn unlink_extended_family(
        &self,
        household_id: HouseholdId,
        family_member_id: FamilyMemberId,
    ) -> RegistryResult<()> {
        ensure_household(self.conn, household_id)?;
        self.conn.execute(
            "DELETE FROM household_extended_family
             WHERE household_id = ?1 AND family_member_id = ?2;",
            params![household_id.to_string(), family_member_id.to_string()],
        )?;
        Ok(())
    }

    pub fn create_visibility_group(&self, group: &VisibilityGroup) -> RegistryResult<GroupId> {
        group.validate()?;
        ensure_household(self.conn, group.household_id)?;
        if group_exists(self.conn, group.id)? {
            return Err(RegistryError::Duplicate(group.id));
        }

        let tx = WriteScope::begin(self.conn)?;
        tx.execute(
            "INSERT INTO visibility_groups (id, household_id, owner_id, name)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                group.id.to_string(),
                group.household_id.to_string(),
                group.owner.to_string(),
                group.name.as_str()
            ],
        )?;
        for user in &group.members {
            tx.execute(
                "INSERT OR IGNORE INTO visibility_group_members (group_id, user_id) VALUES (?1, ?2);",
                params![group.id.to_string(), user.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(group.id)
    }

    pub fn add_group_member(&self, group_id: GroupId, user: UserId) -> RegistryResult<()> {
        ensure_group(self.conn, group_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO visibility_group_members (group_id, user_id) VALUES (?1, ?2);",
            params![group_id.to_string(), user.to_string()],
        )?;
        Ok(())
    }

    pub fn remove_group_member(&self, group_id: GroupId, user: UserId) -> RegistryResult<()> {
        ensure_group(self.conn, group_id)?;
        self.conn.execute(
            "DELETE FROM visibility_group_members WHERE group_id = ?1 AND user_id = ?2;",
            params![group_id.to_string(), user.to_string()],
        )?;
        Ok(())
    }

    pub fn delete_visibility_group(&self, group_id: GroupId) -> RegistryResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM visibility_groups WHERE id = ?1;",
            [group_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RegistryError::GroupNotFound(group_id));
        }
        Ok(())
    }

    /// Deletes a household; family members, groups and links cascade.
    pub fn delete_household(&self, household_id: HouseholdId) -> RegistryResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM households WHERE id = ?1;",
            [household_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RegistryError::HouseholdNotFound(household_id));
        }

        info!(
            "event=household_delete module=registry status=ok backend=sqlite household_id={household_id}"
        );
        Ok(())
    }
}

impl HouseholdRegistry for SqliteHouseholdRegistry<'_> {
    fn get_household(&self, id: HouseholdId) -> RegistryResult<Household> {
        read_household(self.conn, id)
    }

    fn get_family_members(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        ensure_household(self.conn, household_id)?;
        read_family_members(self.conn, household_id)
    }

    fn get_extended_family(&self, household_id: HouseholdId) -> RegistryResult<Vec<FamilyMember>> {
        ensure_household(self.conn, household_id)?;
        read_extended_family(self.conn, household_id)
    }

    fn get_visibility_groups(
        &self,
        household_id: HouseholdId,
    ) -> RegistryResult<Vec<VisibilityGroup>> {
        ensure_household(self.conn, household_id)?;
        read_visibility_groups(self.conn, household_id)
    }

    fn load_snapshot(&self, household_id: HouseholdId) -> RegistryResult<HouseholdSnapshot> {
        // A caller-held transaction already pins one database state.
        if !self.conn.is_autocommit() {
            return read_snapshot(self.conn, household_id);
        }
        let tx = self.conn.unchecked_transaction()?;
        let snapshot = read_snapshot(&tx, household_id)?;
        tx.commit()?;
        Ok(snapshot)
    }
}

/// Atomic write unit: a transaction on an idle connection, or a savepoint
/// nested in the caller's open transaction.
///
/// Dropping without `commit` rolls back only this unit's changes.
struct WriteScope<'conn> {
    conn: &'conn Connection,
    tx: Option<Transaction<'conn>>,
    savepoint_open: bool,
}

const WRITE_SAVEPOINT: &str = "hearth_registry_write";

impl<'conn> WriteScope<'conn> {
    fn begin(conn: &'conn Connection) -> rusqlite::Result<Self> {
        if conn.is_autocommit() {
            return Ok(Self {
                conn,
                tx: Some(conn.unchecked_transaction()?),
                savepoint_open: false,
            });
        }
        conn.execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT};"))?;
        Ok(Self {
            conn,
            tx: None,
            savepoint_open: true,
        })
    }

    fn commit(mut self) -> rusqlite::Result<()> {
        if let Some(tx) = self.tx.take() {
            return tx.commit();
        }
        self.conn
            .execute_batch(&format!("RELEASE {WRITE_SAVEPOINT};"))?;
        self.savepoint_open = false;
        Ok(())
    }
}

impl Deref for WriteScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        if !self.savepoint_open {
            return;
        }
        let rollback = format!("ROLLBACK TO {WRITE_SAVEPOINT}; RELEASE {WRITE_SAVEPOINT};");
        if let Err(err) = self.conn.execute_batch(&rollback) {
            warn!(
                "event=registry_write module=registry status=error error_code=savepoint_rollback_failed error={err}"
            );
        }
    }
}

fn read_snapshot(
    conn: &Connection,
    household_id: HouseholdId,
) -> RegistryResult<HouseholdSnapshot> {
    let household = read_household(conn, household_id)?;
    Ok(HouseholdSnapshot {
        family_members: read_family_members(conn, household_id)?,
        extended_family: read_extended_family(conn, household_id)?,
        visibility_groups: read_visibility_groups(conn, household_id)?,
        household,
    })
}

fn read_household(conn: &Connection, id: HouseholdId) -> RegistryResult<Household> {
    let row = conn
        .query_row(
            "SELECT id, name, owner_id FROM households WHERE id = ?1;",
            [id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>("id")?,
                    row.get::<_, String>("name")?,
                    row.get::<_, String>("owner_id")?,
                ))
            },
        )
        .optional()?;
    let Some((id_text, name, owner_text)) = row else {
        return Err(RegistryError::HouseholdNotFound(id));
    };

    let mut household = Household::with_id(
        parse_uuid(&id_text, "households.id")?,
        name,
        parse_uuid(&owner_text, "households.owner_id")?,
    );
    household.members = read_id_set(
        conn,
        "SELECT user_id FROM household_members WHERE household_id = ?1;",
        id,
        "household_members.user_id",
    )?;
    household.extended_family = read_id_set(
        conn,
        "SELECT family_member_id FROM household_extended_family WHERE household_id = ?1;",
        id,
        "household_extended_family.family_member_id",
    )?;
    Ok(household)
}

fn read_family_members(
    conn: &Connection,
    household_id: HouseholdId,
) -> RegistryResult<Vec<FamilyMember>> {
    let mut stmt = conn.prepare(&format!(
        "{FAMILY_MEMBER_SELECT_SQL}
         WHERE fm.household_id = ?1
         ORDER BY fm.full_name ASC, fm.id ASC;"
    ))?;
    let rows = stmt.query([household_id.to_string()])?;
    collect_family_members(rows)
}

fn read_extended_family(
    conn: &Connection,
    household_id: HouseholdId,
) -> RegistryResult<Vec<FamilyMember>> {
    let mut stmt = conn.prepare(&format!(
        "{FAMILY_MEMBER_SELECT_SQL}
         JOIN household_extended_family hef ON hef.family_member_id = fm.id
         WHERE hef.household_id = ?1
         ORDER BY fm.full_name ASC, fm.id ASC;"
    ))?;
    let rows = stmt.query([household_id.to_string()])?;
    collect_family_members(rows)
}

fn collect_family_members(mut rows: rusqlite::Rows<'_>) -> RegistryResult<Vec<FamilyMember>> {
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        members.push(parse_family_member_row(row)?);
    }
    Ok(members)
}

fn read_visibility_groups(
    conn: &Connection,
    household_id: HouseholdId,
) -> RegistryResult<Vec<VisibilityGroup>> {
    let mut stmt = conn.prepare(
        "SELECT id, household_id, owner_id, name
         FROM visibility_groups
         WHERE household_id = ?1
         ORDER BY name ASC, id ASC;",
    )?;
    let mut rows = stmt.query([household_id.to_string()])?;
    let mut groups = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        let household_text: String = row.get("household_id")?;
        let owner_text: String = row.get("owner_id")?;
        let id = parse_uuid(&id_text, "visibility_groups.id")?;
        groups.push(VisibilityGroup {
            id,
            household_id: parse_uuid(&household_text, "visibility_groups.household_id")?,
            owner: parse_uuid(&owner_text, "visibility_groups.owner_id")?,
            name: row.get("name")?,
            members: BTreeSet::new(),
        });
    }

    for group in &mut groups {
        group.members = read_id_set(
            conn,
            "SELECT user_id FROM visibility_group_members WHERE group_id = ?1;",
            group.id,
            "visibility_group_members.user_id",
        )?;
    }
    Ok(groups)
}

fn read_id_set(
    conn: &Connection,
    sql: &str,
    key: Uuid,
    column: &str,
) -> RegistryResult<BTreeSet<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key.to_string()])?;
    let mut ids = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.insert(parse_uuid(&text, column)?);
    }
    Ok(ids)
}

fn parse_family_member_row(row: &Row<'_>) -> RegistryResult<FamilyMember> {
    let id_text: String = row.get("id")?;
    let household_text: String = row.get("household_id")?;
    let linked_user = match row.get::<_, Option<String>>("linked_user_id")? {
        Some(text) => Some(parse_uuid(&text, "family_members.linked_user_id")?),
        None => None,
    };
    let primary_location = match row.get::<_, Option<String>>("primary_location_id")? {
        Some(text) => Some(parse_uuid(&text, "family_members.primary_location_id")?),
        None => None,
    };
    let is_elder = match row.get::<_, i64>("is_elder")? {
        0 => false,
        1 => true,
        other => {
            return Err(RegistryError::InvalidData(format!(
                "invalid is_elder value `{other}` in family_members.is_elder"
            )));
        }
    };

    Ok(FamilyMember {
        id: parse_uuid(&id_text, "family_members.id")?,
        household_id: parse_uuid(&household_text, "family_members.household_id")?,
        linked_user,
        full_name: row.get("full_name")?,
        relationship_to_household: row.get("relationship_to_household")?,
        is_elder,
        primary_location,
    })
}

fn parse_uuid(text: &str, column: &str) -> RegistryResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| RegistryError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

fn household_exists(conn: &Connection, id: HouseholdId) -> RegistryResult<bool> {
    row_exists(conn, "SELECT EXISTS(SELECT 1 FROM households WHERE id = ?1);", id)
}

fn family_member_exists(conn: &Connection, id: FamilyMemberId) -> RegistryResult<bool> {
    row_exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM family_members WHERE id = ?1);",
        id,
    )
}

fn group_exists(conn: &Connection, id: GroupId) -> RegistryResult<bool> {
    row_exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM visibility_groups WHERE id = ?1);",
        id,
    )
}

fn row_exists(conn: &Connection, sql: &str, id: Uuid) -> RegistryResult<bool> {
    let exists: i64 = conn.query_row(sql, [id.to_string()], |row| row.get(0))?;
    Ok(exists == 1)
}

fn ensure_household(conn: &Connection, id: HouseholdId) -> RegistryResult<()> {
    if !household_exists(conn, id)? {
        return Err(RegistryError::HouseholdNotFound(id));
    }
    Ok(())
}

fn ensure_group(conn: &Connection, id: GroupId) -> RegistryResult<()> {
    if !group_exists(conn, id)? {
        return Err(RegistryError::GroupNotFound(id));
    }
    Ok(())
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
