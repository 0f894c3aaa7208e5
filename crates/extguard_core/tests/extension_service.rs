use extguard_core::db::open_db_in_memory;
use extguard_core::{
    ExtensionCategory, ExtensionId, ExtensionRecord, ExtensionRepository, ExtensionService,
    ExtensionServiceError, ExtensionStore, ExtensionSummary, FixedExtension, FixedToggle, Owner,
    RepoError, RepoResult, SqliteExtensionRepository, SqliteExtensionStore,
};
use rusqlite::Connection;

fn owner() -> Owner {
    Owner::parse("test-user-guid").unwrap()
}

fn custom_exists(conn: &Connection, owner: &Owner, name: &str) -> bool {
    SqliteExtensionRepository::new(conn)
        .exists(owner.as_str(), name, ExtensionCategory::Custom)
        .unwrap()
}

fn custom_count(conn: &Connection, owner: &Owner) -> u32 {
    SqliteExtensionRepository::new(conn)
        .count(owner.as_str(), ExtensionCategory::Custom)
        .unwrap()
}

fn seed_custom(conn: &Connection, owner: &Owner, count: usize) {
    let repo = SqliteExtensionRepository::new(conn);
    for index in 0..count {
        repo.save(owner.as_str(), &format!("seed{index}"), ExtensionCategory::Custom)
            .unwrap();
    }
}

#[test]
fn add_custom_persists_valid_name() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();

    let record = {
        let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));
        service.add_custom(&owner, "png").unwrap()
    };

    assert_eq!(record.name, "png");
    assert_eq!(record.category, ExtensionCategory::Custom);
    assert!(custom_exists(&conn, &owner, "png"));
}

#[test]
fn add_custom_normalizes_before_saving() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    assert_eq!(service.add_custom(&owner, "my ext").unwrap().name, "myext");
    assert_eq!(service.add_custom(&owner, " .TAR.GZ ").unwrap().name, "targz");
    assert_eq!(service.add_custom(&owner, "Web_P-2").unwrap().name, "web_p-2");
}

#[test]
fn add_custom_rejects_empty_input() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    for raw in ["", "   ", ".", " . "] {
        let err = service.add_custom(&owner, raw).unwrap_err();
        assert!(
            matches!(err, ExtensionServiceError::EmptyInput),
            "`{raw}` should be empty input, got {err:?}"
        );
    }
}

#[test]
fn add_custom_enforces_length_limit() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    let err = service.add_custom(&owner, &"a".repeat(21)).unwrap_err();
    assert!(matches!(err, ExtensionServiceError::NameTooLong));

    let record = service.add_custom(&owner, &"a".repeat(20)).unwrap();
    assert_eq!(record.name.len(), 20);
}

#[test]
fn add_custom_rejects_invalid_characters() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    for raw in ["한글", "ex!e", "tar/gz", "*.png"] {
        let err = service.add_custom(&owner, raw).unwrap_err();
        assert!(
            matches!(err, ExtensionServiceError::InvalidCharacters),
            "`{raw}` should be rejected, got {err:?}"
        );
    }
}

#[test]
fn add_custom_rejects_fixed_extension_names() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    for raw in ["EXE", ".exe", "exe", " Js ", "b.a.t"] {
        let err = service.add_custom(&owner, raw).unwrap_err();
        assert!(
            matches!(err, ExtensionServiceError::ReservedName),
            "`{raw}` should be reserved, got {err:?}"
        );
    }
}

#[test]
fn add_custom_rejects_duplicate_for_same_owner_only() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let other = Owner::parse("other-user-guid").unwrap();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    service.add_custom(&owner, "jpg").unwrap();
    let err = service.add_custom(&owner, ".JPG").unwrap_err();
    assert!(matches!(err, ExtensionServiceError::DuplicateName));

    service.add_custom(&other, "jpg").unwrap();
}

#[test]
fn add_custom_allows_insert_while_count_is_at_most_quota() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    seed_custom(&conn, &owner, 200);

    {
        let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));
        service.add_custom(&owner, "newext").unwrap();
    }
    assert_eq!(custom_count(&conn, &owner), 201);
}

#[test]
fn add_custom_rejects_once_count_exceeds_quota() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    seed_custom(&conn, &owner, 201);

    {
        let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));
        let err = service.add_custom(&owner, "newext").unwrap_err();
        assert!(matches!(err, ExtensionServiceError::QuotaExceeded));
    }
    assert_eq!(custom_count(&conn, &owner), 201);
    assert!(!custom_exists(&conn, &owner, "newext"));
}

#[test]
fn duplicate_check_precedes_quota_check() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    seed_custom(&conn, &owner, 201);

    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));
    let err = service.add_custom(&owner, "seed0").unwrap_err();
    assert!(matches!(err, ExtensionServiceError::DuplicateName));
}

#[test]
fn rejected_add_does_not_mutate() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    {
        let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));
        service.add_custom(&owner, "png").unwrap();
        for raw in ["", "a23456789012345678901", "p%g", "com", "png"] {
            assert!(service.add_custom(&owner, raw).is_err());
        }
    }
    assert_eq!(custom_count(&conn, &owner), 1);
}

#[test]
fn toggle_fixed_alternates_state() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    assert_eq!(
        service.toggle_fixed(&owner, FixedExtension::Bat).unwrap(),
        FixedToggle::Checked
    );
    let fixed = service
        .list_by_owner_and_category(&owner, ExtensionCategory::Fixed)
        .unwrap();
    assert_eq!(fixed.len(), 1);
    assert_eq!(fixed[0].name, "bat");

    assert_eq!(
        service.toggle_fixed(&owner, FixedExtension::Bat).unwrap(),
        FixedToggle::Unchecked
    );
    assert!(service
        .list_by_owner_and_category(&owner, ExtensionCategory::Fixed)
        .unwrap()
        .is_empty());
}

#[test]
fn toggle_fixed_does_not_touch_custom_scope() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    SqliteExtensionRepository::new(&conn)
        .save(owner.as_str(), "exe", ExtensionCategory::Custom)
        .unwrap();

    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));
    assert_eq!(
        service.toggle_fixed(&owner, FixedExtension::Exe).unwrap(),
        FixedToggle::Checked
    );
    let custom = service
        .list_by_owner_and_category(&owner, ExtensionCategory::Custom)
        .unwrap();
    assert_eq!(custom.len(), 1);
}

#[test]
fn owners_differing_only_in_whitespace_are_distinct() {
    let mut conn = open_db_in_memory().unwrap();
    let padded = Owner::parse(" guest").unwrap();
    let plain = Owner::parse("guest").unwrap();
    let blank = Owner::parse("   ").unwrap();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    service.add_custom(&padded, "png").unwrap();
    service.add_custom(&blank, "png").unwrap();

    assert!(service
        .list_by_owner_and_category(&plain, ExtensionCategory::Custom)
        .unwrap()
        .is_empty());
    assert_eq!(
        service
            .list_by_owner_and_category(&padded, ExtensionCategory::Custom)
            .unwrap()
            .len(),
        1
    );
    service.add_custom(&plain, "png").unwrap();
}

#[test]
fn delete_custom_ignores_missing_and_foreign_ids() {
    let mut conn = open_db_in_memory().unwrap();
    let owner_a = owner();
    let owner_b = Owner::parse("owner-b").unwrap();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    let b_record = service.add_custom(&owner_b, "dmg").unwrap();

    service.delete_custom(&owner_a, 424_242).unwrap();
    service.delete_custom(&owner_a, b_record.id).unwrap();
    let b_list = service
        .list_by_owner_and_category(&owner_b, ExtensionCategory::Custom)
        .unwrap();
    assert_eq!(b_list.len(), 1);

    service.delete_custom(&owner_b, b_record.id).unwrap();
    assert!(service
        .list_by_owner_and_category(&owner_b, ExtensionCategory::Custom)
        .unwrap()
        .is_empty());
}

#[test]
fn overview_lists_every_fixed_extension_and_custom_items() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    let mut service = ExtensionService::new(SqliteExtensionStore::new(&mut conn));

    service.toggle_fixed(&owner, FixedExtension::Cmd).unwrap();
    service.toggle_fixed(&owner, FixedExtension::Js).unwrap();
    let first = service.add_custom(&owner, "zip").unwrap();
    let second = service.add_custom(&owner, "iso").unwrap();

    let overview = service.overview(&owner).unwrap();
    let checked: Vec<FixedExtension> = overview
        .fixed
        .iter()
        .filter(|state| state.checked)
        .map(|state| state.extension)
        .collect();
    assert_eq!(overview.fixed.len(), FixedExtension::ALL.len());
    assert_eq!(checked, [FixedExtension::Cmd, FixedExtension::Js]);
    assert_eq!(
        overview.custom,
        vec![ExtensionSummary::from(first), ExtensionSummary::from(second)]
    );
}

#[test]
fn racing_duplicate_insert_surfaces_as_duplicate_name() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = owner();
    SqliteExtensionRepository::new(&conn)
        .save(owner.as_str(), "png", ExtensionCategory::Custom)
        .unwrap();

    let mut service = ExtensionService::new(StaleExistsStore { conn: &mut conn });
    let err = service.add_custom(&owner, "png").unwrap_err();
    assert!(matches!(err, ExtensionServiceError::DuplicateName));
    assert!(err.is_user_facing());
}

/// Store whose existence check always misses, standing in for a concurrent
/// writer that inserted between the check and the save.
struct StaleExistsStore<'conn> {
    conn: &'conn mut Connection,
}

struct StaleExistsRepository<'conn> {
    inner: SqliteExtensionRepository<'conn>,
}

impl ExtensionRepository for StaleExistsRepository<'_> {
    fn exists(&self, _owner: &str, _name: &str, _category: ExtensionCategory) -> RepoResult<bool> {
        Ok(false)
    }

    fn count(&self, owner: &str, category: ExtensionCategory) -> RepoResult<u32> {
        self.inner.count(owner, category)
    }

    fn list(
        &self,
        owner: &str,
        category: ExtensionCategory,
    ) -> RepoResult<Vec<ExtensionSummary>> {
        self.inner.list(owner, category)
    }

    fn save(
        &self,
        owner: &str,
        name: &str,
        category: ExtensionCategory,
    ) -> RepoResult<ExtensionRecord> {
        self.inner.save(owner, name, category)
    }

    fn delete_by_name_owner_category(
        &self,
        owner: &str,
        name: &str,
        category: ExtensionCategory,
    ) -> RepoResult<()> {
        self.inner
            .delete_by_name_owner_category(owner, name, category)
    }

    fn delete_by_id_and_owner(&self, id: ExtensionId, owner: &str) -> RepoResult<()> {
        self.inner.delete_by_id_and_owner(id, owner)
    }
}

impl ExtensionStore for StaleExistsStore<'_> {
    fn in_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExtensionRepository) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = self.conn.transaction().map_err(RepoError::from)?;
        let outcome = f(&StaleExistsRepository {
            inner: SqliteExtensionRepository::new(&tx),
        })?;
        tx.commit().map_err(RepoError::from)?;
        Ok(outcome)
    }

    fn in_read_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExtensionRepository) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.in_transaction(f)
    }
}
