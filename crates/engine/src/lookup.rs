//! Name-to-identity resolution shared by the validator and the executor.
//!
//! One table per entity type maps a normalised natural key to a reference.
//! Tables are seeded from the store and grow as the walk admits new items,
//! so later items resolve against earlier ones from the same snapshot.

use std::collections::HashMap;

use stratcat_core::{Actor, FieldValue, RecordId, key};
use stratcat_storage::{Datastore, Row, StorageError};

use crate::descriptor::{EntityDescriptor, EntityKind, KeyColumns, KeyScope};

/// Where a resolved entity lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ref {
    /// Already in the store, or written during this import.
    Stored(RecordId),
    /// Will be created by the snapshot; only the validator produces these.
    Planned(String),
}

impl Ref {
    pub fn id(&self) -> Option<RecordId> {
        match self {
            Self::Stored(id) => Some(*id),
            Self::Planned(_) => None,
        }
    }

    /// Column value for a foreign key. Planned references have no identity yet.
    pub fn value(&self) -> FieldValue {
        match self {
            Self::Stored(id) => FieldValue::Integer(id.get()),
            Self::Planned(_) => FieldValue::Null,
        }
    }

    /// Rendering inside a composite key. Matches `FieldValue::key_part` for
    /// stored ids so keys built from snapshot items and from rows agree.
    pub fn key_part(&self) -> String {
        match self {
            Self::Stored(id) => id.to_string(),
            Self::Planned(key) => format!("~{key}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct LookupTable {
    entries: HashMap<String, Ref>,
}

impl LookupTable {
    pub fn get(&self, key: &str) -> Option<&Ref> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// First writer wins; a key that is already present keeps its reference.
    pub fn insert(&mut self, key: String, reference: Ref) {
        self.entries.entry(key).or_insert(reference);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Lookups {
    tables: HashMap<EntityKind, LookupTable>,
}

impl Lookups {
    /// Load existing natural keys for every given entity type. Domain-scoped
    /// types start empty when `domain` is `None` (a domain that does not exist
    /// yet owns nothing).
    pub fn seed<S, I>(store: &S, domain: Option<RecordId>, descriptors: I) -> Result<Self, StorageError>
    where
        S: Datastore + ?Sized,
        I: IntoIterator<Item = &'static EntityDescriptor>,
    {
        let mut lookups = Self::default();
        for descriptor in descriptors {
            let table = match (descriptor.scope, domain) {
                (KeyScope::Domain, None) => LookupTable::default(),
                _ => seed_table(store, descriptor, domain)?,
            };
            lookups.tables.insert(descriptor.kind, table);
        }
        Ok(lookups)
    }

    pub fn table(&self, kind: EntityKind) -> Option<&LookupTable> {
        self.tables.get(&kind)
    }

    pub fn get(&self, kind: EntityKind, key: &str) -> Option<&Ref> {
        self.tables.get(&kind).and_then(|t| t.get(key))
    }

    pub fn contains(&self, kind: EntityKind, key: &str) -> bool {
        self.get(kind, key).is_some()
    }

    /// Resolve a name or title reference to an entity of `kind`.
    pub fn resolve_name(&self, kind: EntityKind, name: &str) -> Option<Ref> {
        self.get(kind, &key::normalize(name)).cloned()
    }

    pub fn record(&mut self, kind: EntityKind, key: String, reference: Ref) {
        self.tables.entry(kind).or_default().insert(key, reference);
    }
}

/// Build a composite key, ordering the endpoint pair for undirected links.
pub fn link_key(descriptor: &EntityDescriptor, mut parts: Vec<String>) -> String {
    if descriptor.undirected && parts.len() >= 2 && parts[0] > parts[1] {
        parts.swap(0, 1);
    }
    key::composite(parts)
}

/// Stands in for an author part left open.
pub const ANY_AUTHOR: &str = "*";

/// The key with its attributed author part left open, for descriptors that
/// have one.
pub fn open_key(descriptor: &EntityDescriptor, mut parts: Vec<String>) -> Option<String> {
    let part = parts.get_mut(descriptor.attributed?)?;
    *part = ANY_AUTHOR.to_string();
    Some(link_key(descriptor, parts))
}

fn seed_table<S: Datastore + ?Sized>(
    store: &S,
    descriptor: &EntityDescriptor,
    domain: Option<RecordId>,
) -> Result<LookupTable, StorageError> {
    let columns = match descriptor.key {
        KeyColumns::Name(column) => column.to_string(),
        KeyColumns::Composite(columns) => columns.join(", "),
    };
    let mut sql = format!("SELECT id, {columns} FROM {} ", descriptor.table);
    let mut params = Vec::new();
    if let (KeyScope::Domain, Some(domain)) = (descriptor.scope, domain) {
        sql.push_str("WHERE domain_id = ?1 ");
        params.push(FieldValue::from(domain));
    }
    sql.push_str("ORDER BY id");

    let mut table = LookupTable::default();
    for row in store.query(&sql, &params)? {
        let id = row.id("id")?;
        for key in row_keys(descriptor, &row) {
            table.insert(key, Ref::Stored(id));
        }
    }
    Ok(table)
}

fn row_keys(descriptor: &EntityDescriptor, row: &Row) -> Vec<String> {
    match descriptor.key {
        KeyColumns::Name(column) => row.text(column).map(key::normalize).into_iter().collect(),
        KeyColumns::Composite(columns) => {
            let parts: Vec<String> = columns
                .iter()
                .map(|c| match row.get(c) {
                    Some(FieldValue::Text(s)) if descriptor.verbatim.contains(c) => s.trim().to_string(),
                    Some(value) => value.key_part(),
                    None => "-".to_string(),
                })
                .collect();
            let open = open_key(descriptor, parts.clone());
            std::iter::once(link_key(descriptor, parts)).chain(open).collect()
        }
    }
}

/// Look up a single named entity by natural key, bypassing the seeded tables.
pub fn find_named<S: Datastore + ?Sized>(
    store: &S,
    descriptor: &EntityDescriptor,
    domain: Option<RecordId>,
    natural_key: &str,
) -> Result<Option<RecordId>, StorageError> {
    let KeyColumns::Name(column) = descriptor.key else {
        return Ok(None);
    };
    let mut sql = format!("SELECT id, {column} FROM {}", descriptor.table);
    let mut params = Vec::new();
    if let (KeyScope::Domain, Some(domain)) = (descriptor.scope, domain) {
        sql.push_str(" WHERE domain_id = ?1");
        params.push(FieldValue::from(domain));
    }
    for row in store.query(&sql, &params)? {
        if row.text(column).map(key::normalize).as_deref() == Some(natural_key) {
            return Ok(Some(row.id("id")?));
        }
    }
    Ok(None)
}

/// Domains are matched by exact name, unlike every other entity type.
pub fn find_domain<S: Datastore + ?Sized>(
    store: &S,
    name: &str,
) -> Result<Option<RecordId>, StorageError> {
    store
        .query_one("SELECT id FROM domains WHERE name = ?1", &[name.into()])?
        .map(|row| row.id("id"))
        .transpose()
}

/// Known users, matched by case-insensitive name.
#[derive(Debug, Default)]
pub struct ActorDirectory {
    by_name: HashMap<String, RecordId>,
}

impl ActorDirectory {
    pub fn load<S: Datastore + ?Sized>(store: &S) -> Result<Self, StorageError> {
        let mut by_name = HashMap::new();
        for row in store.query("SELECT id, name FROM users ORDER BY id", &[])? {
            if let Some(name) = row.text("name") {
                by_name.entry(key::normalize(name)).or_insert(row.id("id")?);
            }
        }
        Ok(Self { by_name })
    }

    pub fn find(&self, name: &str) -> Option<RecordId> {
        self.by_name.get(&key::normalize(name)).copied()
    }

    /// Resolve an author, attributing unknown or missing names to `fallback`.
    pub fn resolve(&self, name: Option<&str>, fallback: &Actor) -> RecordId {
        match key::present(name) {
            Some(name) => match self.find(name) {
                Some(id) => id,
                None => {
                    tracing::debug!(author = name, user = %fallback.name, "unknown author attributed to importing user");
                    fallback.id
                }
            },
            None => fallback.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratcat_storage::SqliteStore;

    fn store_with_domain() -> Result<(SqliteStore, RecordId), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let out = store.execute(
            "INSERT INTO domains (name, display_name) VALUES ('Finance', 'Finance')",
            &[],
        )?;
        let domain = out.inserted_id.ok_or_else(|| StorageError::NotFound("domain".into()))?;
        Ok((store, domain))
    }

    #[test]
    fn seeded_names_resolve_case_insensitively() -> Result<(), StorageError> {
        let (mut store, domain) = store_with_domain()?;
        store.execute(
            "INSERT INTO pillars (domain_id, name) VALUES (?1, 'Growth')",
            &[domain.into()],
        )?;
        let lookups = Lookups::seed(&store, Some(domain), [EntityKind::Pillar.descriptor()])?;
        assert!(matches!(lookups.resolve_name(EntityKind::Pillar, " GROWTH "), Some(Ref::Stored(_))));
        assert!(lookups.resolve_name(EntityKind::Pillar, "Scale").is_none());
        Ok(())
    }

    #[test]
    fn domain_scoped_seed_ignores_other_domains() -> Result<(), StorageError> {
        let (mut store, finance) = store_with_domain()?;
        let other = store
            .execute("INSERT INTO domains (name, display_name) VALUES ('Ops', 'Ops')", &[])?
            .inserted_id
            .ok_or_else(|| StorageError::NotFound("domain".into()))?;
        store.execute(
            "INSERT INTO categories (domain_id, name) VALUES (?1, 'Automation')",
            &[other.into()],
        )?;
        store.execute("INSERT INTO tags (name) VALUES ('urgent')", &[])?;

        let descriptors = [EntityKind::Category.descriptor(), EntityKind::Tag.descriptor()];
        let lookups = Lookups::seed(&store, Some(finance), descriptors)?;
        assert!(lookups.resolve_name(EntityKind::Category, "Automation").is_none());
        // Tags are global.
        assert!(lookups.resolve_name(EntityKind::Tag, "Urgent").is_some());

        let fresh = Lookups::seed(&store, None, descriptors)?;
        assert_eq!(fresh.table(EntityKind::Category).map(LookupTable::len), Some(0));
        assert_eq!(fresh.table(EntityKind::Tag).map(LookupTable::len), Some(1));
        Ok(())
    }

    #[test]
    fn undirected_keys_ignore_endpoint_order() {
        let descriptor = EntityKind::InitiativeAssociation.descriptor();
        let forward = link_key(descriptor, vec!["3".into(), "9".into()]);
        let backward = link_key(descriptor, vec!["9".into(), "3".into()]);
        assert_eq!(forward, backward);

        let directed = EntityKind::GoalAlignment.descriptor();
        assert_ne!(
            link_key(directed, vec!["3".into(), "9".into()]),
            link_key(directed, vec!["9".into(), "3".into()])
        );
    }

    #[test]
    fn seeded_link_keys_match_keys_built_from_refs() -> Result<(), StorageError> {
        let (mut store, domain) = store_with_domain()?;
        let a = store
            .execute("INSERT INTO initiatives (domain_id, title) VALUES (?1, 'A')", &[domain.into()])?
            .inserted_id
            .ok_or_else(|| StorageError::NotFound("initiative".into()))?;
        let b = store
            .execute("INSERT INTO initiatives (domain_id, title) VALUES (?1, 'B')", &[domain.into()])?
            .inserted_id
            .ok_or_else(|| StorageError::NotFound("initiative".into()))?;
        store.execute(
            "INSERT INTO initiative_associations (initiative_id, associated_initiative_id) VALUES (?1, ?2)",
            &[b.into(), a.into()],
        )?;

        let descriptor = EntityKind::InitiativeAssociation.descriptor();
        let lookups = Lookups::seed(&store, Some(domain), [descriptor])?;
        let key = link_key(descriptor, vec![Ref::Stored(a).key_part(), Ref::Stored(b).key_part()]);
        assert!(lookups.contains(EntityKind::InitiativeAssociation, &key));
        Ok(())
    }

    #[test]
    fn comments_are_seeded_with_an_open_author_and_verbatim_content() -> Result<(), StorageError> {
        let (mut store, domain) = store_with_domain()?;
        let user = store
            .execute("INSERT INTO users (name) VALUES ('Dana Ruiz')", &[])?
            .inserted_id
            .ok_or_else(|| StorageError::NotFound("user".into()))?;
        let initiative = store
            .execute("INSERT INTO initiatives (domain_id, title) VALUES (?1, 'A')", &[domain.into()])?
            .inserted_id
            .ok_or_else(|| StorageError::NotFound("initiative".into()))?;
        store.execute(
            "INSERT INTO comments (domain_id, entity_type, entity_id, user_id, content) \
             VALUES (?1, 'initiative', ?2, ?3, ' Ship it ')",
            &[domain.into(), initiative.into(), user.into()],
        )?;

        let descriptor = EntityKind::Comment.descriptor();
        let lookups = Lookups::seed(&store, Some(domain), [descriptor])?;
        let parts = |author: String, content: &str| {
            vec![
                "initiative".to_string(),
                initiative.to_string(),
                author,
                "-".to_string(),
                content.to_string(),
            ]
        };
        let exact = link_key(descriptor, parts(user.to_string(), "Ship it"));
        assert!(lookups.contains(EntityKind::Comment, &exact));
        let open = open_key(descriptor, parts("999".to_string(), "Ship it"));
        assert!(open.is_some_and(|k| lookups.contains(EntityKind::Comment, &k)));
        let shouted = link_key(descriptor, parts(user.to_string(), "SHIP IT"));
        assert!(!lookups.contains(EntityKind::Comment, &shouted));
        Ok(())
    }

    #[test]
    fn find_domain_is_exact() -> Result<(), StorageError> {
        let (store, domain) = store_with_domain()?;
        assert_eq!(find_domain(&store, "Finance")?, Some(domain));
        assert_eq!(find_domain(&store, "finance")?, None);
        Ok(())
    }

    #[test]
    fn unknown_authors_fall_back_to_importing_user() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let dana = store
            .execute("INSERT INTO users (name) VALUES ('Dana Ruiz')", &[])?
            .inserted_id
            .ok_or_else(|| StorageError::NotFound("user".into()))?;
        let admin = Actor::new(RecordId::from_i64(999), "admin");

        let actors = ActorDirectory::load(&store)?;
        assert_eq!(actors.resolve(Some("dana ruiz"), &admin), dana);
        assert_eq!(actors.resolve(Some("Nobody"), &admin), admin.id);
        assert_eq!(actors.resolve(None, &admin), admin.id);
        Ok(())
    }
}
