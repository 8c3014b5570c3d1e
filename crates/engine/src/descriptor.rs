//! Declarative description of every entity type the importer handles.
//!
//! The table is ordered leaves-first: every type only references types that
//! appear earlier. Lookup seeding and generic inserts are both driven from it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Category,
    Tag,
    Pillar,
    Department,
    AgentType,
    Goal,
    Initiative,
    Agent,
    GoalAlignment,
    InitiativeAssociation,
    AgentInitiative,
    Comment,
    Like,
    TagAssignment,
}

impl EntityKind {
    pub fn descriptor(self) -> &'static EntityDescriptor {
        &DESCRIPTORS[self as usize]
    }

    pub fn report_name(self) -> &'static str {
        self.descriptor().report_name
    }

    /// Singular noun used in messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Pillar => "pillar",
            Self::Department => "department",
            Self::AgentType => "agent type",
            Self::Goal => "goal",
            Self::Initiative => "initiative",
            Self::Agent => "agent",
            Self::GoalAlignment => "goal alignment",
            Self::InitiativeAssociation => "initiative association",
            Self::AgentInitiative => "agent link",
            Self::Comment => "comment",
            Self::Like => "like",
            Self::TagAssignment => "tag assignment",
        }
    }
}

/// Whether duplicates are detected within one domain or across the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    Domain,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColumns {
    /// A single name or title column, matched case-insensitively.
    Name(&'static str),
    /// A composite key over reference and value columns.
    Composite(&'static [&'static str]),
}

#[derive(Debug)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub report_name: &'static str,
    pub table: &'static str,
    pub key: KeyColumns,
    pub scope: KeyScope,
    /// The first two key columns form an unordered pair.
    pub undirected: bool,
    /// The store's natural-key constraint, as the store names it.
    pub unique_constraint: Option<&'static str>,
    pub rich_only: bool,
    /// Key columns compared as trimmed, case-sensitive text.
    pub verbatim: &'static [&'static str],
    /// Key position of an author that may have been attributed to the
    /// importing user. Such items are also indexed with that part left open.
    pub attributed: Option<usize>,
}

impl EntityDescriptor {
    /// Field name reported when the natural key is missing.
    pub fn key_field(&self) -> &'static str {
        match self.key {
            KeyColumns::Name(column) => column,
            KeyColumns::Composite(columns) => columns.first().copied().unwrap_or("key"),
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self.key, KeyColumns::Name(_))
    }
}

const fn named(
    kind: EntityKind,
    report_name: &'static str,
    table: &'static str,
    column: &'static str,
    scope: KeyScope,
    unique_constraint: Option<&'static str>,
    rich_only: bool,
) -> EntityDescriptor {
    EntityDescriptor {
        kind,
        report_name,
        table,
        key: KeyColumns::Name(column),
        scope,
        undirected: false,
        unique_constraint,
        rich_only,
        verbatim: &[],
        attributed: None,
    }
}

const fn link(
    kind: EntityKind,
    report_name: &'static str,
    table: &'static str,
    columns: &'static [&'static str],
    unique_constraint: Option<&'static str>,
    rich_only: bool,
) -> EntityDescriptor {
    EntityDescriptor {
        kind,
        report_name,
        table,
        key: KeyColumns::Composite(columns),
        scope: KeyScope::Global,
        undirected: false,
        unique_constraint,
        rich_only,
        verbatim: &[],
        attributed: None,
    }
}

// Indexed by `EntityKind as usize`.
pub const DESCRIPTORS: &[EntityDescriptor] = &[
    named(EntityKind::Category, "categories", "categories", "name", KeyScope::Domain, None, false),
    named(EntityKind::Tag, "tags", "tags", "name", KeyScope::Global, Some("tags.name"), false),
    named(EntityKind::Pillar, "pillars", "pillars", "name", KeyScope::Domain, None, false),
    named(
        EntityKind::Department,
        "departments",
        "departments",
        "name",
        KeyScope::Global,
        Some("departments.name"),
        true,
    ),
    named(EntityKind::AgentType, "agent_types", "agent_types", "name", KeyScope::Domain, None, true),
    named(EntityKind::Goal, "strategic_goals", "strategic_goals", "title", KeyScope::Domain, None, false),
    named(EntityKind::Initiative, "initiatives", "initiatives", "title", KeyScope::Domain, None, false),
    named(EntityKind::Agent, "agents", "agents", "title", KeyScope::Domain, None, true),
    link(
        EntityKind::GoalAlignment,
        "goal_alignments",
        "goal_alignments",
        &["initiative_id", "goal_id"],
        Some("goal_alignments.initiative_id, goal_alignments.goal_id"),
        false,
    ),
    EntityDescriptor {
        undirected: true,
        ..link(
            EntityKind::InitiativeAssociation,
            "initiative_associations",
            "initiative_associations",
            &["initiative_id", "associated_initiative_id"],
            Some("initiative_associations.initiative_id, initiative_associations.associated_initiative_id"),
            false,
        )
    },
    link(
        EntityKind::AgentInitiative,
        "agent_initiatives",
        "agent_initiatives",
        &["agent_id", "initiative_id"],
        Some("agent_initiatives.agent_id, agent_initiatives.initiative_id"),
        true,
    ),
    EntityDescriptor {
        scope: KeyScope::Domain,
        verbatim: &["content"],
        attributed: Some(2),
        ..link(
            EntityKind::Comment,
            "comments",
            "comments",
            &["entity_type", "entity_id", "user_id", "parent_comment_id", "content"],
            None,
            false,
        )
    },
    EntityDescriptor {
        attributed: Some(2),
        ..link(
            EntityKind::Like,
            "likes",
            "likes",
            &["entity_type", "entity_id", "user_id"],
            Some("likes.entity_type, likes.entity_id, likes.user_id"),
            false,
        )
    },
    link(
        EntityKind::TagAssignment,
        "tag_assignments",
        "initiative_tags",
        &["initiative_id", "tag_id"],
        Some("initiative_tags.initiative_id, initiative_tags.tag_id"),
        false,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_kind() {
        for (i, descriptor) in DESCRIPTORS.iter().enumerate() {
            assert_eq!(descriptor.kind as usize, i, "{}", descriptor.report_name);
        }
    }

    #[test]
    fn references_point_backwards() {
        // Each kind's position must come after everything it references.
        let order = |k: EntityKind| k as usize;
        assert!(order(EntityKind::Pillar) < order(EntityKind::Goal));
        assert!(order(EntityKind::Category) < order(EntityKind::Initiative));
        assert!(order(EntityKind::Department) < order(EntityKind::Initiative));
        assert!(order(EntityKind::AgentType) < order(EntityKind::Agent));
        assert!(order(EntityKind::Goal) < order(EntityKind::GoalAlignment));
        assert!(order(EntityKind::Initiative) < order(EntityKind::InitiativeAssociation));
        assert!(order(EntityKind::Agent) < order(EntityKind::AgentInitiative));
        assert!(order(EntityKind::AgentInitiative) < order(EntityKind::Comment));
        assert!(order(EntityKind::Comment) < order(EntityKind::Like));
        assert!(order(EntityKind::Tag) < order(EntityKind::TagAssignment));
    }

    #[test]
    fn attributed_position_names_the_author_column() {
        for descriptor in DESCRIPTORS {
            let (Some(position), KeyColumns::Composite(columns)) = (descriptor.attributed, descriptor.key) else {
                continue;
            };
            assert_eq!(columns.get(position), Some(&"user_id"), "{}", descriptor.report_name);
        }
    }

    #[test]
    fn global_kinds_are_backed_by_a_constraint() {
        for descriptor in DESCRIPTORS.iter().filter(|d| d.is_named() && d.scope == KeyScope::Global) {
            assert!(descriptor.unique_constraint.is_some(), "{}", descriptor.report_name);
        }
    }
}
