//! The dependency-ordered pass over one domain section.
//!
//! The walk decides, item by item, whether an entity is already present,
//! cannot be imported, or should be written, and resolves every reference
//! through the running lookup tables. What "written" means is up to the
//! [`Sink`]: the validator only counts, the merge executor inserts rows.

use std::collections::HashMap;

use stratcat_core::enums::{
    AlignmentStrength, GoalStatus, InitiativeStatus, KanbanPillar, Priority, StrategicImpact,
    TargetKind, TextEnum,
};
use stratcat_core::snapshot::{
    AgentInitiativeRecord, AgentRecord, AgentTypeRecord, CategoryRecord, CommentRecord, Complexity,
    DepartmentRecord, DomainSection, GoalAlignmentRecord, GoalRecord,
    InitiativeAssociationRecord, InitiativeRecord, LikeRecord, PillarRecord, TagAssignmentRecord,
    TagRecord, local_id, parse_date,
};
use stratcat_core::{Actor, CoreError, FieldValue, key};

use crate::config::SchemaVariant;
use crate::descriptor::{EntityDescriptor, EntityKind, KeyColumns, KeyScope};
use crate::error::EngineError;
use crate::lookup::{ActorDirectory, Lookups, Ref, link_key, open_key};

pub(crate) type Columns = Vec<(&'static str, FieldValue)>;

/// Result of handing an item to the sink.
pub(crate) enum Written {
    Inserted(Ref),
    /// The store already had it. Carries its identity when the sink knows it.
    Skipped(Option<Ref>),
    Failed,
}

pub(crate) trait Sink {
    fn skipped(&mut self, kind: EntityKind, label: &str);

    /// The item cannot be imported: a required field or reference is missing.
    fn rejected(&mut self, kind: EntityKind, label: &str, reason: &str);

    /// The item is imported with a reference dropped or a value defaulted.
    fn warned(&mut self, kind: EntityKind, label: &str, message: &str);

    /// A whole collection is outside the configured schema variant.
    fn ignored(&mut self, collection: &str, count: usize);

    /// Only `Err` for failures that must abort the domain.
    fn write(
        &mut self,
        descriptor: &'static EntityDescriptor,
        natural_key: &str,
        label: &str,
        columns: &[(&'static str, FieldValue)],
    ) -> Result<Written, EngineError>;
}

trait Named {
    fn name(&self) -> Option<&str>;

    fn source_id(&self) -> Option<String> {
        None
    }
}

macro_rules! named_by {
    ($record:ty, $field:ident) => {
        impl Named for $record {
            fn name(&self) -> Option<&str> {
                self.$field.as_deref()
            }
        }
    };
    ($record:ty, $field:ident, traced) => {
        impl Named for $record {
            fn name(&self) -> Option<&str> {
                self.$field.as_deref()
            }

            fn source_id(&self) -> Option<String> {
                self.id.as_ref().and_then(local_id)
            }
        }
    };
}

named_by!(CategoryRecord, name);
named_by!(TagRecord, name);
named_by!(PillarRecord, name);
named_by!(DepartmentRecord, name);
named_by!(AgentTypeRecord, name);
named_by!(GoalRecord, title);
named_by!(InitiativeRecord, title, traced);
named_by!(AgentRecord, title, traced);

trait Labelled {
    fn label(&self) -> String;
}

fn or_unknown(value: &Option<String>) -> &str {
    key::present(value.as_deref()).unwrap_or("?")
}

impl Labelled for GoalAlignmentRecord {
    fn label(&self) -> String {
        format!("{} -> {}", or_unknown(&self.initiative_title), or_unknown(&self.goal_title))
    }
}

impl Labelled for InitiativeAssociationRecord {
    fn label(&self) -> String {
        format!(
            "{} <-> {}",
            or_unknown(&self.initiative_title),
            or_unknown(&self.associated_initiative_title)
        )
    }
}

impl Labelled for AgentInitiativeRecord {
    fn label(&self) -> String {
        format!("{} -> {}", or_unknown(&self.agent_title), or_unknown(&self.initiative_title))
    }
}

impl Labelled for LikeRecord {
    fn label(&self) -> String {
        format!(
            "{} {} liked by {}",
            target_label(&self.entity_type),
            or_unknown(&self.entity_title),
            key::present(self.user_name.as_deref()).unwrap_or("importing user")
        )
    }
}

impl Labelled for TagAssignmentRecord {
    fn label(&self) -> String {
        format!("{} #{}", or_unknown(&self.initiative_title), or_unknown(&self.tag_name))
    }
}

impl Labelled for CommentRecord {
    fn label(&self) -> String {
        let target = format!("{} {}", target_label(&self.entity_type), or_unknown(&self.entity_title));
        match self.local_id() {
            Some(id) => format!("#{id} on {target}"),
            None => format!("on {target}"),
        }
    }
}

struct Link {
    /// Match with the author part left open.
    open: bool,
    parts: Vec<String>,
    columns: Columns,
}

fn target_label(raw: &Option<String>) -> &str {
    key::present(raw.as_deref()).unwrap_or(TargetKind::default().as_str())
}

fn is_agent(target: Result<TargetKind, CoreError>) -> bool {
    matches!(target, Ok(TargetKind::Agent))
}

fn target_kind(target: TargetKind) -> EntityKind {
    match target {
        TargetKind::Initiative => EntityKind::Initiative,
        TargetKind::Agent => EntityKind::Agent,
    }
}

fn text(value: &Option<String>) -> FieldValue {
    FieldValue::text_or_null(value.as_deref())
}

pub(crate) struct Walk<'a, K: Sink> {
    sink: &'a mut K,
    lookups: Lookups,
    actors: &'a ActorDirectory,
    user: &'a Actor,
    variant: SchemaVariant,
    /// Value for `domain_id` columns. NULL while validating a domain that
    /// does not exist yet.
    domain: FieldValue,
    /// Warnings raised while building the current item, emitted only if the
    /// item goes on to be written.
    notes: Vec<String>,
}

impl<'a, K: Sink> Walk<'a, K> {
    pub(crate) fn new(
        sink: &'a mut K,
        lookups: Lookups,
        actors: &'a ActorDirectory,
        user: &'a Actor,
        variant: SchemaVariant,
        domain: FieldValue,
    ) -> Self {
        Self {
            sink,
            lookups,
            actors,
            user,
            variant,
            domain,
            notes: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, section: &DomainSection) -> Result<(), EngineError> {
        let rich = self.variant == SchemaVariant::Rich;
        if !rich {
            self.report_ignored(section);
        }

        self.named(EntityKind::Category, &section.categories, Self::category)?;
        self.named(EntityKind::Tag, &section.tags, Self::tag)?;
        self.named(EntityKind::Pillar, &section.pillars, Self::pillar)?;
        if rich {
            self.named(EntityKind::Department, &section.departments, Self::department)?;
            self.named(EntityKind::AgentType, &section.agent_types, Self::agent_type)?;
        }
        self.named(EntityKind::Goal, &section.strategic_goals, Self::goal)?;
        self.named(EntityKind::Initiative, &section.initiatives, Self::initiative)?;
        if rich {
            self.named(EntityKind::Agent, &section.agents, Self::agent)?;
        }

        self.links(EntityKind::GoalAlignment, &section.goal_alignments, Self::goal_alignment)?;
        self.links(
            EntityKind::InitiativeAssociation,
            &section.initiative_associations,
            Self::association,
        )?;
        if rich {
            self.links(
                EntityKind::AgentInitiative,
                &section.agent_initiatives,
                Self::agent_initiative,
            )?;
        }

        let comments: Vec<&CommentRecord> = section
            .comments
            .iter()
            .filter(|c| rich || !is_agent(c.target()))
            .collect();
        self.comments(&comments)?;

        let likes = section
            .likes
            .iter()
            .filter(|l| rich || !is_agent(l.target()));
        self.links(EntityKind::Like, likes, Self::like)?;
        self.links(EntityKind::TagAssignment, &section.tag_assignments, Self::tag_assignment)?;
        Ok(())
    }

    fn report_ignored(&mut self, section: &DomainSection) {
        let agent_comments = section
            .comments
            .iter()
            .filter(|c| is_agent(c.target()))
            .count();
        let agent_likes = section
            .likes
            .iter()
            .filter(|l| is_agent(l.target()))
            .count();
        let ignored = [
            ("departments", section.departments.len()),
            ("agent_types", section.agent_types.len()),
            ("agents", section.agents.len()),
            ("agent_initiatives", section.agent_initiatives.len()),
            ("agent comments", agent_comments),
            ("agent likes", agent_likes),
        ];
        for (collection, count) in ignored {
            if count > 0 {
                self.sink.ignored(collection, count);
            }
        }
    }

    // ========================================================================
    // Generic passes
    // ========================================================================

    fn named<'r, T, I>(
        &mut self,
        kind: EntityKind,
        items: I,
        build: fn(&mut Self, &T) -> Result<Columns, String>,
    ) -> Result<(), EngineError>
    where
        T: Named + 'r,
        I: IntoIterator<Item = &'r T>,
    {
        let descriptor = kind.descriptor();
        let KeyColumns::Name(column) = descriptor.key else {
            return Ok(());
        };

        for item in items {
            let source = item.source_id();
            let Some(name) = key::present(item.name()) else {
                let label = match source {
                    Some(id) => format!("(unnamed, source id {id})"),
                    None => "(unnamed)".to_string(),
                };
                self.sink.rejected(kind, &label, &format!("missing {column}"));
                continue;
            };
            let label = match source {
                Some(id) => format!("{name} (source id {id})"),
                None => name.to_string(),
            };

            let natural_key = key::normalize(name);
            if self.lookups.contains(kind, &natural_key) {
                self.sink.skipped(kind, &label);
                continue;
            }

            let mut columns = self.owner_columns(descriptor);
            columns.push((column, FieldValue::Text(name.to_string())));
            match build(self, item) {
                Ok(rest) => columns.extend(rest),
                Err(reason) => {
                    self.notes.clear();
                    self.sink.rejected(kind, &label, &reason);
                    continue;
                }
            }
            self.flush_notes(kind, &label);
            self.admit(descriptor, natural_key, &label, &columns)?;
        }
        Ok(())
    }

    fn links<'r, T, I>(
        &mut self,
        kind: EntityKind,
        items: I,
        build: fn(&mut Self, &T) -> Result<Link, String>,
    ) -> Result<(), EngineError>
    where
        T: Labelled + 'r,
        I: IntoIterator<Item = &'r T>,
    {
        let descriptor = kind.descriptor();
        for item in items {
            let label = item.label();
            let link = match build(self, item) {
                Ok(link) => link,
                Err(reason) => {
                    self.notes.clear();
                    self.sink.rejected(kind, &label, &reason);
                    continue;
                }
            };

            let open = open_key(descriptor, link.parts.clone());
            let natural_key = link_key(descriptor, link.parts);
            if self.existing(kind, &natural_key, open.as_ref(), link.open).is_some() {
                self.notes.clear();
                self.sink.skipped(kind, &label);
                continue;
            }

            let mut columns = self.owner_columns(descriptor);
            columns.extend(link.columns);
            self.flush_notes(kind, &label);
            let stored = self.admit(descriptor, natural_key, &label, &columns)?;
            self.record_open(kind, open, &stored);
        }
        Ok(())
    }

    /// Top-level comments first, then replies in rounds until no reply's
    /// parent can be resolved any more. The local id map never outlives one
    /// domain.
    fn comments(&mut self, comments: &[&CommentRecord]) -> Result<(), EngineError> {
        let mut local: HashMap<String, Ref> = HashMap::new();
        let (roots, mut pending): (Vec<&CommentRecord>, Vec<&CommentRecord>) = comments
            .iter()
            .copied()
            .partition(|c| c.parent_local_id().is_none());

        for comment in roots {
            let stored = self.comment(comment, None)?;
            remember(&mut local, comment, stored);
        }

        while !pending.is_empty() {
            let before = pending.len();
            let mut waiting = Vec::new();
            for comment in pending {
                let parent = comment
                    .parent_local_id()
                    .and_then(|id| local.get(&id).cloned());
                match parent {
                    Some(parent) => {
                        let stored = self.comment(comment, Some(parent))?;
                        remember(&mut local, comment, stored);
                    }
                    None => waiting.push(comment),
                }
            }

            if waiting.len() == before {
                for comment in waiting {
                    let parent = comment.parent_local_id().unwrap_or_default();
                    self.sink.rejected(
                        EntityKind::Comment,
                        &comment.label(),
                        &format!("parent comment {parent} not found"),
                    );
                }
                break;
            }
            pending = waiting;
        }
        Ok(())
    }

    fn comment(
        &mut self,
        comment: &CommentRecord,
        parent: Option<Ref>,
    ) -> Result<Option<Ref>, EngineError> {
        let kind = EntityKind::Comment;
        let descriptor = kind.descriptor();
        let label = comment.label();

        let on = match comment.target() {
            Ok(on) => on,
            Err(e) => {
                self.sink.rejected(kind, &label, &e.to_string());
                return Ok(None);
            }
        };
        let target = match self.require(
            target_kind(on),
            "entity_title",
            comment.entity_title.as_deref(),
        ) {
            Ok(target) => target,
            Err(reason) => {
                self.sink.rejected(kind, &label, &reason);
                return Ok(None);
            }
        };
        let Some(content) = key::present(comment.content.as_deref()) else {
            self.sink.rejected(kind, &label, "missing content");
            return Ok(None);
        };

        let author = self.author(comment.author_name.as_deref());
        let parent_part = parent
            .as_ref()
            .map_or_else(|| FieldValue::Null.key_part(), Ref::key_part);
        let parts = vec![
            on.as_str().to_string(),
            target.key_part(),
            author.key_part(),
            parent_part,
            content.to_string(),
        ];
        let natural_key = link_key(descriptor, parts.clone());
        let open = open_key(descriptor, parts);
        let unmatched = !self.is_matched(comment.author_name.as_deref());
        if let Some(existing) = self.existing(kind, &natural_key, open.as_ref(), unmatched) {
            self.sink.skipped(kind, &label);
            return Ok(Some(existing));
        }

        let content = FieldValue::Text(content.to_string());
        let mut columns = self.owner_columns(descriptor);
        columns.extend([
            ("entity_type", FieldValue::from(on.as_str())),
            ("entity_id", target.value()),
            ("parent_comment_id", parent.as_ref().map_or(FieldValue::Null, Ref::value)),
            ("user_id", author),
            ("content", content),
            ("is_edited", FieldValue::from(comment.is_edited)),
        ]);
        let stored = self.admit(descriptor, natural_key, &label, &columns)?;
        self.record_open(kind, open, &stored);
        Ok(stored)
    }

    /// Items whose author was attributed to the importing user are matched
    /// with the author left open, so a rerun by someone else still finds them.
    fn existing(
        &self,
        kind: EntityKind,
        natural_key: &str,
        open: Option<&String>,
        attributed: bool,
    ) -> Option<Ref> {
        let key = match open {
            Some(open) if attributed => open.as_str(),
            _ => natural_key,
        };
        self.lookups.get(kind, key).cloned()
    }

    fn record_open(&mut self, kind: EntityKind, open: Option<String>, stored: &Option<Ref>) {
        if let (Some(open), Some(stored)) = (open, stored) {
            self.lookups.record(kind, open, stored.clone());
        }
    }

    fn admit(
        &mut self,
        descriptor: &'static EntityDescriptor,
        natural_key: String,
        label: &str,
        columns: &[(&'static str, FieldValue)],
    ) -> Result<Option<Ref>, EngineError> {
        match self.sink.write(descriptor, &natural_key, label, columns)? {
            Written::Inserted(reference) | Written::Skipped(Some(reference)) => {
                self.lookups
                    .record(descriptor.kind, natural_key, reference.clone());
                Ok(Some(reference))
            }
            Written::Skipped(None) | Written::Failed => Ok(None),
        }
    }

    // ========================================================================
    // Resolution helpers
    // ========================================================================

    fn owner_columns(&self, descriptor: &EntityDescriptor) -> Columns {
        match descriptor.scope {
            KeyScope::Domain => vec![("domain_id", self.domain.clone())],
            KeyScope::Global => Vec::new(),
        }
    }

    fn note(&mut self, message: String) {
        self.notes.push(message);
    }

    fn flush_notes(&mut self, kind: EntityKind, label: &str) {
        for note in std::mem::take(&mut self.notes) {
            self.sink.warned(kind, label, &note);
        }
    }

    /// A reference the item cannot exist without.
    fn require(&self, kind: EntityKind, field: &str, name: Option<&str>) -> Result<Ref, String> {
        let name = key::present(name).ok_or_else(|| format!("missing {field}"))?;
        self.lookups
            .resolve_name(kind, name)
            .ok_or_else(|| format!("{} '{name}' not found", kind.noun()))
    }

    /// A reference that is dropped, with a warning, when it does not resolve.
    fn optional(&mut self, kind: EntityKind, name: Option<&str>) -> FieldValue {
        let Some(name) = key::present(name) else {
            return FieldValue::Null;
        };
        match self.lookups.resolve_name(kind, name) {
            Some(reference) => reference.value(),
            None => {
                self.note(format!("{} '{name}' not found, imported without one", kind.noun()));
                FieldValue::Null
            }
        }
    }

    fn choice<E: TextEnum>(&mut self, raw: Option<&str>) -> FieldValue {
        let value = match key::present(raw) {
            None => E::default(),
            Some(raw) => E::parse(raw).unwrap_or_else(|e| {
                self.note(format!("{e}, using '{}'", E::default().as_str()));
                E::default()
            }),
        };
        FieldValue::from(value.as_str())
    }

    fn date(&mut self, field: &str, raw: Option<&str>) -> FieldValue {
        let Some(raw) = key::present(raw) else {
            return FieldValue::Null;
        };
        match parse_date(raw) {
            Ok(date) => FieldValue::Text(date.to_string()),
            Err(e) => {
                self.note(format!("{field}: {e}, imported as empty"));
                FieldValue::Null
            }
        }
    }

    fn author(&self, name: Option<&str>) -> FieldValue {
        self.actors.resolve(name, self.user).into()
    }

    fn is_matched(&self, name: Option<&str>) -> bool {
        key::present(name).is_some_and(|name| self.actors.find(name).is_some())
    }

    fn complexity(&mut self, complexity: Option<&Complexity>) -> FieldValue {
        let Some(complexity) = complexity else {
            return FieldValue::Null;
        };
        let range = Complexity::MIN_SCORE..=Complexity::MAX_SCORE;
        let mut scores = serde_json::Map::new();
        for (name, score) in complexity.scores() {
            match score {
                None => {}
                Some(score) if range.contains(&score) => {
                    scores.insert(name.to_string(), serde_json::Value::from(score));
                }
                Some(score) => self.note(format!(
                    "{name} complexity {score} outside {}..={}, dropped",
                    range.start(),
                    range.end()
                )),
            }
        }
        if scores.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::Text(serde_json::Value::Object(scores).to_string())
        }
    }

    // ========================================================================
    // Per-type column builders
    // ========================================================================

    fn category(&mut self, category: &CategoryRecord) -> Result<Columns, String> {
        Ok(vec![
            ("description", text(&category.description)),
            ("color", text(&category.color)),
        ])
    }

    fn tag(&mut self, tag: &TagRecord) -> Result<Columns, String> {
        Ok(vec![("color", text(&tag.color))])
    }

    fn pillar(&mut self, pillar: &PillarRecord) -> Result<Columns, String> {
        Ok(vec![
            ("description", text(&pillar.description)),
            ("icon", text(&pillar.icon)),
            ("color", text(&pillar.color)),
            ("display_order", pillar.display_order.unwrap_or(0).into()),
        ])
    }

    fn department(&mut self, department: &DepartmentRecord) -> Result<Columns, String> {
        Ok(vec![("description", text(&department.description))])
    }

    fn agent_type(&mut self, agent_type: &AgentTypeRecord) -> Result<Columns, String> {
        Ok(vec![("description", text(&agent_type.description))])
    }

    fn goal(&mut self, goal: &GoalRecord) -> Result<Columns, String> {
        let pillar = self.require(EntityKind::Pillar, "pillar_name", goal.pillar_name.as_deref())?;
        let completion = match goal.completion_percentage {
            None => 0,
            Some(p) if (0.0..=100.0).contains(&p) => p.round() as i64,
            Some(p) => {
                let clamped = p.clamp(0.0, 100.0).round() as i64;
                self.note(format!("completion_percentage {p} clamped to {clamped}"));
                clamped
            }
        };
        Ok(vec![
            ("pillar_id", pillar.value()),
            ("description", text(&goal.description)),
            ("target_date", self.date("target_date", goal.target_date.as_deref())),
            ("priority", self.choice::<Priority>(goal.priority.as_deref())),
            ("status", self.choice::<GoalStatus>(goal.status.as_deref())),
            ("completion_percentage", completion.into()),
            ("success_metrics", text(&goal.success_metrics)),
            ("author_id", self.author(goal.author_name.as_deref())),
            ("display_order", goal.display_order.unwrap_or(0).into()),
        ])
    }

    fn initiative(&mut self, initiative: &InitiativeRecord) -> Result<Columns, String> {
        let department = match self.variant {
            SchemaVariant::Rich => {
                self.optional(EntityKind::Department, initiative.department_name.as_deref())
            }
            SchemaVariant::Simple => FieldValue::Null,
        };
        Ok(vec![
            (
                "category_id",
                self.optional(EntityKind::Category, initiative.category_name.as_deref()),
            ),
            ("department_id", department),
            ("problem_statement", text(&initiative.problem_statement)),
            ("solution_description", text(&initiative.solution_description)),
            ("status", self.choice::<InitiativeStatus>(initiative.status.as_deref())),
            ("kanban_pillar", self.choice::<KanbanPillar>(initiative.kanban_pillar.as_deref())),
            (
                "strategic_impact",
                self.choice::<StrategicImpact>(initiative.strategic_impact.as_deref()),
            ),
            ("complexity", self.complexity(initiative.complexity.as_ref())),
            (
                "expected_delivery_date",
                self.date("expected_delivery_date", initiative.expected_delivery_date.as_deref()),
            ),
            ("owner_name", text(&initiative.owner_name)),
            ("owner_email", text(&initiative.owner_email)),
            ("author_id", self.author(initiative.author_name.as_deref())),
        ])
    }

    fn agent(&mut self, agent: &AgentRecord) -> Result<Columns, String> {
        Ok(vec![
            (
                "agent_type_id",
                self.optional(EntityKind::AgentType, agent.agent_type_name.as_deref()),
            ),
            (
                "department_id",
                self.optional(EntityKind::Department, agent.department_name.as_deref()),
            ),
            ("description", text(&agent.description)),
            ("status", self.choice::<InitiativeStatus>(agent.status.as_deref())),
            ("author_id", self.author(agent.author_name.as_deref())),
        ])
    }

    fn goal_alignment(&mut self, alignment: &GoalAlignmentRecord) -> Result<Link, String> {
        let initiative = self.require(
            EntityKind::Initiative,
            "initiative_title",
            alignment.initiative_title.as_deref(),
        )?;
        let goal = self.require(EntityKind::Goal, "goal_title", alignment.goal_title.as_deref())?;
        Ok(Link {
            open: false,
            parts: vec![initiative.key_part(), goal.key_part()],
            columns: vec![
                ("initiative_id", initiative.value()),
                ("goal_id", goal.value()),
                (
                    "alignment_strength",
                    self.choice::<AlignmentStrength>(alignment.alignment_strength.as_deref()),
                ),
                ("rationale", text(&alignment.rationale)),
            ],
        })
    }

    fn association(&mut self, association: &InitiativeAssociationRecord) -> Result<Link, String> {
        let initiative = self.require(
            EntityKind::Initiative,
            "initiative_title",
            association.initiative_title.as_deref(),
        )?;
        let associated = self.require(
            EntityKind::Initiative,
            "associated_initiative_title",
            association.associated_initiative_title.as_deref(),
        )?;
        if initiative == associated {
            return Err("an initiative cannot be associated with itself".into());
        }
        Ok(Link {
            open: false,
            parts: vec![initiative.key_part(), associated.key_part()],
            columns: vec![
                ("initiative_id", initiative.value()),
                ("associated_initiative_id", associated.value()),
                ("created_by", self.author(association.created_by.as_deref())),
            ],
        })
    }

    fn agent_initiative(&mut self, link: &AgentInitiativeRecord) -> Result<Link, String> {
        let agent = self.require(EntityKind::Agent, "agent_title", link.agent_title.as_deref())?;
        let initiative = self.require(
            EntityKind::Initiative,
            "initiative_title",
            link.initiative_title.as_deref(),
        )?;
        Ok(Link {
            open: false,
            parts: vec![agent.key_part(), initiative.key_part()],
            columns: vec![
                ("agent_id", agent.value()),
                ("initiative_id", initiative.value()),
                ("created_by", self.author(link.created_by.as_deref())),
            ],
        })
    }

    fn like(&mut self, like: &LikeRecord) -> Result<Link, String> {
        let on = like.target().map_err(|e| e.to_string())?;
        let target = self.require(target_kind(on), "entity_title", like.entity_title.as_deref())?;
        let user = self.author(like.user_name.as_deref());
        Ok(Link {
            open: !self.is_matched(like.user_name.as_deref()),
            parts: vec![
                on.as_str().to_string(),
                target.key_part(),
                user.key_part(),
            ],
            columns: vec![
                ("entity_type", on.as_str().into()),
                ("entity_id", target.value()),
                ("user_id", user),
            ],
        })
    }

    fn tag_assignment(&mut self, assignment: &TagAssignmentRecord) -> Result<Link, String> {
        let initiative = self.require(
            EntityKind::Initiative,
            "initiative_title",
            assignment.initiative_title.as_deref(),
        )?;
        let tag = self.require(EntityKind::Tag, "tag_name", assignment.tag_name.as_deref())?;
        Ok(Link {
            open: false,
            parts: vec![initiative.key_part(), tag.key_part()],
            columns: vec![("initiative_id", initiative.value()), ("tag_id", tag.value())],
        })
    }
}

fn remember(local: &mut HashMap<String, Ref>, comment: &CommentRecord, stored: Option<Ref>) {
    if let (Some(id), Some(stored)) = (comment.local_id(), stored) {
        local.entry(id).or_insert(stored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratcat_core::{RecordId, Snapshot};

    #[derive(Default)]
    struct Recorder {
        written: Vec<(EntityKind, String)>,
        skipped: Vec<String>,
        rejected: Vec<String>,
        warned: Vec<String>,
    }

    impl Sink for Recorder {
        fn skipped(&mut self, _kind: EntityKind, label: &str) {
            self.skipped.push(label.to_string());
        }

        fn rejected(&mut self, _kind: EntityKind, label: &str, reason: &str) {
            self.rejected.push(format!("{label}: {reason}"));
        }

        fn warned(&mut self, _kind: EntityKind, label: &str, message: &str) {
            self.warned.push(format!("{label}: {message}"));
        }

        fn ignored(&mut self, collection: &str, _count: usize) {
            self.warned.push(collection.to_string());
        }

        fn write(
            &mut self,
            descriptor: &'static EntityDescriptor,
            natural_key: &str,
            label: &str,
            _columns: &[(&'static str, FieldValue)],
        ) -> Result<Written, EngineError> {
            self.written.push((descriptor.kind, label.to_string()));
            Ok(Written::Inserted(Ref::Planned(natural_key.to_string())))
        }
    }

    fn walk(section: serde_json::Value) -> Result<Recorder, Box<dyn std::error::Error>> {
        let snapshot = Snapshot::from_value(json!({ "domains": [section] }))?;
        let actors = ActorDirectory::default();
        let user = Actor::new(RecordId::from_i64(1), "importer");
        let mut recorder = Recorder::default();
        Walk::new(
            &mut recorder,
            Lookups::default(),
            &actors,
            &user,
            SchemaVariant::Rich,
            FieldValue::Null,
        )
        .run(&snapshot.domains[0])?;
        Ok(recorder)
    }

    #[test]
    fn parents_are_written_before_children() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = walk(json!({
            "goal_alignments": [{ "initiative_title": "Launch", "goal_title": "Grow" }],
            "initiatives": [{ "title": "Launch" }],
            "strategic_goals": [{ "title": "Grow", "pillar_name": "Growth" }],
            "pillars": [{ "name": "Growth" }]
        }))?;

        let kinds: Vec<EntityKind> = recorder.written.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::Pillar,
                EntityKind::Goal,
                EntityKind::Initiative,
                EntityKind::GoalAlignment
            ]
        );
        assert!(recorder.rejected.is_empty());
        Ok(())
    }

    #[test]
    fn duplicate_links_drop_their_warnings() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = walk(json!({
            "pillars": [{ "name": "Growth" }],
            "strategic_goals": [{ "title": "Grow", "pillar_name": "Growth" }],
            "initiatives": [{ "title": "Launch" }],
            "goal_alignments": [
                { "initiative_title": "Launch", "goal_title": "Grow", "alignment_strength": "total" },
                { "initiative_title": "launch", "goal_title": "grow", "alignment_strength": "total" }
            ]
        }))?;

        assert_eq!(recorder.skipped, vec!["launch -> grow".to_string()]);
        assert_eq!(recorder.warned.len(), 1);
        assert!(recorder.warned[0].contains("invalid alignment strength 'total'"));
        Ok(())
    }

    #[test]
    fn blank_names_are_rejected_with_source_id() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = walk(json!({
            "initiatives": [{ "id": "init-7", "title": "   " }]
        }))?;

        assert_eq!(recorder.rejected, vec!["(unnamed, source id init-7): missing title".to_string()]);
        assert!(recorder.written.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_target_kinds_reject_only_the_item() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = walk(json!({
            "initiatives": [{ "title": "Launch" }],
            "comments": [
                { "id": 1, "entity_type": "goal", "entity_title": "Grow", "content": "hm" },
                { "id": 2, "entity_title": "Launch", "content": "fine" }
            ],
            "likes": [{ "entity_type": "pillar", "entity_title": "Growth" }]
        }))?;

        assert_eq!(
            recorder.rejected,
            vec![
                "#1 on goal Grow: invalid entity_type 'goal'".to_string(),
                "pillar Growth liked by importing user: invalid entity_type 'pillar'".to_string(),
            ]
        );
        assert!(recorder.written.contains(&(EntityKind::Comment, "#2 on initiative Launch".to_string())));
        Ok(())
    }

    #[test]
    fn comment_content_keeps_its_case() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = walk(json!({
            "initiatives": [{ "title": "Launch" }],
            "comments": [
                { "id": 1, "entity_title": "Launch", "content": "OK" },
                { "id": 2, "entity_title": "Launch", "content": "ok" },
                { "id": 3, "entity_title": "launch", "content": " OK " }
            ]
        }))?;

        let comments = recorder
            .written
            .iter()
            .filter(|(kind, _)| *kind == EntityKind::Comment)
            .count();
        assert_eq!(comments, 2);
        assert_eq!(recorder.skipped, vec!["#3 on initiative launch".to_string()]);
        Ok(())
    }
}
