//! The snapshot document consumed by the importer.
//!
//! Relationships are expressed by natural-key references (names and titles),
//! never by surrogate identifiers. Fields that are required for import are
//! still optional here so that a malformed item surfaces as a per-item error
//! instead of failing to parse the whole document.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::enums::{TargetKind, TextEnum};
use crate::error::CoreError;
use crate::key;

pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub metadata: SnapshotMeta,
    #[serde(default)]
    pub domains: Vec<DomainSection>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Advisory block written by the exporter. Never trusted for import decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub exported_at: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainSection {
    pub domain: DomainRecord,
    pub categories: Vec<CategoryRecord>,
    pub tags: Vec<TagRecord>,
    pub pillars: Vec<PillarRecord>,
    pub departments: Vec<DepartmentRecord>,
    pub agent_types: Vec<AgentTypeRecord>,
    pub strategic_goals: Vec<GoalRecord>,
    pub initiatives: Vec<InitiativeRecord>,
    pub agents: Vec<AgentRecord>,
    pub goal_alignments: Vec<GoalAlignmentRecord>,
    pub initiative_associations: Vec<InitiativeAssociationRecord>,
    pub agent_initiatives: Vec<AgentInitiativeRecord>,
    pub comments: Vec<CommentRecord>,
    pub likes: Vec<LikeRecord>,
    pub tag_assignments: Vec<TagAssignmentRecord>,
}

impl DomainSection {
    /// Size of each collection, keyed the same way as the metadata counts.
    pub fn collection_sizes(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("categories", self.categories.len()),
            ("tags", self.tags.len()),
            ("pillars", self.pillars.len()),
            ("departments", self.departments.len()),
            ("agent_types", self.agent_types.len()),
            ("strategic_goals", self.strategic_goals.len()),
            ("initiatives", self.initiatives.len()),
            ("agents", self.agents.len()),
            ("goal_alignments", self.goal_alignments.len()),
            ("initiative_associations", self.initiative_associations.len()),
            ("agent_initiatives", self.agent_initiatives.len()),
            ("comments", self.comments.len()),
            ("likes", self.likes.len()),
            ("tag_assignments", self.tag_assignments.len()),
        ])
    }

    /// Every distinct author or actor name referenced anywhere in the section,
    /// deduplicated case-insensitively, in first-seen spelling.
    pub fn author_names(&self) -> Vec<&str> {
        let referenced = self
            .strategic_goals
            .iter()
            .map(|g| g.author_name.as_deref())
            .chain(self.initiatives.iter().map(|i| i.author_name.as_deref()))
            .chain(self.agents.iter().map(|a| a.author_name.as_deref()))
            .chain(self.initiative_associations.iter().map(|a| a.created_by.as_deref()))
            .chain(self.agent_initiatives.iter().map(|a| a.created_by.as_deref()))
            .chain(self.comments.iter().map(|c| c.author_name.as_deref()))
            .chain(self.likes.iter().map(|l| l.user_name.as_deref()));

        let mut seen = BTreeSet::new();
        let mut names = Vec::new();
        for name in referenced.filter_map(key::present) {
            if seen.insert(key::normalize(name)) {
                names.push(name);
            }
        }
        names
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainRecord {
    pub name: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub domain_type: Option<String>,
    pub hero_message: Option<String>,
    pub subtitle: Option<String>,
    pub config: Option<serde_json::Value>,
    #[serde(deserialize_with = "optional_flag")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagRecord {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PillarRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartmentRecord {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTypeRecord {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub pillar_name: Option<String>,
    pub target_date: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub completion_percentage: Option<f64>,
    pub success_metrics: Option<String>,
    pub author_name: Option<String>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Complexity {
    pub data: Option<i64>,
    pub integration: Option<i64>,
    pub intelligence: Option<i64>,
    pub ux: Option<i64>,
}

impl Complexity {
    pub const MIN_SCORE: i64 = 1;
    pub const MAX_SCORE: i64 = 5;

    pub fn scores(&self) -> [(&'static str, Option<i64>); 4] {
        [
            ("data", self.data),
            ("integration", self.integration),
            ("intelligence", self.intelligence),
            ("ux", self.ux),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitiativeRecord {
    /// Identifier from the exporting deployment. Only used to make messages traceable.
    pub id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub problem_statement: Option<String>,
    pub solution_description: Option<String>,
    pub status: Option<String>,
    pub kanban_pillar: Option<String>,
    pub strategic_impact: Option<String>,
    pub complexity: Option<Complexity>,
    pub expected_delivery_date: Option<String>,
    pub category_name: Option<String>,
    pub department_name: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentRecord {
    pub id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub agent_type_name: Option<String>,
    pub department_name: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalAlignmentRecord {
    pub initiative_title: Option<String>,
    pub goal_title: Option<String>,
    pub alignment_strength: Option<String>,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitiativeAssociationRecord {
    pub initiative_title: Option<String>,
    pub associated_initiative_title: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentInitiativeRecord {
    pub agent_title: Option<String>,
    pub initiative_title: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentRecord {
    /// Snapshot-local identifier, only meaningful within one import call.
    pub id: Option<serde_json::Value>,
    pub entity_type: Option<String>,
    pub entity_title: Option<String>,
    pub parent_comment_id: Option<serde_json::Value>,
    pub author_name: Option<String>,
    pub content: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub is_edited: bool,
}

impl CommentRecord {
    pub fn target(&self) -> Result<TargetKind, CoreError> {
        target(self.entity_type.as_deref())
    }

    pub fn local_id(&self) -> Option<String> {
        self.id.as_ref().and_then(local_id)
    }

    pub fn parent_local_id(&self) -> Option<String> {
        self.parent_comment_id.as_ref().and_then(local_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LikeRecord {
    pub entity_type: Option<String>,
    pub entity_title: Option<String>,
    pub user_name: Option<String>,
}

impl LikeRecord {
    pub fn target(&self) -> Result<TargetKind, CoreError> {
        target(self.entity_type.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagAssignmentRecord {
    pub initiative_title: Option<String>,
    pub tag_name: Option<String>,
}

/// Exporters write local ids as either numbers or strings; both are accepted.
pub fn local_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A missing target kind means an initiative.
fn target(raw: Option<&str>) -> Result<TargetKind, CoreError> {
    key::present(raw).map_or(Ok(TargetKind::default()), TargetKind::parse)
}

/// Relational exporters write flags as `0`/`1`; unreadable values fall back
/// to the field default.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(optional_flag(deserializer)?.unwrap_or_default())
}

fn optional_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    use serde_json::Value;
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_collections_default_to_empty() -> Result<(), CoreError> {
        let snapshot = Snapshot::from_value(json!({
            "metadata": { "version": "1.0" },
            "domains": [{ "domain": { "name": "Finance", "type": "business" } }]
        }))?;
        let section = &snapshot.domains[0];
        assert_eq!(section.domain.name.as_deref(), Some("Finance"));
        assert_eq!(section.domain.domain_type.as_deref(), Some("business"));
        assert!(section.initiatives.is_empty());
        assert!(section.comments.is_empty());
        Ok(())
    }

    #[test]
    fn missing_required_field_still_parses() -> Result<(), CoreError> {
        let snapshot = Snapshot::from_value(json!({
            "domains": [{ "domain": { "name": "Ops" }, "categories": [{ "description": "no name" }] }]
        }))?;
        assert!(snapshot.domains[0].categories[0].name.is_none());
        Ok(())
    }

    #[test]
    fn comment_local_ids_accept_numbers_and_strings() -> Result<(), CoreError> {
        let snapshot = Snapshot::from_value(json!({
            "domains": [{
                "domain": { "name": "Ops" },
                "comments": [
                    { "id": 7, "entity_title": "A", "content": "root" },
                    { "id": "c-8", "parent_comment_id": 7, "entity_type": "agent", "entity_title": "B", "content": "reply" }
                ]
            }]
        }))?;
        let comments = &snapshot.domains[0].comments;
        assert_eq!(comments[0].local_id().as_deref(), Some("7"));
        assert_eq!(comments[0].target()?, TargetKind::Initiative);
        assert_eq!(comments[1].local_id().as_deref(), Some("c-8"));
        assert_eq!(comments[1].parent_local_id().as_deref(), Some("7"));
        assert_eq!(comments[1].target()?, TargetKind::Agent);
        Ok(())
    }

    #[test]
    fn exporter_flags_and_numbers_are_accepted() -> Result<(), CoreError> {
        let snapshot = Snapshot::from_value(json!({
            "domains": [{
                "domain": { "name": "Ops", "is_active": 0 },
                "goals": [{ "title": "G", "completion_percentage": 42.5 }],
                "comments": [
                    { "entity_title": "A", "content": "x", "is_edited": 1 },
                    { "entity_title": "A", "content": "y", "is_edited": "false" },
                    { "entity_type": "goal", "entity_title": "G", "content": "z", "is_edited": null }
                ],
                "likes": [{ "entity_type": "Agent", "entity_title": "B" }]
            }]
        }))?;
        let section = &snapshot.domains[0];
        assert_eq!(section.domain.is_active, Some(false));
        assert_eq!(section.goals[0].completion_percentage, Some(42.5));
        assert!(section.comments[0].is_edited);
        assert!(!section.comments[1].is_edited);
        assert!(!section.comments[2].is_edited);
        let unknown = section.comments[2].target().unwrap_err();
        assert_eq!(unknown.to_string(), "invalid entity_type 'goal'");
        assert_eq!(section.likes[0].target()?, TargetKind::Agent);
        Ok(())
    }

    #[test]
    fn author_names_are_distinct_case_insensitively() -> Result<(), CoreError> {
        let snapshot = Snapshot::from_value(json!({
            "domains": [{
                "domain": { "name": "Ops" },
                "initiatives": [{ "title": "A", "author_name": "Dana" }],
                "comments": [{ "entity_title": "A", "author_name": "dana ", "content": "x" }],
                "likes": [{ "entity_title": "A", "user_name": "Eli" }]
            }]
        }))?;
        assert_eq!(snapshot.domains[0].author_names(), vec!["Dana", "Eli"]);
        Ok(())
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_date("2025-03-31").is_ok());
        assert!(parse_date("31/03/2025").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }
}
