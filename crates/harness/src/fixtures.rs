//! Snapshot documents for tests, written as JSON the way exporters produce them.

use serde_json::{Value, json};
use stratcat_core::{CoreError, Snapshot};

/// Wrap domain sections in a version 1.0 document with no declared counts.
pub fn snapshot(domains: Vec<Value>) -> Result<Snapshot, CoreError> {
    Snapshot::from_value(json!({
        "metadata": {
            "version": "1.0",
            "exported_at": "2026-09-30T12:00:00Z",
            "source": "test"
        },
        "domains": domains
    }))
}

/// A new "Finance" domain: one pillar, goal, initiative and alignment.
pub fn finance() -> Value {
    json!({
        "domain": { "name": "Finance", "display_name": "Finance", "type": "business" },
        "pillars": [{ "name": "Growth", "display_order": 1 }],
        "strategic_goals": [{
            "title": "Expand EU",
            "pillar_name": "Growth",
            "priority": "high",
            "status": "active",
            "target_date": "2027-06-30",
            "author_name": "Bob Builder"
        }],
        "initiatives": [{
            "id": 101,
            "title": "EU Launch",
            "status": "pilot",
            "kanban_pillar": "in_progress",
            "strategic_impact": "high",
            "author_name": "Bob Builder"
        }],
        "goal_alignments": [{
            "initiative_title": "EU Launch",
            "goal_title": "Expand EU",
            "alignment_strength": "strong"
        }]
    })
}

/// Every entity type populated, references all resolvable.
pub fn full_domain(name: &str) -> Value {
    json!({
        "domain": { "name": name, "type": "business", "config": { "theme": "dark" } },
        "categories": [{ "name": "Automation", "color": "#00aa00" }],
        "tags": [{ "name": "Fintech" }, { "name": "Regulatory" }],
        "pillars": [{ "name": "Growth" }, { "name": "Efficiency" }],
        "departments": [{ "name": "Operations" }],
        "agent_types": [{ "name": "Assistant" }],
        "strategic_goals": [
            { "title": "Expand EU", "pillar_name": "Growth" },
            { "title": "Cut Costs", "pillar_name": "Efficiency", "completion_percentage": 40 }
        ],
        "initiatives": [
            {
                "title": "EU Launch",
                "category_name": "Automation",
                "department_name": "Operations",
                "complexity": { "data": 3, "integration": 4 },
                "expected_delivery_date": "2027-01-15"
            },
            { "title": "Invoice Bot", "category_name": "automation" }
        ],
        "agents": [{
            "title": "Ledger Helper",
            "agent_type_name": "Assistant",
            "department_name": "Operations"
        }],
        "goal_alignments": [
            { "initiative_title": "EU Launch", "goal_title": "Expand EU" },
            { "initiative_title": "Invoice Bot", "goal_title": "Cut Costs", "alignment_strength": "weak" }
        ],
        "initiative_associations": [
            { "initiative_title": "EU Launch", "associated_initiative_title": "Invoice Bot" }
        ],
        "agent_initiatives": [
            { "agent_title": "Ledger Helper", "initiative_title": "Invoice Bot" }
        ],
        "comments": [
            { "id": 1, "entity_type": "initiative", "entity_title": "EU Launch", "author_name": "Bob Builder", "content": "Kickoff next week" },
            { "id": 2, "entity_type": "initiative", "entity_title": "EU Launch", "parent_comment_id": 1, "content": "Agreed" },
            { "id": 3, "entity_type": "agent", "entity_title": "Ledger Helper", "content": "Needs access to the ledger" }
        ],
        "likes": [
            { "entity_type": "initiative", "entity_title": "EU Launch", "user_name": "Bob Builder" },
            { "entity_type": "agent", "entity_title": "Ledger Helper" }
        ],
        "tag_assignments": [
            { "initiative_title": "EU Launch", "tag_name": "Fintech" },
            { "initiative_title": "Invoice Bot", "tag_name": "regulatory" }
        ]
    })
}

/// A three-deep reply chain A <- B <- C, listed in the given order.
pub fn threaded(order: [&str; 3]) -> Value {
    let comment = |id: &str| match id {
        "A" => json!({ "id": "A", "entity_type": "initiative", "entity_title": "EU Launch", "content": "A" }),
        "B" => json!({ "id": "B", "entity_type": "initiative", "entity_title": "EU Launch", "parent_comment_id": "A", "content": "B" }),
        _ => json!({ "id": "C", "entity_type": "initiative", "entity_title": "EU Launch", "parent_comment_id": "B", "content": "C" }),
    };
    json!({
        "domain": { "name": "Finance" },
        "initiatives": [{ "title": "EU Launch" }],
        "comments": order.iter().map(|id| comment(id)).collect::<Vec<_>>()
    })
}
