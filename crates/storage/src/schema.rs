use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// Titles and names of domain-scoped entities carry no UNIQUE constraint;
// duplicate detection for those happens in the importer. Link tables and
// the global reference tables are backed by one.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT
);

CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    domain_type TEXT NOT NULL DEFAULT 'general',
    hero_message TEXT,
    subtitle TEXT,
    config TEXT NOT NULL DEFAULT '{}',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL DEFAULT (unixepoch())
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    domain_id INTEGER NOT NULL REFERENCES domains (id),
    name TEXT NOT NULL,
    description TEXT,
    color TEXT
);
CREATE INDEX IF NOT EXISTS idx_categories_domain ON categories (domain_id);

CREATE TABLE IF NOT EXISTS pillars (
    id INTEGER PRIMARY KEY,
    domain_id INTEGER NOT NULL REFERENCES domains (id),
    name TEXT NOT NULL,
    description TEXT,
    icon TEXT,
    color TEXT,
    display_order INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_pillars_domain ON pillars (domain_id);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    color TEXT
);

CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS agent_types (
    id INTEGER PRIMARY KEY,
    domain_id INTEGER NOT NULL REFERENCES domains (id),
    name TEXT NOT NULL,
    description TEXT
);
CREATE INDEX IF NOT EXISTS idx_agent_types_domain ON agent_types (domain_id);

CREATE TABLE IF NOT EXISTS strategic_goals (
    id INTEGER PRIMARY KEY,
    domain_id INTEGER NOT NULL REFERENCES domains (id),
    pillar_id INTEGER NOT NULL REFERENCES pillars (id),
    title TEXT NOT NULL,
    description TEXT,
    target_date TEXT,
    priority TEXT NOT NULL DEFAULT 'medium',
    status TEXT NOT NULL DEFAULT 'draft',
    completion_percentage INTEGER NOT NULL DEFAULT 0
        CHECK (completion_percentage BETWEEN 0 AND 100),
    success_metrics TEXT,
    author_id INTEGER REFERENCES users (id),
    display_order INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_goals_domain ON strategic_goals (domain_id);

CREATE TABLE IF NOT EXISTS initiatives (
    id INTEGER PRIMARY KEY,
    domain_id INTEGER NOT NULL REFERENCES domains (id),
    category_id INTEGER REFERENCES categories (id),
    department_id INTEGER REFERENCES departments (id),
    title TEXT NOT NULL,
    problem_statement TEXT,
    solution_description TEXT,
    status TEXT NOT NULL DEFAULT 'ideation',
    kanban_pillar TEXT NOT NULL DEFAULT 'backlog',
    strategic_impact TEXT NOT NULL DEFAULT 'medium',
    complexity TEXT,
    expected_delivery_date TEXT,
    owner_name TEXT,
    owner_email TEXT,
    author_id INTEGER REFERENCES users (id),
    created_at INTEGER NOT NULL DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_initiatives_domain ON initiatives (domain_id);

CREATE TABLE IF NOT EXISTS agents (
    id INTEGER PRIMARY KEY,
    domain_id INTEGER NOT NULL REFERENCES domains (id),
    agent_type_id INTEGER REFERENCES agent_types (id),
    department_id INTEGER REFERENCES departments (id),
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'ideation',
    author_id INTEGER REFERENCES users (id)
);
CREATE INDEX IF NOT EXISTS idx_agents_domain ON agents (domain_id);

CREATE TABLE IF NOT EXISTS goal_alignments (
    id INTEGER PRIMARY KEY,
    initiative_id INTEGER NOT NULL REFERENCES initiatives (id),
    goal_id INTEGER NOT NULL REFERENCES strategic_goals (id),
    alignment_strength TEXT NOT NULL DEFAULT 'moderate',
    rationale TEXT,
    UNIQUE (initiative_id, goal_id)
);

CREATE TABLE IF NOT EXISTS initiative_associations (
    id INTEGER PRIMARY KEY,
    initiative_id INTEGER NOT NULL REFERENCES initiatives (id),
    associated_initiative_id INTEGER NOT NULL REFERENCES initiatives (id),
    created_by INTEGER REFERENCES users (id),
    UNIQUE (initiative_id, associated_initiative_id),
    CHECK (initiative_id <> associated_initiative_id)
);

CREATE TABLE IF NOT EXISTS agent_initiatives (
    id INTEGER PRIMARY KEY,
    agent_id INTEGER NOT NULL REFERENCES agents (id),
    initiative_id INTEGER NOT NULL REFERENCES initiatives (id),
    created_by INTEGER REFERENCES users (id),
    UNIQUE (agent_id, initiative_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY,
    domain_id INTEGER NOT NULL REFERENCES domains (id),
    entity_type TEXT NOT NULL CHECK (entity_type IN ('initiative', 'agent')),
    entity_id INTEGER NOT NULL,
    parent_comment_id INTEGER REFERENCES comments (id),
    user_id INTEGER REFERENCES users (id),
    content TEXT NOT NULL,
    is_edited INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_comments_entity ON comments (entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_comments_domain ON comments (domain_id);

CREATE TABLE IF NOT EXISTS likes (
    id INTEGER PRIMARY KEY,
    entity_type TEXT NOT NULL CHECK (entity_type IN ('initiative', 'agent')),
    entity_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id),
    UNIQUE (entity_type, entity_id, user_id)
);

CREATE TABLE IF NOT EXISTS initiative_tags (
    id INTEGER PRIMARY KEY,
    initiative_id INTEGER NOT NULL REFERENCES initiatives (id),
    tag_id INTEGER NOT NULL REFERENCES tags (id),
    UNIQUE (initiative_id, tag_id)
);
";
