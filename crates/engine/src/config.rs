use serde::{Deserialize, Serialize};

use crate::descriptor::{DESCRIPTORS, EntityDescriptor};
use crate::error::EngineError;

/// Which shape of the catalog the importer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// Departments, agent types, agents and their links included.
    #[default]
    Rich,
    Simple,
}

impl SchemaVariant {
    pub fn includes(&self, descriptor: &EntityDescriptor) -> bool {
        match self {
            Self::Rich => true,
            Self::Simple => !descriptor.rich_only,
        }
    }

    /// Descriptors taking part in an import, in dependency order.
    pub fn descriptors(self) -> impl Iterator<Item = &'static EntityDescriptor> {
        DESCRIPTORS.iter().filter(move |d| self.includes(d))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub variant: SchemaVariant,
    /// Only treat a store-level duplicate-key rejection as "already present"
    /// when it fired on the entity type's own natural-key constraint.
    pub verify_duplicate_constraint: bool,
    /// Warnings kept per domain report; the remainder is summarised.
    pub max_warnings: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            variant: SchemaVariant::Rich,
            verify_duplicate_constraint: true,
            max_warnings: 500,
        }
    }
}

impl ImportConfig {
    pub fn simple() -> Self {
        Self {
            variant: SchemaVariant::Simple,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        if config.max_warnings == 0 {
            return Err(EngineError::Config("max_warnings must be at least 1".into()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::EntityKind;

    #[test]
    fn partial_json_keeps_defaults() -> Result<(), EngineError> {
        let config = ImportConfig::from_json(r#"{ "variant": "simple" }"#)?;
        assert_eq!(config.variant, SchemaVariant::Simple);
        assert!(config.verify_duplicate_constraint);
        assert_eq!(config.max_warnings, 500);
        Ok(())
    }

    #[test]
    fn rejects_zero_warning_cap() {
        let err = ImportConfig::from_json(r#"{ "max_warnings": 0 }"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn simple_variant_drops_rich_only_kinds() {
        let kinds: Vec<EntityKind> = SchemaVariant::Simple.descriptors().map(|d| d.kind).collect();
        assert!(kinds.contains(&EntityKind::Initiative));
        assert!(!kinds.contains(&EntityKind::Department));
        assert!(!kinds.contains(&EntityKind::Agent));
        assert!(!kinds.contains(&EntityKind::AgentInitiative));
        assert_eq!(SchemaVariant::Rich.descriptors().count(), DESCRIPTORS.len());
    }
}
