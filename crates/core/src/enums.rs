//! Enumerated text columns and their fallback defaults.
//!
//! Snapshot values are parsed leniently: case is ignored and spaces or
//! hyphens are read as underscores. Anything else is rejected and the caller
//! falls back to `Default`.

use std::fmt;

use crate::error::CoreError;

pub trait TextEnum: Sized + Copy + Default {
    fn as_str(&self) -> &'static str;

    fn parse(s: &str) -> Result<Self, CoreError>;
}

macro_rules! text_enum {
    ($name:ident, $field:literal, default = $default:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl TextEnum for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            fn parse(s: &str) -> Result<Self, CoreError> {
                let folded: String = s
                    .trim()
                    .chars()
                    .map(|c| match c {
                        ' ' | '-' => '_',
                        c => c.to_ascii_lowercase(),
                    })
                    .collect();
                match folded.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(CoreError::UnknownVariant {
                        field: $field,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(Priority, "priority", default = Medium, {
    Low => "low",
    Medium => "medium",
    High => "high",
});

text_enum!(GoalStatus, "goal status", default = Draft, {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

// Maturity stage. Independent of the delivery pipeline position below.
text_enum!(InitiativeStatus, "status", default = Ideation, {
    Ideation => "ideation",
    Research => "research",
    Pilot => "pilot",
    Production => "production",
    Deprecated => "deprecated",
});

text_enum!(KanbanPillar, "kanban pillar", default = Backlog, {
    Backlog => "backlog",
    Prioritized => "prioritized",
    InProgress => "in_progress",
    Review => "review",
    Done => "done",
});

text_enum!(StrategicImpact, "strategic impact", default = Medium, {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

text_enum!(AlignmentStrength, "alignment strength", default = Moderate, {
    Weak => "weak",
    Moderate => "moderate",
    Strong => "strong",
});

// Kind of entity a comment or like points at. Unlike the columns above, an
// unknown value rejects the item instead of defaulting.
text_enum!(TargetKind, "entity_type", default = Initiative, {
    Initiative => "initiative",
    Agent => "agent",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_lenient_about_case_and_separators() -> Result<(), CoreError> {
        assert_eq!(KanbanPillar::parse("In Progress")?, KanbanPillar::InProgress);
        assert_eq!(KanbanPillar::parse("in-progress")?, KanbanPillar::InProgress);
        assert_eq!(Priority::parse(" HIGH ")?, Priority::High);
        Ok(())
    }

    #[test]
    fn unknown_value_names_the_field() {
        let err = GoalStatus::parse("paused").unwrap_err();
        assert_eq!(err.to_string(), "invalid goal status 'paused'");
    }

    #[test]
    fn defaults() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(GoalStatus::default(), GoalStatus::Draft);
        assert_eq!(InitiativeStatus::default(), InitiativeStatus::Ideation);
        assert_eq!(KanbanPillar::default(), KanbanPillar::Backlog);
        assert_eq!(StrategicImpact::default(), StrategicImpact::Medium);
        assert_eq!(AlignmentStrength::default(), AlignmentStrength::Moderate);
    }

    #[test]
    fn every_variant_round_trips_through_text() -> Result<(), CoreError> {
        for status in InitiativeStatus::ALL {
            assert_eq!(InitiativeStatus::parse(status.as_str())?, *status);
        }
        Ok(())
    }
}
