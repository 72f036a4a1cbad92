/// Shared types used across the codebase

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soft-delete state of every stored record.
///
/// Storage keeps a nullable `deleted_at` column; everything above the
/// repositories works with this enum instead, so "is this record live"
/// is a single match arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Active,
    Deleted { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Deleted { at } => Some(*at),
        }
    }

    /// Moves to `Deleted`. Returns false if the record was already deleted,
    /// in which case the original timestamp is kept.
    pub fn terminate(&mut self, at: DateTime<Utc>) -> bool {
        match self {
            Lifecycle::Active => {
                *self = Lifecycle::Deleted { at };
                true
            }
            Lifecycle::Deleted { .. } => false,
        }
    }
}

impl From<Option<DateTime<Utc>>> for Lifecycle {
    fn from(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            None => Lifecycle::Active,
            Some(at) => Lifecycle::Deleted { at },
        }
    }
}

/// Which records a repository query should consider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Active,
    Any,
}

impl Scope {
    pub fn admits(&self, lifecycle: &Lifecycle) -> bool {
        match self {
            Scope::Active => lifecycle.is_active(),
            Scope::Any => true,
        }
    }
}

/// The services this binary can mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Practitioner,
    Facility,
    Individual,
    Examination,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Practitioner,
        ServiceKind::Facility,
        ServiceKind::Individual,
        ServiceKind::Examination,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Practitioner => "practitioner",
            ServiceKind::Facility => "facility",
            ServiceKind::Individual => "individual",
            ServiceKind::Examination => "examination",
        }
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "practitioner" | "doctor" => Ok(ServiceKind::Practitioner),
            "facility" | "hospital" => Ok(ServiceKind::Facility),
            "individual" | "patient" => Ok(ServiceKind::Individual),
            "examination" | "test" => Ok(ServiceKind::Examination),
            other => Err(format!("unknown service '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminate_is_monotonic() {
        let first = Utc::now();
        let mut lifecycle = Lifecycle::Active;
        assert!(lifecycle.terminate(first));
        assert!(!lifecycle.terminate(first + chrono::Duration::seconds(5)));
        assert_eq!(lifecycle.deleted_at(), Some(first));
    }

    #[test]
    fn scope_filters_deleted_records() {
        let deleted = Lifecycle::Deleted { at: Utc::now() };
        assert!(!Scope::Active.admits(&deleted));
        assert!(Scope::Any.admits(&deleted));
        assert!(Scope::Active.admits(&Lifecycle::Active));
    }

    #[test]
    fn service_kind_accepts_legacy_names() {
        assert_eq!("doctor".parse::<ServiceKind>(), Ok(ServiceKind::Practitioner));
        assert_eq!("hospital".parse::<ServiceKind>(), Ok(ServiceKind::Facility));
        assert!("gateway".parse::<ServiceKind>().is_err());
    }
}
