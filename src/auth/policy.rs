// Route access policy: which paths are public and which roles may call the rest.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::{ROLE_ADMIN, ROLE_FACILITY, ROLE_PRACTITIONER, ROLE_SERVICE};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read access policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse access policy: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid pattern '{0}': '**' is only allowed as the last segment")]
    InvalidPattern(String),
}

/// One allow rule. Patterns use `*` for exactly one segment and a trailing
/// `**` for any number of segments (including none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    pub pattern: String,
    /// HTTP methods the rule covers; empty means all
    #[serde(default)]
    pub methods: Vec<String>,
    pub roles: Vec<String>,
}

/// Ordered rules: the first rule matching method and path decides.
/// Paths that match no rule are denied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub public: Vec<String>,
    pub rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let policy: AccessPolicy = serde_yaml::from_str(yaml)?;
        policy.check_patterns()?;
        Ok(policy)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn check_patterns(&self) -> Result<(), PolicyError> {
        let patterns = self.public.iter().chain(self.rules.iter().map(|r| &r.pattern));
        for pattern in patterns {
            let segments = split(pattern);
            if let Some(pos) = segments.iter().position(|s| *s == "**") {
                if pos != segments.len() - 1 {
                    return Err(PolicyError::InvalidPattern(pattern.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|pattern| pattern_matches(pattern, path))
    }

    pub fn authorize(&self, method: &str, path: &str, roles: &[String]) -> bool {
        let rule = self.rules.iter().find(|rule| {
            (rule.methods.is_empty() || rule.methods.iter().any(|m| m.eq_ignore_ascii_case(method)))
                && pattern_matches(&rule.pattern, path)
        });
        match rule {
            Some(rule) => rule.roles.iter().any(|allowed| roles.contains(allowed)),
            None => false,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        let rule = |pattern: &str, methods: &[&str], roles: &[&str]| AccessRule {
            pattern: pattern.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };

        Self {
            public: vec![
                "/".to_string(),
                "/health".to_string(),
                "/docs".to_string(),
                "/public/**".to_string(),
            ],
            rules: vec![
                rule("/internal/**", &[], &[ROLE_SERVICE, ROLE_ADMIN]),
                rule("/api/practitioners/me/**", &[], &[ROLE_PRACTITIONER]),
                rule("/api/practitioners/**", &["GET"], &[ROLE_ADMIN, ROLE_FACILITY]),
                rule("/api/facilities/me/**", &[], &[ROLE_FACILITY]),
                // The one facility route a practitioner may call
                rule("/api/facilities/*", &["GET"], &[ROLE_FACILITY, ROLE_PRACTITIONER, ROLE_ADMIN]),
                rule("/api/facilities/**", &["GET"], &[ROLE_FACILITY, ROLE_ADMIN]),
                rule("/api/individuals/**", &[], &[ROLE_PRACTITIONER, ROLE_FACILITY, ROLE_ADMIN]),
                rule("/api/examinations/**", &[], &[ROLE_PRACTITIONER, ROLE_FACILITY, ROLE_ADMIN]),
            ],
        }
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern = split(pattern);
    let path = split(path);

    let mut i = 0;
    for (pos, segment) in pattern.iter().enumerate() {
        match *segment {
            "**" if pos == pattern.len() - 1 => return true,
            "*" => {
                if i >= path.len() {
                    return false;
                }
            }
            literal => {
                if path.get(i) != Some(&literal) {
                    return false;
                }
            }
        }
        i += 1;
    }
    i == path.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[&str]) -> Vec<String> {
        list.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn patterns_match_segments() {
        assert!(pattern_matches("/", "/"));
        assert!(pattern_matches("/api/facilities/*", "/api/facilities/10"));
        assert!(!pattern_matches("/api/facilities/*", "/api/facilities"));
        assert!(!pattern_matches("/api/facilities/*", "/api/facilities/10/practitioners"));
        assert!(pattern_matches("/api/practitioners/me/**", "/api/practitioners/me"));
        assert!(pattern_matches("/api/practitioners/me/**", "/api/practitioners/me/anything/else"));
        assert!(!pattern_matches("/health", "/healthz"));
    }

    #[test]
    fn documentation_routes_are_public() {
        let policy = AccessPolicy::default();
        assert!(policy.is_public("/docs"));
        assert!(policy.is_public("/public/examinations/ABCDEFGHIJ"));
        assert!(!policy.is_public("/api/examinations"));
    }

    #[test]
    fn practitioner_role_gets_exactly_one_facility_route() {
        let policy = AccessPolicy::default();
        let practitioner = roles(&[ROLE_PRACTITIONER]);

        assert!(policy.authorize("GET", "/api/facilities/10", &practitioner));
        assert!(!policy.authorize("GET", "/api/facilities", &practitioner));
        assert!(!policy.authorize("GET", "/api/facilities/me", &practitioner));
        assert!(!policy.authorize("GET", "/api/facilities/me/practitioners", &practitioner));
        assert!(!policy.authorize("DELETE", "/api/facilities/10", &practitioner));
    }

    #[test]
    fn unmatched_paths_are_denied() {
        let policy = AccessPolicy::default();
        assert!(!policy.authorize("GET", "/api/unknown", &roles(&[ROLE_ADMIN])));
        assert!(!policy.authorize("GET", "/internal/individuals/1/exists", &roles(&[ROLE_PRACTITIONER])));
        assert!(policy.authorize("GET", "/internal/individuals/1/exists", &roles(&[ROLE_SERVICE])));
    }

    #[test]
    fn loads_policy_from_yaml() {
        let yaml = r#"
public: ["/health"]
rules:
  - pattern: /api/individuals/**
    methods: [GET]
    roles: [auditor]
"#;
        let policy = AccessPolicy::from_yaml_str(yaml).unwrap();
        assert!(policy.authorize("GET", "/api/individuals/3", &roles(&["auditor"])));
        assert!(!policy.authorize("POST", "/api/individuals", &roles(&["auditor"])));
    }

    #[test]
    fn rejects_inner_double_star() {
        let yaml = "public: []\nrules:\n  - pattern: /api/**/x\n    roles: [admin]\n";
        assert!(matches!(AccessPolicy::from_yaml_str(yaml), Err(PolicyError::InvalidPattern(_))));
    }
}
