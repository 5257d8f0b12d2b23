// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health-check configuration and status types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unique name of a configured check. Used as the key into the check
/// manager's in-memory record table and as the `CheckDetails.name` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckName(pub String);

impl CheckName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CheckName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CheckName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CheckName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for CheckName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Readiness level a check reports against, mirroring the Kubernetes-style
/// liveness/readiness split. `Unset` checks are informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    Unset,
    Alive,
    Ready,
}

impl Default for CheckLevel {
    fn default() -> Self {
        Self::Unset
    }
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckLevel::Unset => "-",
            CheckLevel::Alive => "alive",
            CheckLevel::Ready => "ready",
        };
        write!(f, "{s}")
    }
}

/// Whether a check's driving task is spawned at plan-install time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStartup {
    Enabled,
    Disabled,
}

impl std::fmt::Display for CheckStartup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckStartup::Enabled => "enabled",
            CheckStartup::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

/// Probe payload. Concrete transports (HTTP, TCP, EXEC) are external
/// collaborators of this scheduler — only their configuration shape and the
/// `Checker` trait that consumes them live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Probe {
    Http { url: String },
    Tcp { host: String, port: u16 },
    Exec { command: String },
}

/// Immutable (for the lifetime of the record) configuration of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    pub name: CheckName,
    pub level: CheckLevel,
    pub startup: CheckStartup,
    pub period: Duration,
    pub timeout: Duration,
    pub threshold: u32,
    pub probe: Probe,
}

impl CheckConfig {
    /// Structural validity independent of any plan-parsing concerns:
    /// period/timeout must be positive, timeout must not exceed period, and
    /// threshold must be at least 1.
    pub fn validate(&self) -> Result<(), String> {
        if self.period.is_zero() {
            return Err(format!("check {:?}: period must be > 0", self.name.0));
        }
        if self.timeout.is_zero() {
            return Err(format!("check {:?}: timeout must be > 0", self.name.0));
        }
        if self.timeout > self.period {
            return Err(format!(
                "check {:?}: timeout ({:?}) exceeds period ({:?})",
                self.name.0, self.timeout, self.period
            ));
        }
        if self.threshold == 0 {
            return Err(format!("check {:?}: threshold must be positive", self.name.0));
        }
        Ok(())
    }
}

/// Current reported status of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Up,
    Down,
    Inactive,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckStatus::Up => "up",
            CheckStatus::Down => "down",
            CheckStatus::Inactive => "inactive",
        };
        write!(f, "{s}")
    }
}

/// Durable per-task attribute bag, persisted as part of the owning task.
/// Mirrors the upstream `checkDetailsAttr` shape exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDetails {
    pub name: CheckName,
    #[serde(default)]
    pub failures: u32,
    #[serde(default)]
    pub proceed: bool,
    pub threshold: u32,
}

impl CheckDetails {
    pub fn new(name: CheckName, threshold: u32) -> Self {
        Self {
            name,
            failures: 0,
            proceed: false,
            threshold,
        }
    }

    pub fn at_threshold(&self) -> bool {
        self.failures >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_level_renders_unset_as_dash() {
        assert_eq!(CheckLevel::Unset.to_string(), "-");
        assert_eq!(CheckLevel::Alive.to_string(), "alive");
    }

    #[test]
    fn check_config_rejects_timeout_exceeding_period() {
        let cfg = CheckConfig {
            name: CheckName::new("web"),
            level: CheckLevel::Unset,
            startup: CheckStartup::Enabled,
            period: Duration::from_secs(1),
            timeout: Duration::from_secs(2),
            threshold: 3,
            probe: Probe::Http {
                url: "http://localhost".into(),
            },
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn check_config_rejects_zero_threshold() {
        let cfg = CheckConfig {
            name: CheckName::new("web"),
            level: CheckLevel::Unset,
            startup: CheckStartup::Enabled,
            period: Duration::from_secs(10),
            timeout: Duration::from_secs(1),
            threshold: 0,
            probe: Probe::Tcp {
                host: "localhost".into(),
                port: 80,
            },
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn details_at_threshold() {
        let mut details = CheckDetails::new(CheckName::new("web"), 3);
        assert!(!details.at_threshold());
        details.failures = 3;
        assert!(details.at_threshold());
    }
}
