//! Transaction configuration types.
//!
//! - [`AccessMode`] - read/write intent of a transaction
//! - [`DatabaseName`] - default-database sentinel or a named database
//! - [`NotificationConfig`] - server notification filtering
//!   ([`NotificationSeverity`], [`NotificationClassification`])

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Read/write intent of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    /// Never encoded on the wire; the server assumes it.
    #[default]
    Write,
}

/// Target database of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DatabaseName {
    /// Whatever the server considers the home/default database. Never encoded.
    #[default]
    Default,
    /// An explicit database name. The empty string is a valid, distinct name.
    Named(String),
}

impl DatabaseName {
    pub fn named(name: impl Into<String>) -> Self {
        DatabaseName::Named(name.into())
    }

    /// The explicit name, or `None` for the default sentinel.
    pub fn name(&self) -> Option<&str> {
        match self {
            DatabaseName::Default => None,
            DatabaseName::Named(name) => Some(name),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, DatabaseName::Default)
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseName::Default => f.write_str("<default database>"),
            DatabaseName::Named(name) => f.write_str(name),
        }
    }
}

/// Minimum severity of notifications the server should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotificationSeverity {
    /// Disable notifications entirely
    Off,
    Warning,
    Information,
}

impl NotificationSeverity {
    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Warning => "WARNING",
            Self::Information => "INFORMATION",
        }
    }
}

impl fmt::Display for NotificationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OFF" => Ok(Self::Off),
            "WARNING" => Ok(Self::Warning),
            "INFORMATION" => Ok(Self::Information),
            other => Err(format!("unknown notification severity: {other}")),
        }
    }
}

/// Notification classification (also called category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotificationClassification {
    Hint,
    Unrecognized,
    Unsupported,
    Performance,
    Deprecation,
    Security,
    Topology,
    Generic,
    Schema,
}

impl NotificationClassification {
    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hint => "HINT",
            Self::Unrecognized => "UNRECOGNIZED",
            Self::Unsupported => "UNSUPPORTED",
            Self::Performance => "PERFORMANCE",
            Self::Deprecation => "DEPRECATION",
            Self::Security => "SECURITY",
            Self::Topology => "TOPOLOGY",
            Self::Generic => "GENERIC",
            Self::Schema => "SCHEMA",
        }
    }
}

impl fmt::Display for NotificationClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationClassification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HINT" => Ok(Self::Hint),
            "UNRECOGNIZED" => Ok(Self::Unrecognized),
            "UNSUPPORTED" => Ok(Self::Unsupported),
            "PERFORMANCE" => Ok(Self::Performance),
            "DEPRECATION" => Ok(Self::Deprecation),
            "SECURITY" => Ok(Self::Security),
            "TOPOLOGY" => Ok(Self::Topology),
            "GENERIC" => Ok(Self::Generic),
            "SCHEMA" => Ok(Self::Schema),
            other => Err(format!("unknown notification classification: {other}")),
        }
    }
}

/// Notification filtering requested for a transaction.
///
/// Each field is independently optional; unset fields leave the server
/// default in place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub minimum_severity: Option<NotificationSeverity>,
    pub disabled_classifications: Option<BTreeSet<NotificationClassification>>,
}

impl NotificationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with both fields set.
    pub fn with(
        minimum_severity: NotificationSeverity,
        disabled: impl IntoIterator<Item = NotificationClassification>,
    ) -> Self {
        Self::new()
            .minimum_severity(minimum_severity)
            .disabled_classifications(disabled)
    }

    /// Set the minimum severity.
    pub fn minimum_severity(mut self, severity: NotificationSeverity) -> Self {
        self.minimum_severity = Some(severity);
        self
    }

    /// Set the disabled classifications.
    pub fn disabled_classifications(
        mut self,
        disabled: impl IntoIterator<Item = NotificationClassification>,
    ) -> Self {
        self.disabled_classifications = Some(disabled.into_iter().collect());
        self
    }

    /// Turn off all notifications.
    pub fn disable_all() -> Self {
        Self::new().minimum_severity(NotificationSeverity::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(AccessMode::default(), AccessMode::Write);
        assert!(DatabaseName::default().is_default());
        assert_eq!(DatabaseName::default().name(), None);
    }

    #[test]
    fn test_empty_database_name_is_distinct() {
        let empty = DatabaseName::named("");
        assert!(!empty.is_default());
        assert_eq!(empty.name(), Some(""));
        assert_ne!(empty, DatabaseName::Default);
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for c in [
            NotificationClassification::Hint,
            NotificationClassification::Unsupported,
            NotificationClassification::Schema,
        ] {
            assert_eq!(c.as_str().parse::<NotificationClassification>(), Ok(c));
        }
        assert_eq!(
            "warning".parse::<NotificationSeverity>(),
            Ok(NotificationSeverity::Warning)
        );
        assert!("loud".parse::<NotificationSeverity>().is_err());
    }

    #[test]
    fn test_notification_config_builder() {
        let config = NotificationConfig::with(
            NotificationSeverity::Warning,
            [NotificationClassification::Unsupported],
        );
        assert_eq!(
            config.minimum_severity,
            Some(NotificationSeverity::Warning)
        );
        assert_eq!(
            config.disabled_classifications,
            Some(BTreeSet::from([NotificationClassification::Unsupported]))
        );
        assert_eq!(NotificationConfig::new().minimum_severity, None);
        assert_eq!(
            NotificationConfig::disable_all().minimum_severity,
            Some(NotificationSeverity::Off)
        );
    }
}
