//! Transaction metadata encoding.
//!
//! Translates a transaction's logical configuration into the sparse metadata
//! map carried by the transaction-start message. Every rule is independent:
//! a key is present only when its source field is set to a non-default
//! value, and absence always means "use the server default".
//!
//! | Source                  | Key                                   | Value                      |
//! |-------------------------|---------------------------------------|----------------------------|
//! | timeout                 | `tx_timeout`                          | integer ms, rounded up     |
//! | custom metadata         | `tx_metadata`                         | map, verbatim              |
//! | named database          | `db`                                  | name (may be empty)        |
//! | READ access mode        | `mode`                                | `"r"`                      |
//! | bookmarks               | `bookmarks`                           | set of tokens              |
//! | impersonated user       | `imp_user`                            | user name                  |
//! | bookmark manager        | `bookmark_manager`                    | manager id                 |
//! | minimum severity        | `notifications_minimum_severity`      | uppercase name             |
//! | disabled classifications| `notifications_disabled_categories`\* | set of uppercase names     |
//!
//! \* `notifications_disabled_classifications` when legacy naming is off.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bookmark::Bookmark;
use crate::logging::Logging;
use crate::types::{AccessMode, DatabaseName, NotificationConfig};
use crate::value::Value;

pub const TX_TIMEOUT_KEY: &str = "tx_timeout";
pub const TX_METADATA_KEY: &str = "tx_metadata";
pub const DATABASE_KEY: &str = "db";
pub const MODE_KEY: &str = "mode";
pub const MODE_READ_VALUE: &str = "r";
pub const BOOKMARKS_KEY: &str = "bookmarks";
pub const IMPERSONATED_USER_KEY: &str = "imp_user";
pub const BOOKMARK_MANAGER_KEY: &str = "bookmark_manager";
pub const NOTIFICATIONS_MINIMUM_SEVERITY_KEY: &str = "notifications_minimum_severity";
pub const NOTIFICATIONS_DISABLED_CATEGORIES_KEY: &str = "notifications_disabled_categories";
pub const NOTIFICATIONS_DISABLED_CLASSIFICATIONS_KEY: &str =
    "notifications_disabled_classifications";

/// Logger name used for the rounding notice.
pub const LOGGER_NAME: &str = "TransactionMetadataBuilder";

pub const TIMEOUT_ROUNDED_MESSAGE: &str = "The transaction timeout has been rounded up to next millisecond value since the config had a fractional millisecond value";

pub const TIMEOUT_CLAMPED_MESSAGE: &str =
    "The transaction timeout exceeds i64::MAX milliseconds and has been clamped to i64::MAX";

const NANOS_PER_MILLI: u128 = 1_000_000;

/// Wire metadata for a transaction start. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionMetadata(BTreeMap<String, Value>);

impl TransactionMetadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for TransactionMetadata {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<TransactionMetadata> for Value {
    fn from(v: TransactionMetadata) -> Self {
        Value::Map(v.0)
    }
}

/// User-facing transaction settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionConfig {
    /// Server-side transaction timeout
    pub timeout: Option<Duration>,
    /// Custom metadata attached to the transaction
    pub metadata: BTreeMap<String, Value>,
    /// User to run the transaction as
    pub impersonated_user: Option<String>,
    /// Bookmark manager the transaction's bookmarks are tracked by
    pub bookmark_manager_id: Option<String>,
    /// Notification filtering for this transaction
    pub notification_config: Option<NotificationConfig>,
}

impl TransactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transaction timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a metadata entry.
    pub fn metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace all metadata.
    pub fn metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn impersonated_user(mut self, user: impl Into<String>) -> Self {
        self.impersonated_user = Some(user.into());
        self
    }

    pub fn bookmark_manager_id(mut self, id: impl Into<String>) -> Self {
        self.bookmark_manager_id = Some(id.into());
        self
    }

    pub fn notification_config(mut self, config: NotificationConfig) -> Self {
        self.notification_config = Some(config);
        self
    }
}

/// Build the metadata map for a transaction start.
///
/// Pure apart from logging: one info line when the timeout had a
/// sub-millisecond remainder, one warning when it does not fit in `i64`
/// milliseconds. The logger is resolved from `logging` only in those cases.
pub fn build_metadata(
    timeout: Option<Duration>,
    tx_metadata: Option<&BTreeMap<String, Value>>,
    database: &DatabaseName,
    mode: AccessMode,
    bookmarks: &BTreeSet<Bookmark>,
    impersonated_user: Option<&str>,
    bookmark_manager_id: Option<&str>,
    notification_config: Option<&NotificationConfig>,
    legacy_notifications: bool,
    logging: &dyn Logging,
) -> TransactionMetadata {
    let mut result = BTreeMap::new();

    if let Some(timeout) = timeout {
        let nanos = timeout.as_nanos();
        let mut millis = nanos / NANOS_PER_MILLI;
        if nanos % NANOS_PER_MILLI != 0 {
            millis += 1;
            logging.get_log(LOGGER_NAME).info(TIMEOUT_ROUNDED_MESSAGE);
        }
        let millis = i64::try_from(millis).unwrap_or_else(|_| {
            logging.get_log(LOGGER_NAME).warn(TIMEOUT_CLAMPED_MESSAGE);
            i64::MAX
        });
        result.insert(TX_TIMEOUT_KEY.to_string(), Value::Integer(millis));
    }

    if let Some(tx_metadata) = tx_metadata.filter(|m| !m.is_empty()) {
        result.insert(
            TX_METADATA_KEY.to_string(),
            Value::Map(tx_metadata.clone()),
        );
    }

    if let Some(name) = database.name() {
        result.insert(DATABASE_KEY.to_string(), Value::from(name));
    }

    if mode == AccessMode::Read {
        result.insert(MODE_KEY.to_string(), Value::from(MODE_READ_VALUE));
    }

    if !bookmarks.is_empty() {
        result.insert(
            BOOKMARKS_KEY.to_string(),
            Value::string_set(bookmarks.iter().map(Bookmark::value)),
        );
    }

    if let Some(user) = impersonated_user {
        result.insert(IMPERSONATED_USER_KEY.to_string(), Value::from(user));
    }

    if let Some(manager_id) = bookmark_manager_id {
        result.insert(BOOKMARK_MANAGER_KEY.to_string(), Value::from(manager_id));
    }

    if let Some(config) = notification_config {
        append_notification_config(&mut result, config, legacy_notifications);
    }

    TransactionMetadata(result)
}

fn append_notification_config(
    result: &mut BTreeMap<String, Value>,
    config: &NotificationConfig,
    legacy_notifications: bool,
) {
    if let Some(severity) = config.minimum_severity {
        result.insert(
            NOTIFICATIONS_MINIMUM_SEVERITY_KEY.to_string(),
            Value::from(severity.as_str()),
        );
    }

    if let Some(disabled) = config
        .disabled_classifications
        .as_ref()
        .filter(|d| !d.is_empty())
    {
        let key = if legacy_notifications {
            NOTIFICATIONS_DISABLED_CATEGORIES_KEY
        } else {
            NOTIFICATIONS_DISABLED_CLASSIFICATIONS_KEY
        };
        result.insert(
            key.to_string(),
            Value::string_set(disabled.iter().map(|c| c.as_str())),
        );
    }
}

/// Named-field front end to [`build_metadata`].
///
/// ```
/// use std::time::Duration;
/// use boltwire_core::logging::NoLogging;
/// use boltwire_core::messaging::TransactionMetadataBuilder;
/// use boltwire_core::{AccessMode, Value};
///
/// let metadata = TransactionMetadataBuilder::new()
///     .timeout(Duration::from_secs(7))
///     .mode(AccessMode::Read)
///     .build(&NoLogging);
///
/// assert_eq!(metadata.get("tx_timeout"), Some(&Value::Integer(7000)));
/// assert_eq!(metadata.get("mode"), Some(&Value::from("r")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionMetadataBuilder {
    timeout: Option<Duration>,
    tx_metadata: Option<BTreeMap<String, Value>>,
    database: DatabaseName,
    mode: AccessMode,
    bookmarks: BTreeSet<Bookmark>,
    impersonated_user: Option<String>,
    bookmark_manager_id: Option<String>,
    notification_config: Option<NotificationConfig>,
    legacy_notifications: bool,
}

impl TransactionMetadataBuilder {
    pub fn new() -> Self {
        Self {
            legacy_notifications: true,
            ..Self::default()
        }
    }

    /// Seed every transaction-level setting from a [`TransactionConfig`].
    pub fn from_config(config: &TransactionConfig) -> Self {
        Self {
            timeout: config.timeout,
            tx_metadata: Some(config.metadata.clone()),
            impersonated_user: config.impersonated_user.clone(),
            bookmark_manager_id: config.bookmark_manager_id.clone(),
            notification_config: config.notification_config.clone(),
            ..Self::new()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn tx_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.tx_metadata = Some(metadata);
        self
    }

    pub fn database(mut self, database: DatabaseName) -> Self {
        self.database = database;
        self
    }

    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn bookmarks(mut self, bookmarks: impl IntoIterator<Item = Bookmark>) -> Self {
        self.bookmarks.extend(bookmarks);
        self
    }

    pub fn impersonated_user(mut self, user: impl Into<String>) -> Self {
        self.impersonated_user = Some(user.into());
        self
    }

    pub fn bookmark_manager_id(mut self, id: impl Into<String>) -> Self {
        self.bookmark_manager_id = Some(id.into());
        self
    }

    pub fn notification_config(mut self, config: NotificationConfig) -> Self {
        self.notification_config = Some(config);
        self
    }

    /// Choose between legacy (`true`, default) and current notification key names.
    pub fn legacy_notifications(mut self, legacy: bool) -> Self {
        self.legacy_notifications = legacy;
        self
    }

    pub fn build(&self, logging: &dyn Logging) -> TransactionMetadata {
        build_metadata(
            self.timeout,
            self.tx_metadata.as_ref(),
            &self.database,
            self.mode,
            &self.bookmarks,
            self.impersonated_user.as_deref(),
            self.bookmark_manager_id.as_deref(),
            self.notification_config.as_ref(),
            self.legacy_notifications,
            logging,
        )
    }
}
