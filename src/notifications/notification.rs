// SPDX-License-Identifier: MPL-2.0
//! Core notification data structures.
//!
//! This module defines the `Notification` record, the `Severity` enum and
//! the `PublishOptions` accepted by the bus.

use super::id::NotificationId;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Severity level determines the default lifetime of a notification.
///
/// Parsing never fails: anything that is not a known severity becomes `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "SeverityInput")]
pub enum Severity {
    /// Operation completed successfully.
    Success,
    /// Error requiring attention (longest default lifetime).
    Error,
    /// Warning that doesn't block operation.
    Warning,
    /// Informational message, also the fallback for unrecognized input.
    #[default]
    Info,
}

impl Severity {
    /// All severities, in declaration order.
    pub const ALL: [Severity; 4] = [
        Severity::Success,
        Severity::Error,
        Severity::Warning,
        Severity::Info,
    ];

    /// Parses a severity name, normalizing anything unrecognized to `Info`.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(input))
            .unwrap_or_default()
    }

    /// Returns the lowercase name of this severity.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Severity {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl From<String> for Severity {
    fn from(input: String) -> Self {
        Self::parse(&input)
    }
}

/// Whatever shape the `kind` field arrives in at the boundary.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeverityInput {
    Name(String),
    Other(IgnoredAny),
}

impl From<SeverityInput> for Severity {
    fn from(input: SeverityInput) -> Self {
        match input {
            SeverityInput::Name(name) => Self::parse(&name),
            SeverityInput::Other(_) => Self::Info,
        }
    }
}

/// Lifecycle state of a record. Transitions exactly once, active → retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Retired,
}

/// A notification to be displayed to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Unique identifier for this notification.
    id: NotificationId,
    /// Severity level.
    kind: Severity,
    /// Opaque text payload; never interpreted here.
    message: String,
    /// Logical insertion tick, used only for display order.
    created_at: u64,
    /// Effective lifetime; `None` means persistent.
    #[serde(rename = "duration_ms", serialize_with = "serialize_duration_ms")]
    duration: Option<Duration>,
    status: Status,
}

impl Notification {
    pub(crate) fn new(
        id: NotificationId,
        kind: Severity,
        message: String,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            id,
            kind,
            message,
            created_at: 0,
            duration,
            status: Status::Active,
        }
    }

    pub(crate) fn stamp(&mut self, created_at: u64) {
        self.created_at = created_at;
    }

    pub(crate) fn retire(mut self) -> Self {
        self.status = Status::Retired;
        self
    }

    /// Returns the notification's unique ID.
    #[must_use]
    pub fn id(&self) -> NotificationId {
        self.id
    }

    /// Returns the severity level.
    #[must_use]
    pub fn kind(&self) -> Severity {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the logical insertion tick assigned by the store.
    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Returns the effective lifetime, or `None` for a persistent notification.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Returns whether this notification is only removed by an explicit dismiss.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.duration.is_none()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }
}

fn serialize_duration_ms<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let ms = duration.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
    serializer.serialize_u64(ms)
}

/// Options accepted by [`NotificationBus::publish`](super::NotificationBus::publish).
///
/// Every field is forgiving: an unknown `kind` becomes `Info`, a missing or
/// unreadable `duration_ms` falls back to the per-kind default, and a
/// non-positive one makes the notification persistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublishOptions {
    #[serde(default)]
    pub kind: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_duration_ms")]
    pub duration_ms: Option<i64>,
}

impl PublishOptions {
    /// Creates options for an `Info` notification with the default duration.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: Severity::Info,
            message: message.into(),
            duration_ms: None,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<Severity>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Sets an explicit lifetime. Zero or negative means persistent.
    #[must_use]
    pub fn duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Marks the notification as persistent.
    #[must_use]
    pub fn persistent(self) -> Self {
        self.duration_ms(0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationInput {
    Integer(i64),
    Float(f64),
    Other(IgnoredAny),
}

fn lenient_duration_ms<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match DurationInput::deserialize(deserializer)? {
        DurationInput::Integer(ms) => Some(ms),
        #[allow(clippy::cast_possible_truncation)]
        DurationInput::Float(ms) if ms.is_finite() => Some(ms as i64),
        DurationInput::Float(_) | DurationInput::Other(_) => None,
    })
}

/// Resolves a requested lifetime against a per-kind default.
///
/// `None` in the result means persistent.
pub(crate) fn effective_duration(
    requested_ms: Option<i64>,
    default: Option<Duration>,
) -> Option<Duration> {
    match requested_ms {
        None => default,
        Some(ms) if ms <= 0 => None,
        Some(ms) => Some(Duration::from_millis(ms.unsigned_abs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_severities() {
        assert_eq!(Severity::parse("success"), Severity::Success);
        assert_eq!(Severity::parse("error"), Severity::Error);
        assert_eq!(Severity::parse("warning"), Severity::Warning);
        assert_eq!(Severity::parse("info"), Severity::Info);
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Severity::parse("  ERROR "), Severity::Error);
        assert_eq!(Severity::parse("Warning"), Severity::Warning);
    }

    #[test]
    fn unknown_severity_normalizes_to_info() {
        assert_eq!(Severity::parse("critical"), Severity::Info);
        assert_eq!(Severity::parse(""), Severity::Info);
        assert_eq!(Severity::from("warn"), Severity::Info);
    }

    #[test]
    fn severity_display_matches_parse() {
        for severity in Severity::ALL {
            assert_eq!(Severity::parse(&severity.to_string()), severity);
        }
    }

    #[test]
    fn options_deserialize_with_unknown_kind() {
        let options: PublishOptions =
            toml::from_str("kind = \"fatal\"\nmessage = \"saved\"").expect("valid toml");
        assert_eq!(options.kind, Severity::Info);
        assert_eq!(options.message, "saved");
        assert_eq!(options.duration_ms, None);
    }

    #[test]
    fn options_deserialize_with_non_string_kind() {
        let options: PublishOptions =
            toml::from_str("kind = 42\nmessage = \"x\"").expect("valid toml");
        assert_eq!(options.kind, Severity::Info);
    }

    #[test]
    fn options_deserialize_without_kind_defaults_to_info() {
        let options: PublishOptions = toml::from_str("message = \"x\"").expect("valid toml");
        assert_eq!(options.kind, Severity::Info);
    }

    #[test]
    fn options_deserialize_lenient_durations() {
        let options: PublishOptions =
            toml::from_str("message = \"x\"\nduration_ms = 1500").expect("valid toml");
        assert_eq!(options.duration_ms, Some(1_500));

        let options: PublishOptions =
            toml::from_str("message = \"x\"\nduration_ms = 2.9").expect("valid toml");
        assert_eq!(options.duration_ms, Some(2));

        let options: PublishOptions =
            toml::from_str("message = \"x\"\nduration_ms = \"soon\"").expect("valid toml");
        assert_eq!(options.duration_ms, None);
    }

    #[test]
    fn options_builder_sets_fields() {
        let options = PublishOptions::new("hello").kind("error").duration_ms(250);
        assert_eq!(options.kind, Severity::Error);
        assert_eq!(options.message, "hello");
        assert_eq!(options.duration_ms, Some(250));
        assert_eq!(PublishOptions::new("x").persistent().duration_ms, Some(0));
    }

    #[test]
    fn effective_duration_rules() {
        let default = Some(Duration::from_millis(3_000));
        assert_eq!(effective_duration(None, default), default);
        assert_eq!(effective_duration(None, None), None);
        assert_eq!(effective_duration(Some(0), default), None);
        assert_eq!(effective_duration(Some(-5), default), None);
        assert_eq!(
            effective_duration(Some(100), default),
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn record_serializes_for_presentation() {
        let id = super::super::IdGenerator::with_seed(9).next();
        let notification = Notification::new(
            id,
            Severity::Warning,
            "heads up".into(),
            Some(Duration::from_millis(1_500)),
        );

        let rendered = toml::to_string(&notification).expect("serializable");
        assert!(rendered.contains(&format!("id = \"{id}\"")));
        assert!(rendered.contains("kind = \"warning\""));
        assert!(rendered.contains("duration_ms = 1500"));
        assert!(rendered.contains("status = \"active\""));
    }

    #[test]
    fn retire_flips_status_once() {
        let id = super::super::IdGenerator::new().next();
        let notification = Notification::new(id, Severity::Info, "x".into(), None);
        assert_eq!(notification.status(), Status::Active);
        assert!(notification.is_persistent());
        assert_eq!(notification.retire().status(), Status::Retired);
    }
}
