//! Record model: identity, display name and accumulated time.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RecordError;

/// Milliseconds per platform tick.
const MILLIS_PER_TICK: u64 = 50;

/// Milliseconds per second.
const MILLIS_PER_SECOND: u64 = 1_000;

/// Accumulated time with millisecond resolution.
///
/// Never negative. Arithmetic is checked and reports
/// [`RecordError::TimeOverflow`] instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpentTime(u64);

impl SpentTime {
    pub const ZERO: SpentTime = SpentTime(0);

    pub const fn from_millis(millis: u64) -> Self {
        SpentTime(millis)
    }

    pub fn from_secs(secs: u64) -> Result<Self, RecordError> {
        secs.checked_mul(MILLIS_PER_SECOND)
            .map(SpentTime)
            .ok_or(RecordError::TimeOverflow)
    }

    pub fn from_ticks(ticks: u64) -> Result<Self, RecordError> {
        ticks
            .checked_mul(MILLIS_PER_TICK)
            .map(SpentTime)
            .ok_or(RecordError::TimeOverflow)
    }

    pub fn from_duration(duration: Duration) -> Result<Self, RecordError> {
        u64::try_from(duration.as_millis())
            .map(SpentTime)
            .map_err(|_| RecordError::TimeOverflow)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub const fn as_secs(self) -> u64 {
        self.0 / MILLIS_PER_SECOND
    }

    pub const fn as_ticks(self) -> u64 {
        self.0 / MILLIS_PER_TICK
    }

    pub const fn to_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: SpentTime) -> Result<Self, RecordError> {
        self.0
            .checked_add(other.0)
            .map(SpentTime)
            .ok_or(RecordError::TimeOverflow)
    }

    /// Subtract, failing if the result would be negative.
    pub fn checked_sub(self, other: SpentTime) -> Result<Self, RecordError> {
        self.0
            .checked_sub(other.0)
            .map(SpentTime)
            .ok_or(RecordError::TimeOverflow)
    }
}

impl From<SpentTime> for Duration {
    fn from(t: SpentTime) -> Self {
        t.to_duration()
    }
}

/// Per-identity persisted entity.
///
/// Equality and hashing use the identity only, so two snapshots of the
/// same player compare equal even if their names or times differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr")]
pub struct Record {
    identity: Uuid,
    display_name: String,
    spent_time: SpentTime,
}

impl Record {
    /// Create a record with zero spent time.
    pub fn new(identity: Uuid, display_name: impl Into<String>) -> Result<Self, RecordError> {
        Self::with_time(identity, display_name, SpentTime::ZERO)
    }

    /// Create a record with the given spent time.
    pub fn with_time(
        identity: Uuid,
        display_name: impl Into<String>,
        spent_time: SpentTime,
    ) -> Result<Self, RecordError> {
        let display_name = validate_name(display_name.into())?;
        Ok(Self {
            identity,
            display_name,
            spent_time,
        })
    }

    pub fn identity(&self) -> Uuid {
        self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn spent_time(&self) -> SpentTime {
        self.spent_time
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) -> Result<(), RecordError> {
        self.display_name = validate_name(name.into())?;
        Ok(())
    }

    pub fn set_spent_time(&mut self, spent_time: SpentTime) {
        self.spent_time = spent_time;
    }

    /// Add to the accumulated time.
    pub fn add_time(&mut self, delta: SpentTime) -> Result<(), RecordError> {
        self.spent_time = self.spent_time.checked_add(delta)?;
        Ok(())
    }

    /// Whether name and time match as well as identity.
    pub fn same_state(&self, other: &Record) -> bool {
        self.identity == other.identity
            && self.display_name == other.display_name
            && self.spent_time == other.spent_time
    }
}

#[derive(Deserialize)]
struct RecordRepr {
    identity: Uuid,
    display_name: String,
    spent_time: SpentTime,
}

impl TryFrom<RecordRepr> for Record {
    type Error = RecordError;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        Record::with_time(repr.identity, repr.display_name, repr.spent_time)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

pub(crate) fn validate_name(name: String) -> Result<String, RecordError> {
    if name.trim().is_empty() {
        return Err(RecordError::BlankName);
    }
    Ok(name)
}

/// Outcome of a repository delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    Deleted,
    NotFound,
    Failed,
}

/// The record as it existed before deletion, plus the delete status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    pub record: Option<Record>,
    pub status: DeleteStatus,
}

impl DeleteResult {
    pub fn deleted(record: Record) -> Self {
        Self {
            record: Some(record),
            status: DeleteStatus::Deleted,
        }
    }

    pub fn not_found() -> Self {
        Self {
            record: None,
            status: DeleteStatus::NotFound,
        }
    }

    pub fn failed(record: Option<Record>) -> Self {
        Self {
            record,
            status: DeleteStatus::Failed,
        }
    }

    /// True only when a record was present and actually deleted.
    pub fn is_success(&self) -> bool {
        self.record.is_some() && self.status == DeleteStatus::Deleted
    }
}

/// Why a record was saved, carried on save notifications for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    /// Player joined; record loaded or created.
    PlayerJoin,
    /// Player left; record persisted.
    PlayerLeave,
    /// Operator set the time explicitly.
    SetCommand,
    /// Operator reset the time.
    ResetCommand,
    /// Periodic flush.
    ScheduledSave,
    /// Bootstrap migration seeded the record.
    Migration,
}

impl SaveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveReason::PlayerJoin => "player_join",
            SaveReason::PlayerLeave => "player_leave",
            SaveReason::SetCommand => "set_command",
            SaveReason::ResetCommand => "reset_command",
            SaveReason::ScheduledSave => "scheduled_save",
            SaveReason::Migration => "migration",
        }
    }
}

impl fmt::Display for SaveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let id = Uuid::new_v4();
        assert_eq!(Record::new(id, "   ").unwrap_err(), RecordError::BlankName);
        assert_eq!(Record::new(id, "").unwrap_err(), RecordError::BlankName);

        let mut record = Record::new(id, "Steve").unwrap();
        assert!(record.set_display_name("\t").is_err());
        assert_eq!(record.display_name(), "Steve");
    }

    #[test]
    fn test_equality_is_by_identity() {
        let id = Uuid::new_v4();
        let a = Record::with_time(id, "Steve", SpentTime::from_millis(10)).unwrap();
        let b = Record::with_time(id, "Alex", SpentTime::from_millis(99)).unwrap();
        assert_eq!(a, b);
        assert!(!a.same_state(&b));

        let c = Record::new(Uuid::new_v4(), "Steve").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_spent_time_conversions() {
        let t = SpentTime::from_secs(90).unwrap();
        assert_eq!(t.as_millis(), 90_000);
        assert_eq!(t.as_secs(), 90);
        assert_eq!(t.as_ticks(), 1_800);
        assert_eq!(SpentTime::from_ticks(20).unwrap().as_millis(), 1_000);
        assert_eq!(
            SpentTime::from_duration(Duration::from_millis(1_500)).unwrap(),
            SpentTime::from_millis(1_500)
        );
        assert_eq!(t.to_duration(), Duration::from_secs(90));
    }

    #[test]
    fn test_overflow_fails_loudly() {
        let max = SpentTime::from_millis(u64::MAX);
        assert_eq!(
            max.checked_add(SpentTime::from_millis(1)),
            Err(RecordError::TimeOverflow)
        );
        assert_eq!(
            SpentTime::ZERO.checked_sub(SpentTime::from_millis(1)),
            Err(RecordError::TimeOverflow)
        );
        assert_eq!(SpentTime::from_secs(u64::MAX), Err(RecordError::TimeOverflow));
        assert_eq!(SpentTime::from_ticks(u64::MAX), Err(RecordError::TimeOverflow));

        let mut record = Record::with_time(Uuid::new_v4(), "Steve", max).unwrap();
        assert!(record.add_time(SpentTime::from_millis(1)).is_err());
        assert_eq!(record.spent_time(), max);
    }

    #[test]
    fn test_delete_result_success() {
        let record = Record::new(Uuid::new_v4(), "Steve").unwrap();
        assert!(DeleteResult::deleted(record.clone()).is_success());
        assert!(!DeleteResult::not_found().is_success());
        assert!(!DeleteResult::failed(Some(record)).is_success());
        let orphan = DeleteResult {
            record: None,
            status: DeleteStatus::Deleted,
        };
        assert!(!orphan.is_success());
    }

    #[test]
    fn test_record_serializes_time_as_millis() {
        let id = Uuid::nil();
        let record = Record::with_time(id, "Steve", SpentTime::from_millis(1234)).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["spent_time"], 1234);
        assert_eq!(json["display_name"], "Steve");

        let back: Record = serde_json::from_value(json).unwrap();
        assert!(back.same_state(&record));
    }

    #[test]
    fn test_deserialize_rejects_blank_name() {
        let json = serde_json::json!({
            "identity": Uuid::nil(),
            "display_name": " ",
            "spent_time": 0,
        });
        assert!(serde_json::from_value::<Record>(json).is_err());
    }
}
