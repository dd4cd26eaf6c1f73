//! Patient record model.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Per-record sync flag for offline-first operation.
///
/// Transitions: Pending → InFlight → {Done, Pending (on upload failure)}.
/// Invalid is set when the server rejects a record and stays until a later
/// successful pull replaces the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    InFlight,
    Done,
    Invalid,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::InFlight => "in_flight",
            SyncState::Done => "done",
            SyncState::Invalid => "invalid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SyncState::Pending),
            "in_flight" => Some(SyncState::InFlight),
            "done" => Some(SyncState::Done),
            "invalid" => Some(SyncState::Invalid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Transgender,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Transgender => "transgender",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "female" => Some(Gender::Female),
            "male" => Some(Gender::Male),
            "transgender" => Some(Gender::Transgender),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Active,
    Dead,
    Migrated,
    Unresponsive,
    Inactive,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Active => "active",
            PatientStatus::Dead => "dead",
            PatientStatus::Migrated => "migrated",
            PatientStatus::Unresponsive => "unresponsive",
            PatientStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PatientStatus::Active),
            "dead" => Some(PatientStatus::Dead),
            "migrated" => Some(PatientStatus::Migrated),
            "unresponsive" => Some(PatientStatus::Unresponsive),
            "inactive" => Some(PatientStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedReason {
    Duplicate,
    AccidentalRegistration,
    Unknown,
}

impl DeletedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletedReason::Duplicate => "duplicate",
            DeletedReason::AccidentalRegistration => "accidental_registration",
            DeletedReason::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "duplicate" => Some(DeletedReason::Duplicate),
            "accidental_registration" => Some(DeletedReason::AccidentalRegistration),
            "unknown" => Some(DeletedReason::Unknown),
            _ => None,
        }
    }
}

/// Age representation: exactly one of a known date of birth or an age value
/// captured at a point in time. The enum makes the exactly-one rule a type
/// invariant instead of a pair of nullable columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgeDetails {
    DateOfBirth {
        date_of_birth: NaiveDate,
    },
    Recorded {
        age_years: u32,
        /// RFC 3339 timestamp of when the age was captured.
        recorded_at: String,
    },
}

impl AgeDetails {
    /// Date of birth, estimated from the recorded age when no exact date is
    /// known. Returns `None` only for an unparseable recorded-at timestamp.
    pub fn estimated_date_of_birth(&self) -> Option<NaiveDate> {
        match self {
            AgeDetails::DateOfBirth { date_of_birth } => Some(*date_of_birth),
            AgeDetails::Recorded {
                age_years,
                recorded_at,
            } => chrono::DateTime::parse_from_rfc3339(recorded_at)
                .ok()
                .map(|dt| dt.date_naive() - Months::new(age_years * 12)),
        }
    }
}

/// Strip a display name down to the form used for matching: lowercase,
/// alphanumeric characters only.
pub fn searchable_name(full_name: &str) -> String {
    full_name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub uuid: String,
    /// Owning side of the 1:1 address relation.
    pub address_uuid: String,
    pub full_name: String,
    /// Derived from `full_name`; kept in sync by the mutating constructors.
    pub searchable_name: String,
    pub gender: Gender,
    pub age: AgeDetails,
    pub status: PatientStatus,
    pub created_at: String,
    pub updated_at: String,
    pub recorded_at: String,
    pub deleted_at: Option<String>,
    pub deleted_reason: Option<DeletedReason>,
    pub sync_state: SyncState,
}

impl Patient {
    /// Create a new locally-registered patient (sync state Pending).
    pub fn new(full_name: String, gender: Gender, age: AgeDetails, address_uuid: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let searchable = searchable_name(&full_name);
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            address_uuid,
            full_name,
            searchable_name: searchable,
            gender,
            age,
            status: PatientStatus::Active,
            created_at: now.clone(),
            updated_at: now.clone(),
            recorded_at: now,
            deleted_at: None,
            deleted_reason: None,
            sync_state: SyncState::Pending,
        }
    }

    /// Rename the patient. Recomputes the searchable name and marks the
    /// record as a pending local edit.
    pub fn rename(&mut self, full_name: String) {
        self.searchable_name = searchable_name(&full_name);
        self.full_name = full_name;
        self.updated_at = chrono::Utc::now().to_rfc3339();
        self.sync_state = SyncState::Pending;
    }

    /// Eligible for physical removal: confirmed synced and soft-deleted.
    pub fn is_purge_eligible(&self) -> bool {
        self.sync_state == SyncState::Done && self.deleted_at.is_some()
    }
}
