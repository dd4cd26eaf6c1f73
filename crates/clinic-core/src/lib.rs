//! Clinic Core Library
//!
//! Offline-first patient search and reconciliation engine for clinic apps.
//!
//! # Architecture
//!
//! ```text
//!                       search(query, assumed_age)
//!                                  │
//!                        AgeWindowCalculator (optional)
//!                                  │
//!                  ┌───────────────┴───────────────┐
//!                  │                               │
//!                  ▼                               ▼
//!            ExactSearch                   FuzzyNameSearch
//!        (name/phone prefix)        (weighted edit distance,
//!                  │                 sharded across threads)
//!                  └───────────────┬───────────────┘
//!                                  ▼
//!                          SearchResultMerger
//!                      (fuzzy rank first, dedup)
//!
//!      server pull ──▶ ReconciliationEngine ──▶ batched FK-ordered upserts
//!                             │
//!                    SyncConflictPolicy
//!              (Pending/InFlight local copy wins)
//! ```
//!
//! # Core Principle
//!
//! **A local edit the server has not acknowledged is never overwritten.**
//! Server copies only replace local records in sync state Done or Invalid.
//!
//! # Modules
//!
//! - [`db`]: SQLite storage layer
//! - [`models`]: Domain types (Patient, Address, PhoneNumber, payloads, drafts)
//! - [`search`]: Exact + fuzzy patient search
//! - [`sync`]: Conflict policy and reconciliation

pub mod db;
pub mod models;
pub mod search;
pub mod sync;

// Re-export commonly used types
pub use db::Database;
pub use models::{
    Address, AgeDetails, DeletedReason, Gender, Patient, PatientDraft, PatientPayload,
    PatientProfile, PatientStatus, PhoneNumber, PhoneType, SyncState,
};
pub use search::{CancelToken, EditCosts, SearchConfig, SearchEngine};
pub use sync::{ReconcileResult, ReconciliationEngine};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicCoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Search error: {0}")]
    SearchFailed(String),

    #[error("Sync error: {0}")]
    SyncFailed(String),
}

impl From<db::DbError> for ClinicCoreError {
    fn from(e: db::DbError) -> Self {
        ClinicCoreError::DatabaseError(e.to_string())
    }
}

impl From<search::SearchError> for ClinicCoreError {
    fn from(e: search::SearchError) -> Self {
        match e {
            search::SearchError::InvalidConfig(msg) => ClinicCoreError::InvalidInput(msg),
            other => ClinicCoreError::SearchFailed(other.to_string()),
        }
    }
}

impl From<sync::ReconcileError> for ClinicCoreError {
    fn from(e: sync::ReconcileError) -> Self {
        ClinicCoreError::SyncFailed(e.to_string())
    }
}

impl From<serde_json::Error> for ClinicCoreError {
    fn from(e: serde_json::Error) -> Self {
        ClinicCoreError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicCoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicCoreError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

impl From<Vec<models::DraftValidationError>> for ClinicCoreError {
    fn from(errors: Vec<models::DraftValidationError>) -> Self {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ClinicCoreError::InvalidInput(messages.join("; "))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ClinicCore>, ClinicCoreError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(ClinicCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClinicCore>, ClinicCoreError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ClinicCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a new patient from a completed entry draft.
    pub fn register_patient(
        &self,
        draft: FfiPatientDraft,
    ) -> Result<FfiPatientProfile, ClinicCoreError> {
        let draft: PatientDraft = draft.try_into()?;
        let profile = draft.to_profile()?;

        let mut db = self.db.lock()?;
        db.upsert_addresses(std::slice::from_ref(&profile.address))?;
        db.upsert_patients(std::slice::from_ref(&profile.patient))?;
        db.upsert_phone_numbers(&profile.phone_numbers)?;
        Ok(profile.into())
    }

    /// Get a patient profile by uuid.
    pub fn get_patient(&self, uuid: String) -> Result<Option<FfiPatientProfile>, ClinicCoreError> {
        let db = self.db.lock()?;
        let mut profiles = db.hydrate(std::slice::from_ref(&uuid))?;
        Ok(profiles.pop().map(|p| p.into()))
    }

    /// Search patients by name or phone digits, best matches first.
    pub fn search(
        &self,
        query: String,
        assumed_age: Option<u32>,
        fuzzy_enabled: bool,
    ) -> Result<Vec<FfiPatientProfile>, ClinicCoreError> {
        let db = self.db.lock()?;
        let engine = SearchEngine::new(&db);
        let profiles = engine.search(&query, assumed_age, fuzzy_enabled, &CancelToken::new())?;
        Ok(profiles.into_iter().map(|p| p.into()).collect())
    }

    /// Mark a patient as dead (local edit, queued for the next push).
    pub fn mark_patient_dead(&self, uuid: String) -> Result<(), ClinicCoreError> {
        let db = self.db.lock()?;
        if !db.update_patient_status(&uuid, PatientStatus::Dead)? {
            return Err(ClinicCoreError::NotFound(uuid));
        }
        Ok(())
    }

    /// Soft-delete a patient with a reason.
    pub fn soft_delete_patient(&self, uuid: String, reason: String) -> Result<(), ClinicCoreError> {
        let reason = DeletedReason::parse(&reason)
            .ok_or_else(|| ClinicCoreError::InvalidInput(format!("Unknown deletion reason: {}", reason)))?;
        let db = self.db.lock()?;
        if !db.soft_delete_patient(&uuid, reason)? {
            return Err(ClinicCoreError::NotFound(uuid));
        }
        Ok(())
    }

    // =========================================================================
    // Sync Operations
    // =========================================================================

    /// Merge a batch of server payloads into the local store.
    pub fn reconcile(
        &self,
        payloads: Vec<FfiPatientPayload>,
    ) -> Result<FfiReconcileResult, ClinicCoreError> {
        let payloads: Vec<PatientPayload> = payloads
            .into_iter()
            .map(PatientPayload::try_from)
            .collect::<Result<_, _>>()?;
        let mut db = self.db.lock()?;
        let result = ReconciliationEngine::new(&mut db).reconcile(&payloads)?;
        Ok(result.into())
    }

    /// Merge a JSON-encoded batch of server payloads into the local store.
    pub fn reconcile_json(&self, payloads_json: String) -> Result<FfiReconcileResult, ClinicCoreError> {
        let payloads: Vec<PatientPayload> = serde_json::from_str(&payloads_json)?;
        let mut db = self.db.lock()?;
        let result = ReconciliationEngine::new(&mut db).reconcile(&payloads)?;
        Ok(result.into())
    }

    /// Number of records with unsynced local edits.
    pub fn pending_sync_count(&self) -> Result<u32, ClinicCoreError> {
        let db = self.db.lock()?;
        Ok(db.pending_sync_count()?)
    }

    /// Batch of pending records for the uploader.
    pub fn pending_sync_records(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FfiPatientProfile>, ClinicCoreError> {
        let db = self.db.lock()?;
        let profiles = db.pending_sync_records(limit, offset)?;
        Ok(profiles.into_iter().map(|p| p.into()).collect())
    }

    /// Mark records as uploading (Pending -> InFlight).
    pub fn mark_sync_started(&self, uuids: Vec<String>) -> Result<u32, ClinicCoreError> {
        let db = self.db.lock()?;
        Ok(sync::mark_sync_started(&db, &uuids)? as u32)
    }

    /// Confirm records as delivered (InFlight -> Done).
    pub fn mark_sync_succeeded(&self, uuids: Vec<String>) -> Result<u32, ClinicCoreError> {
        let db = self.db.lock()?;
        Ok(sync::mark_sync_succeeded(&db, &uuids)? as u32)
    }

    /// Return a failed upload batch to Pending for retry.
    pub fn mark_sync_failed(&self, uuids: Vec<String>) -> Result<u32, ClinicCoreError> {
        let db = self.db.lock()?;
        Ok(sync::mark_sync_failed(&db, &uuids)? as u32)
    }

    /// Physically remove records that are both synced and soft-deleted.
    pub fn purge_deleted_records(&self) -> Result<u32, ClinicCoreError> {
        let mut db = self.db.lock()?;
        Ok(db.purge_soft_deleted()? as u32)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient entry draft.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientDraft {
    pub full_name: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub age_years: Option<u32>,
    pub street_address: Option<String>,
    pub colony_or_village: Option<String>,
    pub zone: Option<String>,
    pub district: String,
    pub state: String,
    pub country: Option<String>,
    pub phone_number: Option<String>,
    pub phone_type: Option<String>,
}

impl TryFrom<FfiPatientDraft> for PatientDraft {
    type Error = ClinicCoreError;

    fn try_from(draft: FfiPatientDraft) -> Result<Self, Self::Error> {
        let gender = draft
            .gender
            .map(|g| {
                Gender::parse(&g)
                    .ok_or_else(|| ClinicCoreError::InvalidInput(format!("Unknown gender: {}", g)))
            })
            .transpose()?;
        let date_of_birth = draft
            .date_of_birth
            .map(|d| {
                d.parse().map_err(|_| {
                    ClinicCoreError::InvalidInput(format!("Unparseable date of birth: {}", d))
                })
            })
            .transpose()?;
        let phone_type = draft
            .phone_type
            .map(|t| {
                PhoneType::parse(&t).ok_or_else(|| {
                    ClinicCoreError::InvalidInput(format!("Unknown phone type: {}", t))
                })
            })
            .transpose()?
            .unwrap_or(PhoneType::Mobile);
        let phone_number = draft.phone_number.map(|number| models::DraftPhoneNumber {
            number,
            phone_type,
            active: true,
        });

        Ok(PatientDraft {
            full_name: draft.full_name,
            gender,
            date_of_birth,
            age_years: draft.age_years,
            street_address: draft.street_address,
            colony_or_village: draft.colony_or_village,
            zone: draft.zone,
            district: draft.district,
            state: draft.state,
            country: draft.country,
            phone_number,
        })
    }
}

/// FFI-safe patient record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub uuid: String,
    pub address_uuid: String,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub age_years: Option<u32>,
    pub age_recorded_at: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub recorded_at: String,
    pub deleted_at: Option<String>,
    pub deleted_reason: Option<String>,
    pub sync_state: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        let (date_of_birth, age_years, age_recorded_at) = match &patient.age {
            AgeDetails::DateOfBirth { date_of_birth } => {
                (Some(date_of_birth.to_string()), None, None)
            }
            AgeDetails::Recorded {
                age_years,
                recorded_at,
            } => (None, Some(*age_years), Some(recorded_at.clone())),
        };
        Self {
            uuid: patient.uuid,
            address_uuid: patient.address_uuid,
            full_name: patient.full_name,
            gender: patient.gender.as_str().to_string(),
            date_of_birth,
            age_years,
            age_recorded_at,
            status: patient.status.as_str().to_string(),
            created_at: patient.created_at,
            updated_at: patient.updated_at,
            recorded_at: patient.recorded_at,
            deleted_at: patient.deleted_at,
            deleted_reason: patient.deleted_reason.map(|r| r.as_str().to_string()),
            sync_state: patient.sync_state.as_str().to_string(),
        }
    }
}

/// FFI-safe address.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAddress {
    pub uuid: String,
    pub street_address: Option<String>,
    pub colony_or_village: Option<String>,
    pub zone: Option<String>,
    pub district: String,
    pub state: String,
    pub country: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl From<Address> for FfiAddress {
    fn from(address: Address) -> Self {
        Self {
            uuid: address.uuid,
            street_address: address.street_address,
            colony_or_village: address.colony_or_village,
            zone: address.zone,
            district: address.district,
            state: address.state,
            country: address.country,
            created_at: address.created_at,
            updated_at: address.updated_at,
            deleted_at: address.deleted_at,
        }
    }
}

/// FFI-safe phone number.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPhoneNumber {
    pub uuid: String,
    pub patient_uuid: String,
    pub number: String,
    pub phone_type: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl From<PhoneNumber> for FfiPhoneNumber {
    fn from(phone: PhoneNumber) -> Self {
        Self {
            uuid: phone.uuid,
            patient_uuid: phone.patient_uuid,
            number: phone.number,
            phone_type: phone.phone_type.as_str().to_string(),
            active: phone.active,
            created_at: phone.created_at,
            updated_at: phone.updated_at,
            deleted_at: phone.deleted_at,
        }
    }
}

/// FFI-safe full patient profile.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientProfile {
    pub patient: FfiPatient,
    pub address: FfiAddress,
    pub phone_numbers: Vec<FfiPhoneNumber>,
}

impl From<PatientProfile> for FfiPatientProfile {
    fn from(profile: PatientProfile) -> Self {
        Self {
            patient: profile.patient.into(),
            address: profile.address.into(),
            phone_numbers: profile.phone_numbers.into_iter().map(|p| p.into()).collect(),
        }
    }
}

/// FFI-safe server address payload.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAddressPayload {
    pub uuid: String,
    pub street_address: Option<String>,
    pub colony_or_village: Option<String>,
    pub zone: Option<String>,
    pub district: String,
    pub state: String,
    pub country: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// FFI-safe server phone number payload.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPhoneNumberPayload {
    pub uuid: String,
    pub number: String,
    pub phone_type: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// FFI-safe server patient payload.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientPayload {
    pub uuid: String,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub age_years: Option<u32>,
    pub age_recorded_at: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub recorded_at: String,
    pub deleted_at: Option<String>,
    pub deleted_reason: Option<String>,
    pub address: FfiAddressPayload,
    pub phone_numbers: Vec<FfiPhoneNumberPayload>,
}

impl TryFrom<FfiPatientPayload> for PatientPayload {
    type Error = ClinicCoreError;

    fn try_from(payload: FfiPatientPayload) -> Result<Self, Self::Error> {
        let gender = Gender::parse(&payload.gender).ok_or_else(|| {
            ClinicCoreError::InvalidInput(format!("Unknown gender: {}", payload.gender))
        })?;
        let status = PatientStatus::parse(&payload.status).ok_or_else(|| {
            ClinicCoreError::InvalidInput(format!("Unknown status: {}", payload.status))
        })?;
        let deleted_reason = payload
            .deleted_reason
            .map(|r| {
                DeletedReason::parse(&r).ok_or_else(|| {
                    ClinicCoreError::InvalidInput(format!("Unknown deletion reason: {}", r))
                })
            })
            .transpose()?;
        let date_of_birth = payload
            .date_of_birth
            .map(|d| {
                d.parse().map_err(|_| {
                    ClinicCoreError::InvalidInput(format!("Unparseable date of birth: {}", d))
                })
            })
            .transpose()?;
        let phone_numbers = payload
            .phone_numbers
            .into_iter()
            .map(|phone| {
                let phone_type = PhoneType::parse(&phone.phone_type).ok_or_else(|| {
                    ClinicCoreError::InvalidInput(format!("Unknown phone type: {}", phone.phone_type))
                })?;
                Ok(models::PhoneNumberPayload {
                    uuid: phone.uuid,
                    number: phone.number,
                    phone_type,
                    active: phone.active,
                    created_at: phone.created_at,
                    updated_at: phone.updated_at,
                    deleted_at: phone.deleted_at,
                })
            })
            .collect::<Result<_, ClinicCoreError>>()?;

        Ok(PatientPayload {
            uuid: payload.uuid,
            full_name: payload.full_name,
            gender,
            date_of_birth,
            age_years: payload.age_years,
            age_recorded_at: payload.age_recorded_at,
            status,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            recorded_at: payload.recorded_at,
            deleted_at: payload.deleted_at,
            deleted_reason,
            address: models::AddressPayload {
                uuid: payload.address.uuid,
                street_address: payload.address.street_address,
                colony_or_village: payload.address.colony_or_village,
                zone: payload.address.zone,
                district: payload.address.district,
                state: payload.address.state,
                country: payload.address.country,
                created_at: payload.address.created_at,
                updated_at: payload.address.updated_at,
                deleted_at: payload.address.deleted_at,
            },
            phone_numbers,
        })
    }
}

/// FFI-safe reconciliation outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReconcileResult {
    pub accepted_count: u32,
    pub rejected_uuids: Vec<String>,
}

impl From<ReconcileResult> for FfiReconcileResult {
    fn from(result: ReconcileResult) -> Self {
        Self {
            accepted_count: result.accepted_count,
            rejected_uuids: result.rejected_uuids,
        }
    }
}
