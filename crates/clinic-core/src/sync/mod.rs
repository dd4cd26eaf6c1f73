//! Reconciliation of server-fetched patient payloads with local,
//! possibly-unsynced records.

mod policy;

pub use policy::can_be_overridden_by_server_copy;

use std::fmt;

use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{Address, Patient, PatientPayload, PhoneNumber, SyncState};

/// Which of the three dependency-ordered write batches failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    Addresses,
    Patients,
    PhoneNumbers,
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WritePhase::Addresses => "addresses",
            WritePhase::Patients => "patients",
            WritePhase::PhoneNumbers => "phone numbers",
        };
        f.write_str(name)
    }
}

/// Reconciliation errors.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// One of the three batches failed. Earlier batches may have committed;
    /// retrying the whole payload set is safe because every upsert is keyed
    /// by identifier.
    #[error("Batch write failed during the {phase} phase: {source}")]
    BatchFailed {
        phase: WritePhase,
        source: DbError,
    },

    #[error("Invalid payload {uuid}: {reason}")]
    InvalidPayload { uuid: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileResult {
    pub accepted_count: u32,
    pub rejected_uuids: Vec<String>,
}

/// Applies the conflict policy per record across a payload batch, then
/// writes the accepted subset in foreign-key order.
pub struct ReconciliationEngine<'a> {
    db: &'a mut Database,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Merge a batch of server payloads into the local store.
    ///
    /// Records whose local copy holds an unacknowledged edit are rejected
    /// and left byte-identical; the rest are written address batch first,
    /// then patients, then phone numbers, each batch one transaction. The
    /// patient batch re-checks the policy per row inside its transaction,
    /// so a local edit that lands after partitioning still wins. The whole
    /// operation is idempotent and safe to replay after a partial failure.
    pub fn reconcile(&mut self, payloads: &[PatientPayload]) -> Result<ReconcileResult, ReconcileError> {
        let mut rejected_uuids = Vec::new();
        let mut addresses: Vec<Address> = Vec::new();
        let mut patients: Vec<Patient> = Vec::new();
        let mut phone_numbers: Vec<PhoneNumber> = Vec::new();

        for payload in payloads {
            let local_state = self.db.get_sync_state(&payload.uuid)?;
            if !can_be_overridden_by_server_copy(local_state) {
                rejected_uuids.push(payload.uuid.clone());
                continue;
            }
            let profile = payload
                .to_profile()
                .map_err(|err| ReconcileError::InvalidPayload {
                    uuid: err.uuid,
                    reason: err.reason,
                })?;
            addresses.push(profile.address);
            patients.push(profile.patient);
            phone_numbers.extend(profile.phone_numbers);
        }

        self.db
            .upsert_addresses(&addresses)
            .map_err(|source| ReconcileError::BatchFailed {
                phase: WritePhase::Addresses,
                source,
            })?;

        let demoted = self
            .db
            .upsert_patients_filtered(&patients, |state| {
                can_be_overridden_by_server_copy(state)
            })
            .map_err(|source| ReconcileError::BatchFailed {
                phase: WritePhase::Patients,
                source,
            })?;
        if !demoted.is_empty() {
            // A local edit landed between partitioning and the patient
            // write; those records keep their local copy.
            tracing::warn!(count = demoted.len(), "records demoted by write-time conflict check");
        }

        let phone_numbers: Vec<PhoneNumber> = phone_numbers
            .into_iter()
            .filter(|phone| !demoted.contains(&phone.patient_uuid))
            .collect();
        self.db
            .upsert_phone_numbers(&phone_numbers)
            .map_err(|source| ReconcileError::BatchFailed {
                phase: WritePhase::PhoneNumbers,
                source,
            })?;

        let accepted_count = (patients.len() - demoted.len()) as u32;
        rejected_uuids.extend(demoted);
        tracing::debug!(
            accepted = accepted_count,
            rejected = rejected_uuids.len(),
            "reconciliation completed"
        );
        Ok(ReconcileResult {
            accepted_count,
            rejected_uuids,
        })
    }
}

/// Mark a batch of records as uploading. Part of the Pending -> InFlight ->
/// {Done, Pending} push cycle driven by the caller.
pub fn mark_sync_started(db: &Database, uuids: &[String]) -> Result<usize, DbError> {
    db.update_sync_state_for_ids(uuids, SyncState::InFlight)
}

/// Confirm a batch of records as delivered.
pub fn mark_sync_succeeded(db: &Database, uuids: &[String]) -> Result<usize, DbError> {
    db.update_sync_state_for_ids(uuids, SyncState::Done)
}

/// Return a failed upload batch to Pending so the next push retries it.
pub fn mark_sync_failed(db: &Database, uuids: &[String]) -> Result<usize, DbError> {
    db.update_sync_state_for_ids(uuids, SyncState::Pending)
}
