//! Patient database operations: lookups, candidate scans, batched upserts,
//! and sync-state bookkeeping.

use rusqlite::{params, params_from_iter, OptionalExtension, Transaction};
use std::collections::HashMap;

use super::{Database, DbError, DbResult};
use crate::models::{
    AgeDetails, DateOfBirthRange, DeletedReason, Gender, Patient, PatientProfile, PatientStatus,
    SearchCandidate, SyncState,
};

const PATIENT_COLUMNS: &str = r#"
    uuid, address_uuid, full_name, searchable_name, gender,
    date_of_birth, age_years, age_recorded_at, status,
    created_at, updated_at, recorded_at, deleted_at, deleted_reason, sync_state
"#;

/// Date of birth for filtering, estimated from the recorded age when no
/// exact date is stored.
const EFFECTIVE_DOB: &str =
    "COALESCE(date_of_birth, date(age_recorded_at, '-' || age_years || ' years'))";

impl Database {
    /// Upsert a batch of patients in one transaction. Idempotent by uuid.
    pub fn upsert_patients(&mut self, patients: &[Patient]) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        for patient in patients {
            upsert_patient_tx(&tx, patient)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Upsert a batch of patients, re-checking each record's stored sync
    /// state inside the transaction and writing only those `allow` admits.
    /// Returns the uuids that were skipped.
    ///
    /// This is the write-time guard against a local edit landing between a
    /// caller's earlier state check and the commit.
    pub fn upsert_patients_filtered(
        &mut self,
        patients: &[Patient],
        allow: impl Fn(Option<SyncState>) -> bool,
    ) -> DbResult<Vec<String>> {
        let tx = self.conn.transaction()?;
        let mut skipped = Vec::new();
        for patient in patients {
            let current = sync_state_tx(&tx, &patient.uuid)?;
            if allow(current) {
                upsert_patient_tx(&tx, patient)?;
            } else {
                skipped.push(patient.uuid.clone());
            }
        }
        tx.commit()?;
        Ok(skipped)
    }

    /// Get a patient by uuid.
    pub fn get_patient(&self, uuid: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patient WHERE uuid = ?"),
                [uuid],
                map_patient_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Sync state of the local copy, if one exists.
    pub fn get_sync_state(&self, uuid: &str) -> DbResult<Option<SyncState>> {
        let state: Option<String> = self
            .conn
            .query_row("SELECT sync_state FROM patient WHERE uuid = ?", [uuid], |row| {
                row.get(0)
            })
            .optional()?;
        state
            .map(|s| {
                SyncState::parse(&s)
                    .ok_or_else(|| DbError::Constraint(format!("Unknown sync state: {}", s)))
            })
            .transpose()
    }

    /// Move every record in `from` to `to` (push-side bulk transition).
    pub fn update_sync_state(&self, from: SyncState, to: SyncState) -> DbResult<usize> {
        let updated = self.conn.execute(
            "UPDATE patient SET sync_state = ?2 WHERE sync_state = ?1",
            [from.as_str(), to.as_str()],
        )?;
        Ok(updated)
    }

    /// Move the given records to `to`.
    pub fn update_sync_state_for_ids(&self, uuids: &[String], to: SyncState) -> DbResult<usize> {
        if uuids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; uuids.len()].join(",");
        let sql = format!(
            "UPDATE patient SET sync_state = '{}' WHERE uuid IN ({placeholders})",
            to.as_str()
        );
        let updated = self
            .conn
            .execute(&sql, params_from_iter(uuids.iter()))?;
        Ok(updated)
    }

    /// Number of records awaiting upload.
    pub fn pending_sync_count(&self) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM patient WHERE sync_state = 'pending'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Batch of pending records for the uploader, oldest edits first.
    pub fn pending_sync_records(&self, limit: u32, offset: u32) -> DbResult<Vec<PatientProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid FROM patient WHERE sync_state = 'pending'
             ORDER BY updated_at, uuid LIMIT ? OFFSET ?",
        )?;
        let uuids: Vec<String> = stmt
            .query_map(params![limit, offset], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        self.hydrate(&uuids)
    }

    /// All scoring candidates, in store (insertion) order. Excludes
    /// soft-deleted records; optionally restricted to a date-of-birth window.
    pub fn enumerate_candidates(
        &self,
        dob_range: Option<&DateOfBirthRange>,
    ) -> DbResult<Vec<SearchCandidate>> {
        let base = "SELECT uuid, full_name FROM patient WHERE deleted_at IS NULL";
        let rows = match dob_range {
            Some(range) => {
                let sql =
                    format!("{base} AND {EFFECTIVE_DOB} BETWEEN ?1 AND ?2 ORDER BY rowid");
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    [range.lower.to_string(), range.upper.to_string()],
                    |row| {
                        Ok(SearchCandidate {
                            uuid: row.get(0)?,
                            full_name: row.get(1)?,
                        })
                    },
                )?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("{base} ORDER BY rowid");
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| {
                    Ok(SearchCandidate {
                        uuid: row.get(0)?,
                        full_name: row.get(1)?,
                    })
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    /// Precise search: prefix match on the searchable name, or phone-digit
    /// prefix when the query is purely numeric. Results come back in the
    /// store's natural (name) order.
    pub fn exact_search(
        &self,
        normalized_query: &str,
        dob_range: Option<&DateOfBirthRange>,
    ) -> DbResult<Vec<String>> {
        if normalized_query.is_empty() {
            return Ok(Vec::new());
        }

        let is_numeric = normalized_query.bytes().all(|b| b.is_ascii_digit());
        let dob_filter = match dob_range {
            Some(_) => format!(" AND {EFFECTIVE_DOB} BETWEEN ?2 AND ?3"),
            None => String::new(),
        };

        let sql = if is_numeric {
            format!(
                "SELECT p.uuid FROM patient p
                 JOIN patient_phone pp ON pp.patient_uuid = p.uuid
                 WHERE p.deleted_at IS NULL AND pp.deleted_at IS NULL
                   AND pp.number LIKE ?1 || '%'{dob_filter}
                 GROUP BY p.uuid
                 ORDER BY p.full_name"
            )
        } else {
            format!(
                "SELECT uuid FROM patient
                 WHERE deleted_at IS NULL AND searchable_name LIKE ?1 || '%'{dob_filter}
                 ORDER BY full_name"
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let uuids: Vec<String> = match dob_range {
            Some(range) => stmt
                .query_map(
                    params![
                        normalized_query,
                        range.lower.to_string(),
                        range.upper.to_string()
                    ],
                    |row| row.get(0),
                )?
                .collect::<Result<_, _>>()?,
            None => stmt
                .query_map([normalized_query], |row| row.get(0))?
                .collect::<Result<_, _>>()?,
        };
        Ok(uuids)
    }

    /// Hydrate identifiers into full profiles, preserving the input order.
    /// Unknown uuids are skipped; a patient without its address row is a
    /// corrupt store and surfaces as an error.
    pub fn hydrate(&self, uuids: &[String]) -> DbResult<Vec<PatientProfile>> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; uuids.len()].join(",");
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patient WHERE uuid IN ({placeholders})");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(uuids.iter()), map_patient_row)?;

        let mut by_uuid: HashMap<String, Patient> = HashMap::new();
        for row in rows {
            let patient = Patient::try_from(row?)?;
            by_uuid.insert(patient.uuid.clone(), patient);
        }

        let mut profiles = Vec::with_capacity(by_uuid.len());
        for uuid in uuids {
            let Some(patient) = by_uuid.remove(uuid) else {
                continue;
            };
            let address = self
                .get_address(&patient.address_uuid)?
                .ok_or_else(|| DbError::NotFound(format!("address for patient {}", uuid)))?;
            let phone_numbers = self.phone_numbers_for_patient(uuid)?;
            profiles.push(PatientProfile {
                patient,
                address,
                phone_numbers,
            });
        }
        Ok(profiles)
    }

    /// Persist a local edit. Bumps `updated_at` and flips the record back to
    /// Pending so the next push picks it up.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let (date_of_birth, age_years, age_recorded_at) = age_columns(&patient.age);
        let updated = self.conn.execute(
            r#"
            UPDATE patient SET
                address_uuid = ?2,
                full_name = ?3,
                searchable_name = ?4,
                gender = ?5,
                date_of_birth = ?6,
                age_years = ?7,
                age_recorded_at = ?8,
                status = ?9,
                updated_at = ?10,
                deleted_at = ?11,
                deleted_reason = ?12,
                sync_state = 'pending'
            WHERE uuid = ?1
            "#,
            params![
                patient.uuid,
                patient.address_uuid,
                patient.full_name,
                patient.searchable_name,
                patient.gender.as_str(),
                date_of_birth,
                age_years,
                age_recorded_at,
                patient.status.as_str(),
                chrono::Utc::now().to_rfc3339(),
                patient.deleted_at,
                patient.deleted_reason.map(|r| r.as_str()),
            ],
        )?;
        Ok(updated > 0)
    }

    /// Change a patient's status (dead, migrated, ...) as a local edit.
    pub fn update_patient_status(&self, uuid: &str, status: PatientStatus) -> DbResult<bool> {
        let updated = self.conn.execute(
            "UPDATE patient SET status = ?2, updated_at = ?3, sync_state = 'pending'
             WHERE uuid = ?1",
            params![uuid, status.as_str(), chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(updated > 0)
    }

    /// Soft-delete a patient with a reason. The row stays until it is both
    /// synced and deleted, then becomes purge-eligible.
    pub fn soft_delete_patient(&self, uuid: &str, reason: DeletedReason) -> DbResult<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE patient SET deleted_at = ?2, deleted_reason = ?3, updated_at = ?2,
                                sync_state = 'pending'
             WHERE uuid = ?1",
            params![uuid, now, reason.as_str()],
        )?;
        Ok(updated > 0)
    }

    /// Physically remove records that are both confirmed synced and
    /// soft-deleted, with their phone numbers and orphaned addresses.
    /// Returns the number of patients purged.
    pub fn purge_soft_deleted(&mut self) -> DbResult<usize> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM patient_phone WHERE patient_uuid IN
                 (SELECT uuid FROM patient WHERE sync_state = 'done' AND deleted_at IS NOT NULL)",
            [],
        )?;
        let purged = tx.execute(
            "DELETE FROM patient WHERE sync_state = 'done' AND deleted_at IS NOT NULL",
            [],
        )?;
        tx.execute(
            "DELETE FROM patient_address WHERE uuid NOT IN (SELECT address_uuid FROM patient)",
            [],
        )?;
        tx.commit()?;
        Ok(purged)
    }
}

fn upsert_patient_tx(tx: &Transaction<'_>, patient: &Patient) -> DbResult<()> {
    let (date_of_birth, age_years, age_recorded_at) = age_columns(&patient.age);
    tx.execute(
        r#"
        INSERT INTO patient (
            uuid, address_uuid, full_name, searchable_name, gender,
            date_of_birth, age_years, age_recorded_at, status,
            created_at, updated_at, recorded_at, deleted_at, deleted_reason, sync_state
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(uuid) DO UPDATE SET
            address_uuid = excluded.address_uuid,
            full_name = excluded.full_name,
            searchable_name = excluded.searchable_name,
            gender = excluded.gender,
            date_of_birth = excluded.date_of_birth,
            age_years = excluded.age_years,
            age_recorded_at = excluded.age_recorded_at,
            status = excluded.status,
            updated_at = excluded.updated_at,
            recorded_at = excluded.recorded_at,
            deleted_at = excluded.deleted_at,
            deleted_reason = excluded.deleted_reason,
            sync_state = excluded.sync_state
        "#,
        params![
            patient.uuid,
            patient.address_uuid,
            patient.full_name,
            patient.searchable_name,
            patient.gender.as_str(),
            date_of_birth,
            age_years,
            age_recorded_at,
            patient.status.as_str(),
            patient.created_at,
            patient.updated_at,
            patient.recorded_at,
            patient.deleted_at,
            patient.deleted_reason.map(|r| r.as_str()),
            patient.sync_state.as_str(),
        ],
    )?;
    Ok(())
}

fn sync_state_tx(tx: &Transaction<'_>, uuid: &str) -> DbResult<Option<SyncState>> {
    let state: Option<String> = tx
        .query_row("SELECT sync_state FROM patient WHERE uuid = ?", [uuid], |row| {
            row.get(0)
        })
        .optional()?;
    state
        .map(|s| {
            SyncState::parse(&s)
                .ok_or_else(|| DbError::Constraint(format!("Unknown sync state: {}", s)))
        })
        .transpose()
}

fn age_columns(age: &AgeDetails) -> (Option<String>, Option<u32>, Option<String>) {
    match age {
        AgeDetails::DateOfBirth { date_of_birth } => (Some(date_of_birth.to_string()), None, None),
        AgeDetails::Recorded {
            age_years,
            recorded_at,
        } => (None, Some(*age_years), Some(recorded_at.clone())),
    }
}

/// Intermediate row struct for database mapping.
pub struct PatientRow {
    uuid: String,
    address_uuid: String,
    full_name: String,
    searchable_name: String,
    gender: String,
    date_of_birth: Option<String>,
    age_years: Option<u32>,
    age_recorded_at: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
    recorded_at: String,
    deleted_at: Option<String>,
    deleted_reason: Option<String>,
    sync_state: String,
}

fn map_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        uuid: row.get(0)?,
        address_uuid: row.get(1)?,
        full_name: row.get(2)?,
        searchable_name: row.get(3)?,
        gender: row.get(4)?,
        date_of_birth: row.get(5)?,
        age_years: row.get(6)?,
        age_recorded_at: row.get(7)?,
        status: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        recorded_at: row.get(11)?,
        deleted_at: row.get(12)?,
        deleted_reason: row.get(13)?,
        sync_state: row.get(14)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = Gender::parse(&row.gender)
            .ok_or_else(|| DbError::Constraint(format!("Unknown gender: {}", row.gender)))?;
        let status = PatientStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown status: {}", row.status)))?;
        let sync_state = SyncState::parse(&row.sync_state).ok_or_else(|| {
            DbError::Constraint(format!("Unknown sync state: {}", row.sync_state))
        })?;
        let deleted_reason = row
            .deleted_reason
            .map(|r| {
                DeletedReason::parse(&r)
                    .ok_or_else(|| DbError::Constraint(format!("Unknown deleted reason: {}", r)))
            })
            .transpose()?;

        let age = match (row.date_of_birth, row.age_years, row.age_recorded_at) {
            (Some(dob), None, None) => AgeDetails::DateOfBirth {
                date_of_birth: dob.parse().map_err(|_| {
                    DbError::Constraint(format!("Unparseable date of birth: {}", dob))
                })?,
            },
            (None, Some(age_years), Some(recorded_at)) => AgeDetails::Recorded {
                age_years,
                recorded_at,
            },
            _ => {
                return Err(DbError::Constraint(format!(
                    "Patient {} has an inconsistent age representation",
                    row.uuid
                )))
            }
        };

        Ok(Patient {
            uuid: row.uuid,
            address_uuid: row.address_uuid,
            full_name: row.full_name,
            searchable_name: row.searchable_name,
            gender,
            age,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            recorded_at: row.recorded_at,
            deleted_at: row.deleted_at,
            deleted_reason,
            sync_state,
        })
    }
}
