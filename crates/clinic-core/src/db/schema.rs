//! SQLite schema definition.

/// Complete database schema for the clinic core.
///
/// Table order mirrors the write order required by the foreign keys:
/// addresses before patients, patients before phone numbers.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patient Addresses (written first: patients reference them)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_address (
    uuid TEXT PRIMARY KEY,
    street_address TEXT,
    colony_or_village TEXT,
    zone TEXT,
    district TEXT NOT NULL,
    state TEXT NOT NULL,
    country TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient (
    uuid TEXT PRIMARY KEY,
    address_uuid TEXT NOT NULL REFERENCES patient_address(uuid),
    full_name TEXT NOT NULL,
    searchable_name TEXT NOT NULL,                -- lowercase alphanumerics of full_name
    gender TEXT NOT NULL,
    date_of_birth TEXT,                           -- ISO date, exclusive with age columns
    age_years INTEGER,
    age_recorded_at TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    deleted_at TEXT,
    deleted_reason TEXT,
    sync_state TEXT NOT NULL DEFAULT 'pending'
        CHECK (sync_state IN ('pending', 'in_flight', 'done', 'invalid')),
    CHECK (
        (date_of_birth IS NOT NULL AND age_years IS NULL AND age_recorded_at IS NULL)
        OR (date_of_birth IS NULL AND age_years IS NOT NULL AND age_recorded_at IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS idx_patient_searchable_name ON patient(searchable_name);
CREATE INDEX IF NOT EXISTS idx_patient_sync_state ON patient(sync_state);
CREATE INDEX IF NOT EXISTS idx_patient_date_of_birth ON patient(date_of_birth);

-- ============================================================================
-- Patient Phone Numbers
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_phone (
    uuid TEXT PRIMARY KEY,
    patient_uuid TEXT NOT NULL REFERENCES patient(uuid),
    number TEXT NOT NULL,
    phone_type TEXT NOT NULL DEFAULT 'mobile' CHECK (phone_type IN ('mobile', 'landline')),
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_phone_patient ON patient_phone(patient_uuid);
CREATE INDEX IF NOT EXISTS idx_phone_number ON patient_phone(number);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    const NOW: &str = "2024-01-15T10:00:00+00:00";

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn
    }

    fn insert_address(conn: &Connection, uuid: &str) {
        conn.execute(
            "INSERT INTO patient_address (uuid, district, state, created_at, updated_at)
             VALUES (?1, 'Bathinda', 'Punjab', ?2, ?2)",
            params![uuid, NOW],
        )
        .unwrap();
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_patient_requires_existing_address() {
        let conn = setup();

        let result = conn.execute(
            "INSERT INTO patient (uuid, address_uuid, full_name, searchable_name, gender,
                                  date_of_birth, created_at, updated_at, recorded_at)
             VALUES ('p1', 'missing-addr', 'Amit Kumar', 'amitkumar', 'male',
                     '1980-01-01', ?1, ?1, ?1)",
            params![NOW],
        );
        assert!(result.is_err());

        insert_address(&conn, "addr-1");
        let result = conn.execute(
            "INSERT INTO patient (uuid, address_uuid, full_name, searchable_name, gender,
                                  date_of_birth, created_at, updated_at, recorded_at)
             VALUES ('p1', 'addr-1', 'Amit Kumar', 'amitkumar', 'male',
                     '1980-01-01', ?1, ?1, ?1)",
            params![NOW],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_age_representation_is_exclusive() {
        let conn = setup();
        insert_address(&conn, "addr-1");

        // Both date of birth and age columns set: rejected.
        let result = conn.execute(
            "INSERT INTO patient (uuid, address_uuid, full_name, searchable_name, gender,
                                  date_of_birth, age_years, age_recorded_at,
                                  created_at, updated_at, recorded_at)
             VALUES ('p1', 'addr-1', 'Amit Kumar', 'amitkumar', 'male',
                     '1980-01-01', 44, ?1, ?1, ?1, ?1)",
            params![NOW],
        );
        assert!(result.is_err());

        // Neither set: rejected.
        let result = conn.execute(
            "INSERT INTO patient (uuid, address_uuid, full_name, searchable_name, gender,
                                  created_at, updated_at, recorded_at)
             VALUES ('p1', 'addr-1', 'Amit Kumar', 'amitkumar', 'male', ?1, ?1, ?1)",
            params![NOW],
        );
        assert!(result.is_err());

        // Age value with its recorded-at timestamp: accepted.
        let result = conn.execute(
            "INSERT INTO patient (uuid, address_uuid, full_name, searchable_name, gender,
                                  age_years, age_recorded_at, created_at, updated_at, recorded_at)
             VALUES ('p1', 'addr-1', 'Amit Kumar', 'amitkumar', 'male', 44, ?1, ?1, ?1, ?1)",
            params![NOW],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_sync_state_rejected() {
        let conn = setup();
        insert_address(&conn, "addr-1");

        let result = conn.execute(
            "INSERT INTO patient (uuid, address_uuid, full_name, searchable_name, gender,
                                  date_of_birth, created_at, updated_at, recorded_at, sync_state)
             VALUES ('p1', 'addr-1', 'Amit Kumar', 'amitkumar', 'male',
                     '1980-01-01', ?1, ?1, ?1, 'synced-ish')",
            params![NOW],
        );
        assert!(result.is_err());
    }
}
