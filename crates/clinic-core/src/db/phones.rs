//! Patient phone number database operations.

use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::{PhoneNumber, PhoneType};

impl Database {
    /// Upsert a batch of phone numbers in one transaction. Idempotent by uuid.
    pub fn upsert_phone_numbers(&mut self, phones: &[PhoneNumber]) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        for phone in phones {
            tx.execute(
                r#"
                INSERT INTO patient_phone (
                    uuid, patient_uuid, number, phone_type, active,
                    created_at, updated_at, deleted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(uuid) DO UPDATE SET
                    patient_uuid = excluded.patient_uuid,
                    number = excluded.number,
                    phone_type = excluded.phone_type,
                    active = excluded.active,
                    updated_at = excluded.updated_at,
                    deleted_at = excluded.deleted_at
                "#,
                params![
                    phone.uuid,
                    phone.patient_uuid,
                    phone.number,
                    phone.phone_type.as_str(),
                    phone.active,
                    phone.created_at,
                    phone.updated_at,
                    phone.deleted_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// All phone numbers attached to a patient, oldest first.
    pub fn phone_numbers_for_patient(&self, patient_uuid: &str) -> DbResult<Vec<PhoneNumber>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT uuid, patient_uuid, number, phone_type, active,
                   created_at, updated_at, deleted_at
            FROM patient_phone
            WHERE patient_uuid = ? AND deleted_at IS NULL
            ORDER BY created_at, uuid
            "#,
        )?;
        let rows = stmt.query_map([patient_uuid], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut phones = Vec::new();
        for row in rows {
            let (uuid, patient_uuid, number, phone_type, active, created_at, updated_at, deleted_at) =
                row?;
            let phone_type = PhoneType::parse(&phone_type)
                .ok_or_else(|| DbError::Constraint(format!("Unknown phone type: {}", phone_type)))?;
            phones.push(PhoneNumber {
                uuid,
                patient_uuid,
                number,
                phone_type,
                active,
                created_at,
                updated_at,
                deleted_at,
            });
        }
        Ok(phones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, AgeDetails, Gender, Patient};

    fn setup_patient(db: &mut Database) -> Patient {
        let address = Address::new("Bathinda".into(), "Punjab".into());
        let patient = Patient::new(
            "Amit Kumar".into(),
            Gender::Male,
            AgeDetails::DateOfBirth {
                date_of_birth: "1980-06-15".parse().unwrap(),
            },
            address.uuid.clone(),
        );
        db.upsert_addresses(&[address]).unwrap();
        db.upsert_patients(std::slice::from_ref(&patient)).unwrap();
        patient
    }

    #[test]
    fn test_upsert_and_list_for_patient() {
        let mut db = Database::open_in_memory().unwrap();
        let patient = setup_patient(&mut db);

        let phone = PhoneNumber::new(patient.uuid.clone(), "9876543210".into(), PhoneType::Mobile);
        db.upsert_phone_numbers(std::slice::from_ref(&phone)).unwrap();

        let phones = db.phone_numbers_for_patient(&patient.uuid).unwrap();
        assert_eq!(phones, vec![phone]);
    }

    #[test]
    fn test_soft_deleted_numbers_are_hidden() {
        let mut db = Database::open_in_memory().unwrap();
        let patient = setup_patient(&mut db);

        let mut phone =
            PhoneNumber::new(patient.uuid.clone(), "9876543210".into(), PhoneType::Mobile);
        phone.deleted_at = Some("2024-01-15T10:00:00+00:00".into());
        db.upsert_phone_numbers(&[phone]).unwrap();

        assert!(db.phone_numbers_for_patient(&patient.uuid).unwrap().is_empty());
    }

    #[test]
    fn test_phone_requires_existing_patient() {
        let mut db = Database::open_in_memory().unwrap();
        let phone = PhoneNumber::new("no-such-patient".into(), "9876543210".into(), PhoneType::Mobile);
        assert!(db.upsert_phone_numbers(&[phone]).is_err());
    }
}
