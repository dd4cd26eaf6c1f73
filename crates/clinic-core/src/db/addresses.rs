//! Patient address database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Address;

impl Database {
    /// Upsert a batch of addresses in one transaction. Idempotent by uuid.
    pub fn upsert_addresses(&mut self, addresses: &[Address]) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        for address in addresses {
            tx.execute(
                r#"
                INSERT INTO patient_address (
                    uuid, street_address, colony_or_village, zone, district,
                    state, country, created_at, updated_at, deleted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(uuid) DO UPDATE SET
                    street_address = excluded.street_address,
                    colony_or_village = excluded.colony_or_village,
                    zone = excluded.zone,
                    district = excluded.district,
                    state = excluded.state,
                    country = excluded.country,
                    updated_at = excluded.updated_at,
                    deleted_at = excluded.deleted_at
                "#,
                params![
                    address.uuid,
                    address.street_address,
                    address.colony_or_village,
                    address.zone,
                    address.district,
                    address.state,
                    address.country,
                    address.created_at,
                    address.updated_at,
                    address.deleted_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Get an address by uuid.
    pub fn get_address(&self, uuid: &str) -> DbResult<Option<Address>> {
        self.conn
            .query_row(
                r#"
                SELECT uuid, street_address, colony_or_village, zone, district,
                       state, country, created_at, updated_at, deleted_at
                FROM patient_address
                WHERE uuid = ?
                "#,
                [uuid],
                |row| {
                    Ok(Address {
                        uuid: row.get(0)?,
                        street_address: row.get(1)?,
                        colony_or_village: row.get(2)?,
                        zone: row.get(3)?,
                        district: row.get(4)?,
                        state: row.get(5)?,
                        country: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                        deleted_at: row.get(9)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
