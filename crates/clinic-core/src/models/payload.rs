//! Server-fetched patient payloads.
//!
//! Wire shapes are owned by the network layer; this module only defines the
//! deserialized form and its conversion into local rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    searchable_name, Address, AgeDetails, DeletedReason, Gender, Patient, PatientProfile,
    PatientStatus, PhoneNumber, PhoneType, SyncState,
};

/// A payload that cannot be turned into local rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("payload {uuid}: {reason}")]
pub struct InvalidPayload {
    pub uuid: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPayload {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumberPayload {
    pub uuid: String,
    pub number: String,
    pub phone_type: PhoneType,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// One patient record as delivered by a sync pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPayload {
    pub uuid: String,
    pub full_name: String,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub age_years: Option<u32>,
    pub age_recorded_at: Option<String>,
    pub status: PatientStatus,
    pub created_at: String,
    pub updated_at: String,
    pub recorded_at: String,
    pub deleted_at: Option<String>,
    pub deleted_reason: Option<DeletedReason>,
    pub address: AddressPayload,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumberPayload>,
}

impl PatientPayload {
    /// Convert into local rows. The patient comes out with sync state Done:
    /// an accepted server copy carries no unacknowledged local mutation.
    pub fn to_profile(&self) -> Result<PatientProfile, InvalidPayload> {
        let age = match (self.date_of_birth, self.age_years, &self.age_recorded_at) {
            (Some(date_of_birth), None, None) => AgeDetails::DateOfBirth { date_of_birth },
            (Some(_), None, Some(_)) => {
                return Err(InvalidPayload {
                    uuid: self.uuid.clone(),
                    reason: "date of birth with a stray age recorded-at timestamp".into(),
                })
            }
            (None, Some(age_years), Some(recorded_at)) => AgeDetails::Recorded {
                age_years,
                recorded_at: recorded_at.clone(),
            },
            (None, Some(_), None) => {
                return Err(InvalidPayload {
                    uuid: self.uuid.clone(),
                    reason: "age value without a recorded-at timestamp".into(),
                })
            }
            (None, None, _) => {
                return Err(InvalidPayload {
                    uuid: self.uuid.clone(),
                    reason: "neither date of birth nor age present".into(),
                })
            }
            (Some(_), Some(_), _) => {
                return Err(InvalidPayload {
                    uuid: self.uuid.clone(),
                    reason: "both date of birth and age present".into(),
                })
            }
        };

        let patient = Patient {
            uuid: self.uuid.clone(),
            address_uuid: self.address.uuid.clone(),
            full_name: self.full_name.clone(),
            searchable_name: searchable_name(&self.full_name),
            gender: self.gender,
            age,
            status: self.status,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            recorded_at: self.recorded_at.clone(),
            deleted_at: self.deleted_at.clone(),
            deleted_reason: self.deleted_reason,
            sync_state: SyncState::Done,
        };

        let address = Address {
            uuid: self.address.uuid.clone(),
            street_address: self.address.street_address.clone(),
            colony_or_village: self.address.colony_or_village.clone(),
            zone: self.address.zone.clone(),
            district: self.address.district.clone(),
            state: self.address.state.clone(),
            country: self.address.country.clone(),
            created_at: self.address.created_at.clone(),
            updated_at: self.address.updated_at.clone(),
            deleted_at: self.address.deleted_at.clone(),
        };

        let phone_numbers = self
            .phone_numbers
            .iter()
            .map(|phone| PhoneNumber {
                uuid: phone.uuid.clone(),
                patient_uuid: self.uuid.clone(),
                number: phone.number.clone(),
                phone_type: phone.phone_type,
                active: phone.active,
                created_at: phone.created_at.clone(),
                updated_at: phone.updated_at.clone(),
                deleted_at: phone.deleted_at.clone(),
            })
            .collect();

        Ok(PatientProfile {
            patient,
            address,
            phone_numbers,
        })
    }
}
