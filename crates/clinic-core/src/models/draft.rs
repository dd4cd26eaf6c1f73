//! In-progress patient registration.
//!
//! The draft is an explicit value owned by the caller for the lifetime of the
//! entry flow; there is no process-wide "current entry" state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    searchable_name, Address, AgeDetails, Gender, Patient, PatientProfile, PhoneNumber, PhoneType,
};

/// Validation failures for a draft. One variant per field rule so callers can
/// match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DraftValidationError {
    #[error("full name must not be empty")]
    EmptyFullName,
    #[error("gender is required")]
    MissingGender,
    #[error("either a date of birth or an age is required")]
    MissingAgeDetails,
    #[error("date of birth and age must not both be present")]
    AgeAndDateOfBirthBothPresent,
    #[error("district must not be empty")]
    EmptyDistrict,
    #[error("state must not be empty")]
    EmptyState,
    #[error("phone number must not be empty")]
    EmptyPhoneNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPhoneNumber {
    pub number: String,
    pub phone_type: PhoneType,
    pub active: bool,
}

/// A patient registration being filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub full_name: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub age_years: Option<u32>,
    pub street_address: Option<String>,
    pub colony_or_village: Option<String>,
    pub zone: Option<String>,
    pub district: String,
    pub state: String,
    pub country: Option<String>,
    pub phone_number: Option<DraftPhoneNumber>,
}

impl PatientDraft {
    /// Check every field rule and report all failures at once.
    pub fn validate(&self) -> Result<(), Vec<DraftValidationError>> {
        let mut errors = Vec::new();

        if self.full_name.trim().is_empty() {
            errors.push(DraftValidationError::EmptyFullName);
        }
        if self.gender.is_none() {
            errors.push(DraftValidationError::MissingGender);
        }
        match (self.date_of_birth, self.age_years) {
            (None, None) => errors.push(DraftValidationError::MissingAgeDetails),
            (Some(_), Some(_)) => errors.push(DraftValidationError::AgeAndDateOfBirthBothPresent),
            _ => {}
        }
        if self.district.trim().is_empty() {
            errors.push(DraftValidationError::EmptyDistrict);
        }
        if self.state.trim().is_empty() {
            errors.push(DraftValidationError::EmptyState);
        }
        if let Some(phone) = &self.phone_number {
            if phone.number.trim().is_empty() {
                errors.push(DraftValidationError::EmptyPhoneNumber);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and materialize a full profile with freshly generated ids.
    /// The patient comes out Pending, ready for the next sync push.
    pub fn to_profile(&self) -> Result<PatientProfile, Vec<DraftValidationError>> {
        self.validate()?;

        let now = chrono::Utc::now().to_rfc3339();
        let age = match (self.date_of_birth, self.age_years) {
            (Some(date_of_birth), None) => AgeDetails::DateOfBirth { date_of_birth },
            (None, Some(age_years)) => AgeDetails::Recorded {
                age_years,
                recorded_at: now,
            },
            (None, None) => return Err(vec![DraftValidationError::MissingAgeDetails]),
            (Some(_), Some(_)) => {
                return Err(vec![DraftValidationError::AgeAndDateOfBirthBothPresent])
            }
        };

        let mut address = Address::new(self.district.clone(), self.state.clone());
        address.street_address = self.street_address.clone();
        address.colony_or_village = self.colony_or_village.clone();
        address.zone = self.zone.clone();
        address.country = self.country.clone();

        let Some(gender) = self.gender else {
            return Err(vec![DraftValidationError::MissingGender]);
        };
        let patient = Patient::new(
            self.full_name.trim().to_string(),
            gender,
            age,
            address.uuid.clone(),
        );

        let phone_numbers = self
            .phone_number
            .iter()
            .map(|phone| {
                let mut number =
                    PhoneNumber::new(patient.uuid.clone(), phone.number.clone(), phone.phone_type);
                number.active = phone.active;
                number
            })
            .collect();

        Ok(PatientProfile {
            patient,
            address,
            phone_numbers,
        })
    }
}
