//! Full patient record: patient + address + phone numbers.

use serde::{Deserialize, Serialize};

use super::{Address, Patient, PhoneNumber};

/// The hydrated form returned by search and consumed by the sync layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub patient: Patient,
    pub address: Address,
    pub phone_numbers: Vec<PhoneNumber>,
}
