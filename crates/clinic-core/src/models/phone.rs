//! Patient phone number model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneType {
    Mobile,
    Landline,
}

impl PhoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneType::Mobile => "mobile",
            PhoneType::Landline => "landline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mobile" => Some(PhoneType::Mobile),
            "landline" => Some(PhoneType::Landline),
            _ => None,
        }
    }
}

/// A phone number attached to a patient (1:many). Soft-deleted via
/// `deleted_at`, never removed while the owning record is unsynced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub uuid: String,
    pub patient_uuid: String,
    pub number: String,
    pub phone_type: PhoneType,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl PhoneNumber {
    pub fn new(patient_uuid: String, number: String, phone_type: PhoneType) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            patient_uuid,
            number,
            phone_type,
            active: true,
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
        }
    }
}
