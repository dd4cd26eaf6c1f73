//! Patient address model.

use serde::{Deserialize, Serialize};

/// Locality details for a patient. Exactly one address per patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
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

impl Address {
    pub fn new(district: String, state: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            street_address: None,
            colony_or_village: None,
            zone: None,
            district,
            state,
            country: None,
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
        }
    }
}
