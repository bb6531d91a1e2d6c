//! Customer domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::CustomerId;

use super::{CellValue, Record};

/// A customer who places orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer fields as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Validated customer fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerData {
    pub name: String,
    /// Lower-cased email address.
    pub email: String,
    pub phone: Option<String>,
}

impl Record for Customer {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id" => CellValue::Int(self.id.as_i64()),
            "name" => self.name.as_str().into(),
            "email" => self.email.as_str().into(),
            "phone" => self.phone.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => CellValue::Null,
        }
    }
}
