//! The single baby profile the learner is parameterised by.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BabyProfile {
    pub id: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BabyProfile {
    pub fn new(name: impl Into<String>, birth_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("baby_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            birth_date,
            created_at: now,
            updated_at: now,
        }
    }
}
