use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

/// Account record, owned by the auth subsystem.
/// The ledger joins to it by email; the core only reads it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Operators may trigger sync runs
    #[serde(skip)]
    pub is_operator: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
