/// API route handlers
///
/// One module per resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Login and token refresh
/// - `dashboard`: Per-caller summary
/// - `budgets`, `invoices`, `tasks`, `notes`: Record collections
/// - `team`: Roster, roles, and account status (lead-managed)
/// - `profile`: The caller's own profile
///
/// Successful payloads are wrapped as `{"data": ...}`; deletions answer
/// `{"success": true}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub mod auth;
pub mod budgets;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod notes;
pub mod profile;
pub mod tasks;
pub mod team;

/// `{"data": ...}` response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `{"success": true}` response body for deletions
#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub success: bool,
}

impl Deleted {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `?id=` on PATCH and DELETE
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<Uuid>,
}

impl IdQuery {
    /// The id, or 400 when it was left out
    pub fn require(self) -> Result<Uuid, ApiError> {
        self.id
            .ok_or_else(|| ApiError::BadRequest("id query parameter is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes_serialize() {
        let body = serde_json::to_value(Data::new(vec![1, 2])).unwrap();
        assert_eq!(body, serde_json::json!({ "data": [1, 2] }));

        let body = serde_json::to_value(Deleted::ok()).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true }));
    }

    #[test]
    fn test_id_query_requires_id() {
        assert!(matches!(IdQuery::default().require(), Err(ApiError::BadRequest(_))));

        let id = Uuid::new_v4();
        assert_eq!(IdQuery { id: Some(id) }.require().unwrap(), id);
    }
}
