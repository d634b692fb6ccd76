//! Visitor identity extractor.
//!
//! Every visitor gets a random id on first contact, stored in the session.
//! The id names the visitor's cart and order slots.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;

use super::session::keys;

/// The current visitor's id.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Visitor(id): Visitor) -> String {
///     format!("cart slot for {id}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor(pub String);

impl Visitor {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let existing = session
            .get::<String>(keys::VISITOR_ID)
            .await
            .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?;

        // Only ids we issued are trusted as slot names.
        if let Some(id) = existing.filter(|id| Uuid::parse_str(id).is_ok()) {
            return Ok(Self(id));
        }

        let id = Uuid::new_v4().to_string();
        session
            .insert(keys::VISITOR_ID, &id)
            .await
            .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
        tracing::debug!(visitor = %id, "New visitor");

        Ok(Self(id))
    }
}
