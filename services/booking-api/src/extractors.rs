//! Caller identity extraction.
//!
//! Identity-provider integration sits in front of this service; an
//! upstream proxy injects the authenticated user's id as `x-user-id`.
//! The extractor trusts that header and resolves the role from the user
//! store, so handlers receive a ready-made [`Actor`].

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use horae_db::UserRepository;
use horae_types::{Actor, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor producing the authenticated caller of a request
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

impl Deref for Caller {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .ok_or(ApiError::Unauthenticated)?;
        let raw = header.to_str().map_err(|_| ApiError::Unauthenticated)?;
        let user_id = UserId::parse(raw).map_err(|_| ApiError::Unauthenticated)?;

        let user = state
            .repos
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Self(Actor::new(user.id, user.role)))
    }
}
