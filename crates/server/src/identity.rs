//! Caller identity as asserted by the upstream identity provider.
//!
//! The gateway forwards the authenticated user in `x-user-id` / `x-user-role`. When a shared
//! gateway secret is configured, requests that do not carry it are refused so the headers
//! cannot be forged by clients reaching the service directly.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use valora_core::config::IdentityConfig;
use valora_core::domain::user::{CurrentUser, UserId, UserRole};
use valora_core::errors::ApplicationError;

use crate::error::{new_correlation_id, ApiError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const GATEWAY_SECRET_HEADER: &str = "x-valora-gateway-secret";

#[derive(Clone, Debug, Default)]
pub struct IdentityGate {
    gateway_secret: Option<SecretString>,
}

impl IdentityGate {
    pub fn new(gateway_secret: Option<SecretString>) -> Self {
        Self { gateway_secret }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.gateway_secret.clone())
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<CurrentUser, ApplicationError> {
        if let Some(expected) = &self.gateway_secret {
            let provided = header_value(headers, GATEWAY_SECRET_HEADER);
            if provided != Some(expected.expose_secret()) {
                return Err(ApplicationError::Unauthorized(
                    "request did not come through the identity gateway".to_string(),
                ));
            }
        }

        let id = header_value(headers, USER_ID_HEADER)
            .ok_or_else(|| ApplicationError::Unauthorized(format!("missing {USER_ID_HEADER}")))?;
        let role = header_value(headers, USER_ROLE_HEADER)
            .ok_or_else(|| ApplicationError::Unauthorized(format!("missing {USER_ROLE_HEADER}")))?
            .parse::<UserRole>()
            .map_err(|error| ApplicationError::Unauthorized(error.to_string()))?;

        Ok(CurrentUser { id: UserId(id.to_string()), role })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Any authenticated caller.
#[derive(Clone, Debug)]
pub struct Identity(pub CurrentUser);

/// An authenticated caller with the admin role.
#[derive(Clone, Debug)]
pub struct AdminIdentity(pub CurrentUser);

impl<S> FromRequestParts<S> for Identity
where
    IdentityGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        IdentityGate::from_ref(state)
            .authenticate(&parts.headers)
            .map(Self)
            .map_err(|error| ApiError::new(error, &new_correlation_id()))
    }
}

impl<S> FromRequestParts<S> for AdminIdentity
where
    IdentityGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Identity(user) = Identity::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::new(
                ApplicationError::Forbidden(format!("user {} is not an admin", user.id)),
                &new_correlation_id(),
            ));
        }
        Ok(Self(user))
    }
}
