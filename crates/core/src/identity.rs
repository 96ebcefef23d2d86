//! Identity claims, roles and session slots

use crate::error::{CoreError, CoreResult};
use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Role carried in an access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[serde(alias = "customer")]
    Customer,
    #[serde(alias = "admin")]
    Admin,
    #[serde(alias = "employee")]
    Employee,
}

impl Role {
    /// Session slot a subject with this role signs into
    pub const fn slot(self) -> SessionSlot {
        match self {
            Self::Customer => SessionSlot::Customer,
            Self::Admin | Self::Employee => SessionSlot::AdminOrEmployee,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "CUSTOMER"),
            Self::Admin => write!(f, "ADMIN"),
            Self::Employee => write!(f, "EMPLOYEE"),
        }
    }
}

/// One of the two independent token slots.
///
/// Customers and staff (admins and employees) keep separate credentials, and
/// both may be signed in at the same time in one browsing context. Each slot
/// owns a fixed pair of storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSlot {
    Customer,
    AdminOrEmployee,
}

impl SessionSlot {
    pub const ALL: [Self; 2] = [Self::Customer, Self::AdminOrEmployee];

    /// Storage key holding the access token for this slot
    pub const fn access_token_key(self) -> &'static str {
        match self {
            Self::Customer => "accessToken",
            Self::AdminOrEmployee => "admin_access_token",
        }
    }

    /// Storage key holding the refresh token for this slot
    pub const fn refresh_token_key(self) -> &'static str {
        match self {
            Self::Customer => "customer_refresh_token",
            Self::AdminOrEmployee => "admin_refresh_token",
        }
    }

    /// Login surface the user is sent to after logout
    pub const fn login_route(self) -> &'static str {
        match self {
            Self::Customer => "/login",
            Self::AdminOrEmployee => "/employees/login",
        }
    }

    /// Slot for a decoded role
    pub const fn for_role(role: Role) -> Self {
        role.slot()
    }
}

impl Display for SessionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::AdminOrEmployee => write!(f, "admin_or_employee"),
        }
    }
}

/// Identity claims carried in an access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id
    pub id: String,
    /// Customer tokens may omit the role
    #[serde(default)]
    pub role: Option<Role>,
    /// Expiration (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    /// Decode the claims of a JWT without verifying its signature.
    ///
    /// Only the payload segment is read. Validity is decided by the backend;
    /// this is used to derive the subject id and role for local state.
    pub fn decode(token: &str) -> CoreResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CoreError::malformed_token("token is empty"));
        }

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(CoreError::malformed_token(format!(
                "expected 3 segments, got {}",
                segments.len()
            )));
        }

        let payload = segments[1];
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .or_else(|_| URL_SAFE.decode(payload))
            .map_err(|e| CoreError::malformed_token(format!("invalid payload encoding: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::malformed_token(format!("invalid payload: {e}")))
    }
}

/// In-memory view of one session slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub subject_id: Option<String>,
    pub role: Option<Role>,
    pub is_authenticated: bool,
}

impl SessionSnapshot {
    /// The signed-out snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an authenticated snapshot from an access token
    pub fn from_token(token: &str) -> CoreResult<Self> {
        let claims = Claims::decode(token)?;
        Ok(Self {
            access_token: Some(token.to_string()),
            subject_id: Some(claims.id),
            role: claims.role,
            is_authenticated: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_decode_staff_claims() {
        let token = token_with(&json!({"id": "emp-1", "role": "EMPLOYEE", "exp": 1_900_000_000}));
        let claims = Claims::decode(&token).unwrap();
        assert_eq!(claims.id, "emp-1");
        assert_eq!(claims.role, Some(Role::Employee));
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn test_decode_customer_claims_without_role() {
        let token = token_with(&json!({"id": "cust-9"}));
        let claims = Claims::decode(&token).unwrap();
        assert_eq!(claims.id, "cust-9");
        assert!(claims.role.is_none());
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = URL_SAFE.encode(json!({"id": "a"}).to_string());
        let claims = Claims::decode(&format!("{header}.{body}.sig")).unwrap();
        assert_eq!(claims.id, "a");
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        for token in ["", "   ", "not-a-jwt", "a.b", "a.!!!.c", "a.e30.c"] {
            let err = Claims::decode(token).unwrap_err();
            assert!(err.is_malformed_token(), "{token:?} gave {err:?}");
        }
    }

    #[test]
    fn test_snapshot_from_token() {
        let token = token_with(&json!({"id": "admin-1", "role": "ADMIN"}));
        let snapshot = SessionSnapshot::from_token(&token).unwrap();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.access_token.as_deref(), Some(token.as_str()));
        assert_eq!(snapshot.subject_id.as_deref(), Some("admin-1"));
        assert_eq!(snapshot.role, Some(Role::Admin));
    }

    #[test]
    fn test_empty_snapshot_is_signed_out() {
        let snapshot = SessionSnapshot::empty();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.access_token.is_none());
    }

    #[test]
    fn test_slot_keys_are_distinct() {
        let customer = SessionSlot::Customer;
        let staff = SessionSlot::AdminOrEmployee;
        assert_eq!(customer.access_token_key(), "accessToken");
        assert_eq!(staff.access_token_key(), "admin_access_token");
        assert_eq!(customer.refresh_token_key(), "customer_refresh_token");
        assert_eq!(staff.refresh_token_key(), "admin_refresh_token");
    }

    #[test]
    fn test_role_slot_mapping() {
        assert_eq!(Role::Customer.slot(), SessionSlot::Customer);
        assert_eq!(Role::Admin.slot(), SessionSlot::AdminOrEmployee);
        assert_eq!(SessionSlot::for_role(Role::Employee), SessionSlot::AdminOrEmployee);
    }

    #[test]
    fn test_role_accepts_lowercase() {
        let role: Role = serde_json::from_value(json!("admin")).unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(Role::Employee.to_string(), "EMPLOYEE");
    }
}
