//! Account model and create-request validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lexportal_auth::Role;
use lexportal_core::{AccountId, DomainError, DomainResult};

/// Plaintext password on its way to the identity store.
///
/// Never logged: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for Password {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Raw create request, as received from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccountRequest {
    pub email: String,
    pub password: Password,
    pub full_name: String,
    pub role: String,
    #[serde(default)]
    pub staff_role: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAccount {
    /// Trimmed and lowercased.
    pub email: String,
    pub password: Password,
    pub full_name: String,
    pub role: Role,
}

/// Metadata attached to the identity-store record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountMetadata {
    pub full_name: String,
    #[serde(flatten)]
    pub role: Role,
}

impl From<&ValidatedAccount> for AccountMetadata {
    fn from(value: &ValidatedAccount) -> Self {
        Self {
            full_name: value.full_name.clone(),
            role: value.role,
        }
    }
}

/// Row in the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: AccountId,
    pub email: String,
    pub full_name: String,
    #[serde(flatten)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    /// Maintained by the login flow, never by provisioning.
    pub last_login: Option<DateTime<Utc>>,
}

/// A fully provisioned account, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    #[serde(flatten)]
    pub role: Role,
}

/// Validate a create request without touching any store.
pub fn validate(request: &NewAccountRequest, min_password_length: usize) -> DomainResult<ValidatedAccount> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    if !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }

    if request.password.is_empty() {
        return Err(DomainError::validation("password is required"));
    }
    if request.password.len() < min_password_length {
        return Err(DomainError::validation(format!(
            "password must be at least {min_password_length} characters"
        )));
    }

    let full_name = request.full_name.trim();
    if full_name.is_empty() {
        return Err(DomainError::validation("full_name is required"));
    }

    if request.role.trim().is_empty() {
        return Err(DomainError::validation("role is required"));
    }
    let role = Role::from_parts(&request.role, request.staff_role.as_deref())
        .map_err(|e| DomainError::validation(e.to_string()))?;

    Ok(ValidatedAccount {
        email,
        password: request.password.clone(),
        full_name: full_name.to_string(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexportal_auth::StaffRole;

    fn request(role: &str, staff_role: Option<&str>) -> NewAccountRequest {
        NewAccountRequest {
            email: "  A@X.com ".to_string(),
            password: Password::new("secret1"),
            full_name: "A B".to_string(),
            role: role.to_string(),
            staff_role: staff_role.map(str::to_string),
        }
    }

    #[test]
    fn accepts_staff_with_sub_role() {
        let v = validate(&request("staff", Some("attorney")), 6).unwrap();
        assert_eq!(v.email, "a@x.com");
        assert_eq!(v.role, Role::Staff(StaffRole::Attorney));
    }

    #[test]
    fn staff_without_sub_role_is_invalid() {
        let err = validate(&request("staff", None), 6).unwrap_err();
        assert!(err.detail().contains("staff_role"), "{err}");
    }

    #[test]
    fn short_password_is_invalid() {
        let mut req = request("client", None);
        req.password = Password::new("12345");
        let err = validate(&req, 6).unwrap_err();
        assert!(err.detail().contains("at least 6"), "{err}");

        req.password = Password::new("123456");
        assert!(validate(&req, 6).is_ok());
    }

    #[test]
    fn required_fields() {
        let mut req = request("client", None);
        req.full_name = "   ".to_string();
        assert!(validate(&req, 6).is_err());

        let mut req = request("client", None);
        req.email = String::new();
        assert!(validate(&req, 6).is_err());

        let mut req = request("client", None);
        req.email = "not-an-email".to_string();
        assert!(validate(&req, 6).is_err());

        assert!(validate(&request("", None), 6).is_err());
        assert!(validate(&request("client", Some("attorney")), 6).is_err());
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let rendered = format!("{:?}", request("client", None));
        assert!(!rendered.contains("secret1"));
        assert!(rendered.contains("Password(***)"));
    }

    #[test]
    fn account_serializes_flat() {
        let account = Account {
            id: AccountId::new("U1"),
            email: "a@x.com".to_string(),
            role: Role::Staff(StaffRole::Secretary),
        };
        assert_eq!(
            serde_json::to_value(&account).unwrap(),
            serde_json::json!({
                "id": "U1",
                "email": "a@x.com",
                "role": "staff",
                "staff_role": "secretary",
            })
        );
    }
}
