//! Account roles.
//!
//! Stores keep roles in a flat form: a `role` string plus a nullable
//! `staff_role` sibling. In memory a role is a tagged enum, so "sub-role set
//! iff staff" holds by construction and the flat form only exists at the edges
//! (`from_parts` / `as_parts`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sub-role of a staff member.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    SeniorAttorney,
    Attorney,
    Secretary,
    Paralegal,
}

impl StaffRole {
    pub const ALL: [StaffRole; 4] = [
        StaffRole::SeniorAttorney,
        StaffRole::Attorney,
        StaffRole::Secretary,
        StaffRole::Paralegal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::SeniorAttorney => "senior_attorney",
            StaffRole::Attorney => "attorney",
            StaffRole::Secretary => "secretary",
            StaffRole::Paralegal => "paralegal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl core::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of an account.
///
/// Serialized adjacently tagged, which yields the flat store shape:
/// `{"role": "staff", "staff_role": "attorney"}` or `{"role": "client"}`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "staff_role", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff(StaffRole),
    Client,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("unknown role '{0}' (expected one of: admin, staff, client)")]
    UnknownRole(String),

    #[error("unknown staff role '{0}'")]
    UnknownStaffRole(String),

    #[error("staff_role is required when role is 'staff'")]
    MissingStaffRole,

    #[error("staff_role is only allowed when role is 'staff' (got role '{0}')")]
    UnexpectedStaffRole(&'static str),
}

impl Role {
    /// Build a role from its flat store form.
    ///
    /// An empty `staff_role` is treated the same as an absent one.
    pub fn from_parts(role: &str, staff_role: Option<&str>) -> Result<Self, RoleError> {
        let staff_role = staff_role.map(str::trim).filter(|s| !s.is_empty());

        match (role.trim(), staff_role) {
            ("admin", None) => Ok(Role::Admin),
            ("client", None) => Ok(Role::Client),
            ("admin", Some(_)) => Err(RoleError::UnexpectedStaffRole("admin")),
            ("client", Some(_)) => Err(RoleError::UnexpectedStaffRole("client")),
            ("staff", None) => Err(RoleError::MissingStaffRole),
            ("staff", Some(sub)) => StaffRole::parse(sub)
                .map(Role::Staff)
                .ok_or_else(|| RoleError::UnknownStaffRole(sub.to_string())),
            (other, _) => Err(RoleError::UnknownRole(other.to_string())),
        }
    }

    /// Flat store form: `(role, staff_role)`.
    pub fn as_parts(&self) -> (&'static str, Option<&'static str>) {
        match self {
            Role::Admin => ("admin", None),
            Role::Staff(sub) => ("staff", Some(sub.as_str())),
            Role::Client => ("client", None),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.as_parts().0
    }

    pub fn staff_role(&self) -> Option<StaffRole> {
        match self {
            Role::Staff(sub) => Some(*sub),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff(_))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Role::Staff(sub) => write!(f, "staff/{sub}"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_flat_forms() {
        assert_eq!(Role::from_parts("admin", None).unwrap(), Role::Admin);
        assert_eq!(Role::from_parts("client", Some("")).unwrap(), Role::Client);
        assert_eq!(
            Role::from_parts("staff", Some("senior_attorney")).unwrap(),
            Role::Staff(StaffRole::SeniorAttorney)
        );
    }

    #[test]
    fn staff_requires_a_known_sub_role() {
        assert_eq!(
            Role::from_parts("staff", None).unwrap_err(),
            RoleError::MissingStaffRole
        );
        assert_eq!(
            Role::from_parts("staff", Some("  ")).unwrap_err(),
            RoleError::MissingStaffRole
        );
        assert!(matches!(
            Role::from_parts("staff", Some("judge")),
            Err(RoleError::UnknownStaffRole(_))
        ));
    }

    #[test]
    fn non_staff_rejects_sub_role() {
        assert_eq!(
            Role::from_parts("client", Some("attorney")).unwrap_err(),
            RoleError::UnexpectedStaffRole("client")
        );
        assert!(matches!(
            Role::from_parts("superuser", None),
            Err(RoleError::UnknownRole(_))
        ));
    }

    #[test]
    fn serializes_to_flat_store_shape() {
        let staff = serde_json::to_value(Role::Staff(StaffRole::Attorney)).unwrap();
        assert_eq!(staff, serde_json::json!({"role": "staff", "staff_role": "attorney"}));

        let client = serde_json::to_value(Role::Client).unwrap();
        assert_eq!(client, serde_json::json!({"role": "client"}));
    }

    proptest! {
        #[test]
        fn staff_role_present_iff_staff(
            role in prop_oneof![
                Just("admin".to_string()),
                Just("staff".to_string()),
                Just("client".to_string()),
                "[a-z_]{0,12}",
            ],
            staff in proptest::option::of(prop_oneof![
                Just("senior_attorney".to_string()),
                Just("attorney".to_string()),
                Just("secretary".to_string()),
                Just("paralegal".to_string()),
                "[a-z_ ]{0,12}",
            ]),
        ) {
            if let Ok(parsed) = Role::from_parts(&role, staff.as_deref()) {
                let (flat_role, flat_staff) = parsed.as_parts();
                prop_assert_eq!(flat_staff.is_some(), flat_role == "staff");
                prop_assert_eq!(Role::from_parts(flat_role, flat_staff), Ok(parsed));
            }
        }
    }
}
