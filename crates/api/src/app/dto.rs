use serde::Serialize;

use lexportal_provisioning::{Account, DeletedAccount};

// -------------------------
// Request DTOs
// -------------------------

/// `POST /admin/users` body; validation happens in the provisioner.
pub type CreateUserRequest = lexportal_provisioning::NewAccountRequest;

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_role: Option<&'static str>,
}

impl From<&Account> for UserDto {
    fn from(account: &Account) -> Self {
        let (role, staff_role) = account.role.as_parts();
        Self {
            id: account.id.to_string(),
            email: account.email.clone(),
            role,
            staff_role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub success: bool,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct DeletedUserResponse {
    pub success: bool,
    pub id: String,
    /// False when the identity record was already gone.
    pub identity_existed: bool,
    pub profile_existed: bool,
}

impl From<&DeletedAccount> for DeletedUserResponse {
    fn from(deleted: &DeletedAccount) -> Self {
        Self {
            success: true,
            id: deleted.id.to_string(),
            identity_existed: deleted.identity_existed,
            profile_existed: deleted.profile_existed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use lexportal_auth::{Role, StaffRole};
    use lexportal_core::AccountId;

    use super::*;

    #[test]
    fn staff_role_only_rendered_for_staff() {
        let staff = Account {
            id: AccountId::new("U1"),
            email: "a@x.com".to_string(),
            role: Role::Staff(StaffRole::SeniorAttorney),
        };
        let v = serde_json::to_value(UserDto::from(&staff)).unwrap();
        assert_eq!(v["staff_role"], "senior_attorney");

        let client = Account {
            role: Role::Client,
            ..staff
        };
        let v = serde_json::to_value(UserDto::from(&client)).unwrap();
        assert_eq!(v["role"], "client");
        assert!(v.get("staff_role").is_none());
    }
}
