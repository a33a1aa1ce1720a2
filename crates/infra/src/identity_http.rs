//! Identity store over a GoTrue-style admin HTTP API.
//!
//! - `POST   /auth/v1/admin/users`       create (email pre-confirmed)
//! - `DELETE /auth/v1/admin/users/{id}`  delete
//! - `GET    /auth/v1/user`              resolve a session's access token
//!
//! Admin calls authenticate with the service key. The client timeout from
//! config bounds every call; a timeout surfaces as `Unavailable`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lexportal_core::AccountId;
use lexportal_provisioning::{AccountMetadata, IdentityRecord, IdentityStore, Password, StoreError, StoreErrorKind};

use crate::config::IdentityStoreConfig;

/// Error codes the identity store uses for an already-registered email.
const DUPLICATE_EMAIL_CODES: [&str; 3] = ["email_exists", "user_already_exists", "identity_already_exists"];

#[derive(Serialize)]
struct CreateUserBody<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: &'a AccountMetadata,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Error payloads vary between versions; take whatever fields are present.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
    }
}

pub struct HttpIdentityStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl core::fmt::Debug for HttpIdentityStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpIdentityStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpIdentityStore {
    pub fn new(config: &IdentityStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::other(format!("failed to build identity store client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    fn admin_users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    /// URL of one user. The id is percent-encoded as a single path segment.
    fn admin_user_url(&self, id: &AccountId) -> Result<Url, StoreError> {
        if matches!(id.as_str(), "" | "." | "..") {
            return Err(StoreError::rejected(format!("not a usable account id: {id:?}")));
        }
        let mut url = Url::parse(&self.admin_users_url())
            .map_err(|e| StoreError::other(format!("invalid identity store url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| StoreError::other("identity store url cannot carry a path"))?
            .push(id.as_str());
        Ok(url)
    }

    fn admin(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl IdentityStore for HttpIdentityStore {
    #[instrument(skip_all, err(Display))]
    async fn create_account(
        &self,
        email: &str,
        password: &Password,
        metadata: &AccountMetadata,
    ) -> Result<IdentityRecord, StoreError> {
        let body = CreateUserBody {
            email,
            password: password.expose(),
            email_confirm: true,
            user_metadata: metadata,
        };

        let response = self
            .admin(self.client.post(self.admin_users_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("create_account", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify("create_account", status, &text));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| StoreError::other(format!("create_account: unreadable response: {e}")))?;
        Ok(IdentityRecord {
            id: AccountId::new(user.id),
            email: user.email.unwrap_or_else(|| email.to_string()),
        })
    }

    #[instrument(skip_all, fields(account_id = %id), err(Display))]
    async fn delete_account(&self, id: &AccountId) -> Result<(), StoreError> {
        let url = self.admin_user_url(id)?;
        let response = self
            .admin(self.client.delete(url))
            .send()
            .await
            .map_err(|e| transport_error("delete_account", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify("delete_account", status, &text))
    }

    #[instrument(skip_all, err(Display))]
    async fn resolve_session(&self, token: &str) -> Result<Option<AccountId>, StoreError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error("resolve_session", e))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => return Ok(None),
            s if !s.is_success() => {
                let text = response.text().await.unwrap_or_default();
                return Err(classify("resolve_session", status, &text));
            }
            _ => {}
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| StoreError::other(format!("resolve_session: unreadable response: {e}")))?;
        Ok(Some(AccountId::new(user.id)))
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> StoreError {
    if err.is_timeout() || err.is_connect() {
        StoreError::unavailable(format!("{operation}: identity store unreachable: {err}"))
    } else {
        StoreError::other(format!("{operation}: {err}"))
    }
}

/// Map a non-success response to a store error.
fn classify(operation: &str, status: StatusCode, body: &str) -> StoreError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code();
    let message = format!(
        "{operation}: {} ({status})",
        parsed.message().unwrap_or("identity store request failed")
    );

    let duplicate = code
        .as_deref()
        .is_some_and(|c| DUPLICATE_EMAIL_CODES.contains(&c));

    let kind = match status {
        StatusCode::NOT_FOUND => StoreErrorKind::NotFound,
        StatusCode::CONFLICT => StoreErrorKind::Conflict,
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST if duplicate => StoreErrorKind::Conflict,
        StatusCode::TOO_MANY_REQUESTS => StoreErrorKind::Unavailable,
        s if s.is_server_error() => StoreErrorKind::Unavailable,
        s if s.is_client_error() => StoreErrorKind::Rejected,
        _ => StoreErrorKind::Other,
    };

    let err = StoreError::new(kind, message);
    match code {
        Some(code) => err.with_code(code),
        None => err.with_code(status.as_u16().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    const NO_CONTENT: &[u8] = b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

    /// Accept one request, answer `response`, and return the request head.
    async fn capture_request(listener: TcpListener, response: &'static [u8]) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let mut read = 0;
        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf[read..]).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            read += n;
        }
        socket.write_all(response).await.unwrap();
        String::from_utf8_lossy(&buf[..read]).to_string()
    }

    async fn capture_request_line(listener: TcpListener) -> String {
        let head = capture_request(listener, NO_CONTENT).await;
        head.lines().next().unwrap_or_default().to_string()
    }

    async fn store_at(listener: &TcpListener) -> HttpIdentityStore {
        let addr = listener.local_addr().unwrap();
        HttpIdentityStore::new(&IdentityStoreConfig {
            base_url: format!("http://{addr}"),
            service_key: "service-key".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn delete_targets_exactly_one_user_path() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let store = store_at(&listener).await;
        let server = tokio::spawn(capture_request_line(listener));

        store.delete_account(&AccountId::new("U1?x=1#f")).await.unwrap();

        let line = server.await.unwrap();
        assert_eq!(line, "DELETE /auth/v1/admin/users/U1%3Fx=1%23f HTTP/1.1");
    }

    #[tokio::test]
    async fn delete_plain_id_keeps_path_unchanged() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let store = store_at(&listener).await;
        let server = tokio::spawn(capture_request_line(listener));

        store.delete_account(&AccountId::new("0190c6c4-8a7e")).await.unwrap();

        assert_eq!(server.await.unwrap(), "DELETE /auth/v1/admin/users/0190c6c4-8a7e HTTP/1.1");
    }

    #[tokio::test]
    async fn expired_session_resolves_to_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let store = store_at(&listener).await;
        let server = tokio::spawn(capture_request(
            listener,
            b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
        ));

        assert_eq!(store.resolve_session("user-token").await.unwrap(), None);

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /auth/v1/user http/1.1"));
        assert!(head.contains("authorization: bearer user-token"));
    }

    #[tokio::test]
    async fn dot_segment_ids_never_reach_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let store = store_at(&listener).await;

        for raw in ["..", ".", ""] {
            let err = store.delete_account(&AccountId::new(raw)).await.unwrap_err();
            assert_eq!(err.kind, StoreErrorKind::Rejected);
        }
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let err = classify(
            "create_account",
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code":422,"error_code":"email_exists","msg":"A user with this email address has already been registered"}"#,
        );
        assert_eq!(err.kind, StoreErrorKind::Conflict);
        assert_eq!(err.code.as_deref(), Some("email_exists"));
    }

    #[test]
    fn missing_user_is_not_found() {
        let err = classify(
            "delete_account",
            StatusCode::NOT_FOUND,
            r#"{"code":"user_not_found","message":"User not found"}"#,
        );
        assert!(err.is_not_found());
        assert_eq!(err.code.as_deref(), Some("user_not_found"));
    }

    #[test]
    fn weak_password_is_rejected_not_conflict() {
        let err = classify(
            "create_account",
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error_code":"weak_password","msg":"Password should be at least 6 characters"}"#,
        );
        assert_eq!(err.kind, StoreErrorKind::Rejected);
    }

    #[test]
    fn outages_are_unavailable_and_keep_status_as_code() {
        let err = classify("delete_account", StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.kind, StoreErrorKind::Unavailable);
        assert_eq!(err.code.as_deref(), Some("502"));
    }

    #[test]
    fn create_body_confirms_email_and_carries_metadata() {
        use lexportal_auth::{Role, StaffRole};

        let metadata = AccountMetadata {
            full_name: "A B".to_string(),
            role: Role::Staff(StaffRole::Attorney),
        };
        let body = CreateUserBody {
            email: "a@x.com",
            password: "secret1",
            email_confirm: true,
            user_metadata: &metadata,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["email_confirm"], true);
        assert_eq!(value["user_metadata"]["role"], "staff");
        assert_eq!(value["user_metadata"]["staff_role"], "attorney");
        assert_eq!(value["user_metadata"]["full_name"], "A B");
    }
}
