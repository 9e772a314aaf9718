use bidsync_core::error::AppError;
use bidsync_core::traits::CredentialProvisioner;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Maximum number of retry attempts for failed requests.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries (will be multiplied by attempt number).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Per-request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header carrying the service API key.
const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AssignRoleRequest<'a> {
    role: &'a str,
}

/// User record returned by the identity API.
///
/// Deployments differ in whether ids are numeric or opaque strings, so both
/// forms are accepted.
///
/// # Examples
///
/// ```
/// use bidsync_client::identity::IdentityUser;
///
/// let user: IdentityUser = serde_json::from_str(r#"{"id": 42, "email": "a@b.com"}"#).unwrap();
/// assert_eq!(user.id.to_string(), "42");
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct IdentityUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// HTTP client for the bidding platform's identity API.
///
/// Creates application logins for member contacts and assigns them a role.
/// A user that already exists for the email (HTTP 409) is looked up instead of
/// failing, so a contact whose earlier run created the login but could not
/// record the user id recovers on the next run.
///
/// # Examples
///
/// ```no_run
/// use bidsync_client::IdentityClient;
/// use bidsync_core::CredentialProvisioner;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = IdentityClient::new("https://bids.example.com", "secret")?;
/// let user_id = client.create_login("jane@example.com", "pw", "Member").await?;
/// println!("Created user {}", user_id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl IdentityClient {
    /// Creates a new identity client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the URL is invalid or malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(base_url_str: &str, api_key: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url_str).map_err(|_| {
            AppError::ConfigError(format!("Invalid identity API URL: {}", base_url_str))
        })?;

        let client = Client::builder()
            .user_agent(concat!("bidsync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn users_url(&self) -> Result<Url, AppError> {
        self.base_url
            .join("api/users")
            .map_err(|e| AppError::ConfigError(e.to_string()))
    }

    fn user_lookup_url(&self, email: &str) -> Result<Url, AppError> {
        let mut url = self.users_url()?;
        url.query_pairs_mut().append_pair("email", email);
        Ok(url)
    }

    fn roles_url(&self, user_id: &UserId) -> Result<Url, AppError> {
        self.base_url
            .join(&format!("api/users/{}/roles", user_id))
            .map_err(|e| AppError::ConfigError(e.to_string()))
    }

    /// Creates the user, or finds the existing one with the same email.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<UserId, AppError> {
        let url = self.users_url()?;
        let body = CreateUserRequest { email, password };

        let resp = self
            .request_with_retry(&url, || self.client.post(url.clone()).json(&body))
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            debug!(email, "Identity user already exists, looking it up");
            return self.find_user(email).await;
        }

        let user: IdentityUser = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;
        Ok(user.id)
    }

    /// Looks a user up by email.
    pub async fn find_user(&self, email: &str) -> Result<UserId, AppError> {
        let url = self.user_lookup_url(email)?;
        let resp = self
            .request_with_retry(&url, || self.client.get(url.clone()))
            .await?;

        let users: Vec<IdentityUser> = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        users
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| AppError::CredentialError(format!("No identity user for {}", email)))
    }

    /// Assigns `role` to the user. Assigning a role the user already holds is
    /// not an error.
    pub async fn assign_role(&self, user_id: &UserId, role: &str) -> Result<(), AppError> {
        let url = self.roles_url(user_id)?;
        let body = AssignRoleRequest { role };
        self.request_with_retry(&url, || self.client.post(url.clone()).json(&body))
            .await?;
        Ok(())
    }

    /// Sends a request with automatic retry on transient failures.
    ///
    /// Retries on:
    /// - Network errors
    /// - Timeouts
    /// - Server errors (5xx)
    /// - Rate limiting (429)
    ///
    /// A 409 Conflict is handed back to the caller as a response.
    async fn request_with_retry<F>(&self, url: &Url, build: F) -> Result<reqwest::Response, AppError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = AppError::Generic("No attempts made".to_string());

        for attempt in 1..=MAX_RETRIES {
            match build().header(API_KEY_HEADER, &self.api_key).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() || status == StatusCode::CONFLICT {
                        return Ok(resp);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = AppError::ClientError("Rate limited: HTTP 429".to_string());
                        if attempt < MAX_RETRIES {
                            let delay =
                                Duration::from_millis(RETRY_BASE_DELAY_MS * 2_u64.pow(attempt));
                            sleep(delay).await;
                            continue;
                        }
                    }

                    if status.is_server_error() {
                        last_error = AppError::ClientError(format!(
                            "Server error: HTTP {}",
                            status.as_u16()
                        ));
                        if attempt < MAX_RETRIES {
                            let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * attempt as u64);
                            sleep(delay).await;
                            continue;
                        }
                    }

                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(AppError::CredentialError(format!(
                            "HTTP {} from {}",
                            status.as_u16(),
                            url.path()
                        )));
                    }

                    return Err(last_error);
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = AppError::Timeout(REQUEST_TIMEOUT_SECS);
                    } else if e.is_connect() {
                        last_error = AppError::NetworkError(format!("Connection failed: {}", e));
                    } else {
                        last_error = AppError::ClientError(e.to_string());
                    }

                    if attempt < MAX_RETRIES && (e.is_timeout() || e.is_connect()) {
                        let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * attempt as u64);
                        sleep(delay).await;
                        continue;
                    }
                    return Err(last_error);
                }
            }
        }

        Err(last_error)
    }
}

impl CredentialProvisioner for IdentityClient {
    async fn create_login(
        &self,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<String, AppError> {
        let user_id = self.create_user(email, password).await?;
        self.assign_role(&user_id, role).await?;
        info!(email, user_id = %user_id, role, "Provisioned contact login");
        Ok(user_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_valid_url() {
        let client = IdentityClient::new("https://bids.example.com", "key").unwrap();
        assert_eq!(client.base_url.as_str(), "https://bids.example.com/");
        assert_eq!(client.api_key, "key");
    }

    #[test]
    fn test_new_with_invalid_url() {
        let result = IdentityClient::new("not-a-valid-url", "key");

        if let Err(AppError::ConfigError(msg)) = result {
            assert!(msg.contains("Invalid identity API URL"));
        } else {
            panic!("Expected AppError::ConfigError");
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let client = IdentityClient::new("https://bids.example.com/", "key").unwrap();

        assert_eq!(
            client.users_url().unwrap().as_str(),
            "https://bids.example.com/api/users"
        );
        assert_eq!(
            client.user_lookup_url("jane+bids@example.com").unwrap().as_str(),
            "https://bids.example.com/api/users?email=jane%2Bbids%40example.com"
        );
        assert_eq!(
            client.roles_url(&UserId::Number(7)).unwrap().as_str(),
            "https://bids.example.com/api/users/7/roles"
        );
    }

    #[test]
    fn test_user_deserialization() {
        let numeric: IdentityUser = serde_json::from_str(r#"{"id": 12}"#).unwrap();
        assert_eq!(numeric.id, UserId::Number(12));
        assert!(numeric.email.is_none());

        let opaque: IdentityUser =
            serde_json::from_str(r#"{"id": "a1b2", "email": "x@y.com", "roles": []}"#).unwrap();
        assert_eq!(opaque.id.to_string(), "a1b2");
        assert_eq!(opaque.email.as_deref(), Some("x@y.com"));
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(CreateUserRequest {
            email: "a@b.com",
            password: "pw",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"email": "a@b.com", "password": "pw"}));

        let body = serde_json::to_value(AssignRoleRequest { role: "Member" }).unwrap();
        assert_eq!(body, serde_json::json!({"role": "Member"}));
    }
}
