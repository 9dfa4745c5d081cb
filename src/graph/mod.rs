//! Microsoft Graph client for the employee directory.
//!
//! Service-to-service access uses the client-credential flow; the bearer
//! token is cached until shortly before expiry. User listing pages through
//! `@odata.nextLink` until the directory is exhausted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::AppConfig;
use crate::entities::employee;
use crate::errors::ServiceError;

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Fields requested for every directory user
const USER_SELECT: &str = "id,userPrincipalName,displayName,givenName,surname,jobTitle,department,officeLocation,mail,businessPhones,mobilePhone,streetAddress,city,state,postalCode,country,countryLetterCode";

/// Directory user as returned by the Graph API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphUser {
    pub id: String,
    pub user_principal_name: Option<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub office_location: Option<String>,
    pub mail: Option<String>,
    pub business_phones: Vec<String>,
    pub mobile_phone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub country_letter_code: Option<String>,
}

impl GraphUser {
    /// Address used for the organization-domain filter
    pub fn email(&self) -> Option<&str> {
        self.user_principal_name
            .as_deref()
            .or(self.mail.as_deref())
    }

    /// Free-text country value, preferring the ISO letter code
    pub fn country_input(&self) -> Option<&str> {
        self.country_letter_code
            .as_deref()
            .or(self.country.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct UserPage {
    #[serde(default)]
    value: Vec<GraphUser>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Client for the external directory API
pub struct GraphClient {
    http: reqwest::Client,
    token_url: String,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<CachedToken>>,
}

impl GraphClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.graph_token_url(),
            cfg.graph_base_url.clone(),
            cfg.graph_client_id.clone(),
            cfg.graph_client_secret.clone(),
        )
    }

    pub fn new(
        token_url: String,
        base_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            token: RwLock::new(None),
        }
    }

    /// Get a bearer token, reusing the cached one until near expiry
    async fn access_token(&self) -> Result<String, ServiceError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if Utc::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let token_response: TokenResponse = response.json().await?;

        // Refresh 5 minutes before the reported expiry
        let expires_at = Utc::now() + Duration::seconds(token_response.expires_in - 300);
        let token = token_response.access_token.clone();
        *self.token.write().await = Some(CachedToken {
            token: token_response.access_token,
            expires_at,
        });

        debug!("Obtained directory access token");
        Ok(token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ServiceError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Fetch the full user directory, following pagination links
    pub async fn list_users(&self) -> Result<Vec<GraphUser>, ServiceError> {
        let mut users = Vec::new();
        let mut url = format!("{}/users?$select={}", self.base_url, USER_SELECT);

        loop {
            let page: UserPage = self.get_json(&url).await?;
            users.extend(page.value);
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(users)
    }

    /// Fetch a single user by object ID or principal name
    pub async fn get_user(&self, user_id: &str) -> Result<GraphUser, ServiceError> {
        let url = format!(
            "{}/users/{}?$select={}",
            self.base_url, user_id, USER_SELECT
        );
        self.get_json(&url).await
    }

    /// Push a field patch to a single directory user, returning the updated
    /// record
    ///
    /// Last writer wins; the directory performs no conflict detection.
    pub async fn update_user(
        &self,
        user_id: &str,
        patch: &Value,
    ) -> Result<GraphUser, ServiceError> {
        let token = self.access_token().await?;
        let url = format!("{}/users/{}", self.base_url, user_id);

        self.http
            .patch(&url)
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?
            .error_for_status()?;

        self.get_user(user_id).await
    }
}

/// Per-field patch a directory user maps to on the local employee row
///
/// Only the fields present here are written during upsert; everything else
/// keeps its local value.
#[derive(Debug, Clone, Default)]
pub struct EmployeeFields {
    pub azure_oid: String,
    pub azure_upn: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub office: Option<String>,
    pub email: Option<String>,
    pub mobile_phone: Option<String>,
    pub office_phone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Map a directory user onto local employee fields
pub fn employee_fields_from_graph(user: &GraphUser) -> EmployeeFields {
    EmployeeFields {
        azure_oid: user.id.clone(),
        azure_upn: user.user_principal_name.clone(),
        first_name: user.given_name.clone(),
        last_name: user.surname.clone(),
        display_name: user.display_name.clone(),
        title: user.job_title.clone(),
        department: user.department.clone(),
        office: user.office_location.clone(),
        email: user
            .mail
            .clone()
            .or_else(|| user.user_principal_name.clone()),
        mobile_phone: user.mobile_phone.clone(),
        office_phone: user.business_phones.first().cloned(),
        street_address: user.street_address.clone(),
        city: user.city.clone(),
        state: user.state.clone(),
        postal_code: user.postal_code.clone(),
    }
}

/// Map local employee fields to a directory PATCH body (non-null only)
pub fn graph_patch_from_employee(employee: &employee::Model) -> Value {
    let mut patch = serde_json::Map::new();

    let mut set = |key: &str, value: &Option<String>| {
        if let Some(v) = value {
            patch.insert(key.to_string(), json!(v));
        }
    };

    set("givenName", &employee.first_name);
    set("surname", &employee.last_name);
    set("displayName", &employee.display_name);
    set("jobTitle", &employee.title);
    set("department", &employee.department);
    set("officeLocation", &employee.office);
    set("mobilePhone", &employee.mobile_phone);
    set("streetAddress", &employee.street_address);
    set("city", &employee.city);
    set("state", &employee.state);
    set("postalCode", &employee.postal_code);

    if let Some(office_phone) = &employee.office_phone {
        patch.insert("businessPhones".to_string(), json!([office_phone]));
    }

    Value::Object(patch)
}
