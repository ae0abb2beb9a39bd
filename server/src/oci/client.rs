//! Signed REST client for one (profile, region) pair

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::auth::Credentials;
use super::endpoints::Service;
use super::error::OciError;
use super::signing::sign_request;

/// Decoded response of a successful call
#[derive(Debug, Clone)]
pub struct OciResponse {
    pub status: u16,
    pub body: Value,
    pub next_page: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// OCI client bound to one profile and one region
#[derive(Debug, Clone)]
pub struct OciClient {
    http: Client,
    credentials: Arc<Credentials>,
    profile: String,
    region: String,
    endpoint_override: Option<String>,
}

impl OciClient {
    pub fn new(
        profile: impl Into<String>,
        region: impl Into<String>,
        credentials: Arc<Credentials>,
        timeout: Duration,
    ) -> Result<Self, OciError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("opsi-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            credentials,
            profile: profile.into(),
            region: region.into(),
            endpoint_override: None,
        })
    }

    /// Send every service to `base` instead of the regional endpoint
    pub fn with_endpoint_override(mut self, base: impl Into<String>) -> Self {
        self.endpoint_override = Some(base.into());
        self
    }

    /// Same identity and connection pool, different region
    pub fn with_region(&self, region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..self.clone()
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn tenancy_id(&self) -> &str {
        &self.credentials.tenancy_id
    }

    fn base_url(&self, service: Service) -> String {
        match &self.endpoint_override {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), service.api_version()),
            None => service.base_url(&self.region),
        }
    }

    /// Build the full request URL
    pub fn url(&self, service: Service, path: &str, query: &[(String, String)]) -> Result<Url, OciError> {
        let raw = format!("{}/{}", self.base_url(service), path.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| OciError::InvalidArgument(format!("invalid URL {}: {}", raw, e)))?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    pub async fn get(
        &self,
        service: Service,
        path: &str,
        query: &[(String, String)],
    ) -> Result<OciResponse, OciError> {
        self.send(Method::GET, service, path, query, None).await
    }

    /// Sign and send a request, mapping non-2xx answers to `OciError::Service`
    pub async fn send(
        &self,
        method: Method,
        service: Service,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<OciResponse, OciError> {
        let url = self.url(service, path, query)?;
        let payload = body.map(serde_json::to_vec).transpose()?;

        let signed = sign_request(
            &self.credentials,
            &method,
            &url,
            payload.as_deref(),
            Utc::now(),
        )?;

        debug!(method = %method, url = %url, profile = %self.profile, "OCI request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("accept", "application/json")
            .header("opc-request-id", Uuid::new_v4().simple().to_string().to_uppercase());
        for (name, value) in signed.into_pairs() {
            request = request.header(name, value);
        }
        if let Some(payload) = payload {
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let request_id = header("opc-request-id");
        let next_page = header("opc-next-page");

        let text = response.text().await?;

        if !status.is_success() {
            let parsed: Option<ServiceErrorBody> = serde_json::from_str(&text).ok();
            let (code, message) = match parsed {
                Some(b) => (b.code, b.message),
                None => (None, None),
            };
            warn!(status = %status, url = %url, request_id = ?request_id, "OCI request failed");
            return Err(OciError::Service {
                status: status.as_u16(),
                code: code.unwrap_or_else(|| status.canonical_reason().unwrap_or("Error").to_string()),
                message: message.unwrap_or(text),
                request_id,
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(OciResponse {
            status: status.as_u16(),
            body,
            next_page,
            request_id,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::oci::auth::AuthType;
    use rsa::RsaPrivateKey;

    pub fn test_credentials() -> Arc<Credentials> {
        Arc::new(Credentials {
            auth_type: AuthType::ApiKey,
            key_id: "ocid1.tenancy.oc1..aaaatenant/ocid1.user.oc1..aaaauser/aa:bb".to_string(),
            private_key: RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap(),
            tenancy_id: "ocid1.tenancy.oc1..aaaatenant".to_string(),
            region: Some("us-ashburn-1".to_string()),
        })
    }

    pub fn test_client() -> OciClient {
        OciClient::new("DEFAULT", "us-ashburn-1", test_credentials(), Duration::from_secs(5)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_client;
    use super::*;

    #[test]
    fn test_url_building() {
        let client = test_client();
        let url = client
            .url(
                Service::OperationsInsights,
                "/databaseInsights",
                &[
                    ("compartmentId".to_string(), "ocid1.compartment.oc1..x".to_string()),
                    ("lifecycleState".to_string(), "ACTIVE".to_string()),
                ],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://operationsinsights.us-ashburn-1.oci.oraclecloud.com/20200630/databaseInsights?compartmentId=ocid1.compartment.oc1..x&lifecycleState=ACTIVE"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let client = test_client().with_endpoint_override("http://127.0.0.1:9000/");
        let url = client.url(Service::Identity, "regions", &[]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/20160918/regions");
    }

    #[test]
    fn test_accessors() {
        let client = test_client();
        assert_eq!(client.profile(), "DEFAULT");
        assert_eq!(client.region(), "us-ashburn-1");
        assert_eq!(client.tenancy_id(), "ocid1.tenancy.oc1..aaaatenant");

        let frankfurt = client.with_region("eu-frankfurt-1");
        assert_eq!(frankfurt.region(), "eu-frankfurt-1");
        assert_eq!(frankfurt.tenancy_id(), client.tenancy_id());
    }
}
