//! SigV4-signed requests to an OpenSearch Serverless collection endpoint

use std::time::SystemTime;

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{
    sign, PayloadChecksumKind, SignableBody, SignableRequest, SigningSettings,
};
use aws_sigv4::sign::v4;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::DomainError;

const SERVICE_NAME: &str = "aoss";

/// Creates k-NN indexes inside a vector collection
#[derive(Clone)]
pub struct VectorIndexClient {
    http: reqwest::Client,
    credentials: SharedCredentialsProvider,
    region: String,
}

impl std::fmt::Debug for VectorIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndexClient")
            .field("region", &self.region)
            .finish()
    }
}

impl VectorIndexClient {
    pub fn new(credentials: SharedCredentialsProvider, region: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            region: region.into(),
        }
    }

    /// Create `index_name` on the collection at `endpoint`; an existing index is accepted
    pub async fn create_index(
        &self,
        endpoint: &str,
        index_name: &str,
        body: &Value,
    ) -> Result<(), DomainError> {
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), index_name);
        let payload = serde_json::to_vec(body).map_err(|e| {
            DomainError::internal(format!("Failed to serialize index body: {}", e))
        })?;

        let headers = self.signed_headers("PUT", &url, &payload).await?;

        let mut request = self.http.put(&url).body(payload);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::network(format!("Vector index request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(index = %index_name, "Created vector index");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains("resource_already_exists_exception") {
            debug!(index = %index_name, "Vector index already exists");
            return Ok(());
        }

        Err(DomainError::provisioning(format!(
            "Failed to create vector index '{}' ({}): {}",
            index_name, status, error_body
        )))
    }

    async fn signed_headers(
        &self,
        method: &str,
        url: &str,
        payload: &[u8],
    ) -> Result<Vec<(String, String)>, DomainError> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| DomainError::configuration(format!("No AWS credentials: {}", e)))?;

        let host = reqwest::Url::parse(url)
            .map_err(|e| DomainError::internal(format!("Invalid index URL '{}': {}", url, e)))?
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| DomainError::internal(format!("Index URL '{}' has no host", url)))?;

        let mut headers = vec![
            ("host".to_string(), host),
            ("content-type".to_string(), "application/json".to_string()),
        ];

        let mut settings = SigningSettings::default();
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;

        let identity = credentials.into();
        let params: aws_sigv4::http_request::SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SERVICE_NAME)
            .time(SystemTime::now())
            .settings(settings)
            .build()
            .map_err(|e| DomainError::internal(format!("Invalid signing parameters: {}", e)))?
            .into();

        let signable = SignableRequest::new(
            method,
            url,
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            SignableBody::Bytes(payload),
        )
        .map_err(|e| DomainError::internal(format!("Failed to prepare signing: {}", e)))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| DomainError::internal(format!("Failed to sign request: {}", e)))?
            .into_parts();

        headers.extend(
            instructions
                .headers()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );

        // reqwest sets its own host header
        headers.retain(|(name, _)| name != "host");

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::Credentials;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> VectorIndexClient {
        let credentials = Credentials::new("AKIDEXAMPLE", "secret", None, None, "test");
        VectorIndexClient::new(SharedCredentialsProvider::new(credentials), "us-east-1")
    }

    #[tokio::test]
    async fn test_create_index_signs_request() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/school-index"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(header_exists("x-amz-content-sha256"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "acknowledged": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        client()
            .create_index(&server.uri(), "school-index", &serde_json::json!({}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_existing_index_is_accepted() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/school-index"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "type": "resource_already_exists_exception" },
                "status": 400
            })))
            .mount(&server)
            .await;

        let result = client()
            .create_index(&server.uri(), "school-index", &serde_json::json!({}))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_forbidden_is_provisioning_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client()
            .create_index(&server.uri(), "school-index", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Provisioning { .. }));
        assert!(err.to_string().contains("403"));
    }
}
