use crate::error::ToolError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionInfo {
    pub function_name: String,
    #[serde(default)]
    pub function_arn: String,
    #[serde(default)]
    pub runtime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketInfo {
    pub bucket_name: String,
    #[serde(default)]
    pub region: String,
}

/// Remote resource API used by cloud operations.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn create_function(&self, function_name: &str, runtime: &str) -> Result<FunctionInfo, ToolError>;

    async fn create_bucket(&self, bucket_name: &str) -> Result<BucketInfo, ToolError>;
}

/// JSON-over-HTTP provisioning API.
///
/// Functions are created with `POST {endpoint}/functions` and buckets with
/// `POST {endpoint}/buckets`. A bearer token is attached when configured.
pub struct HttpCloudProvider {
    client: Client,
    endpoint: String,
    region: String,
    token: Option<String>,
}

impl HttpCloudProvider {
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            region: region.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ToolError> {
        let url = format!("{}/{}", self.endpoint, path);
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Cloud(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Cloud(format!("{} returned {}: {}", path, status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::Cloud(format!("invalid response from {}: {}", path, e)))
    }
}

#[async_trait]
impl CloudProvider for HttpCloudProvider {
    async fn create_function(&self, function_name: &str, runtime: &str) -> Result<FunctionInfo, ToolError> {
        tracing::info!("Creating cloud function {} ({})", function_name, runtime);
        let body = json!({
            "function_name": function_name,
            "runtime": runtime,
            "handler": "lambda_function.lambda_handler",
            "region": self.region,
        });
        let value = self.post("functions", body).await?;

        Ok(FunctionInfo {
            function_name: function_name.to_string(),
            function_arn: value
                .get("function_arn")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            runtime: runtime.to_string(),
        })
    }

    async fn create_bucket(&self, bucket_name: &str) -> Result<BucketInfo, ToolError> {
        tracing::info!("Creating storage bucket {}", bucket_name);
        let body = json!({ "bucket_name": bucket_name, "region": self.region });
        self.post("buckets", body).await?;

        Ok(BucketInfo {
            bucket_name: bucket_name.to_string(),
            region: self.region.clone(),
        })
    }
}
