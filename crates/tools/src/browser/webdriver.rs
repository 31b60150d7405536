use super::{BrowserDriver, BrowserLauncher};
use crate::error::ToolError;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tokio::time::{timeout, Duration};

/// W3C key under which element references are returned.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Launches sessions against a WebDriver endpoint (chromedriver, geckodriver
/// or a Selenium grid).
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    client: Client,
    endpoint: String,
    headless: bool,
    navigation_timeout_ms: u64,
}

impl WebDriverLauncher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            headless: true,
            navigation_timeout_ms: 15_000,
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    fn capabilities(&self) -> Value {
        let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage"];
        if self.headless {
            args.push("--headless=new");
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, ToolError> {
        let value = send(
            &self.client,
            Method::POST,
            &format!("{}/session", self.endpoint),
            Some(self.capabilities()),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Browser("WebDriver response missing sessionId".into()))?
            .to_string();

        tracing::debug!("WebDriver session {} started", session_id);

        let session = WebDriverSession {
            client: self.client.clone(),
            base: format!("{}/session/{}", self.endpoint, session_id),
            session_id,
            navigation_timeout_ms: self.navigation_timeout_ms,
        };
        session
            .command(
                Method::POST,
                "timeouts",
                Some(json!({ "pageLoad": self.navigation_timeout_ms })),
            )
            .await?;

        Ok(Box::new(session))
    }
}

/// One WebDriver session. Owned by exactly one [`super::BrowserSession`].
#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    base: String,
    session_id: String,
    navigation_timeout_ms: u64,
}

impl WebDriverSession {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ToolError> {
        let url = if path.is_empty() {
            self.base.clone()
        } else {
            format!("{}/{}", self.base, path)
        };
        send(&self.client, method, &url, body).await
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ToolError> {
        let request = self.command(Method::POST, "url", Some(json!({ "url": url })));
        match timeout(Duration::from_millis(self.navigation_timeout_ms), request).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(ToolError::Timeout(self.navigation_timeout_ms)),
        }
    }

    async fn extract_text(&mut self, selector: &str) -> Result<String, ToolError> {
        let element = self
            .command(
                Method::POST,
                "element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await
            .map_err(|e| match e {
                ToolError::WebDriver { error, .. } if error == "no such element" => {
                    ToolError::ElementNotFound(selector.to_string())
                }
                other => other,
            })?;

        let element_id = element
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Browser(format!("no element reference for '{}'", selector)))?;

        let text = self
            .command(Method::GET, &format!("element/{}/text", element_id), None)
            .await?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&mut self) -> Result<String, ToolError> {
        let url = self.command(Method::GET, "url", None).await?;
        Ok(url.as_str().unwrap_or_default().to_string())
    }

    async fn close(self: Box<Self>) -> Result<(), ToolError> {
        self.command(Method::DELETE, "", None).await?;
        tracing::debug!("WebDriver session {} closed", self.session_id);
        Ok(())
    }
}

/// Issue one WebDriver command and unwrap the `value` envelope.
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, ToolError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| ToolError::Browser(format!("WebDriver request failed: {}", e)))?;
    let status = response.status();
    let envelope: Value = response
        .json()
        .await
        .map_err(|e| ToolError::Browser(format!("invalid WebDriver response: {}", e)))?;
    let value = envelope.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(ToolError::WebDriver { error, message });
    }

    Ok(value)
}
