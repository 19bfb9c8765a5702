use std::time::Duration;

use lumina_contracts::config::GatewayConfig;
use lumina_contracts::errors::GatewayError;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;

use crate::gateway::{error_chain_text, truncate_text, ModelGateway};

/// Google Generative Language `generateContent` over blocking HTTP.
pub struct GeminiGateway {
    api_base: String,
    api_key: Option<String>,
    request_timeout: Option<Duration>,
    http: HttpClient,
}

impl GeminiGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout,
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn post(&self, endpoint: &str, api_key: &str, payload: &Value) -> anyhow::Result<HttpResponse> {
        let mut request = self
            .http
            .post(endpoint)
            .query(&[("key", api_key)])
            .json(payload);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .map_err(|raw| anyhow::Error::new(raw).context(format!("Gemini request failed ({endpoint})")))?;
        Ok(response)
    }
}

impl ModelGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GatewayError::missing_credential());
        };
        let endpoint = self.endpoint_for_model(model);
        log::debug!("gemini generateContent model={model} endpoint={endpoint}");

        let response = self
            .post(&endpoint, api_key, payload)
            .map_err(|err| GatewayError::upstream(error_chain_text(&err, 512)))?;
        let status = response.status();
        let body = response.text().map_err(|err| {
            GatewayError::upstream(format!("Gemini response body read failed: {err}"))
        })?;
        decode_response_body(status.as_u16(), status.is_success(), &body)
    }
}

fn decode_response_body(code: u16, success: bool, body: &str) -> Result<Value, GatewayError> {
    if !success {
        let message = service_error_message(body).unwrap_or_else(|| truncate_text(body.trim(), 512));
        return Err(GatewayError::upstream(format!(
            "Gemini request failed ({code}): {message}"
        )));
    }
    serde_json::from_str(body)
        .map_err(|err| GatewayError::upstream(format!("Gemini returned invalid JSON payload: {err}")))
}

/// `{"error": {"message": ...}}` as returned by the service on failure.
fn service_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
