use std::sync::Mutex;

use lumina_contracts::errors::GatewayError;
use serde_json::Value;

use crate::gateway::ModelGateway;

type Responder = Box<dyn Fn(&str, &Value) -> Result<Value, GatewayError> + Send + Sync>;

/// In-process gateway that answers from a closure and records every call.
pub(crate) struct ScriptedGateway {
    responder: Responder,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedGateway {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, GatewayError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(response: Value) -> Self {
        Self::new(move |_, _| Ok(response.clone()))
    }

    pub(crate) fn failing(error: GatewayError) -> Self {
        Self::new(move |_, _| Err(error.clone()))
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl ModelGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((model.to_string(), payload.clone()));
        }
        (self.responder)(model, payload)
    }
}

pub(crate) fn text_reply(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

pub(crate) fn image_reply(data: &str) -> Value {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": data } }] }
        }]
    })
}
