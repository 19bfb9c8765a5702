use lumina_contracts::config::GatewayConfig;
use lumina_contracts::errors::GatewayError;
use lumina_contracts::image_handle::{ImageHandle, DEFAULT_IMAGE_MIME};
use serde_json::{json, Value};

use crate::gateway::ModelGateway;

pub fn build_edit_payload(image: &ImageHandle, instruction: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": image.mime_type(),
                        "data": image.base64_payload(),
                    }
                },
                { "text": instruction },
            ],
        }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
        },
    })
}

/// Sends one edit request and returns the first image the model produced.
pub fn request_edit(
    gateway: &dyn ModelGateway,
    config: &GatewayConfig,
    image: &ImageHandle,
    instruction: &str,
) -> Result<ImageHandle, GatewayError> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(GatewayError::InvalidInput(
            "Edit instruction is empty.".to_string(),
        ));
    }
    if image.encoded_len() == 0 {
        return Err(GatewayError::InvalidInput("Image payload is empty.".to_string()));
    }

    let payload = build_edit_payload(image, instruction);
    log::debug!(
        "edit request gateway={} model={} image={:?} instruction_chars={}",
        gateway.name(),
        config.edit_model,
        image,
        instruction.chars().count()
    );
    let response = gateway.generate_content(&config.edit_model, &payload)?;
    extract_edited_image(&response)
}

fn extract_edited_image(response: &Value) -> Result<ImageHandle, GatewayError> {
    let candidates = response
        .get("candidates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut notes: Vec<String> = Vec::new();

    for candidate in &candidates {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for part in parts {
            let inline = part.get("inlineData").or_else(|| part.get("inline_data"));
            if let Some(inline) = inline {
                let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
                if data.is_empty() {
                    continue;
                }
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_IMAGE_MIME);
                return ImageHandle::from_base64(data, mime_type).map_err(|err| {
                    GatewayError::upstream(format!("Gateway returned an unusable image: {err}"))
                });
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                let text = text.trim();
                if !text.is_empty() {
                    notes.push(text.to_string());
                }
            }
        }
        if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
            if reason != "STOP" {
                notes.push(format!("finish reason {reason}"));
            }
        }
    }

    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        notes.push(format!("blocked: {reason}"));
    }
    let note = notes.join("; ");
    Err(GatewayError::empty_result(Some(&note)))
}
