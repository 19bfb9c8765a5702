use std::collections::HashSet;

use lumina_contracts::config::GatewayConfig;
use lumina_contracts::errors::GatewayError;
use lumina_contracts::image_handle::ImageHandle;
use lumina_contracts::session::StyleSuggestion;
use serde_json::{json, Value};

use crate::gateway::ModelGateway;

const SUGGESTION_FIELDS: [&str; 5] = ["id", "label", "icon", "prompt", "sampleOutcome"];

fn suggestion_instruction(count: usize) -> String {
    format!(
        "Look at this photo and propose {count} diverse, currently trending creative style \
transformations for it. Mix looks such as cinematic relighting, film stocks, illustration \
styles, surreal or playful reinterpretations and fashionable color grades, and tailor each one \
to what is actually in the picture. For every style return: a short kebab-case `id`, a 1-3 word \
`label`, a single emoji `icon`, a detailed `prompt` an image editing model can follow directly \
while keeping the main subject recognizable, and a one-sentence `sampleOutcome` describing the \
result."
    )
}

pub fn build_suggestion_payload(image: &ImageHandle, count: usize) -> Value {
    let properties: serde_json::Map<String, Value> = SUGGESTION_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!({ "type": "STRING" })))
        .collect();
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
                { "text": suggestion_instruction(count) },
            ],
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": SUGGESTION_FIELDS,
                },
            },
        },
    })
}

/// Never fails: any problem is logged and reported as no suggestions.
pub fn request_suggestions(
    gateway: &dyn ModelGateway,
    config: &GatewayConfig,
    image: &ImageHandle,
) -> Vec<StyleSuggestion> {
    match try_request_suggestions(gateway, config, image) {
        Ok(suggestions) => suggestions,
        Err(err) => {
            log::warn!(
                "style suggestions unavailable ({}): {}",
                err.kind().as_str(),
                err
            );
            Vec::new()
        }
    }
}

pub fn try_request_suggestions(
    gateway: &dyn ModelGateway,
    config: &GatewayConfig,
    image: &ImageHandle,
) -> Result<Vec<StyleSuggestion>, GatewayError> {
    if image.encoded_len() == 0 {
        return Err(GatewayError::InvalidInput("Image payload is empty.".to_string()));
    }
    let count = config.suggestion_count.max(1);
    let payload = build_suggestion_payload(image, count);
    log::debug!(
        "suggestion request gateway={} model={} count={count}",
        gateway.name(),
        config.suggest_model
    );
    let response = gateway.generate_content(&config.suggest_model, &payload)?;
    let text = response_text(&response)
        .ok_or_else(|| GatewayError::upstream("Suggestion response carried no text."))?;
    parse_suggestions(&text, count)
}

fn response_text(response: &Value) -> Option<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_suggestions(text: &str, count: usize) -> Result<Vec<StyleSuggestion>, GatewayError> {
    let rows: Vec<StyleSuggestion> = serde_json::from_str(strip_code_fence(text)).map_err(|err| {
        GatewayError::upstream(format!("Suggestion response did not match the schema: {err}"))
    })?;

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(count.min(rows.len()));
    for row in rows {
        if row.id.trim().is_empty() || row.label.trim().is_empty() || row.prompt.trim().is_empty()
        {
            return Err(GatewayError::upstream(
                "Suggestion response contained an entry without id, label or prompt.",
            ));
        }
        if !seen.insert(row.id.clone()) {
            continue;
        }
        if out.len() < count {
            out.push(row);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use lumina_contracts::config::GatewayConfig;
    use lumina_contracts::errors::{GatewayError, GatewayErrorKind};
    use lumina_contracts::image_handle::ImageHandle;
    use serde_json::{json, Value};

    use super::{build_suggestion_payload, request_suggestions, try_request_suggestions};
    use crate::testing::{text_reply, ScriptedGateway};

    fn source() -> ImageHandle {
        ImageHandle::from_base64("QUJD", "image/png").expect("handle")
    }

    fn row(id: &str) -> Value {
        json!({
            "id": id,
            "label": format!("Label {id}"),
            "icon": "✨",
            "prompt": format!("Apply {id}"),
            "sampleOutcome": "Looks great.",
        })
    }

    #[test]
    fn payload_requests_structured_json() {
        let payload = build_suggestion_payload(&source(), 6);
        assert_eq!(
            payload.pointer("/generationConfig/responseMimeType"),
            Some(&Value::from("application/json"))
        );
        assert_eq!(
            payload.pointer("/generationConfig/responseSchema/items/required"),
            Some(&json!(["id", "label", "icon", "prompt", "sampleOutcome"]))
        );
        assert_eq!(
            payload.pointer("/generationConfig/responseSchema/items/properties/sampleOutcome/type"),
            Some(&Value::from("STRING"))
        );
        let text = payload
            .pointer("/contents/0/parts/1/text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        assert!(text.contains("propose 6 diverse"));
    }

    #[test]
    fn six_entries_come_back_in_order() -> anyhow::Result<()> {
        let rows: Vec<Value> = ["a", "b", "c", "d", "e", "f"].iter().map(|id| row(id)).collect();
        let gateway = ScriptedGateway::replying(text_reply(&Value::Array(rows).to_string()));
        let suggestions = try_request_suggestions(&gateway, &GatewayConfig::default(), &source())?;
        assert_eq!(suggestions.len(), 6);
        assert_eq!(suggestions[0].id, "a");
        assert_eq!(suggestions[5].sample_outcome, "Looks great.");
        assert_eq!(gateway.calls()[0].0, "gemini-3-flash-preview");
        Ok(())
    }

    #[test]
    fn duplicates_are_dropped_and_count_is_capped() -> anyhow::Result<()> {
        let rows = json!([row("a"), row("a"), row("b"), row("c")]);
        let gateway = ScriptedGateway::replying(text_reply(&format!("```json\n{rows}\n```")));
        let config = GatewayConfig {
            suggestion_count: 2,
            ..GatewayConfig::default()
        };
        let suggestions = try_request_suggestions(&gateway, &config, &source())?;
        let ids: Vec<&str> = suggestions.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn missing_required_field_degrades_to_empty() {
        let mut broken = row("b");
        if let Some(object) = broken.as_object_mut() {
            object.remove("sampleOutcome");
        }
        let gateway =
            ScriptedGateway::replying(text_reply(&json!([row("a"), broken]).to_string()));
        let err = try_request_suggestions(&gateway, &GatewayConfig::default(), &source())
            .expect_err("schema");
        assert_eq!(err.kind(), GatewayErrorKind::Upstream);
        assert!(request_suggestions(&gateway, &GatewayConfig::default(), &source()).is_empty());
    }

    #[test]
    fn blank_prompt_or_malformed_text_degrades_to_empty() {
        let mut blank = row("a");
        blank["prompt"] = Value::from("  ");
        let gateway = ScriptedGateway::replying(text_reply(&json!([blank]).to_string()));
        assert!(request_suggestions(&gateway, &GatewayConfig::default(), &source()).is_empty());

        let gateway = ScriptedGateway::replying(text_reply("Sorry, here are some ideas: ..."));
        assert!(request_suggestions(&gateway, &GatewayConfig::default(), &source()).is_empty());

        let gateway = ScriptedGateway::replying(json!({ "candidates": [] }));
        assert!(request_suggestions(&gateway, &GatewayConfig::default(), &source()).is_empty());
    }

    #[test]
    fn gateway_failures_never_escape() {
        let gateway = ScriptedGateway::failing(GatewayError::missing_credential());
        assert!(request_suggestions(&gateway, &GatewayConfig::default(), &source()).is_empty());
        let err = try_request_suggestions(&gateway, &GatewayConfig::default(), &source())
            .expect_err("configuration");
        assert_eq!(err.kind(), GatewayErrorKind::Configuration);
    }
}
