use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use lumina_contracts::errors::GatewayError;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::gateway::ModelGateway;

const TINT_STRENGTH: f32 = 0.35;

const CANNED_SUGGESTIONS: [(&str, &str, &str, &str, &str); 6] = [
    (
        "golden-hour",
        "Golden Hour",
        "☀️",
        "Relight the photo with warm low golden-hour sun from the side and soft haze.",
        "Warm amber light with long soft shadows.",
    ),
    (
        "neon-noir",
        "Neon Noir",
        "🌃",
        "Turn the scene into a rainy night lit by magenta and cyan neon signs.",
        "Moody night shot with saturated neon reflections.",
    ),
    (
        "film-grain",
        "Analog Film",
        "🎞️",
        "Give the photo a faded 35mm film look with lifted blacks and fine grain.",
        "Soft contrast and nostalgic grain.",
    ),
    (
        "watercolor",
        "Watercolor",
        "🎨",
        "Repaint the image as a loose watercolor illustration on textured paper.",
        "Bleeding pigments and visible paper texture.",
    ),
    (
        "clay-figure",
        "Clay Figure",
        "🧸",
        "Recreate the subject as a glossy handmade clay figurine on a studio backdrop.",
        "Playful stop-motion style miniature.",
    ),
    (
        "cyber-chrome",
        "Cyber Chrome",
        "🤖",
        "Restyle the scene with liquid chrome surfaces and holographic highlights.",
        "Futuristic metallic sheen across the frame.",
    ),
];

/// Offline gateway with deterministic output.
///
/// Edit requests come back as the input image tinted with a colour derived
/// from the instruction. Requests carrying a `responseSchema` get a fixed set
/// of suggestions as JSON text.
pub struct DryrunGateway;

impl ModelGateway for DryrunGateway {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn requires_credential(&self) -> bool {
        false
    }

    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
        let (image, text) = request_parts(payload);
        log::debug!(
            "dryrun generateContent model={model} image={} text_chars={}",
            image.is_some(),
            text.chars().count()
        );

        if payload
            .pointer("/generationConfig/responseSchema")
            .is_some()
        {
            return Ok(text_response(&canned_suggestions_json()));
        }

        let Some((mime_type, data)) = image else {
            return Err(GatewayError::upstream(
                "dryrun request carried no inline image",
            ));
        };
        match tint_image(&data, &text) {
            Some(png) => Ok(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            { "text": format!("dryrun edit of {mime_type} input") },
                            { "inlineData": { "mimeType": "image/png", "data": BASE64.encode(png) } },
                        ],
                    },
                    "finishReason": "STOP",
                }],
            })),
            None => Ok(text_response("I could not read that image.")),
        }
    }
}

fn request_parts(payload: &Value) -> (Option<(String, String)>, String) {
    let mut image = None;
    let mut text = String::new();
    let parts = payload
        .pointer("/contents/0/parts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for part in parts {
        if let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) {
            let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
            let mime_type = inline
                .get("mimeType")
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            if image.is_none() && !data.is_empty() {
                image = Some((mime_type.to_string(), data.to_string()));
            }
        } else if let Some(value) = part.get("text").and_then(Value::as_str) {
            text.push_str(value);
        }
    }
    (image, text)
}

fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP",
        }],
    })
}

fn canned_suggestions_json() -> String {
    let rows: Vec<Value> = CANNED_SUGGESTIONS
        .iter()
        .map(|(id, label, icon, prompt, sample)| {
            json!({
                "id": id,
                "label": label,
                "icon": icon,
                "prompt": prompt,
                "sampleOutcome": sample,
            })
        })
        .collect();
    Value::Array(rows).to_string()
}

fn tint_image(data: &str, instruction: &str) -> Option<Vec<u8>> {
    let bytes = BASE64.decode(data.as_bytes()).ok()?;
    let decoded = image::load_from_memory(&bytes).ok()?;
    let mut rgb: RgbImage = decoded.to_rgb8();
    let (r, g, b) = color_from_prompt(instruction);
    for pixel in rgb.pixels_mut() {
        let Rgb([pr, pg, pb]) = *pixel;
        *pixel = Rgb([blend(pr, r), blend(pg, g), blend(pb, b)]);
    }
    let mut out = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .ok()?;
    Some(out)
}

fn blend(base: u8, tint: u8) -> u8 {
    let mixed = base as f32 * (1.0 - TINT_STRENGTH) + tint as f32 * TINT_STRENGTH;
    mixed.round().clamp(0.0, 255.0) as u8
}

fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.trim().as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::{json, Value};

    use super::{color_from_prompt, DryrunGateway};
    use crate::gateway::ModelGateway;

    fn png_base64(width: u32, height: u32) -> anyhow::Result<String> {
        let image = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut out = Vec::new();
        image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        Ok(BASE64.encode(out))
    }

    fn edit_payload(data: &str, text: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": data } },
                    { "text": text },
                ],
            }],
        })
    }

    #[test]
    fn edit_returns_tinted_png_of_same_size() -> anyhow::Result<()> {
        let payload = edit_payload(&png_base64(4, 3)?, "make it teal");
        let response = DryrunGateway.generate_content("dryrun-edit", &payload)?;
        let data = response
            .pointer("/candidates/0/content/parts/1/inlineData/data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let decoded = image::load_from_memory(&BASE64.decode(data)?)?.to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_ne!(decoded.get_pixel(0, 0), &Rgb([10, 20, 30]));

        let again = DryrunGateway.generate_content("dryrun-edit", &payload)?;
        assert_eq!(response, again);
        Ok(())
    }

    #[test]
    fn undecodable_image_yields_text_only_response() -> anyhow::Result<()> {
        let payload = edit_payload(&BASE64.encode(b"not an image"), "anything");
        let response = DryrunGateway.generate_content("dryrun-edit", &payload)?;
        let parts = response
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].get("inlineData").is_none());
        Ok(())
    }

    #[test]
    fn schema_requests_get_six_suggestions() -> anyhow::Result<()> {
        let mut payload = edit_payload("abc", "suggest styles");
        payload["generationConfig"] = json!({ "responseSchema": { "type": "ARRAY" } });
        let response = DryrunGateway.generate_content("dryrun-suggest", &payload)?;
        let text = response
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let rows: Vec<Value> = serde_json::from_str(text)?;
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|row| row.get("sampleOutcome").is_some()));
        Ok(())
    }

    #[test]
    fn prompt_colour_ignores_surrounding_whitespace() {
        assert_eq!(color_from_prompt(" sepia "), color_from_prompt("sepia"));
        assert_ne!(color_from_prompt("sepia"), color_from_prompt("neon"));
    }
}
