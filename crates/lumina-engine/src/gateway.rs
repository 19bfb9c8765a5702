use std::collections::BTreeMap;
use std::sync::Arc;

use lumina_contracts::config::GatewayConfig;
use lumina_contracts::errors::GatewayError;
use serde_json::Value;

use crate::dryrun::DryrunGateway;
use crate::gemini::GeminiGateway;

/// One `generateContent`-shaped call to a hosted (or simulated) model.
///
/// Implementations make exactly one attempt and never mutate caller state.
pub trait ModelGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Offline gateways answer without an API key.
    fn requires_credential(&self) -> bool {
        true
    }

    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, GatewayError>;
}

#[derive(Default)]
pub struct GatewayRegistry {
    gateways: BTreeMap<String, Arc<dyn ModelGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<G: ModelGateway + 'static>(&mut self, gateway: G) {
        self.gateways
            .insert(gateway.name().to_string(), Arc::new(gateway));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelGateway>> {
        self.gateways.get(name.trim()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.gateways.keys().cloned().collect()
    }
}

pub fn default_gateway_registry(config: &GatewayConfig) -> GatewayRegistry {
    let mut registry = GatewayRegistry::new();
    registry.register(GeminiGateway::new(config));
    registry.register(DryrunGateway);
    registry
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().is_some_and(|existing| existing == trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use lumina_contracts::config::GatewayConfig;

    use super::{default_gateway_registry, error_chain_text, truncate_text};

    #[test]
    fn default_registry_has_gemini_and_dryrun() {
        let registry = default_gateway_registry(&GatewayConfig::default());
        assert_eq!(registry.names(), vec!["dryrun".to_string(), "gemini".to_string()]);
        assert!(registry.get(" gemini ").is_some());
        assert!(registry.get("openai").is_none());
    }

    #[test]
    fn error_chain_text_keeps_nested_contexts_once() {
        let err = anyhow::anyhow!("connection reset")
            .context("Gemini request failed (https://example.test)")
            .context("Gemini request failed (https://example.test)");
        let rendered = error_chain_text(&err, 400);
        assert_eq!(
            rendered,
            "Gemini request failed (https://example.test) | caused by: connection reset"
        );
    }

    #[test]
    fn truncate_text_marks_cut_values() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
