use super::registry::{Capability, ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    /// Resolves `requested` for `capability` on `gateway`, falling back to the
    /// gateway default with a reason when the request cannot be honored.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: Capability,
        gateway: &str,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        let fallback_reason = match requested {
            Some(name) => {
                if let Some(model) = self.registry.ensure(name, capability, gateway) {
                    return Ok(ModelSelection {
                        model,
                        requested: Some(name.to_string()),
                        fallback_reason: None,
                    });
                }
                format!(
                    "Requested model '{name}' unavailable for {} on gateway '{gateway}'.",
                    capability.as_str()
                )
            }
            None => "No model specified; using default.".to_string(),
        };

        let Some(model) = self
            .registry
            .candidates(capability, gateway)
            .first()
            .map(|model| (*model).clone())
        else {
            return Err(format!(
                "No models available for {} on gateway '{gateway}'.",
                capability.as_str()
            ));
        };
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }
}
