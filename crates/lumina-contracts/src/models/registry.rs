use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ImageEdit,
    StyleSuggest,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImageEdit => "image_edit",
            Self::StyleSuggest => "style_suggest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub gateway: String,
    pub capabilities: Vec<Capability>,
}

impl ModelSpec {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Known models in preference order; the first match for a capability is
/// that gateway's default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim().trim_start_matches("models/"))
    }

    pub fn candidates(&self, capability: Capability, gateway: &str) -> Vec<&ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability) && model.gateway == gateway)
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: Capability, gateway: &str) -> Option<ModelSpec> {
        self.get(name)
            .filter(|model| model.supports(capability) && model.gateway == gateway)
            .cloned()
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    use Capability::{ImageEdit, StyleSuggest};

    let rows: &[(&str, &str, &[Capability])] = &[
        ("gemini-2.5-flash-image", "gemini", &[ImageEdit]),
        ("gemini-3-pro-image-preview", "gemini", &[ImageEdit]),
        ("gemini-3-flash-preview", "gemini", &[StyleSuggest]),
        ("gemini-2.5-flash", "gemini", &[StyleSuggest]),
        ("gemini-3-pro-preview", "gemini", &[StyleSuggest]),
        ("dryrun-edit", "dryrun", &[ImageEdit]),
        ("dryrun-suggest", "dryrun", &[StyleSuggest]),
    ];

    rows.iter()
        .map(|(name, gateway, capabilities)| {
            (
                name.to_string(),
                ModelSpec {
                    name: name.to_string(),
                    gateway: gateway.to_string(),
                    capabilities: capabilities.to_vec(),
                },
            )
        })
        .collect()
}
