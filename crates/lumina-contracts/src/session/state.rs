use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::image_handle::ImageHandle;

pub const DEFAULT_PROMPT: &str = "Keep the subject's face and pose unchanged. Re-light the scene \
with warm golden-hour sunlight coming from the left, soften the background into a creamy bokeh, \
lift the shadows slightly and finish with subtle analog film grain and a gentle vignette for a \
nostalgic, editorial mood.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub image: ImageHandle,
    pub prompt: String,
    pub created_at_ms: i64,
}

/// Gateway-proposed style. The wire shape is camelCase (`sampleOutcome`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSuggestion {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub prompt: String,
    pub sample_outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    pub loading: bool,
    pub image: Option<ImageHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Loaded,
    Suggesting,
    Editing,
    Previewing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub original_image: Option<ImageHandle>,
    pub edited_image: Option<ImageHandle>,
    pub prompt: String,
    pub is_processing: bool,
    pub show_comparison: bool,
    pub error: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub suggestions: Vec<StyleSuggestion>,
    pub suggestion_previews: BTreeMap<String, Preview>,
    pub suggestions_loading: bool,
    pub explorer_open: bool,
    pub explorer_epoch: u64,
    pub generation: u64,
    pub config_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    /// `config_error` is the persistent message shown when gateway calls are
    /// disabled; it survives loads and clears.
    pub fn new(config_error: Option<String>) -> Self {
        Self {
            original_image: None,
            edited_image: None,
            prompt: DEFAULT_PROMPT.to_string(),
            is_processing: false,
            show_comparison: false,
            error: None,
            history: Vec::new(),
            suggestions: Vec::new(),
            suggestion_previews: BTreeMap::new(),
            suggestions_loading: false,
            explorer_open: false,
            explorer_epoch: 0,
            generation: 0,
            config_error,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.original_image.is_none() {
            SessionPhase::Empty
        } else if self.is_processing {
            SessionPhase::Editing
        } else if self.explorer_open {
            SessionPhase::Previewing
        } else if self.suggestions_loading {
            SessionPhase::Suggesting
        } else {
            SessionPhase::Loaded
        }
    }

    /// What a viewer should show right now: the original while the compare
    /// control is held, otherwise the latest edit, otherwise the original.
    pub fn display_image(&self) -> Option<&ImageHandle> {
        if self.show_comparison && self.edited_image.is_some() {
            return self.original_image.as_ref();
        }
        self.edited_image.as_ref().or(self.original_image.as_ref())
    }

    pub fn can_apply_edit(&self) -> bool {
        self.original_image.is_some() && !self.prompt.trim().is_empty() && !self.is_processing
    }

    pub fn suggestion(&self, id: &str) -> Option<&StyleSuggestion> {
        self.suggestions.iter().find(|suggestion| suggestion.id == id)
    }

    pub fn history_entry(&self, id: &str) -> Option<&HistoryEntry> {
        self.history.iter().find(|entry| entry.id == id)
    }

    pub fn previews_in_flight(&self) -> usize {
        self.suggestion_previews
            .values()
            .filter(|preview| preview.loading)
            .count()
    }
}
