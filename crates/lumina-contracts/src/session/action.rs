use crate::image_handle::ImageHandle;

use super::effect::PreviewTicket;
use super::state::StyleSuggestion;

/// Everything that can change a [`super::Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    LoadImage(ImageHandle),
    SetPrompt(String),
    ResetPrompt,
    ApplySuggestion(String),
    /// `None` edits with the current session prompt.
    ApplyEdit {
        prompt: Option<String>,
    },
    Clear,
    ToggleComparison(bool),
    RestoreFromHistory(String),
    OpenExplorer,
    CloseExplorer,
    GeneratePreview(String),
    Completed(Completion),
}

/// Results of gateway work, tagged with the generation (and explorer epoch)
/// they were issued under.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    SuggestionsResolved {
        generation: u64,
        suggestions: Vec<StyleSuggestion>,
    },
    EditSucceeded {
        generation: u64,
        prompt: String,
        image: ImageHandle,
        entry_id: String,
        created_at_ms: i64,
    },
    EditFailed {
        generation: u64,
        message: String,
    },
    PreviewResolved {
        ticket: PreviewTicket,
        image: Option<ImageHandle>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadImage(_) => "load_image",
            Self::SetPrompt(_) => "set_prompt",
            Self::ResetPrompt => "reset_prompt",
            Self::ApplySuggestion(_) => "apply_suggestion",
            Self::ApplyEdit { .. } => "apply_edit",
            Self::Clear => "clear",
            Self::ToggleComparison(_) => "toggle_comparison",
            Self::RestoreFromHistory(_) => "restore_from_history",
            Self::OpenExplorer => "open_explorer",
            Self::CloseExplorer => "close_explorer",
            Self::GeneratePreview(_) => "generate_preview",
            Self::Completed(completion) => completion.name(),
        }
    }
}

impl Completion {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SuggestionsResolved { .. } => "suggestions_resolved",
            Self::EditSucceeded { .. } => "edit_succeeded",
            Self::EditFailed { .. } => "edit_failed",
            Self::PreviewResolved { .. } => "preview_resolved",
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Self::SuggestionsResolved { generation, .. }
            | Self::EditSucceeded { generation, .. }
            | Self::EditFailed { generation, .. } => *generation,
            Self::PreviewResolved { ticket, .. } => ticket.generation,
        }
    }
}
