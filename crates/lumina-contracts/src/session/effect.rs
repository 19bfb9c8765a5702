use crate::image_handle::ImageHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTicket {
    pub generation: u64,
    pub epoch: u64,
    pub suggestion_id: String,
}

/// Outbound work requested by a transition. The runtime performs it and
/// reports back with a [`super::Completion`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchSuggestions {
        generation: u64,
        image: ImageHandle,
    },
    RequestEdit {
        generation: u64,
        image: ImageHandle,
        prompt: String,
    },
    RequestPreview {
        ticket: PreviewTicket,
        image: ImageHandle,
        instruction: String,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchSuggestions { .. } => "fetch_suggestions",
            Self::RequestEdit { .. } => "request_edit",
            Self::RequestPreview { .. } => "request_preview",
        }
    }
}
