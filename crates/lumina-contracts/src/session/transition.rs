use crate::image_handle::ImageHandle;

use super::action::{Action, Completion};
use super::effect::{Effect, PreviewTicket};
use super::state::{HistoryEntry, Session, DEFAULT_PROMPT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    /// A guard rejected the action; the session is unchanged.
    Ignored,
    /// A completion arrived for a generation or explorer epoch that is no
    /// longer current; the session is unchanged.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
    pub disposition: Disposition,
}

impl Transition {
    fn applied(session: Session) -> Self {
        Self {
            session,
            effects: Vec::new(),
            disposition: Disposition::Applied,
        }
    }

    fn ignored(session: Session) -> Self {
        Self {
            session,
            effects: Vec::new(),
            disposition: Disposition::Ignored,
        }
    }

    fn stale(session: Session) -> Self {
        Self {
            session,
            effects: Vec::new(),
            disposition: Disposition::Stale,
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Pure session reducer: `(session, action) -> (session, effects)`.
pub fn transition(session: Session, action: Action) -> Transition {
    match action {
        Action::LoadImage(image) => load_image(session, image),
        Action::SetPrompt(prompt) => {
            let mut session = session;
            session.prompt = prompt;
            Transition::applied(session)
        }
        Action::ResetPrompt => {
            let mut session = session;
            session.prompt = DEFAULT_PROMPT.to_string();
            Transition::applied(session)
        }
        Action::ApplySuggestion(id) => {
            let Some(prompt) = session.suggestion(&id).map(|row| row.prompt.clone()) else {
                return Transition::ignored(session);
            };
            let mut session = session;
            session.prompt = prompt;
            Transition::applied(session)
        }
        Action::ApplyEdit { prompt } => apply_edit(session, prompt),
        Action::Clear => clear(session),
        Action::ToggleComparison(on) => {
            if on && session.edited_image.is_none() {
                return Transition::ignored(session);
            }
            let mut session = session;
            session.show_comparison = on;
            Transition::applied(session)
        }
        Action::RestoreFromHistory(id) => {
            if session.original_image.is_none() {
                return Transition::ignored(session);
            }
            let Some(image) = session.history_entry(&id).map(|entry| entry.image.clone()) else {
                return Transition::ignored(session);
            };
            let mut session = session;
            session.edited_image = Some(image);
            Transition::applied(session)
        }
        Action::OpenExplorer => {
            if session.original_image.is_none() || session.explorer_open {
                return Transition::ignored(session);
            }
            let mut session = session;
            session.explorer_open = true;
            session.explorer_epoch += 1;
            session.suggestion_previews.clear();
            Transition::applied(session)
        }
        Action::CloseExplorer => {
            if !session.explorer_open {
                return Transition::ignored(session);
            }
            let mut session = session;
            session.explorer_open = false;
            session.suggestion_previews.clear();
            Transition::applied(session)
        }
        Action::GeneratePreview(id) => generate_preview(session, id),
        Action::Completed(completion) => complete(session, completion),
    }
}

fn load_image(mut session: Session, image: ImageHandle) -> Transition {
    session.generation += 1;
    session.original_image = Some(image.clone());
    session.edited_image = None;
    session.error = None;
    session.show_comparison = false;
    session.is_processing = false;
    session.suggestions.clear();
    session.suggestion_previews.clear();
    session.explorer_open = false;

    if session.config_error.is_some() {
        session.suggestions_loading = false;
        return Transition::applied(session);
    }
    session.suggestions_loading = true;
    let generation = session.generation;
    Transition::applied(session).with_effect(Effect::FetchSuggestions { generation, image })
}

fn apply_edit(mut session: Session, prompt: Option<String>) -> Transition {
    if session.is_processing {
        return Transition::ignored(session);
    }
    if let Some(message) = session.config_error.clone() {
        if let Some(prompt) = prompt {
            session.prompt = prompt;
        }
        session.error = Some(message);
        return Transition::applied(session);
    }

    let prompt = prompt.unwrap_or_else(|| session.prompt.clone());
    let Some(image) = session.original_image.clone() else {
        return Transition::ignored(session);
    };
    if prompt.trim().is_empty() {
        return Transition::ignored(session);
    }

    session.prompt = prompt.clone();
    session.is_processing = true;
    session.error = None;
    let generation = session.generation;
    Transition::applied(session).with_effect(Effect::RequestEdit {
        generation,
        image,
        prompt,
    })
}

fn clear(mut session: Session) -> Transition {
    session.generation += 1;
    session.original_image = None;
    session.edited_image = None;
    session.error = None;
    session.show_comparison = false;
    session.is_processing = false;
    session.suggestions.clear();
    session.suggestion_previews.clear();
    session.suggestions_loading = false;
    session.explorer_open = false;
    Transition::applied(session)
}

fn generate_preview(mut session: Session, id: String) -> Transition {
    if !session.explorer_open || session.config_error.is_some() {
        return Transition::ignored(session);
    }
    let Some(image) = session.original_image.clone() else {
        return Transition::ignored(session);
    };
    let Some(instruction) = session.suggestion(&id).map(|row| row.prompt.clone()) else {
        return Transition::ignored(session);
    };
    let preview = session.suggestion_previews.entry(id.clone()).or_default();
    if preview.loading {
        return Transition::ignored(session);
    }
    preview.loading = true;

    let ticket = PreviewTicket {
        generation: session.generation,
        epoch: session.explorer_epoch,
        suggestion_id: id,
    };
    Transition::applied(session).with_effect(Effect::RequestPreview {
        ticket,
        image,
        instruction,
    })
}

fn complete(mut session: Session, completion: Completion) -> Transition {
    if completion.generation() != session.generation {
        return Transition::stale(session);
    }
    match completion {
        Completion::SuggestionsResolved { suggestions, .. } => {
            if !session.suggestions_loading {
                return Transition::stale(session);
            }
            session.suggestions = suggestions;
            session.suggestions_loading = false;
            let known = &session.suggestions;
            session
                .suggestion_previews
                .retain(|id, _| known.iter().any(|row| &row.id == id));
            Transition::applied(session)
        }
        Completion::EditSucceeded {
            prompt,
            image,
            entry_id,
            created_at_ms,
            ..
        } => {
            if !session.is_processing {
                return Transition::stale(session);
            }
            session.edited_image = Some(image.clone());
            session.is_processing = false;
            session.history.insert(
                0,
                HistoryEntry {
                    id: entry_id,
                    image,
                    prompt,
                    created_at_ms,
                },
            );
            Transition::applied(session)
        }
        Completion::EditFailed { message, .. } => {
            if !session.is_processing {
                return Transition::stale(session);
            }
            session.error = Some(message);
            session.is_processing = false;
            Transition::applied(session)
        }
        Completion::PreviewResolved { ticket, image } => {
            if !session.explorer_open || ticket.epoch != session.explorer_epoch {
                return Transition::stale(session);
            }
            let Some(preview) = session.suggestion_previews.get_mut(&ticket.suggestion_id) else {
                return Transition::stale(session);
            };
            if !preview.loading {
                return Transition::stale(session);
            }
            preview.loading = false;
            if let Some(image) = image {
                preview.image = Some(image);
            }
            Transition::applied(session)
        }
    }
}
