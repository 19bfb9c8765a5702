use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;

use lumina_contracts::config::GatewayConfig;
use lumina_contracts::events::{EventPayload, EventWriter};
use lumina_contracts::session::{
    transition, Action, Completion, Disposition, Effect, Session, Transition,
};
use serde_json::{json, Value};

use crate::adapters::{request_edit, request_suggestions};
use crate::gateway::ModelGateway;

type Work = Box<dyn FnOnce() -> Completion + Send + 'static>;

/// Owns one [`Session`] and drives its effects.
///
/// Transitions only ever run on the thread holding the runtime. Each effect
/// gets its own worker thread which reports back over a channel; results are
/// applied on the next `poll`/`wait_*` call.
pub struct SessionRuntime {
    session: Session,
    gateway: Arc<dyn ModelGateway>,
    config: Arc<GatewayConfig>,
    events: EventWriter,
    sender: mpsc::Sender<Completion>,
    receiver: mpsc::Receiver<Completion>,
    in_flight: usize,
}

impl SessionRuntime {
    pub fn new(gateway: Arc<dyn ModelGateway>, config: GatewayConfig, events: EventWriter) -> Self {
        let config_error = if gateway.requires_credential() {
            config.credential_error().map(|err| err.to_string())
        } else {
            None
        };
        let (sender, receiver) = mpsc::channel();
        let runtime = Self {
            session: Session::new(config_error),
            gateway,
            config: Arc::new(config),
            events,
            sender,
            receiver,
            in_flight: 0,
        };
        runtime.record(
            "session_started",
            json!({
                "gateway": runtime.gateway.name(),
                "edit_model": runtime.config.edit_model,
                "suggest_model": runtime.config.suggest_model,
                "config_error": runtime.session.config_error,
            }),
        );
        runtime
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Requests issued and not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn dispatch(&mut self, action: Action) -> Disposition {
        let name = action.name();
        let completion = match &action {
            Action::Completed(completion) => Some(completion.clone()),
            _ => None,
        };
        let before_generation = self.session.generation;
        let Transition {
            session,
            effects,
            disposition,
        } = transition(std::mem::take(&mut self.session), action);
        self.session = session;

        match disposition {
            Disposition::Applied => {
                log::info!(
                    "{name} applied (generation={} effects={})",
                    self.session.generation,
                    effects.len()
                );
                self.record_applied(name, completion.as_ref(), &effects);
            }
            Disposition::Ignored => {
                log::info!("{name} ignored in phase {:?}", self.session.phase());
            }
            Disposition::Stale => {
                log::warn!(
                    "{name} discarded: issued for generation {} but session is at {}",
                    completion
                        .as_ref()
                        .map(Completion::generation)
                        .unwrap_or(before_generation),
                    self.session.generation
                );
                self.record(
                    "result_discarded",
                    json!({
                        "action": name,
                        "issued_generation": completion.as_ref().map(Completion::generation),
                        "generation": self.session.generation,
                        "explorer_epoch": self.session.explorer_epoch,
                    }),
                );
            }
        }

        for effect in effects {
            self.spawn_effect(effect);
        }
        disposition
    }

    /// Applies every completion that has already arrived.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.receiver.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.dispatch(Action::Completed(completion));
            applied += 1;
        }
        applied
    }

    /// Blocks for one completion. `None` when nothing is in flight.
    pub fn wait_next(&mut self) -> Option<Disposition> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.receiver.recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(self.dispatch(Action::Completed(completion)))
    }

    pub fn wait_idle(&mut self) {
        while self.wait_next().is_some() {}
    }

    fn spawn_effect(&mut self, effect: Effect) {
        let gateway = Arc::clone(&self.gateway);
        let config = Arc::clone(&self.config);
        let effect_name = effect.name();

        let (thread_name, fallback, work): (&str, Completion, Work) = match effect {
            Effect::FetchSuggestions { generation, image } => (
                "lumina-suggest",
                Completion::SuggestionsResolved {
                    generation,
                    suggestions: Vec::new(),
                },
                Box::new(move || Completion::SuggestionsResolved {
                    generation,
                    suggestions: request_suggestions(gateway.as_ref(), &config, &image),
                }),
            ),
            Effect::RequestEdit {
                generation,
                image,
                prompt,
            } => (
                "lumina-edit",
                Completion::EditFailed {
                    generation,
                    message: "The edit worker stopped before returning a result.".to_string(),
                },
                Box::new(move || {
                    match request_edit(gateway.as_ref(), &config, &image, &prompt) {
                        Ok(image) => Completion::EditSucceeded {
                            generation,
                            prompt,
                            image,
                            entry_id: uuid::Uuid::new_v4().to_string(),
                            created_at_ms: chrono::Utc::now().timestamp_millis(),
                        },
                        Err(err) => {
                            log::warn!("edit failed ({}): {err}", err.kind().as_str());
                            Completion::EditFailed {
                                generation,
                                message: err.to_string(),
                            }
                        }
                    }
                }),
            ),
            Effect::RequestPreview {
                ticket,
                image,
                instruction,
            } => (
                "lumina-preview",
                Completion::PreviewResolved {
                    ticket: ticket.clone(),
                    image: None,
                },
                Box::new(move || {
                    let image = match request_edit(gateway.as_ref(), &config, &image, &instruction)
                    {
                        Ok(image) => Some(image),
                        Err(err) => {
                            log::debug!("preview {} failed: {err}", ticket.suggestion_id);
                            None
                        }
                    };
                    Completion::PreviewResolved { ticket, image }
                }),
            ),
        };

        let tx = self.sender.clone();
        let on_panic = fallback.clone();
        self.in_flight += 1;
        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                // Every issued effect reports exactly once.
                let completion = match panic::catch_unwind(AssertUnwindSafe(work)) {
                    Ok(completion) => completion,
                    Err(_) => {
                        log::error!("{effect_name} worker panicked");
                        on_panic
                    }
                };
                let _ = tx.send(completion);
            });
        if let Err(err) = spawned {
            log::warn!("{effect_name} worker spawn failed: {err}");
            let _ = self.sender.send(fallback);
        }
    }

    fn record_applied(&self, name: &str, completion: Option<&Completion>, effects: &[Effect]) {
        let session = &self.session;
        match completion {
            Some(Completion::SuggestionsResolved { suggestions, .. }) => self.record(
                "suggestions_resolved",
                json!({
                    "generation": session.generation,
                    "count": suggestions.len(),
                    "ids": suggestions.iter().map(|row| row.id.as_str()).collect::<Vec<_>>(),
                }),
            ),
            Some(Completion::EditSucceeded {
                prompt,
                image,
                entry_id,
                ..
            }) => self.record(
                "edit_succeeded",
                json!({
                    "generation": session.generation,
                    "entry_id": entry_id,
                    "prompt": prompt,
                    "mime_type": image.mime_type(),
                    "fingerprint": image.fingerprint(),
                    "history_len": session.history.len(),
                }),
            ),
            Some(Completion::EditFailed { message, .. }) => self.record(
                "edit_failed",
                json!({ "generation": session.generation, "message": message }),
            ),
            Some(Completion::PreviewResolved { ticket, image }) => self.record(
                "preview_resolved",
                json!({
                    "generation": session.generation,
                    "epoch": ticket.epoch,
                    "suggestion_id": ticket.suggestion_id,
                    "ok": image.is_some(),
                }),
            ),
            None => match name {
                "load_image" => self.record(
                    "image_loaded",
                    json!({
                        "generation": session.generation,
                        "mime_type": session.original_image.as_ref().map(|image| image.mime_type()),
                        "fingerprint": session.original_image.as_ref().map(|image| image.fingerprint()),
                    }),
                ),
                "apply_edit" => {
                    if effects.is_empty() {
                        self.record(
                            "edit_failed",
                            json!({
                                "generation": session.generation,
                                "message": session.error,
                                "kind": "configuration",
                            }),
                        );
                    } else {
                        self.record(
                            "edit_requested",
                            json!({ "generation": session.generation, "prompt": session.prompt }),
                        );
                    }
                }
                "clear" => self.record(
                    "session_cleared",
                    json!({ "generation": session.generation, "history_len": session.history.len() }),
                ),
                _ => {}
            },
        }
    }

    fn record(&self, event_type: &str, payload: Value) {
        let payload: EventPayload = payload.as_object().cloned().unwrap_or_default();
        if let Err(err) = self.events.emit(event_type, payload) {
            log::warn!("event {event_type} not recorded: {err:#}");
        }
    }
}
