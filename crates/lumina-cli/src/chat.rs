use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::DateTime;
use lumina_contracts::chat::{chat_help_rows, parse_chat_command, ChatCommand, PreviewTarget};
use lumina_contracts::export::{default_export_name, export_history, save_image};
use lumina_contracts::image_handle::ImageHandle;
use lumina_contracts::session::{Action, Disposition, Session};
use lumina_engine::SessionRuntime;

use crate::{unix_epoch_millis, write_suggestion, AppContext, ChatArgs};

pub(crate) fn run_chat(context: &AppContext, args: ChatArgs) -> Result<i32> {
    let mut chat = ChatSession::new(context.runtime(), args.out);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(
        out,
        "Lumina chat started on gateway '{}'. Type /help for commands.",
        chat.runtime.gateway_name()
    )?;
    if let Some(message) = chat.runtime.session().config_error.as_deref() {
        writeln!(out, "Warning: {message}")?;
    }
    if let Some(path) = args.image {
        chat.handle(
            ChatCommand::Load {
                path: path.to_string_lossy().to_string(),
            },
            &mut out,
        )?;
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }
        let command = parse_chat_command(line.trim_end_matches(['\n', '\r']));
        if !chat.handle(command, &mut out)? {
            break;
        }
    }
    Ok(0)
}

pub(crate) struct ChatSession {
    runtime: SessionRuntime,
    out_dir: PathBuf,
}

impl ChatSession {
    pub(crate) fn new(runtime: SessionRuntime, out_dir: PathBuf) -> Self {
        Self { runtime, out_dir }
    }

    /// Runs one command. Returns `false` when the loop should stop.
    pub(crate) fn handle<W: Write>(&mut self, command: ChatCommand, out: &mut W) -> Result<bool> {
        self.runtime.poll();
        match command {
            ChatCommand::Noop => {}
            ChatCommand::Help => {
                for (usage, summary) in chat_help_rows() {
                    writeln!(out, "  {usage:<22} {summary}")?;
                }
            }
            ChatCommand::Quit => return Ok(false),
            ChatCommand::Load { path } => match ImageHandle::from_path(Path::new(&path)) {
                Ok(image) => {
                    let summary = describe_image(&image);
                    self.runtime.dispatch(Action::LoadImage(image));
                    writeln!(out, "Loaded {path} ({summary}).")?;
                    if self.runtime.session().suggestions_loading {
                        writeln!(out, "Fetching style suggestions in the background.")?;
                    }
                }
                Err(err) => writeln!(out, "Load failed: {err:#}")?,
            },
            ChatCommand::Edit { prompt } => self.edit(prompt, out)?,
            ChatCommand::SetPrompt { prompt } => {
                self.runtime.dispatch(Action::SetPrompt(prompt));
                writeln!(out, "Prompt set.")?;
            }
            ChatCommand::ResetPrompt => {
                self.runtime.dispatch(Action::ResetPrompt);
                writeln!(out, "Prompt reset: {}", self.runtime.session().prompt)?;
            }
            ChatCommand::Suggestions => {
                self.wait_while(|session| session.suggestions_loading);
                let session = self.runtime.session();
                if session.suggestions.is_empty() {
                    writeln!(out, "No suggestions available.")?;
                }
                for suggestion in &session.suggestions {
                    write_suggestion(out, suggestion)?;
                }
            }
            ChatCommand::UseSuggestion { id } => {
                self.wait_while(|session| session.suggestions_loading);
                match self.runtime.dispatch(Action::ApplySuggestion(id.clone())) {
                    Disposition::Applied => {
                        writeln!(out, "Prompt: {}", self.runtime.session().prompt)?
                    }
                    _ => writeln!(out, "Unknown suggestion '{id}'. Try /suggestions.")?,
                }
            }
            ChatCommand::Explore => {
                self.wait_while(|session| session.suggestions_loading);
                match self.runtime.dispatch(Action::OpenExplorer) {
                    Disposition::Applied => writeln!(
                        out,
                        "Style explorer open with {} suggestions. Use /preview <id|all>.",
                        self.runtime.session().suggestions.len()
                    )?,
                    _ => writeln!(out, "Load an image before opening the explorer.")?,
                }
            }
            ChatCommand::Preview { target } => self.preview(target, out)?,
            ChatCommand::CloseExplorer => {
                self.runtime.dispatch(Action::CloseExplorer);
                writeln!(out, "Style explorer closed.")?;
            }
            ChatCommand::Compare { on } => {
                match self.runtime.dispatch(Action::ToggleComparison(on)) {
                    Disposition::Applied => {
                        let showing = self
                            .runtime
                            .session()
                            .display_image()
                            .map(describe_image)
                            .unwrap_or_else(|| "nothing".to_string());
                        writeln!(out, "Showing {showing}.")?;
                    }
                    _ => writeln!(out, "Nothing to compare yet.")?,
                }
            }
            ChatCommand::History => {
                let history = &self.runtime.session().history;
                if history.is_empty() {
                    writeln!(out, "History is empty.")?;
                }
                for entry in history {
                    writeln!(
                        out,
                        "  {}  {}  {}  {}",
                        entry.id,
                        format_created_at(entry.created_at_ms),
                        describe_image(&entry.image),
                        entry.prompt
                    )?;
                }
            }
            ChatCommand::Restore { id } => {
                match self.runtime.dispatch(Action::RestoreFromHistory(id.clone())) {
                    Disposition::Applied => writeln!(out, "Restored {id}.")?,
                    _ => writeln!(out, "Cannot restore '{id}': unknown entry or no image loaded.")?,
                }
            }
            ChatCommand::Save { path } => self.save(path, out)?,
            ChatCommand::Export { dir } => {
                let dir = dir
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.out_dir.join("history"));
                let rows = export_history(&self.runtime.session().history, &dir)?;
                writeln!(out, "Exported {} entries to {}.", rows.len(), dir.display())?;
            }
            ChatCommand::Clear => {
                self.runtime.dispatch(Action::Clear);
                writeln!(
                    out,
                    "Cleared. {} history entries kept.",
                    self.runtime.session().history.len()
                )?;
            }
            ChatCommand::Status => write_status(self.runtime.session(), out)?,
            ChatCommand::Invalid { usage, .. } => writeln!(out, "Usage: {usage}")?,
            ChatCommand::Unknown { command, .. } => {
                writeln!(out, "Unknown command /{command}. Type /help.")?
            }
        }
        Ok(true)
    }

    fn edit<W: Write>(&mut self, prompt: Option<String>, out: &mut W) -> Result<()> {
        if self.runtime.dispatch(Action::ApplyEdit { prompt }) == Disposition::Ignored {
            let session = self.runtime.session();
            let reason = if session.original_image.is_none() {
                "load an image first"
            } else if session.is_processing {
                "an edit is already running"
            } else {
                "the prompt is empty"
            };
            writeln!(out, "Edit not started: {reason}.")?;
            return Ok(());
        }
        writeln!(out, "Editing...")?;
        self.wait_while(|session| session.is_processing);

        let session = self.runtime.session();
        if let Some(message) = session.error.as_deref() {
            writeln!(out, "Error: {message}")?;
        } else if let Some(entry) = session.history.first() {
            writeln!(out, "Edited ({}) [{}].", describe_image(&entry.image), entry.id)?;
        }
        Ok(())
    }

    fn preview<W: Write>(&mut self, target: PreviewTarget, out: &mut W) -> Result<()> {
        let session = self.runtime.session();
        if let Some(message) = session.config_error.as_deref() {
            writeln!(out, "Previews unavailable: {message}")?;
            return Ok(());
        }
        if !session.explorer_open {
            writeln!(out, "Open the style explorer with /explore first.")?;
            return Ok(());
        }
        let ids: Vec<String> = match target {
            PreviewTarget::All => self
                .runtime
                .session()
                .suggestions
                .iter()
                .map(|row| row.id.clone())
                .collect(),
            PreviewTarget::One(id) => vec![id],
        };
        let mut started = Vec::new();
        for id in ids {
            match self.runtime.dispatch(Action::GeneratePreview(id.clone())) {
                Disposition::Applied => started.push(id),
                _ => {
                    let reason = if self.runtime.session().suggestion(&id).is_none() {
                        "unknown suggestion, try /suggestions"
                    } else {
                        "already rendering"
                    };
                    writeln!(out, "Preview '{id}' not started: {reason}.")?
                }
            }
        }
        if started.is_empty() {
            return Ok(());
        }
        self.wait_while(|session| session.previews_in_flight() > 0);

        let session = self.runtime.session();
        for id in started {
            let image = session
                .suggestion_previews
                .get(&id)
                .and_then(|preview| preview.image.as_ref());
            match image {
                Some(image) => writeln!(out, "  {id}: {}", describe_image(image))?,
                None => writeln!(out, "  {id}: no preview")?,
            }
        }
        Ok(())
    }

    fn save<W: Write>(&mut self, path: Option<String>, out: &mut W) -> Result<()> {
        let Some(image) = self.runtime.session().edited_image.as_ref() else {
            writeln!(out, "No edited image to save.")?;
            return Ok(());
        };
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| self.out_dir.join(default_export_name(image, unix_epoch_millis())));
        let written = save_image(image, &path)?;
        writeln!(out, "Saved {}.", written.display())?;
        Ok(())
    }

    fn wait_while<F>(&mut self, pending: F)
    where
        F: Fn(&Session) -> bool,
    {
        while pending(self.runtime.session()) {
            if self.runtime.wait_next().is_none() {
                break;
            }
        }
    }
}

fn describe_image(image: &ImageHandle) -> String {
    let approx_kb = (image.encoded_len() * 3 / 4).div_ceil(1024);
    format!("{}, ~{approx_kb} KB, #{}", image.mime_type(), image.fingerprint())
}

fn format_created_at(created_at_ms: i64) -> String {
    DateTime::from_timestamp_millis(created_at_ms)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn write_status<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    writeln!(out, "phase:       {:?}", session.phase())?;
    writeln!(
        out,
        "original:    {}",
        session
            .original_image
            .as_ref()
            .map(describe_image)
            .unwrap_or_else(|| "-".to_string())
    )?;
    writeln!(
        out,
        "edited:      {}",
        session
            .edited_image
            .as_ref()
            .map(describe_image)
            .unwrap_or_else(|| "-".to_string())
    )?;
    writeln!(out, "prompt:      {}", session.prompt)?;
    writeln!(out, "suggestions: {}", session.suggestions.len())?;
    writeln!(out, "history:     {}", session.history.len())?;
    writeln!(out, "compare:     {}", if session.show_comparison { "on" } else { "off" })?;
    if let Some(error) = session.error.as_deref() {
        writeln!(out, "error:       {error}")?;
    }
    Ok(())
}
