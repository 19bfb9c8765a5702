mod chat;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lumina_contracts::config::{GatewayConfig, DEFAULT_EDIT_MODEL, DEFAULT_SUGGEST_MODEL};
use lumina_contracts::events::EventWriter;
use lumina_contracts::export::save_image;
use lumina_contracts::image_handle::ImageHandle;
use lumina_contracts::models::{Capability, ModelSelector};
use lumina_contracts::session::{Action, StyleSuggestion};
use lumina_engine::adapters::{request_suggestions, try_request_suggestions};
use lumina_engine::{default_gateway_registry, ModelGateway, SessionRuntime};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "lumina", version, about = "AI photo editing session over a Gemini-style gateway")]
struct Cli {
    /// Gateway that serves model calls (`gemini` or `dryrun`).
    #[arg(long, global = true, default_value = "gemini")]
    gateway: String,
    #[arg(long, global = true)]
    edit_model: Option<String>,
    #[arg(long, global = true)]
    suggest_model: Option<String>,
    /// Append session events to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Edit(EditArgs),
    Suggest(SuggestArgs),
    Explore(ExploreArgs),
    Chat(ChatArgs),
}

#[derive(Debug, Parser)]
struct EditArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct SuggestArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    json: bool,
    /// Fail instead of printing an empty list when the gateway call fails.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Parser)]
struct ExploreArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
pub(crate) struct ChatArgs {
    #[arg(long)]
    pub(crate) image: Option<PathBuf>,
    #[arg(long, default_value = "lumina-out")]
    pub(crate) out: PathBuf,
}

/// Everything a subcommand needs to talk to the gateway.
pub(crate) struct AppContext {
    pub(crate) gateway: Arc<dyn ModelGateway>,
    pub(crate) config: GatewayConfig,
    pub(crate) events: EventWriter,
}

impl AppContext {
    pub(crate) fn runtime(&self) -> SessionRuntime {
        SessionRuntime::new(
            Arc::clone(&self.gateway),
            self.config.clone(),
            self.events.clone(),
        )
    }

    /// Missing-credential message, only for gateways that need a key.
    pub(crate) fn credential_error(&self) -> Option<String> {
        if !self.gateway.requires_credential() {
            return None;
        }
        self.config.credential_error().map(|err| err.to_string())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("LUMINA_LOG", "info"))
        .format_timestamp_millis()
        .init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("lumina error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let context = build_context(&cli)?;
    match cli.command {
        Command::Edit(args) => run_edit(&context, args),
        Command::Suggest(args) => run_suggest(&context, args),
        Command::Explore(args) => run_explore(&context, args),
        Command::Chat(args) => chat::run_chat(&context, args),
    }
}

fn build_context(cli: &Cli) -> Result<AppContext> {
    let mut config = GatewayConfig::from_env();
    let registry = default_gateway_registry(&config);
    let Some(gateway) = registry.get(&cli.gateway) else {
        bail!(
            "unknown gateway '{}' (available: {})",
            cli.gateway,
            registry.names().join(", ")
        );
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let events = match cli.events.as_ref() {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            EventWriter::new(path, session_id)
        }
        None => EventWriter::discard(session_id),
    };

    let selector = ModelSelector::default();
    let edit_requested = cli
        .edit_model
        .clone()
        .or_else(|| (config.edit_model != DEFAULT_EDIT_MODEL).then(|| config.edit_model.clone()));
    config.edit_model = resolve_model(
        &selector,
        &events,
        edit_requested.as_deref(),
        Capability::ImageEdit,
        gateway.name(),
    )?;
    let suggest_requested = cli.suggest_model.clone().or_else(|| {
        (config.suggest_model != DEFAULT_SUGGEST_MODEL).then(|| config.suggest_model.clone())
    });
    config.suggest_model = resolve_model(
        &selector,
        &events,
        suggest_requested.as_deref(),
        Capability::StyleSuggest,
        gateway.name(),
    )?;

    log::info!(
        "gateway={} edit_model={} suggest_model={}",
        gateway.name(),
        config.edit_model,
        config.suggest_model
    );
    Ok(AppContext {
        gateway,
        config,
        events,
    })
}

fn resolve_model(
    selector: &ModelSelector,
    events: &EventWriter,
    requested: Option<&str>,
    capability: Capability,
    gateway: &str,
) -> Result<String> {
    let selection = selector
        .select(requested, capability, gateway)
        .map_err(anyhow::Error::msg)?;
    if let (Some(reason), Some(requested)) = (selection.fallback_reason.as_ref(), requested) {
        log::warn!("{reason} Using '{}'.", selection.model.name);
        events.emit(
            "model_fallback",
            json_object(json!({
                "capability": capability.as_str(),
                "requested": requested,
                "selected": selection.model.name,
                "reason": reason,
            })),
        )?;
    }
    Ok(selection.model.name)
}

fn run_edit(context: &AppContext, args: EditArgs) -> Result<i32> {
    let image = ImageHandle::from_path(&args.image)?;
    let mut runtime = context.runtime();
    runtime.dispatch(Action::LoadImage(image));
    runtime.dispatch(Action::ApplyEdit {
        prompt: Some(args.prompt),
    });
    while runtime.session().is_processing {
        if runtime.wait_next().is_none() {
            break;
        }
    }

    let session = runtime.session();
    if let Some(message) = session.error.as_deref() {
        eprintln!("{message}");
        return Ok(1);
    }
    let Some(edited) = session.edited_image.as_ref() else {
        eprintln!("Edit did not run: an image and a non-empty prompt are required.");
        return Ok(1);
    };
    let path = save_image(edited, &args.out)?;
    println!("Saved {}", path.display());
    Ok(0)
}

fn run_suggest(context: &AppContext, args: SuggestArgs) -> Result<i32> {
    let image = ImageHandle::from_path(&args.image)?;
    if let Some(message) = context.credential_error() {
        eprintln!("{message}");
        return Ok(1);
    }
    let gateway = context.gateway.as_ref();
    let suggestions = if args.strict {
        match try_request_suggestions(gateway, &context.config, &image) {
            Ok(suggestions) => suggestions,
            Err(err) => {
                eprintln!("Suggestions failed ({}): {err}", err.kind().as_str());
                return Ok(1);
            }
        }
    } else {
        request_suggestions(gateway, &context.config, &image)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
    } else if suggestions.is_empty() {
        println!("No suggestions available.");
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for suggestion in &suggestions {
            write_suggestion(&mut out, suggestion)?;
        }
    }
    Ok(0)
}

fn run_explore(context: &AppContext, args: ExploreArgs) -> Result<i32> {
    let image = ImageHandle::from_path(&args.image)?;
    let mut runtime = context.runtime();
    if let Some(message) = runtime.session().config_error.as_deref() {
        eprintln!("{message}");
        return Ok(1);
    }
    runtime.dispatch(Action::LoadImage(image));
    while runtime.session().suggestions_loading {
        if runtime.wait_next().is_none() {
            break;
        }
    }
    let ids: Vec<String> = runtime
        .session()
        .suggestions
        .iter()
        .map(|row| row.id.clone())
        .collect();
    if ids.is_empty() {
        eprintln!("No suggestions available to preview.");
        return Ok(1);
    }

    runtime.dispatch(Action::OpenExplorer);
    for id in &ids {
        runtime.dispatch(Action::GeneratePreview(id.clone()));
    }
    runtime.wait_idle();

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let session = runtime.session();
    for suggestion in &session.suggestions {
        let preview = session
            .suggestion_previews
            .get(&suggestion.id)
            .and_then(|preview| preview.image.as_ref());
        match preview {
            Some(image) => {
                let path = preview_path(&args.out, &suggestion.id, image.file_extension());
                save_image(image, &path)?;
                println!("{:<16} {}", suggestion.id, path.display());
            }
            None => println!("{:<16} (no preview)", suggestion.id),
        }
    }
    Ok(0)
}

fn preview_path(dir: &Path, id: &str, ext: &str) -> PathBuf {
    let stem: String = id
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    dir.join(format!("preview-{stem}.{ext}"))
}

pub(crate) fn write_suggestion<W: Write>(out: &mut W, suggestion: &StyleSuggestion) -> io::Result<()> {
    writeln!(
        out,
        "{} {} [{}]\n    {}\n    -> {}",
        suggestion.icon, suggestion.label, suggestion.id, suggestion.prompt, suggestion.sample_outcome
    )
}

pub(crate) fn json_object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap_or_default()
}

pub(crate) fn unix_epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use clap::Parser;
    use lumina_contracts::config::GatewayConfig;
    use lumina_contracts::errors::MISSING_CREDENTIAL_MESSAGE;
    use lumina_contracts::events::EventWriter;
    use lumina_engine::dryrun::DryrunGateway;
    use lumina_engine::gemini::GeminiGateway;

    use super::{
        preview_path, run_explore, run_suggest, AppContext, Cli, Command, ExploreArgs, SuggestArgs,
    };

    fn keyless_gemini() -> AppContext {
        let config = GatewayConfig::default();
        AppContext {
            gateway: Arc::new(GeminiGateway::new(&config)),
            config,
            events: EventWriter::discard("cli-test"),
        }
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "lumina",
            "edit",
            "--image",
            "in.png",
            "--prompt",
            "make it sepia",
            "--out",
            "out.png",
            "--gateway",
            "dryrun",
        ]);
        assert_eq!(cli.gateway, "dryrun");
        match cli.command {
            Command::Edit(args) => assert_eq!(args.prompt, "make it sepia"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn chat_defaults_output_dir() {
        let cli = Cli::parse_from(["lumina", "chat"]);
        match cli.command {
            Command::Chat(args) => {
                assert!(args.image.is_none());
                assert_eq!(args.out, Path::new("lumina-out"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn preview_paths_are_filesystem_safe() {
        assert_eq!(
            preview_path(Path::new("out"), "neon/noir", "png"),
            Path::new("out").join("preview-neon_noir.png")
        );
    }

    #[test]
    fn suggest_and_explore_stop_on_missing_credential() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image = temp.path().join("photo.png");
        fs::write(&image, b"png-bytes")?;
        let context = keyless_gemini();
        assert_eq!(
            context.credential_error().as_deref(),
            Some(MISSING_CREDENTIAL_MESSAGE)
        );

        let suggest = SuggestArgs {
            image: image.clone(),
            json: false,
            strict: false,
        };
        assert_eq!(run_suggest(&context, suggest)?, 1);

        let out = temp.path().join("previews");
        let explore = ExploreArgs {
            image,
            out: out.clone(),
        };
        assert_eq!(run_explore(&context, explore)?, 1);
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn offline_gateway_has_no_credential_error() {
        let context = AppContext {
            gateway: Arc::new(DryrunGateway),
            config: GatewayConfig::default(),
            events: EventWriter::discard("cli-test"),
        };
        assert_eq!(context.credential_error(), None);
    }
}
