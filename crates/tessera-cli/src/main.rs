//! Tessera CLI: serve the multimodal HTTP API or chat in the terminal.

mod collaborators;
mod display;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_config::{CliOverrides, TesseraConfig};
use tessera_core::{HandlerError, Orchestrator, OutputType};
use tessera_server::AppState;
use tessera_session::LogStatus;
use tessera_types::{Feature, ImageSource, InputMode};

/// Entries shown by `/log` when no count is given.
const DEFAULT_LOG_ENTRIES: usize = 5;

#[derive(Parser)]
#[command(name = "tessera", version, about = "Multimodal chat orchestrator")]
struct Cli {
    /// Config file (defaults to ~/.tessera/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the OpenAI-compatible model server
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory for logs, uploads and synthesized audio
    #[arg(long, global = true)]
    outputs_dir: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat interactively in the terminal
    Chat {
        /// Speak every reply
        #[arg(long)]
        speak: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Command::Serve { .. }, false) => "info",
        (Command::Chat { .. }, false) => "warn",
    };
    init_logging(default_level, cli.log_format);

    let (host, port) = match &cli.command {
        Command::Serve { host, port } => (host.clone(), *port),
        Command::Chat { .. } => (None, None),
    };
    let config = TesseraConfig::load(CliOverrides {
        config_path: cli.config,
        base_url: cli.base_url,
        outputs_dir: cli.outputs_dir,
        host,
        port,
    })
    .context("Failed to load configuration")?;

    let orchestrator = collaborators::build_orchestrator(&config)?;

    match cli.command {
        Command::Serve { .. } => serve(orchestrator, &config).await,
        Command::Chat { speak } => repl(&orchestrator, &config, speak).await,
    }
}

fn init_logging(default_level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn serve(orchestrator: Orchestrator, config: &TesseraConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    tracing::info!(
        "Outputs directory: {} (model: {})",
        config.outputs_dir.display(),
        config.generation.endpoint.model
    );

    let state = AppState::new(Arc::new(orchestrator));
    tessera_server::serve(state, addr)
        .await
        .with_context(|| format!("Server on {addr} failed"))
}

async fn repl(orchestrator: &Orchestrator, config: &TesseraConfig, speak: bool) -> Result<()> {
    let mut state = ReplState { speak };
    let stdin = io::stdin();

    eprintln!(
        "tessera v{} (model: {}, outputs: {})",
        env!("CARGO_PKG_VERSION"),
        config.generation.endpoint.model,
        config.outputs_dir.display()
    );
    eprintln!("Type your message, or /help for commands. Press Ctrl+D to exit.\n");

    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let mut input = String::new();
        let bytes_read = stdin.lock().read_line(&mut input)?;
        if bytes_read == 0 {
            eprintln!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(handled) = handle_slash_command(input, orchestrator, &mut state).await {
            match handled {
                SlashResult::Continue => continue,
                SlashResult::Break => break,
                SlashResult::Unknown => {
                    eprintln!("Unknown command: {input}. Type /help for available commands.");
                    continue;
                }
            }
        }

        match orchestrator
            .chat(input, state.output(), InputMode::Text)
            .await
        {
            Ok(reply) => {
                println!("{}", reply.response);
                print_audio(reply.audio_file.as_deref());
                display::print_degraded(&reply.degraded);
                print_context_brief(orchestrator).await;
            }
            Err(e) => eprintln!("Error: {e}"),
        }
        println!();
    }

    Ok(())
}

struct ReplState {
    speak: bool,
}

impl ReplState {
    fn output(&self) -> OutputType {
        if self.speak {
            OutputType::Both
        } else {
            OutputType::Text
        }
    }
}

enum SlashResult {
    Continue,
    Break,
    Unknown,
}

async fn handle_slash_command(
    input: &str,
    orchestrator: &Orchestrator,
    state: &mut ReplState,
) -> Option<SlashResult> {
    if !input.starts_with('/') {
        return None;
    }

    let (cmd, args) = match input.split_once(' ') {
        Some((c, a)) => (c, Some(a.trim()).filter(|a| !a.is_empty())),
        None => (input, None),
    };

    match cmd {
        "/quit" | "/exit" => Some(SlashResult::Break),
        "/help" => {
            display::print_help();
            Some(SlashResult::Continue)
        }
        "/speak" => {
            state.speak = !state.speak;
            eprintln!("Spoken replies {}.", if state.speak { "on" } else { "off" });
            Some(SlashResult::Continue)
        }
        "/context" => {
            let info = orchestrator.context_info().await;
            eprintln!("{}", orchestrator.context_tracker().format_detailed(&info));
            Some(SlashResult::Continue)
        }
        "/audio" => {
            match args {
                Some(path) => handle_audio(orchestrator, state, path).await,
                None => eprintln!("Usage: /audio <path>"),
            }
            Some(SlashResult::Continue)
        }
        "/image" => {
            match args {
                Some(source) => handle_image(orchestrator, state, source).await,
                None => eprintln!("Usage: /image <path-or-url>"),
            }
            Some(SlashResult::Continue)
        }
        "/log" => {
            match args {
                Some(args) => handle_log(orchestrator, args).await,
                None => eprintln!("Usage: /log <chat|speech|image|synthesis> [n]"),
            }
            Some(SlashResult::Continue)
        }
        _ => Some(SlashResult::Unknown),
    }
}

async fn handle_audio(orchestrator: &Orchestrator, state: &ReplState, path: &str) {
    let path = Path::new(path.trim_matches(|c| c == '"' || c == '\''));
    match orchestrator.voice(path, state.output()).await {
        Ok(reply) => {
            eprintln!("You said: {}", reply.input_voice_text);
            println!("{}", reply.response);
            print_audio(reply.audio_file.as_deref());
            display::print_degraded(&reply.degraded);
            print_context_brief(orchestrator).await;
        }
        Err(e) => print_handler_error(&e),
    }
}

async fn handle_image(orchestrator: &Orchestrator, state: &ReplState, source: &str) {
    match orchestrator
        .image(ImageSource::parse(source), state.output())
        .await
    {
        Ok(reply) => {
            let analysis = &reply.image_analysis;
            eprintln!("Image: {}", analysis.image_name);
            eprintln!("Caption: {}", analysis.image_description);
            if analysis.extracted_text.is_empty() {
                eprintln!("Text: (none)");
            } else {
                eprintln!("Text: {}", analysis.extracted_text);
            }
            println!("{}", reply.response);
            print_audio(reply.audio_file.as_deref());
            display::print_degraded(&reply.degraded);
            print_context_brief(orchestrator).await;
        }
        Err(e) => print_handler_error(&e),
    }
}

async fn handle_log(orchestrator: &Orchestrator, args: &str) {
    let mut parts = args.split_whitespace();
    let feature = match parts.next().map(str::parse::<Feature>) {
        Some(Ok(feature)) => feature,
        Some(Err(e)) => {
            eprintln!("{e}");
            return;
        }
        None => return,
    };
    let count = match parts.next().map(str::parse::<usize>) {
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            eprintln!("Usage: /log <chat|speech|image|synthesis> [n]");
            return;
        }
        None => DEFAULT_LOG_ENTRIES,
    };

    let store = orchestrator.log_store();
    match store.read(feature).await {
        Ok(log) => {
            if let LogStatus::Recovered { reason } = &log.status {
                eprintln!(
                    "Note: {} is unreadable ({reason}); it will restart on the next write.",
                    store.path_for(feature).display()
                );
            }
            if log.entries.is_empty() {
                eprintln!("No {feature} entries yet.");
                return;
            }
            let skip = log.entries.len().saturating_sub(count);
            eprintln!(
                "{} ({} of {} entries):",
                store.path_for(feature).display(),
                log.entries.len() - skip,
                log.entries.len()
            );
            for entry in &log.entries[skip..] {
                eprintln!("  {}", display::summarize_entry(entry));
            }
        }
        Err(e) => eprintln!("Failed to read log: {e}"),
    }
}

fn print_handler_error(e: &HandlerError) {
    eprintln!("Error: {e}");
}

fn print_audio(audio_file: Option<&str>) {
    if let Some(path) = audio_file {
        eprintln!("  [audio: {path}]");
    }
}

async fn print_context_brief(orchestrator: &Orchestrator) {
    let info = orchestrator.context_info().await;
    eprintln!("{}", orchestrator.context_tracker().format_brief(&info));
}
