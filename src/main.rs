use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use chatmock::config::{load_conversation, write_starter, Overrides, DEFAULT_DOCUMENT_NAME};
use chatmock::error_codes::{envelope_for, find_coded_error};
use chatmock::export::{capture_png, OutputTarget, RecordSettings, Recorder, RecorderEvent};
use chatmock::font_assets::discover_fonts;
use chatmock::model::{ConversationView, Message, MessageStatus, Platform, Profile};
use chatmock::raster::{straight_rgba, Rasterizer};
use chatmock::render::compose;
use chatmock::script::{script_stats, ScriptStats};
use chatmock::timeline::{build_timeline, RevealState, RevealTimeline, DEFAULT_FPS};

const LOG_ENV: &str = "CHATMOCK_LOG";

#[derive(Debug, Parser)]
#[command(name = "chatmock")]
#[command(about = "Render messaging-app conversation mockups from a plain-text script")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version (with git hash when available).
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
    /// Report results and errors as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args)]
struct DocumentArgs {
    /// Conversation document (YAML). Defaults apply when omitted.
    document: Option<PathBuf>,
    #[arg(long)]
    platform: Option<String>,
    #[arg(long)]
    status: Option<String>,
    /// Inline script; `\n` separates lines.
    #[arg(long)]
    script: Option<String>,
}

impl DocumentArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            platform: self.platform.clone(),
            status: self.status.clone(),
            script: self.script.clone(),
        }
    }
}

#[derive(Debug, Args)]
struct OutputArgs {
    #[arg(short = 'o', long = "output", conflicts_with = "out_dir")]
    output: Option<PathBuf>,
    #[arg(long = "out-dir")]
    out_dir: Option<PathBuf>,
}

impl OutputArgs {
    fn target(&self) -> OutputTarget {
        match (&self.output, &self.out_dir) {
            (Some(path), _) => OutputTarget::File(path.clone()),
            (None, Some(dir)) => OutputTarget::Dir(dir.clone()),
            (None, None) => OutputTarget::Dir(PathBuf::from(".")),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a conversation and print what would be rendered.
    Check {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Write a still PNG at 2x.
    Render {
        #[command(flatten)]
        document: DocumentArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long)]
        font: Option<PathBuf>,
        /// Show the typing bubble under the last message.
        #[arg(long)]
        typing: bool,
    },
    /// Record the conversation playing out as a video (needs ffmpeg).
    Record {
        #[command(flatten)]
        document: DocumentArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,
        #[arg(long)]
        font: Option<PathBuf>,
    },
    /// Write a starter conversation document.
    Init { path: Option<PathBuf> },
    /// Ask Gemini for a script.
    #[cfg(feature = "generate")]
    Generate {
        #[arg(long, default_value = "Alex")]
        sender: String,
        #[arg(long, default_value = "Jordan")]
        receiver: String,
        #[arg(long)]
        scenario: Option<String>,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Re-render a preview PNG whenever the document is saved.
    #[cfg(feature = "watch")]
    Watch {
        document: PathBuf,
        #[arg(long = "out", default_value = "preview.png")]
        out: PathBuf,
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&error, json);
            if find_coded_error(&error).is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn version_line() -> String {
    match option_env!("CHATMOCK_GIT_HASH") {
        Some(hash) => format!("chatmock {} ({hash})", env!("CARGO_PKG_VERSION")),
        None => format!("chatmock {}", env!("CARGO_PKG_VERSION")),
    }
}

fn report_error(error: &anyhow::Error, json: bool) {
    if json {
        match serde_json::to_string(&envelope_for(error)) {
            Ok(line) => eprintln!("{line}"),
            Err(_) => eprintln!("error: {error:#}"),
        }
    } else {
        eprintln!("error: {error:#}");
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.version {
        println!("{}", version_line());
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Check { document } => run_check(&document, cli.json),
        Commands::Render {
            document,
            output,
            font,
            typing,
        } => run_render(&document, &output, font.as_deref(), typing, cli.json),
        Commands::Record {
            document,
            output,
            fps,
            font,
        } => run_record(&document, &output, fps, font.as_deref(), cli.json),
        Commands::Init { path } => run_init(path.as_deref(), cli.json),
        #[cfg(feature = "generate")]
        Commands::Generate {
            sender,
            receiver,
            scenario,
            output,
        } => run_generate(sender, receiver, scenario.as_deref(), output.as_deref()),
        #[cfg(feature = "watch")]
        Commands::Watch {
            document,
            out,
            font,
        } => run_watch(&document, &out, font.as_deref()),
    }
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    ok: bool,
    document: Option<&'a Path>,
    platform: Platform,
    status: MessageStatus,
    sender: &'a Profile,
    receiver: &'a Profile,
    stats: ScriptStats,
    messages: &'a [Message],
}

fn run_check(document: &DocumentArgs, json: bool) -> Result<()> {
    let conversation = load_conversation(document.document.as_deref(), &document.overrides())?;
    let stats = script_stats(&conversation.script);
    let studio = conversation.clone().into_studio();

    let report = CheckReport {
        ok: true,
        document: conversation.source.as_deref(),
        platform: studio.platform(),
        status: studio.status(),
        sender: studio.sender(),
        receiver: studio.receiver(),
        stats,
        messages: studio.messages(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let label = report
        .document
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_owned());
    println!(
        "OK: {label} ({}, {})",
        report.platform.display_name(),
        report.status.keyword()
    );
    println!(
        "Messages: {} ({} sender, {} receiver, {} dropped)",
        report.messages.len(),
        stats.sender,
        stats.receiver,
        stats.dropped
    );
    for message in report.messages {
        let marker = if message.is_sender() { '>' } else { '<' };
        println!("  {marker} [{}] {}", message.timestamp, message.text);
    }
    Ok(())
}

fn run_render(
    document: &DocumentArgs,
    output: &OutputArgs,
    font: Option<&Path>,
    typing: bool,
    json: bool,
) -> Result<()> {
    let studio = load_conversation(document.document.as_deref(), &document.overrides())?.into_studio();
    let mut raster = Rasterizer::new(discover_fonts(font)?);

    let surface = compose(&ConversationView {
        is_typing: typing,
        ..studio.view()
    });
    let summary = capture_png(&mut raster, &surface, &output.target())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Wrote {} ({}x{}, sha256 {})",
            summary.path.display(),
            summary.width,
            summary.height,
            summary.sha256
        );
    }
    Ok(())
}

fn run_record(
    document: &DocumentArgs,
    output: &OutputArgs,
    fps: u32,
    font: Option<&Path>,
    json: bool,
) -> Result<()> {
    let studio = load_conversation(document.document.as_deref(), &document.overrides())?.into_studio();
    let mut raster = Rasterizer::new(discover_fonts(font)?);

    let mut settings = RecordSettings::new(output.target());
    settings.fps = fps.max(1);
    let fps = settings.fps;
    let mut recorder = Recorder::new(settings.clone());

    match recorder.toggle()? {
        RecorderEvent::Started { path } => {
            tracing::info!(path = %path.display(), fps, "recording conversation")
        }
        RecorderEvent::StartFailed => bail!("recording did not start"),
        RecorderEvent::Finished(_) => bail!("recorder was already running"),
    }

    let messages = studio.messages();
    let timeline = build_timeline(messages);
    let total_frames = timeline.frame_count(fps);
    let mut cached: Option<(RevealState, Vec<u8>)> = None;

    for frame_index in 0..total_frames {
        let at_ms = RevealTimeline::frame_time_ms(frame_index, fps);
        let state = timeline.state_at(at_ms);

        let rgba = match &cached {
            Some((held, rgba)) if *held == state && !state.is_typing => rgba.clone(),
            _ => {
                let surface = compose(&ConversationView {
                    messages: &messages[..state.visible],
                    is_typing: state.is_typing,
                    ..studio.view()
                });
                let pixmap = raster.render(&surface, settings.frame_options(at_ms))?;
                let rgba = straight_rgba(&pixmap);
                cached = Some((state, rgba.clone()));
                rgba
            }
        };
        recorder.push_frame(rgba)?;

        if frame_index % u64::from(fps) == 0 {
            tracing::info!("rendered frame {}/{}", frame_index + 1, total_frames);
        }
    }

    let RecorderEvent::Finished(summary) = recorder.toggle()? else {
        bail!("recorder stopped unexpectedly");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Wrote {} ({}x{}, {} fps, {} frames)",
            summary.path.display(),
            summary.width,
            summary.height,
            summary.fps,
            summary.frames
        );
    }
    Ok(())
}

fn run_init(path: Option<&Path>, json: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_DOCUMENT_NAME));
    write_starter(path)?;
    if json {
        println!("{}", serde_json::json!({ "ok": true, "path": path }));
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(feature = "generate")]
fn run_generate(
    sender: String,
    receiver: String,
    scenario: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    use anyhow::Context;
    use chatmock::generate::{GeminiClient, ScriptRequest};

    let request = ScriptRequest::new(sender, receiver, scenario);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let client = GeminiClient::from_env(reqwest::Client::new());
    let script = runtime.block_on(client.generate_script(&request));
    if script.is_empty() {
        bail!("no script was generated");
    }

    match output {
        Some(path) => {
            std::fs::write(path, format!("{script}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{script}"),
    }
    Ok(())
}

#[cfg(feature = "watch")]
fn run_watch(document: &Path, out: &Path, font: Option<&Path>) -> Result<()> {
    use chatmock::watch::{run_watch, LivePreview};

    let raster = Rasterizer::new(discover_fonts(font)?);
    let preview = LivePreview::open(document, Overrides::default(), out, raster)?;
    run_watch(preview)
}
