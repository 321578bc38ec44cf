use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;
use std::thread;
use anyhow::bail;
use clap::Parser;
use tracing::info;
use duet_app::api::{ApiClient, MotionBackend};
use duet_app::app::{parse_line, App, Flow};
use duet_app::config::ClientConfig;
use duet_app::events::{ClientEvent, JobEvent, UiCommand};
use duet_app::job::JobParams;
use duet_core::{FrameCount, SeedPolicy, DEFAULT_TARGET_LANG};

/// Generate two-person motion videos from text prompts.
#[derive(Parser, Debug)]
#[command(name = "duet", version)]
struct Cli {
    /// Prompt to generate. Without one, an interactive session starts.
    prompt: Option<String>,

    /// Server address, e.g. http://127.0.0.1:8000
    #[arg(long)]
    api_url: Option<String>,

    /// Directory downloaded videos are saved to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of frames to generate (10-2000)
    #[arg(short = 'n', long, value_parser = parse_frames)]
    frames: Option<FrameCount>,

    /// Fixed seed for reproducible output; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Translate the prompt before generating
    #[arg(short, long)]
    translate: bool,

    #[arg(long, default_value = DEFAULT_TARGET_LANG)]
    target_lang: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }

    let template = JobParams {
        prompt: String::new(),
        output_dir: config.output_dir.clone(),
        frames: cli.frames.unwrap_or_default(),
        seed: SeedPolicy::from_seed(cli.seed),
        translate: cli.translate,
        target_lang: cli.target_lang,
    };

    let client = ApiClient::new(&config)?;
    info!("using server at {}", client.base_url());
    let backend: Arc<dyn MotionBackend> = Arc::new(client);

    let (tx, rx) = channel();
    let mut app = App::new(backend, tx.clone());
    let one_shot = cli.prompt.is_some();

    match cli.prompt {
        Some(prompt) => {
            app = app.exit_when_idle();
            app.on_event(ClientEvent::Ui(UiCommand::Submit(JobParams { prompt, ..template })));
        }
        None => {
            println!("Type a prompt and press enter. Commands: :cancel, :history, :quit");
            spawn_input_reader(template, tx);
        }
    }

    for event in rx.iter() {
        if app.on_event(event) == Flow::Exit {
            break;
        }
    }

    if one_shot {
        if let Some(JobEvent::Failed { message }) = app.last_terminal() {
            bail!("{message}");
        }
    }
    Ok(())
}

fn parse_frames(raw: &str) -> Result<FrameCount, String> {
    let frames: u32 = raw.parse().map_err(|e| format!("{raw:?} is not a frame count: {e}"))?;
    FrameCount::new(frames)
}

fn spawn_input_reader(template: JobParams, events: Sender<ClientEvent>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if let Some(command) = parse_line(&line, &template) {
                if events.send(ClientEvent::Ui(command)).is_err() {
                    return;
                }
            }
        }
        let _ = events.send(ClientEvent::Ui(UiCommand::Quit));
    });
}
