use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use clap::Parser;

use passport_reader::camera::CommandCamera;
use passport_reader::clipboard::CommandClipboard;
use passport_reader::controller::CaptureController;
use passport_reader::languages::load_messages;
use passport_reader::view::{Presenter, render_text};
use passport_reader::{Config, Extractor, ImagePayload, ProviderImpl};

#[derive(Parser, Debug)]
#[command(
    name = "passport-reader",
    version,
    about = "Read passport data pages with an AI model and format them as two text lines"
)]
struct Cli {
    /// Passport image file (reads stdin when omitted)
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Model name or provider:model (e.g. gemini:gemini-2.5-flash, openai:gpt-4o-mini)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// UI language for labels and messages (overrides settings [ui] lang)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Print lines, fields, model and usage as JSON
    #[arg(long = "json")]
    json: bool,

    /// Append token usage to output
    #[arg(long = "with-using-tokens")]
    with_using_tokens: bool,

    /// Append model name to output
    #[arg(long = "with-using-model")]
    with_using_model: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    /// Serve the browser client and JSON API
    #[arg(long = "server")]
    server: bool,

    /// Listen address for --server (overrides settings [server] addr)
    #[arg(long = "addr")]
    addr: Option<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            model: self.model.clone(),
            key: self.key.clone(),
            settings_path: self.read_settings.clone(),
            lang: self.lang.clone(),
            with_using_tokens: self.with_using_tokens,
            with_using_model: self.with_using_model,
            json: self.json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    passport_reader::logging::init(cli.verbose)?;

    if cli.server {
        let config = cli.config();
        let settings = config.load_settings()?;
        let provider = passport_reader::connect(&config, &settings)?;
        return passport_reader::server::run_server(settings, provider, cli.addr.clone()).await;
    }
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let image = match cli.data.as_deref() {
        Some(path) => ImagePayload::from_path(Path::new(path))?,
        None => {
            if io::stdin().is_terminal() {
                return Err(anyhow!("no image given (use --data PATH or pipe an image)"));
            }
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            if buffer.is_empty() {
                return Err(anyhow!("stdin is empty"));
            }
            ImagePayload::from_bytes(buffer, None)?
        }
    };

    let output = passport_reader::run(cli.config(), image).await?;
    println!("{}", output);
    Ok(())
}

struct InteractiveState {
    config: Config,
    controller: CaptureController,
    presenter: Presenter,
    clipboard: CommandClipboard,
    extractor: Extractor<ProviderImpl>,
}

impl InteractiveState {
    fn new(cli: &Cli) -> Result<Self> {
        let config = cli.config();
        let settings = config.load_settings()?;
        let messages = load_messages(&settings.lang, &settings.messages)?;
        let provider = passport_reader::connect(&config, &settings)?;
        Ok(Self {
            controller: CaptureController::new(
                Arc::new(CommandCamera::new(&settings.camera)),
                settings.formatter(),
            ),
            presenter: Presenter::new(messages, settings.copy_ack()),
            clipboard: CommandClipboard::new(settings.clipboard_command.as_deref()),
            extractor: Extractor::new(provider),
            config,
        })
    }

    fn show(&mut self) {
        let screen = self.presenter.screen(&self.controller, Instant::now());
        println!("{}", render_text(&screen));
    }

    async fn process(&mut self, image: Option<ImagePayload>) -> Result<()> {
        let Some(image) = image else {
            return Ok(());
        };
        self.show();
        let output = self.controller.process(&self.extractor, image).await?;
        if let Some(output) = output {
            if self.config.with_using_model {
                println!("model: {}", output.model.as_deref().unwrap_or("unavailable"));
            }
            if self.config.with_using_tokens {
                println!("{}", passport_reader::format_usage(output.usage.as_ref()));
            }
        }
        Ok(())
    }
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let mut state = InteractiveState::new(&cli)?;
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    state.show();

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if !input.starts_with('/') {
            eprintln!("commands start with '/'; type /help");
            continue;
        }
        match handle_interactive_command(input, &mut state).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("{:#}", err),
        }
    }
    Ok(())
}

async fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/screen" {
        state.show();
        return Ok(false);
    }
    if trimmed == "/camera" {
        state.controller.start_camera()?;
        state.show();
        return Ok(false);
    }
    if trimmed == "/cancel" {
        state.controller.stop_camera()?;
        state.show();
        return Ok(false);
    }
    if trimmed == "/capture" {
        let image = state.controller.capture()?;
        state.process(image).await?;
        state.show();
        return Ok(false);
    }
    if trimmed == "/reset" {
        state.controller.reset()?;
        state.show();
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/upload") {
        let value = arg.trim();
        if value.is_empty() {
            return Err(anyhow!("usage: /upload <path>"));
        }
        let image = state.controller.upload(Path::new(value))?;
        state.process(image).await?;
        state.show();
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/copy") {
        let index = match arg.trim() {
            "1" => 0,
            "2" => 1,
            _ => return Err(anyhow!("usage: /copy <1|2>")),
        };
        state
            .presenter
            .copy_line(&state.controller, index, &state.clipboard, Instant::now());
        state.show();
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/with-using-model") {
        state.config.with_using_model = parse_toggle(arg, state.config.with_using_model)?;
        println!("with-using-model: {}", state.config.with_using_model);
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/with-using-tokens") {
        state.config.with_using_tokens = parse_toggle(arg, state.config.with_using_tokens)?;
        println!("with-using-tokens: {}", state.config.with_using_tokens);
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/model") {
        let value = arg.trim();
        if value.is_empty() {
            println!(
                "model: {}",
                state.config.model.as_deref().unwrap_or("(auto)")
            );
        } else {
            let mut config = state.config.clone();
            config.model = Some(value.to_string());
            let provider = passport_reader::connect(&config, &config.load_settings()?)?;
            state.extractor = Extractor::new(provider);
            state.config = config;
            println!("model set to {}", value);
        }
        return Ok(false);
    }

    eprintln!("unknown command: {}", trimmed);
    Ok(false)
}

fn parse_toggle(arg: &str, current: bool) -> Result<bool> {
    let value = arg.trim();
    if value.is_empty() {
        return Ok(!current);
    }
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(anyhow!("expected on/off/true/false/1/0")),
    }
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit                 Exit interactive mode");
    println!("  /upload <path>               Extract from an image file");
    println!("  /camera                      Open the rear camera");
    println!("  /capture                     Capture a frame and extract from it");
    println!("  /cancel                      Close the camera");
    println!("  /copy <1|2>                  Copy line 1 or line 2");
    println!("  /reset                       Clear the result and start over");
    println!("  /screen                      Show the current screen");
    println!("  /model <provider:model>      Set model (or show current)");
    println!("  /with-using-model [on|off]   Toggle model output");
    println!("  /with-using-tokens [on|off]  Toggle token usage output");
}
