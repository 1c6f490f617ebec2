use anyhow::Context;
use clap::Parser;
use course_harvest::config::{Config, Credentials, PASSWORD_ENV, USERNAME_ENV};
use course_harvest::pipeline::{self, Mode, RunReport};
use course_harvest::{ChromeDriver, ConnectionMode, StdinPrompt};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to do with each video; asks interactively when omitted
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Duration report file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory downloaded videos are written to
    #[arg(short, long)]
    dest: Option<PathBuf>,

    #[arg(long)]
    login_url: Option<String>,

    /// Lesson listing of the course to harvest
    #[arg(long)]
    lessons_url: Option<String>,

    /// Account identifier
    #[arg(long, env = USERNAME_ENV, hide_env_values = true)]
    username: Option<String>,

    /// Account secret
    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    password: Option<String>,

    /// Run Chrome without a window (manual CAPTCHA solving is not possible)
    #[arg(long)]
    headless: bool,

    /// Disable the Chrome sandbox (needed on some Linux setups)
    #[arg(long)]
    no_sandbox: bool,

    /// Path to the Chrome executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Attach to a Chrome already listening on this debug port
    #[arg(long)]
    debug_port: Option<u16>,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(output) = &self.output {
            config.output_file = output.clone();
        }
        if let Some(dest) = &self.dest {
            config.download_dir = dest.clone();
        }
        if let Some(url) = &self.login_url {
            config.login_url = url.clone();
        }
        if let Some(url) = &self.lessons_url {
            config.lessons_url = url.clone();
        }
        config
    }

    fn connection_mode(&self) -> ConnectionMode {
        match self.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: self.chrome_path.clone(),
                no_sandbox: self.no_sandbox,
                headless: self.headless,
            },
        }
    }
}

fn ask_mode() -> anyhow::Result<Mode> {
    pipeline::print_menu();
    print!("Type 1 or 2: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Mode::from_menu_choice(&answer).map_err(|e| {
        println!("❌ Invalid option. Exiting.");
        e.into()
    })
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    if let Err(e) = run(Args::parse()).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mode = match args.mode {
        Some(mode) => mode,
        None => ask_mode()?,
    };

    let credentials = Credentials::new(args.username.clone(), args.password.clone())?;
    let config = args.config();

    log::info!("Launching Chrome...");
    let driver = ChromeDriver::new(args.connection_mode())
        .await
        .context("could not start the browser session")?;

    let result = pipeline::run_until(
        &driver,
        &config,
        mode,
        &credentials,
        Arc::new(StdinPrompt),
        interrupted(),
    )
    .await;

    if let Err(e) = driver.close().await {
        log::warn!("Failed to close the browser cleanly: {}", e);
    }
    println!("🔚 Done.");

    match result? {
        RunReport::Durations { walk, records } => {
            log::info!("{} lesson(s), {} record(s)", walk.lessons, records.len());
        }
        RunReport::Downloads { walk, entries } => {
            log::info!("{} lesson(s), {} video(s)", walk.lessons, entries.len());
        }
    }

    Ok(())
}
