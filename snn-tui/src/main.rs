//! TUI entrypoint: renders a spike raster (time on X, neurons on Y) of a configured network
//! Controls: [s] Step, [r] Run/Pause, [x] Reset, [q] Quit

mod backend;
mod app;
mod ui;

use anyhow::{Context, Result};
use backend::NetworkBackend;
use app::App;
use clap::Parser;
use snn_core_plus::NetworkConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ui::draw;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute, terminal,
};
use ratatui::{backend::CrosstermBackend, Terminal};

#[derive(Parser, Debug)]
#[command(name = "snn-tui", about = "Live spike raster for snn-core networks")]
struct Args {
    /// TOML network description; a built-in demo network is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raster width in ticks
    #[arg(long, default_value_t = 80)]
    width: usize,

    /// Wall-clock milliseconds per tick while running
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Write logs here (filtered by RUST_LOG); logs are discarded otherwise
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    // The terminal belongs to the UI, so logs only go to a file.
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    // Leave alternate screen and show cursor
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    // Build before touching the terminal so errors print normally
    let backend = match &args.config {
        Some(path) => NetworkBackend::from_config(&NetworkConfig::load(path)?, args.width)?,
        None => NetworkBackend::demo(args.width)?,
    };
    tracing::info!(dt = backend.dt(), width = args.width, "starting");
    let mut app = App::new(backend);

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Ensure terminal is restored on panic
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        default_hook(panic_info);
    }));

    let tick_rate = Duration::from_millis(args.tick_ms.max(1));
    let mut last_tick = Instant::now();

    let outcome = (|| -> Result<()> {
        loop {
            draw(&mut terminal, &app)?;

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::from_millis(0));

            if event::poll(timeout)? {
                if let CEvent::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Char('s') => app.step()?,
                        KeyCode::Char('r') => app.toggle_running(),
                        KeyCode::Char('x') => app.reset(),
                        _ => {}
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if app.running {
                    app.step()?;
                }
                last_tick = Instant::now();
            }
        }
        Ok(())
    })();

    // Cleanup
    restore_terminal()?;
    outcome
}
