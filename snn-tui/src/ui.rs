// TUI rendering: spike raster (time on X, one row per neuron) + status panel.

use std::io::Stdout;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Text,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

use crate::app::App;
use crate::backend::SnnBackend;

/// Draws the UI each frame:
/// - Top: spike raster, rows are neurons grouped by population, columns wrap around.
/// - Bottom: tick, spikes per population, run state, controls.
pub fn draw<B: SnnBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &App<B>,
) -> anyhow::Result<()> {
    let lines = app.raster_lines();
    let counts = app
        .spike_counts()
        .iter()
        .map(|(name, n)| format!("{}: {}", name, n))
        .collect::<Vec<_>>()
        .join("  ");
    let status = format!(
        "Tick: {} | Spikes  {} | Running: {}\nControls: [s] Step  [r] Run/Pause  [x] Reset  [q] Quit",
        app.tick(),
        counts,
        if app.running { "yes" } else { "no" }
    );

    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Min(3), Constraint::Length(4)].as_ref())
            .split(f.size());

        let raster_widget = Paragraph::new(Text::from(lines.join("\n")))
            .block(Block::default().title("Spike Raster  (time →)").borders(Borders::ALL))
            .style(Style::default().fg(Color::White));
        f.render_widget(raster_widget, chunks[0]);

        let status_widget = Paragraph::new(status)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().title("Status").borders(Borders::ALL));
        f.render_widget(status_widget, chunks[1]);
    })?;
    Ok(())
}
