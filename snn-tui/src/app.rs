// Application state for the TUI: the backend plus run/pause control.

use anyhow::Result;

use crate::backend::SnnBackend;

pub struct App<B: SnnBackend> {
    pub backend: B,
    pub running: bool,
}

impl<B: SnnBackend> App<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            running: false,
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    /// Advance the simulation by one tick; the raster monitor records the new column.
    pub fn step(&mut self) -> Result<()> {
        self.backend.step()
    }

    /// Rewind to the initial state and stop.
    pub fn reset(&mut self) {
        self.backend.reset();
        self.running = false;
    }

    pub fn tick(&self) -> u64 {
        self.backend.network().tick()
    }

    /// Spikes per population on the latest tick, in name order.
    pub fn spike_counts(&self) -> Vec<(&str, usize)> {
        self.backend
            .network()
            .populations()
            .map(|p| (p.name(), p.spike_count()))
            .collect()
    }

    /// Raster rendered as text, one line per neuron: `label |cells`.
    pub fn raster_lines(&self) -> Vec<String> {
        let Some(raster) = self.backend.raster() else {
            return Vec::new();
        };
        let label_width = raster
            .rows()
            .iter()
            .map(|r| r.population.len() + 4)
            .max()
            .unwrap_or(0);
        raster
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let label = format!("{}[{:02}]", row.population, row.index);
                let mut line = format!("{:<width$} |", label, width = label_width);
                if let Some(cells) = raster.cells(idx) {
                    line.extend(cells.iter().map(|&spiked| if spiked { '•' } else { ' ' }));
                }
                line
            })
            .collect()
    }
}
