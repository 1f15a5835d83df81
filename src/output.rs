use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::{ProgressEvent, ProgressSink, RunSummary, SpeciesOutcome};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => tracing::info!("{}", event.message),
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    for report in &summary.species {
        match report.outcome {
            SpeciesOutcome::Done => println!(
                "{}: {} records, {} downloaded ({} cached, {} failed), {} spectrograms ({} cached, {} failed)",
                report.species,
                report.records,
                report.downloaded,
                report.audio_cached,
                report.download_failed,
                report.rendered,
                report.spectrogram_cached,
                report.render_failed,
            ),
            SpeciesOutcome::Skipped => println!(
                "{}: skipped after {} page(s), {} records processed",
                report.species, report.pages_fetched, report.records
            ),
        }
        for planned in &report.planned {
            println!(
                "  {} download={} render={} -> {}",
                planned.id, planned.download, planned.render, planned.audio_path
            );
        }
    }
}
