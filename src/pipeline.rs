use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::catalog::{CatalogClient, PageRequest};
use crate::config::ResolvedConfig;
use crate::domain::{ApiKey, RecordingRecord, SpeciesQuery};
use crate::download::Downloader;
use crate::error::HarvestError;
use crate::pacing::Pacer;
use crate::species_state::{PageOutcome, SkipReason, SpeciesState};
use crate::spectrogram::SpectrogramRenderer;
use crate::store::{ArtifactPaths, ArtifactStore};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesOutcome {
    Done,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub id: String,
    pub audio_path: Utf8PathBuf,
    pub spectrogram_path: Utf8PathBuf,
    pub download: bool,
    pub render: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesReport {
    pub species: String,
    pub query: Option<String>,
    pub outcome: SpeciesOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<SkipReason>,
    pub total_pages: Option<u32>,
    pub pages_fetched: u32,
    pub records: usize,
    pub discarded: usize,
    pub downloaded: usize,
    pub audio_cached: usize,
    pub download_failed: usize,
    pub rendered: usize,
    pub spectrogram_cached: usize,
    pub render_failed: usize,
    pub filesystem_errors: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedAction>,
}

impl SpeciesReport {
    fn new(species: &str) -> Self {
        Self {
            species: species.to_string(),
            query: None,
            outcome: SpeciesOutcome::Done,
            skip: None,
            total_pages: None,
            pages_fetched: 0,
            records: 0,
            discarded: 0,
            downloaded: 0,
            audio_cached: 0,
            download_failed: 0,
            rendered: 0,
            spectrogram_cached: 0,
            render_failed: 0,
            filesystem_errors: 0,
            planned: Vec::new(),
        }
    }

    fn finish(&mut self, state: SpeciesState) {
        match state {
            SpeciesState::Skip(reason) => {
                self.outcome = SpeciesOutcome::Skipped;
                self.skip = Some(reason);
            }
            _ => self.outcome = SpeciesOutcome::Done,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub dry_run: bool,
    pub species: Vec<SpeciesReport>,
}

impl RunSummary {
    pub fn downloads(&self) -> usize {
        self.species.iter().map(|report| report.downloaded).sum()
    }

    pub fn renders(&self) -> usize {
        self.species.iter().map(|report| report.rendered).sum()
    }

    pub fn failures(&self) -> usize {
        self.species
            .iter()
            .map(|report| report.download_failed + report.render_failed + report.filesystem_errors)
            .sum()
    }
}

pub struct Pipeline<C: CatalogClient, D: Downloader, R: SpectrogramRenderer, P: Pacer> {
    config: ResolvedConfig,
    store: ArtifactStore,
    catalog: C,
    downloader: D,
    renderer: R,
    pacer: P,
}

impl<C: CatalogClient, D: Downloader, R: SpectrogramRenderer, P: Pacer> Pipeline<C, D, R, P> {
    pub fn new(config: ResolvedConfig, catalog: C, downloader: D, renderer: R, pacer: P) -> Self {
        let store = ArtifactStore::new(config.output_dir.clone(), config.limits);
        Self {
            config,
            store,
            catalog,
            downloader,
            renderer,
            pacer,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Runs every configured species. Only configuration errors are returned;
    /// everything else is logged and recorded in the summary.
    pub fn run(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, HarvestError> {
        let api_key = ApiKey::new(self.config.api_key.as_deref())?;
        let started_at = chrono::Utc::now().to_rfc3339();

        let species = self
            .config
            .species
            .iter()
            .map(|name| self.run_species(name, &api_key, options, sink))
            .collect();

        sink.event(ProgressEvent {
            message: "phase=Done; all species processed".to_string(),
            elapsed: None,
        });
        Ok(RunSummary {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            dry_run: options.dry_run,
            species,
        })
    }

    fn run_species(
        &self,
        species: &str,
        api_key: &ApiKey,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> SpeciesReport {
        let mut report = SpeciesReport::new(species);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; species {species} (country: {}, quality: {})",
                self.config.country.as_deref().unwrap_or("any"),
                self.config.quality.as_deref().unwrap_or("any"),
            ),
            elapsed: None,
        });

        let state = SpeciesState::Init.begin();
        let query = SpeciesQuery::new(
            species,
            self.config.country.as_deref(),
            self.config.quality.as_deref(),
        );
        let (mut state, query) = match query {
            Ok(query) => (state.validated(Ok(())), Some(query.query_string())),
            Err(err) => {
                tracing::warn!(species, error = %err, "skipping species");
                (state.validated(Err(err.to_string())), None)
            }
        };
        report.query = query.clone();

        if let Some(query) = query {
            while let SpeciesState::Paginate { next_page, .. } = state {
                let request = PageRequest {
                    query: &query,
                    api_key,
                    page: next_page,
                };
                let result = self.catalog.fetch_page(&request);
                self.pacer.pause();

                state = match result {
                    Ok(page) => {
                        report.pages_fetched += 1;
                        report.discarded += page.discarded;
                        let next = state.after_page(PageOutcome::from_page(&page), None);
                        if next_page == 1 {
                            report.total_pages = Some(page.num_pages.max(1));
                            tracing::info!(
                                species,
                                recordings = page.num_recordings,
                                pages = page.num_pages,
                                "catalog query answered"
                            );
                        }
                        sink.event(ProgressEvent {
                            message: format!(
                                "phase=Fetch; {species} page {next_page}/{} ({} records)",
                                report.total_pages.unwrap_or(1),
                                page.recordings.len()
                            ),
                            elapsed: None,
                        });
                        if !matches!(next, SpeciesState::Skip(_)) {
                            for record in &page.recordings {
                                self.process_record(species, record, options, &mut report, sink);
                            }
                        }
                        next
                    }
                    Err(err) => {
                        tracing::warn!(
                            species,
                            page = next_page,
                            error = %err,
                            "catalog page failed, abandoning remaining pages"
                        );
                        state.after_page(PageOutcome::Failed, Some(err.to_string()))
                    }
                };
            }
        }

        if let SpeciesState::Skip(reason) = &state {
            tracing::info!(species, ?reason, "species skipped");
        }
        report.finish(state);
        report
    }

    fn process_record(
        &self,
        species: &str,
        record: &RecordingRecord,
        options: &RunOptions,
        report: &mut SpeciesReport,
        sink: &dyn ProgressSink,
    ) {
        report.records += 1;
        let paths = self.store.paths(species, record);

        if options.dry_run {
            report.planned.push(PlannedAction {
                id: record.id.clone(),
                download: !self.store.exists(&paths.audio_path),
                render: !self.store.exists(&paths.spectrogram_path),
                audio_path: paths.audio_path,
                spectrogram_path: paths.spectrogram_path,
            });
            return;
        }

        if let Err(err) = self.store.ensure_dirs(&paths) {
            tracing::warn!(species, id = %record.id, error = %err, "cannot create recording directory");
            report.filesystem_errors += 1;
            return;
        }

        if !self.ensure_audio(species, record, &paths, report, sink) {
            return;
        }

        if self.store.exists(&paths.spectrogram_path) {
            tracing::debug!(species, id = %record.id, path = %paths.spectrogram_path, "spectrogram already exists");
            report.spectrogram_cached += 1;
            return;
        }

        let started = Instant::now();
        match self.renderer.render(
            paths.audio_path.as_std_path(),
            paths.spectrogram_path.as_std_path(),
            &record.file_name,
        ) {
            Ok(summary) => {
                report.rendered += 1;
                tracing::info!(
                    species,
                    id = %record.id,
                    path = %paths.spectrogram_path,
                    sample_rate = summary.sample_rate,
                    frames = summary.frames,
                    "generated spectrogram"
                );
                sink.event(ProgressEvent {
                    message: format!("phase=Render; {}", paths.spectrogram_path),
                    elapsed: Some(started.elapsed()),
                });
            }
            Err(err) => {
                report.render_failed += 1;
                tracing::warn!(species, id = %record.id, error = %err, "spectrogram failed");
            }
        }
    }

    fn ensure_audio(
        &self,
        species: &str,
        record: &RecordingRecord,
        paths: &ArtifactPaths,
        report: &mut SpeciesReport,
        sink: &dyn ProgressSink,
    ) -> bool {
        if self.store.exists(&paths.audio_path) {
            tracing::debug!(species, id = %record.id, path = %paths.audio_path, "audio already exists");
            report.audio_cached += 1;
            return true;
        }

        let started = Instant::now();
        let result = self
            .downloader
            .download(&record.audio_url, paths.audio_path.as_std_path());
        self.pacer.pause();

        match result {
            Ok(bytes) => {
                report.downloaded += 1;
                tracing::info!(species, id = %record.id, bytes, path = %paths.audio_path, "downloaded");
                sink.event(ProgressEvent {
                    message: format!("phase=Download; {}", paths.audio_path),
                    elapsed: Some(started.elapsed()),
                });
                true
            }
            Err(err) => {
                report.download_failed += 1;
                tracing::warn!(
                    species,
                    id = %record.id,
                    url = %record.audio_url,
                    error = %err,
                    "download failed"
                );
                false
            }
        }
    }
}
