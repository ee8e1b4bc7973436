//! Headless application: wires settings, a tag source and the monitor together.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tagwatch_adapters::factoryio::FactoryIoClient;
use tagwatch_adapters::{FileTagSource, TagFilter, TagSource};
use tagwatch_engine::{Export, Monitor, MonitorHandle, StatusSummary, TickOutcome};
use tagwatch_types::Tag;

use crate::config::Settings;
use crate::data::format_duration;

/// A configured monitor plus the settings it was built from.
#[derive(Debug)]
pub struct App {
    pub monitor: Monitor,
    pub settings: Settings,
}

impl App {
    /// Build the tag source named by the settings and a monitor over it.
    pub fn new(settings: Settings) -> Result<Self> {
        let source: Arc<dyn TagSource> = match &settings.catalog_file {
            Some(path) => Arc::new(FileTagSource::new(path)),
            None => Arc::new(
                FactoryIoClient::builder()
                    .endpoint(settings.endpoint.clone())
                    .build()?,
            ),
        };
        Self::with_source(source, settings)
    }

    /// Build a monitor over an existing source.
    pub fn with_source(source: Arc<dyn TagSource>, settings: Settings) -> Result<Self> {
        let monitor = Monitor::builder(source)
            .interval(settings.interval()?)
            .stale_timeout(settings.stale_timeout()?)
            .max_history(settings.max_history)
            .rules(settings.alert_rules()?)
            .build();

        Ok(Self { monitor, settings })
    }

    /// Load the catalog, register configured groups and apply the initial selection.
    pub async fn prepare(&self) -> Result<()> {
        self.monitor
            .refresh_catalog(&TagFilter::default())
            .await
            .context("Failed to load tag catalog")?;

        for group in &self.settings.groups {
            let id = self.monitor.create_group(group.name.clone());
            for tag in &group.tags {
                self.monitor.add_tag_to_group(&id, tag.clone());
            }
        }

        if !self.settings.tags.is_empty() {
            self.monitor.set_selection(self.settings.tags.iter().cloned())?;
        } else if let Some(name) = &self.settings.group {
            let Some(group) = self.monitor.groups().into_iter().find(|g| &g.name == name) else {
                bail!("No configured group named {name:?}");
            };
            self.monitor.select_group(&group.id)?;
        }

        tracing::debug!(selected = self.monitor.selection().len(), "Monitor prepared");
        Ok(())
    }

    /// Fetch the catalog, narrowed by `filter`.
    pub async fn list(&self, filter: &TagFilter) -> Result<Vec<Tag>> {
        self.monitor
            .refresh_catalog(filter)
            .await
            .context("Failed to load tag catalog")?;
        Ok(self.monitor.catalog())
    }

    /// Run one poll and write the resulting snapshot to every destination.
    pub async fn export_once(&self, exports: &[Export]) -> Result<()> {
        match self.monitor.poll_once().await {
            TickOutcome::Published => {}
            TickOutcome::Skipped => bail!("No tags selected; use --tags or configure a selection"),
            outcome => bail!("Poll did not produce a snapshot ({outcome:?})"),
        }

        let snapshot = self.monitor.get_snapshot();
        for export in exports {
            export
                .write(&snapshot)
                .await
                .with_context(|| format!("Failed to write {}", export.path().display()))?;
        }
        Ok(())
    }

    /// Start monitoring and log a status summary for every new snapshot.
    ///
    /// Returns when `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let handle: MonitorHandle = self.monitor.start();
        let mut snapshots = self.monitor.subscribe();
        tokio::pin!(shutdown);

        tracing::info!(
            interval = %format_duration(self.monitor.interval()),
            tags = self.monitor.selection().len(),
            "Watching tags, press Ctrl-C to stop"
        );

        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    let summary = StatusSummary::from_snapshot(&snapshot);
                    tracing::info!(
                        sequence = snapshot.sequence,
                        status = %summary.level,
                        alerts = summary.alert_count(),
                        "{}",
                        summary.message
                    );
                    for message in &summary.alert_messages {
                        tracing::warn!(alert = %message, "Alert triggered");
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down");
                    break;
                }
            }
        }

        handle.stop();
        Ok(())
    }
}

/// Resolve when `signal` fires.
///
/// A signal listener that fails to install is logged and counts as a
/// shutdown request.
pub async fn shutdown_on<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal, shutting down");
    }
}
