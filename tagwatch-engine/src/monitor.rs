//! The polling scheduler and the state it publishes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tagwatch_adapters::{SourceError, TagFilter, TagSource};
use tagwatch_types::{
    now_ms, AlertRule, FailureOverrides, Group, GroupId, HistoryEntry, MonitoringSnapshot,
    RunStatus, Sample, Tag, TagId, TagValue, TimeRange, MAX_HISTORY,
};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::alerts::AlertEngine;
use crate::error::{MonitorError, SelectionError};
use crate::groups::GroupRegistry;
use crate::history::{ActivityDetector, ChangeDetector, HistoryBuffer};
use crate::staleness::{StalenessDetector, DEFAULT_STALE_TIMEOUT};

/// Default time between polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Default cadence of the staleness check.
pub const DEFAULT_STALENESS_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Lower bound for every period given to the builder.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// What a single poll tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The selection was empty, so nothing was fetched.
    Skipped,
    /// A new snapshot was published.
    Published,
    /// The selection changed while the fetch was in flight; the result was dropped.
    Discarded,
    /// The fetch failed; the previous snapshot stays current.
    Failed,
}

/// Samples a selection of tags and publishes monitoring snapshots.
///
/// `Monitor` is a cheap handle; clones share the same state. The selection,
/// rules and groups can be changed from any task while the poll loop runs,
/// and changes take effect on the next tick.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tagwatch_adapters::{MemoryTagSource, Tag, TagFilter};
/// use tagwatch_engine::Monitor;
/// use tagwatch_types::AlertRule;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = Arc::new(MemoryTagSource::with_tags(
///         "demo",
///         [Tag::builder("level").name("Tank level").float(12.0).build()],
///     ));
///
///     let monitor = Monitor::builder(source)
///         .interval(Duration::from_millis(500))
///         .build();
///
///     monitor.refresh_catalog(&TagFilter::default()).await?;
///     monitor.set_selection(["level"])?;
///     monitor.set_rules(vec![AlertRule::greater_than("level", 90.0, "Tank almost full")]);
///
///     let handle = monitor.start();
///     tokio::time::sleep(Duration::from_secs(3)).await;
///     println!("{} alerts", monitor.get_snapshot().alerts.len());
///     handle.stop();
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Monitor {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    source: Arc<dyn TagSource>,
    interval: Duration,
    staleness_check_interval: Duration,
    activity: Box<dyn ActivityDetector>,
    catalog: RwLock<BTreeMap<TagId, Tag>>,
    selection: Mutex<BTreeSet<TagId>>,
    rules: Mutex<AlertEngine>,
    groups: Mutex<GroupRegistry>,
    history: RwLock<HistoryBuffer>,
    staleness: Mutex<StalenessDetector>,
    // Serializes publications from the poll and staleness tasks.
    publish: Mutex<()>,
    snapshot_tx: watch::Sender<Arc<MonitoringSnapshot>>,
}

impl Monitor {
    /// Create a builder that polls `source`.
    pub fn builder(source: Arc<dyn TagSource>) -> MonitorBuilder {
        MonitorBuilder::new(source)
    }

    /// Start the poll and staleness tasks.
    ///
    /// Both run until the returned handle is stopped or dropped.
    pub fn start(&self) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);

        let poller = self.clone();
        let mut poll_stop = stop_rx.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(poller.shared.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let outcome = poller.poll_once().await;
                        tracing::trace!(?outcome, "Poll tick");
                    }
                    changed = poll_stop.changed() => {
                        if changed.is_err() || *poll_stop.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Poll task stopped");
        });

        let checker = self.clone();
        let mut check_stop = stop_rx;
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(checker.shared.staleness_check_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        checker.check_staleness();
                    }
                    changed = check_stop.changed() => {
                        if changed.is_err() || *check_stop.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Staleness task stopped");
        });

        tracing::info!(
            source = self.shared.source.description(),
            interval_ms = self.shared.interval.as_millis() as u64,
            "Monitoring started"
        );

        MonitorHandle { stop_tx }
    }

    /// Run one poll tick.
    ///
    /// Fetch failures are logged and reported as [`TickOutcome::Failed`];
    /// they never propagate.
    pub async fn poll_once(&self) -> TickOutcome {
        let requested = self.selection();
        if requested.is_empty() {
            return TickOutcome::Skipped;
        }

        let result = self.shared.source.fetch_values(&requested).await;

        if self.selection() != requested {
            return discarded(&requested);
        }

        let samples = match result {
            Ok(samples) => samples,
            Err(SourceError::PartialResult { samples, missing }) => {
                tracing::warn!(
                    ?missing,
                    received = samples.len(),
                    "Some selected tags were missing from the response"
                );
                samples
            }
            Err(e) => {
                tracing::warn!(
                    source = self.shared.source.description(),
                    error = %e,
                    "Fetch failed"
                );
                return TickOutcome::Failed;
            }
        };

        self.apply(&requested, samples)
    }

    /// Compare the staleness deadline against the clock.
    ///
    /// When the status flips, the current snapshot is republished with the new
    /// status so consumers see the change without waiting for a poll.
    pub fn check_staleness(&self) -> RunStatus {
        let _publish = self.shared.publish.lock();

        let (before, after) = {
            let mut staleness = self.shared.staleness.lock();
            let before = staleness.status();
            (before, staleness.check(Instant::now()))
        };

        if before != after {
            let current = self.get_snapshot();
            self.shared
                .snapshot_tx
                .send_replace(Arc::new(current.with_status(after)));
        }
        after
    }

    /// Fold one batch of samples into history, evaluate rules and publish.
    ///
    /// The selection lock is held until the snapshot is sent, so a batch
    /// fetched for a replaced selection is never published.
    fn apply(&self, selection: &BTreeSet<TagId>, samples: BTreeMap<TagId, Sample>) -> TickOutcome {
        let _publish = self.shared.publish.lock();
        let current = self.shared.selection.lock();
        if *current != *selection {
            return discarded(selection);
        }
        let previous = self.get_snapshot();

        {
            let mut history = self.shared.history.write();
            for sample in samples.values() {
                let active = self
                    .shared
                    .activity
                    .is_active(history.latest(&sample.tag_id), &sample.value);
                history.append(&sample.tag_id, sample.value, sample.timestamp_ms, active);
            }
        }

        // Missing tags keep their last published value.
        let tags: BTreeMap<TagId, Tag> = {
            let catalog = self.shared.catalog.read();
            selection
                .iter()
                .filter_map(|id| {
                    let sample = samples.get(id);
                    let carried = previous.tags.get(id);
                    let value = sample.map(|s| s.value).or(carried.map(|t| t.value))?;
                    let mut tag = catalog
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| Tag::placeholder(id.clone(), value));
                    tag.value = value;
                    // Failure flags follow the freshest report: this batch, then the
                    // last snapshot, then the catalog.
                    match (sample.and_then(|s| s.overrides), carried) {
                        (Some(overrides), _) => overrides.apply_to(&mut tag),
                        (None, Some(last)) => FailureOverrides::of(last).apply_to(&mut tag),
                        (None, None) => {}
                    }
                    Some((id.clone(), tag))
                })
                .collect()
        };

        let history: BTreeMap<TagId, Vec<HistoryEntry>> = {
            let buffer = self.shared.history.read();
            selection
                .iter()
                .filter(|id| buffer.len(id) > 0)
                .map(|id| (id.clone(), buffer.entries(id)))
                .collect()
        };

        let values: BTreeMap<TagId, TagValue> =
            tags.iter().map(|(id, t)| (id.clone(), t.value)).collect();
        let alerts = self.shared.rules.lock().evaluate(&values);

        let status = {
            let mut staleness = self.shared.staleness.lock();
            // A batch with no samples at all is not fresh data.
            if !samples.is_empty() {
                staleness.record_success(Instant::now());
            }
            staleness.status()
        };

        let snapshot = MonitoringSnapshot {
            sequence: previous.sequence + 1,
            timestamp_ms: now_ms(),
            selection: selection.clone(),
            tags,
            history,
            alerts,
            status,
        };

        tracing::debug!(
            sequence = snapshot.sequence,
            tag_count = snapshot.len(),
            alerts = snapshot.alerts.len(),
            "Published snapshot"
        );
        self.shared.snapshot_tx.send_replace(Arc::new(snapshot));
        drop(current);
        TickOutcome::Published
    }

    /// Load the tag catalog used to validate selections.
    ///
    /// Returns the number of catalog entries.
    pub async fn refresh_catalog(&self, filter: &TagFilter) -> Result<usize, MonitorError> {
        let tags = self.shared.source.list_tags(filter).await?;
        let count = tags.len();
        *self.shared.catalog.write() = tags.into_iter().map(|t| (t.id.clone(), t)).collect();
        tracing::info!(tag_count = count, "Tag catalog loaded");
        Ok(count)
    }

    /// The loaded catalog, ordered by id.
    pub fn catalog(&self) -> Vec<Tag> {
        self.shared.catalog.read().values().cloned().collect()
    }

    /// Replace the selection.
    ///
    /// Rejects an empty set and ids that are not in the catalog.
    pub fn set_selection<I, S>(&self, ids: I) -> Result<(), MonitorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<TagId>,
    {
        let ids: BTreeSet<TagId> = ids.into_iter().map(Into::into).collect();
        self.validate(&ids)?;
        tracing::debug!(tag_count = ids.len(), "Selection replaced");
        *self.shared.selection.lock() = ids;
        Ok(())
    }

    /// Add ids to the selection, with the same validation as `set_selection`.
    pub fn add_to_selection<I, S>(&self, ids: I) -> Result<(), MonitorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<TagId>,
    {
        let ids: BTreeSet<TagId> = ids.into_iter().map(Into::into).collect();
        self.validate(&ids)?;
        self.shared.selection.lock().extend(ids);
        Ok(())
    }

    /// Remove ids from the selection. Ids not selected are ignored.
    pub fn remove_from_selection<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = self.shared.selection.lock();
        for id in ids {
            selection.remove(id.as_ref());
        }
    }

    /// Deselect every tag. The poll loop idles until a new selection is set.
    pub fn clear_selection(&self) {
        self.shared.selection.lock().clear();
    }

    /// Select exactly the tags of a group.
    pub fn select_group(&self, id: &str) -> Result<(), MonitorError> {
        let tags = self
            .shared
            .groups
            .lock()
            .tags_of(id)
            .ok_or_else(|| SelectionError::UnknownGroup(id.to_string()))?;
        self.set_selection(tags)
    }

    /// The currently selected tag ids.
    pub fn selection(&self) -> BTreeSet<TagId> {
        self.shared.selection.lock().clone()
    }

    fn validate(&self, ids: &BTreeSet<TagId>) -> Result<(), SelectionError> {
        if ids.is_empty() {
            return Err(SelectionError::Empty);
        }
        let catalog = self.shared.catalog.read();
        let unknown: Vec<TagId> = ids
            .iter()
            .filter(|id| !catalog.contains_key(*id))
            .cloned()
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(SelectionError::UnknownTags(unknown))
        }
    }

    /// Replace the rule set. Applies from the next tick.
    pub fn set_rules(&self, rules: Vec<AlertRule>) {
        self.shared.rules.lock().set_rules(rules);
    }

    /// The active rules in insertion order.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.shared.rules.lock().rules().to_vec()
    }

    /// Create an empty group and return its id.
    pub fn create_group(&self, name: impl Into<String>) -> GroupId {
        self.shared.groups.lock().create(name)
    }

    /// Remove a group. Unknown ids are ignored.
    pub fn delete_group(&self, id: &str) {
        self.shared.groups.lock().delete(id);
    }

    /// Add a tag to a group. No-op when the group does not exist.
    pub fn add_tag_to_group(&self, id: &str, tag_id: impl Into<TagId>) {
        self.shared.groups.lock().add_tag(id, tag_id);
    }

    /// Remove a tag from a group.
    pub fn remove_tag_from_group(&self, id: &str, tag_id: &str) {
        self.shared.groups.lock().remove_tag(id, tag_id);
    }

    /// Rename a group. No-op when the group does not exist.
    pub fn rename_group(&self, id: &str, name: impl Into<String>) {
        self.shared.groups.lock().rename(id, name);
    }

    /// Look up a group by id.
    pub fn group(&self, id: &str) -> Option<Group> {
        self.shared.groups.lock().get(id).cloned()
    }

    /// All groups in creation order.
    pub fn groups(&self) -> Vec<Group> {
        self.shared.groups.lock().list().to_vec()
    }

    /// History of a tag restricted to `range`, oldest first.
    pub fn get_history(&self, tag_id: &str, range: TimeRange) -> Vec<HistoryEntry> {
        self.shared.history.read().query(tag_id, range)
    }

    /// The latest published snapshot. Never blocks on the poll loop.
    pub fn get_snapshot(&self) -> Arc<MonitoringSnapshot> {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Receive every newly published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MonitoringSnapshot>> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Running or paused, as last decided by the staleness detector.
    pub fn status(&self) -> RunStatus {
        self.shared.staleness.lock().status()
    }

    /// The poll interval in effect.
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }
}

/// Builder for configuring a [`Monitor`].
#[derive(Debug)]
pub struct MonitorBuilder {
    source: Arc<dyn TagSource>,
    interval: Option<Duration>,
    stale_timeout: Option<Duration>,
    staleness_check_interval: Option<Duration>,
    max_history: Option<usize>,
    activity: Option<Box<dyn ActivityDetector>>,
    catalog: Vec<Tag>,
    rules: Vec<AlertRule>,
}

impl MonitorBuilder {
    /// Create a builder with default settings.
    pub fn new(source: Arc<dyn TagSource>) -> Self {
        Self {
            source,
            interval: None,
            stale_timeout: None,
            staleness_check_interval: None,
            max_history: None,
            activity: None,
            catalog: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Set the poll interval.
    ///
    /// Defaults to 1 second if not specified. Values below [`MIN_PERIOD`]
    /// are raised to it.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Time without fresh samples before the system counts as paused.
    ///
    /// Defaults to 5 seconds regardless of the poll interval.
    pub fn stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = Some(timeout);
        self
    }

    /// Set how often the staleness deadline is checked (default 250 ms).
    pub fn staleness_check_interval(mut self, interval: Duration) -> Self {
        self.staleness_check_interval = Some(interval);
        self
    }

    /// Maximum history entries kept per tag (default 100).
    pub fn max_history(mut self, max: usize) -> Self {
        self.max_history = Some(max);
        self
    }

    /// Replace the default change-of-value activity detector.
    pub fn activity_detector(mut self, detector: impl ActivityDetector + 'static) -> Self {
        self.activity = Some(Box::new(detector));
        self
    }

    /// Seed the catalog without asking the source.
    pub fn catalog(mut self, tags: Vec<Tag>) -> Self {
        self.catalog = tags;
        self
    }

    /// Initial alert rules.
    pub fn rules(mut self, rules: Vec<AlertRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Build the monitor. Nothing runs until [`Monitor::start`].
    pub fn build(self) -> Monitor {
        let stale_timeout = self
            .stale_timeout
            .unwrap_or(DEFAULT_STALE_TIMEOUT)
            .max(MIN_PERIOD);
        let (snapshot_tx, _) = watch::channel(Arc::new(MonitoringSnapshot::default()));

        let shared = Shared {
            source: self.source,
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL).max(MIN_PERIOD),
            staleness_check_interval: self
                .staleness_check_interval
                .unwrap_or(DEFAULT_STALENESS_CHECK_INTERVAL)
                .max(MIN_PERIOD),
            activity: self.activity.unwrap_or_else(|| Box::new(ChangeDetector)),
            catalog: RwLock::new(
                self.catalog
                    .into_iter()
                    .map(|t| (t.id.clone(), t))
                    .collect(),
            ),
            selection: Mutex::new(BTreeSet::new()),
            rules: Mutex::new(AlertEngine::with_rules(self.rules)),
            groups: Mutex::new(GroupRegistry::new()),
            history: RwLock::new(HistoryBuffer::new(self.max_history.unwrap_or(MAX_HISTORY))),
            staleness: Mutex::new(StalenessDetector::new(stale_timeout, Instant::now())),
            publish: Mutex::new(()),
            snapshot_tx,
        };

        Monitor {
            shared: Arc::new(shared),
        }
    }
}

fn discarded(requested: &BTreeSet<TagId>) -> TickOutcome {
    tracing::debug!(
        requested = requested.len(),
        "Selection changed during fetch, discarding result"
    );
    TickOutcome::Discarded
}

/// Handle for controlling the background tasks.
///
/// Drop this handle to stop monitoring, or call `stop()` explicitly.
#[derive(Debug)]
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
}

impl MonitorHandle {
    /// Stop both background tasks.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}
