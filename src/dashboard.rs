//! Session controller: owns the current snapshot and routes every user
//! action and every resolved source call through one place.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;

use crate::autoplay::AutoPlay;
use crate::client::{Origin, Reply, RequestKind, Resolved, SourceClient};
use crate::config::DashboardConfig;
use crate::error::SnapshotError;
use crate::mock::{Details, NetworkSource};
use crate::model::{Network, NetworkStats, NeuronId};
use crate::mutation;
use crate::selection::{Edit, EditorKind, Selection, SelectionState};
use crate::snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Loading,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_labels: bool,
    pub show_weights: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_labels: true,
            show_weights: false,
        }
    }
}

pub struct Dashboard<S> {
    network: Option<Network>,
    selection: SelectionState,
    status: ConnectionStatus,
    last_error: Option<String>,
    import_error: Option<String>,
    details: Option<Details>,
    autoplay: AutoPlay,
    client: SourceClient<S>,
    rng: StdRng,
    export_dir: PathBuf,
    pub display: DisplayOptions,
}

impl<S: NetworkSource> Dashboard<S> {
    pub fn new(config: &DashboardConfig, client: SourceClient<S>, rng: StdRng) -> Self {
        Self {
            network: None,
            selection: SelectionState::new(),
            status: ConnectionStatus::Loading,
            last_error: None,
            import_error: None,
            details: None,
            autoplay: AutoPlay::new(config.autoplay_interval()),
            client,
            rng,
            export_dir: config.export_dir.clone(),
            display: DisplayOptions::default(),
        }
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn import_error(&self) -> Option<&str> {
        self.import_error.as_deref()
    }

    /// Detail readouts for the current selection, once they have arrived.
    pub fn details(&self) -> Option<&Details> {
        self.details
            .as_ref()
            .filter(|d| details_match(d, self.selection.selection()))
    }

    pub fn autoplay(&self) -> &AutoPlay {
        &self.autoplay
    }

    pub fn is_loading(&self) -> bool {
        self.client.pending() > 0
    }

    pub fn stats(&self) -> NetworkStats {
        self.network.as_ref().map(Network::aggregate).unwrap_or_default()
    }

    /// Manual fetch; also the retry after a failure.
    pub fn refresh(&mut self) {
        if self.network.is_none() {
            self.status = ConnectionStatus::Loading;
        }
        self.client.request(RequestKind::Fetch, Origin::Manual);
    }

    pub fn step(&mut self) {
        self.client.request(RequestKind::Step, Origin::Manual);
    }

    pub fn toggle_autoplay(&mut self, now: Instant) {
        self.autoplay.toggle(now);
    }

    /// Once per frame: schedules due auto-play steps and applies whatever
    /// has resolved.
    pub fn tick(&mut self, now: Instant) {
        if let Some(generation) = self.autoplay.poll(now) {
            self.client.request(RequestKind::Step, Origin::AutoPlay(generation));
        }
        for resolved in self.client.drain() {
            self.apply(resolved);
        }
    }

    /// Waits for one request to resolve and applies it.
    pub async fn settle(&mut self) {
        if let Some(resolved) = self.client.recv().await {
            self.apply(resolved);
        }
    }

    fn apply(&mut self, resolved: Resolved) {
        if let Origin::AutoPlay(generation) = resolved.origin {
            if !self.autoplay.accepts(generation) {
                warn!("discarding stale auto-play step (generation {generation})");
                return;
            }
        }
        match resolved.outcome {
            Ok(Reply::Network(network)) => {
                info!("{:?} landed for {}", resolved.kind, network.id);
                self.status = ConnectionStatus::Connected;
                self.last_error = None;
                self.replace(network);
            }
            Ok(Reply::Details(details)) => match details {
                Some(d) if details_match(&d, self.selection.selection()) => self.details = Some(d),
                Some(_) => debug!("dropping {:?} for a selection that moved on", resolved.kind),
                None => debug!("{:?} found nothing", resolved.kind),
            },
            Err(err) if resolved.kind.is_details() => {
                warn!("{:?} failed: {err}", resolved.kind);
            }
            Err(err) => {
                warn!("{:?} failed: {err}", resolved.kind);
                self.status = ConnectionStatus::Disconnected;
                self.last_error = Some(err.to_string());
            }
        }
    }

    fn replace(&mut self, network: Network) {
        let before = self.selection.selection().clone();
        self.selection.reconcile(&network);
        self.network = Some(network);
        self.follow_selection(before);
    }

    /// Drops stale details and asks for fresh ones when the selection moved.
    fn follow_selection(&mut self, before: Selection) {
        let kind = match self.selection.selection() {
            current if *current == before => return,
            Selection::None => None,
            Selection::Neuron(id) => Some(RequestKind::NeuronDetails(*id)),
            Selection::Connection(id) => Some(RequestKind::ConnectionDetails(id.clone())),
        };
        self.details = None;
        if let Some(kind) = kind {
            self.client.request(kind, Origin::Manual);
        }
    }

    fn update(&mut self, f: impl FnOnce(&Network, &mut StdRng) -> Network) {
        if let Some(current) = &self.network {
            let next = f(current, &mut self.rng);
            self.replace(next);
        }
    }

    pub fn select_neuron(&mut self, id: NeuronId) {
        let before = self.selection.selection().clone();
        self.selection.select_neuron(id);
        self.follow_selection(before);
    }

    pub fn select_connection(&mut self, id: &str) {
        let before = self.selection.selection().clone();
        self.selection.select_connection(id);
        self.follow_selection(before);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_selection();
        self.details = None;
    }

    pub fn toggle_edit_mode(&mut self) {
        self.selection.toggle_edit_mode();
    }

    pub fn start_edit(&mut self, kind: EditorKind) -> bool {
        self.selection.start_edit(kind)
    }

    pub fn cancel_edit(&mut self) {
        self.selection.cancel_edit();
    }

    /// Returns `true` when the edit was written back.
    pub fn save_edit(&mut self, edit: &Edit) -> bool {
        let Some(current) = &self.network else {
            return false;
        };
        match self.selection.save_edit(current, edit) {
            Some(next) => {
                self.replace(next);
                true
            }
            None => false,
        }
    }

    pub fn randomize_activations(&mut self) {
        self.update(|n, rng| mutation::randomize_activations(n, rng));
    }

    pub fn randomize_weights(&mut self) {
        self.update(|n, rng| mutation::randomize_weights(n, rng));
    }

    pub fn scale_activations(&mut self, factor: f64) {
        self.update(|n, _| mutation::scale_activations(n, factor));
    }

    pub fn scale_weights(&mut self, factor: f64) {
        self.update(|n, _| mutation::scale_weights(n, factor));
    }

    pub fn reset(&mut self) {
        self.update(|n, _| mutation::reset(n));
    }

    pub fn export(&self) -> Result<Option<PathBuf>, SnapshotError> {
        match &self.network {
            Some(network) => snapshot::write_export(network, &self.export_dir).map(Some),
            None => Ok(None),
        }
    }

    /// Replaces the snapshot wholesale. On failure the current snapshot stays
    /// and the error is kept for display.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        self.finish_import(snapshot::import_snapshot(bytes))
    }

    pub fn import_file(&mut self, path: &Path) -> Result<(), SnapshotError> {
        self.finish_import(snapshot::read_import(path))
    }

    fn finish_import(&mut self, result: Result<Network, SnapshotError>) -> Result<(), SnapshotError> {
        match result {
            Ok(network) => {
                self.import_error = None;
                self.replace(network);
                Ok(())
            }
            Err(err) => {
                warn!("import failed: {err}");
                self.import_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn dismiss_import_error(&mut self) {
        self.import_error = None;
    }
}

fn details_match(details: &Details, selection: &Selection) -> bool {
    match selection {
        Selection::None => false,
        Selection::Neuron(id) => details.neuron_id() == Some(*id),
        Selection::Connection(id) => details.connection_id() == Some(id),
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use rand::SeedableRng;
    use tokio::runtime::Handle;

    use super::*;
    use crate::error::SourceError;
    use crate::mock::{MockApi, initial_network};
    use crate::selection::Selection;

    fn config() -> DashboardConfig {
        DashboardConfig::default()
    }

    fn dashboard() -> Dashboard<MockApi> {
        let config = config();
        let api = MockApi::new(&config).seeded(5);
        let client = SourceClient::new(api, Handle::current(), config.network_id.clone());
        Dashboard::new(&config, client, StdRng::seed_from_u64(9))
    }

    /// Fails every call while `up` is false.
    struct FlakySource {
        up: AtomicBool,
    }

    impl NetworkSource for FlakySource {
        fn fetch_network(&self, id: &str) -> impl Future<Output = Result<Network, SourceError>> + Send {
            let up = self.up.load(Ordering::SeqCst);
            let id = id.to_string();
            async move {
                if up {
                    Ok(initial_network())
                } else {
                    Err(SourceError::Transient(format!("{id} unreachable")))
                }
            }
        }

        fn step_network(&self, id: &str) -> impl Future<Output = Result<Network, SourceError>> + Send {
            self.fetch_network(id)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loads_network() {
        let mut dash = dashboard();
        assert_eq!(dash.status(), ConnectionStatus::Loading);
        dash.refresh();
        assert!(dash.is_loading());
        dash.settle().await;

        assert_eq!(dash.status(), ConnectionStatus::Connected);
        let stats = dash.stats();
        assert_eq!(stats.neuron_count, 15);
        assert_eq!(stats.connection_count, 48);
        assert!(!dash.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_last_snapshot() {
        let config = config();
        let source = FlakySource {
            up: AtomicBool::new(false),
        };
        let client = SourceClient::new(source, Handle::current(), "net");
        let mut dash = Dashboard::new(&config, client, StdRng::seed_from_u64(1));

        dash.import_bytes(&snapshot::export_snapshot(&initial_network()).unwrap())
            .unwrap();
        dash.step();
        dash.settle().await;

        assert_eq!(dash.status(), ConnectionStatus::Disconnected);
        assert!(dash.last_error().is_some_and(|e| e.contains("unreachable")));
        assert!(dash.network().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_autoplay_step_is_discarded() {
        let mut dash = dashboard();
        dash.refresh();
        dash.settle().await;
        let before = dash.network().cloned();

        let t0 = Instant::now();
        dash.toggle_autoplay(t0);
        dash.tick(t0 + Duration::from_millis(2000));
        assert!(dash.is_loading());

        dash.toggle_autoplay(t0);
        dash.settle().await;
        assert_eq!(dash.network().cloned(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn live_autoplay_step_is_applied() {
        let mut dash = dashboard();
        dash.refresh();
        dash.settle().await;
        let before = dash.network().cloned().unwrap();

        let t0 = Instant::now();
        dash.toggle_autoplay(t0);
        dash.tick(t0 + Duration::from_millis(2000));
        dash.settle().await;

        let after = dash.network().unwrap();
        assert_eq!(after.connections, before.connections);
        assert_ne!(
            after.neurons().map(|n| n.activation).collect::<Vec<_>>(),
            before.neurons().map(|n| n.activation).collect::<Vec<_>>()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_snapshot_reconciles_selection() {
        let mut dash = dashboard();
        let mut custom = initial_network();
        custom.connections.retain(|c| c.id != "c48");
        dash.import_bytes(&snapshot::export_snapshot(&initial_network()).unwrap())
            .unwrap();
        dash.select_connection("c48");

        dash.import_bytes(&snapshot::export_snapshot(&custom).unwrap())
            .unwrap();
        assert_eq!(dash.selection().selection(), &Selection::None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_import_preserves_snapshot() {
        let mut dash = dashboard();
        dash.refresh();
        dash.settle().await;
        let before = dash.network().cloned();

        assert!(dash.import_bytes(b"<xml/>").is_err());
        assert!(dash.import_error().is_some());
        assert_eq!(dash.network().cloned(), before);

        dash.dismiss_import_error();
        assert!(dash.import_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_flow_clamps_activation() {
        let mut dash = dashboard();
        dash.refresh();
        dash.settle().await;

        dash.toggle_edit_mode();
        dash.select_neuron(1);
        assert!(dash.start_edit(EditorKind::Neuron));

        let mut edited = dash.network().unwrap().find_neuron(1).unwrap().clone();
        edited.activation = 1.5;
        assert!(dash.save_edit(&Edit::Neuron(edited)));
        assert_eq!(dash.network().unwrap().find_neuron(1).unwrap().activation, 1.0);
        assert_eq!(dash.selection().active_editor(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_fetches_details() {
        let mut dash = dashboard();
        dash.refresh();
        dash.settle().await;

        dash.select_neuron(7);
        assert!(dash.details().is_none());
        dash.settle().await;
        match dash.details() {
            Some(Details::Neuron(d)) => {
                assert_eq!(d.neuron.id, 7);
                assert_eq!(d.last_activation, 0.85);
            }
            other => panic!("unexpected details: {other:?}"),
        }

        dash.clear_selection();
        assert!(dash.details().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn details_for_an_old_selection_are_dropped() {
        let mut dash = dashboard();
        dash.refresh();
        dash.settle().await;

        dash.select_neuron(3);
        dash.select_connection("c5");
        dash.settle().await;
        dash.settle().await;
        assert_eq!(dash.details().and_then(Details::connection_id).map(String::as_str), Some("c5"));
        assert!(!dash.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn sources_without_details_report_none() {
        let config = config();
        let source = FlakySource {
            up: AtomicBool::new(true),
        };
        let client = SourceClient::new(source, Handle::current(), "net");
        let mut dash = Dashboard::new(&config, client, StdRng::seed_from_u64(1));
        dash.refresh();
        dash.settle().await;

        dash.select_neuron(1);
        dash.settle().await;
        assert!(dash.details().is_none());
        assert_eq!(dash.status(), ConnectionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_operations_without_network_are_noops() {
        let mut dash = dashboard();
        dash.randomize_weights();
        dash.scale_activations(2.0);
        dash.reset();
        assert!(dash.network().is_none());
        assert!(dash.export().unwrap().is_none());
    }
}
