use std::sync::Arc;

use log::debug;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::SourceError;
use crate::mock::{Details, NetworkSource};
use crate::model::{ConnectionId, Network, NeuronId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Fetch,
    Step,
    NeuronDetails(NeuronId),
    ConnectionDetails(ConnectionId),
}

impl RequestKind {
    pub fn is_details(&self) -> bool {
        matches!(self, RequestKind::NeuronDetails(_) | RequestKind::ConnectionDetails(_))
    }
}

#[derive(Debug)]
pub enum Reply {
    Network(Network),
    /// `None` when the source knows nothing about the id.
    Details(Option<Details>),
}

/// Who asked for a request; auto-play steps carry their generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Manual,
    AutoPlay(u64),
}

/// A finished source call.
#[derive(Debug)]
pub struct Resolved {
    pub kind: RequestKind,
    pub origin: Origin,
    pub outcome: Result<Reply, SourceError>,
}

/// Runs source calls on a tokio runtime and hands results back to the UI
/// thread through a channel.
pub struct SourceClient<S> {
    source: Arc<S>,
    runtime: Handle,
    network_id: String,
    tx: mpsc::UnboundedSender<Resolved>,
    rx: mpsc::UnboundedReceiver<Resolved>,
    pending: usize,
}

impl<S: NetworkSource> SourceClient<S> {
    pub fn new(source: S, runtime: Handle, network_id: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source: Arc::new(source),
            runtime,
            network_id: network_id.into(),
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Number of requests issued but not yet handed out.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn request(&mut self, kind: RequestKind, origin: Origin) {
        let source = Arc::clone(&self.source);
        let id = self.network_id.clone();
        let tx = self.tx.clone();
        debug!("{kind:?} requested ({origin:?})");
        self.runtime.spawn(async move {
            let outcome = match &kind {
                RequestKind::Fetch => source.fetch_network(&id).await.map(Reply::Network),
                RequestKind::Step => source.step_network(&id).await.map(Reply::Network),
                RequestKind::NeuronDetails(neuron) => source
                    .neuron_details(*neuron)
                    .await
                    .map(|d| Reply::Details(d.map(Details::Neuron))),
                RequestKind::ConnectionDetails(connection) => source
                    .connection_details(connection)
                    .await
                    .map(|d| Reply::Details(d.map(Details::Connection))),
            };
            // receiver gone means the session ended
            let _ = tx.send(Resolved {
                kind,
                origin,
                outcome,
            });
        });
        self.pending += 1;
    }

    /// Everything resolved so far, without blocking.
    pub fn drain(&mut self) -> Vec<Resolved> {
        let mut resolved = Vec::new();
        while let Ok(r) = self.rx.try_recv() {
            resolved.push(r);
        }
        self.pending = self.pending.saturating_sub(resolved.len());
        resolved
    }

    /// Waits for the next resolved request.
    pub async fn recv(&mut self) -> Option<Resolved> {
        let resolved = self.rx.recv().await?;
        self.pending = self.pending.saturating_sub(1);
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::{DEFAULT_NETWORK_ID, MockApi};

    fn client() -> SourceClient<MockApi> {
        let api = MockApi::with_delays(
            Duration::from_millis(300),
            Duration::from_millis(500),
            Duration::from_millis(200),
        )
        .seeded(1);
        SourceClient::new(api, Handle::current(), DEFAULT_NETWORK_ID)
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_resolves_through_channel() {
        let mut client = client();
        client.request(RequestKind::Fetch, Origin::Manual);
        assert_eq!(client.pending(), 1);
        assert!(client.drain().is_empty());

        let resolved = client.recv().await.unwrap();
        assert_eq!(resolved.kind, RequestKind::Fetch);
        assert_eq!(resolved.origin, Origin::Manual);
        let Ok(Reply::Network(network)) = resolved.outcome else {
            panic!("fetch did not return a network");
        };
        assert_eq!(network.connections.len(), 48);
        assert_eq!(client.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn detail_lookups_come_back_tagged() {
        let mut client = client();
        client.request(RequestKind::ConnectionDetails("c3".into()), Origin::Manual);
        let resolved = client.recv().await.unwrap();
        assert!(resolved.kind.is_details());
        let Ok(Reply::Details(Some(details))) = resolved.outcome else {
            panic!("no details for c3");
        };
        assert_eq!(details.connection_id().map(String::as_str), Some("c3"));

        client.request(RequestKind::NeuronDetails(404), Origin::Manual);
        let resolved = client.recv().await.unwrap();
        assert!(matches!(resolved.outcome, Ok(Reply::Details(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn faster_request_resolves_first() {
        let mut client = client();
        client.request(RequestKind::Step, Origin::AutoPlay(4));
        client.request(RequestKind::Fetch, Origin::Manual);

        let first = client.recv().await.unwrap();
        let second = client.recv().await.unwrap();
        assert_eq!(first.kind, RequestKind::Fetch);
        assert_eq!(second.origin, Origin::AutoPlay(4));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_collects_everything_ready() {
        let mut client = client();
        client.request(RequestKind::Fetch, Origin::Manual);
        client.request(RequestKind::Fetch, Origin::Manual);
        tokio::time::sleep(Duration::from_millis(400)).await;
        // let the spawned tasks run their sends
        tokio::task::yield_now().await;

        let resolved = client.drain();
        assert_eq!(resolved.len(), 2);
        assert_eq!(client.pending(), 0);
    }
}
