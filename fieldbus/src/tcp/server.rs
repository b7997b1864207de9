use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::common::phys::PhysLayer;
use crate::datastore::Datastore;
use crate::decode::DecodeLevel;
use crate::server::context::ServerContext;
use crate::server::task::SessionTask;

// sessions are keyed by an increasing id, so the first entry is always the oldest
struct SessionTracker {
    limit: usize,
    next_id: u64,
    sessions: BTreeMap<u64, tokio::sync::mpsc::Sender<()>>,
}

type SharedTracker = Arc<Mutex<SessionTracker>>;

impl SessionTracker {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            next_id: 0,
            sessions: BTreeMap::new(),
        }
    }

    fn shared(limit: usize) -> SharedTracker {
        Arc::new(Mutex::new(Self::new(limit)))
    }

    // the tracker holds no invariant that a panic could break
    fn lock(tracker: &SharedTracker) -> MutexGuard<'_, SessionTracker> {
        tracker.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// register a session, evicting the oldest one if the limit is reached
    fn add(&mut self, shutdown: tokio::sync::mpsc::Sender<()>) -> u64 {
        while self.sessions.len() >= self.limit {
            match self.sessions.pop_first() {
                // dropping the sender stops the session task
                Some((oldest, _)) => {
                    tracing::warn!("session limit reached, closing session {}", oldest)
                }
                None => break,
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, shutdown);
        id
    }

    fn remove(&mut self, id: u64) {
        self.sessions.remove(&id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.len()
    }
}

pub(crate) struct ServerTask<T: Datastore> {
    listener: TcpListener,
    context: ServerContext<T>,
    tracker: SharedTracker,
    decode: DecodeLevel,
}

impl<T> ServerTask<T>
where
    T: Datastore,
{
    pub(crate) fn new(
        max_sessions: usize,
        listener: TcpListener,
        context: ServerContext<T>,
        decode: DecodeLevel,
    ) -> Self {
        Self {
            listener,
            context,
            tracker: SessionTracker::shared(max_sessions.max(1)),
            decode,
        }
    }

    pub(crate) async fn run(&mut self, mut shutdown: tokio::sync::mpsc::Receiver<()>) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("server shutdown");
                    return;
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((socket, addr)) => self.handle(socket, addr),
                Err(err) => {
                    tracing::error!("unable to accept connection: {}", err);
                    return;
                }
            }
        }
    }

    fn handle(&self, socket: TcpStream, addr: SocketAddr) {
        let phys = PhysLayer::new(socket, self.decode.physical);
        let session = self.context.create_session(self.decode);
        let tracker = self.tracker.clone();
        let (tx, rx) = tokio::sync::mpsc::channel(1);

        let id = SessionTracker::lock(&self.tracker).add(tx);

        tracing::info!("session {} connected from {}", id, addr);

        tokio::spawn(
            async move {
                let err = SessionTask::new(phys, session, rx).run().await;
                tracing::info!("session {} closed: {}", id, err);
                SessionTracker::lock(&tracker).remove(id);
            }
            .instrument(tracing::info_span!("Session", "remote" = ?addr)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_the_oldest_session_when_full() {
        let mut tracker = SessionTracker::new(2);
        let (tx1, mut rx1) = tokio::sync::mpsc::channel(1);
        let (tx2, mut rx2) = tokio::sync::mpsc::channel(1);
        let (tx3, _rx3) = tokio::sync::mpsc::channel(1);

        assert_eq!(tracker.add(tx1), 0);
        assert_eq!(tracker.add(tx2), 1);
        assert_eq!(tracker.add(tx3), 2);
        assert_eq!(tracker.len(), 2);

        // the sender of the first session was dropped
        assert_eq!(
            rx1.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        );
        assert_eq!(
            rx2.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Empty)
        );
    }

    #[test]
    fn removed_sessions_free_a_slot() {
        let mut tracker = SessionTracker::new(1);
        let (tx1, _rx1) = tokio::sync::mpsc::channel(1);
        let id = tracker.add(tx1);
        tracker.remove(id);
        assert_eq!(tracker.len(), 0);
    }
}
