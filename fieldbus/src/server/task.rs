use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::phys::PhysLayer;
use crate::datastore::Datastore;
use crate::server::session::ConnectionSession;

// larger than any MBAP frame, a read may still end in the middle of one
const READ_BUFFER_SIZE: usize = 512;

#[derive(Debug)]
pub(crate) enum SessionError {
    Io(std::io::Error),
    Closed,
    Shutdown,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Io(err) => write!(f, "i/o error: {err}"),
            SessionError::Closed => f.write_str("connection closed by the client"),
            SessionError::Shutdown => f.write_str("session shutdown"),
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err)
    }
}

/// Drives a [`ConnectionSession`] from a byte stream until the stream closes or
/// the shutdown channel is dropped
pub(crate) struct SessionTask<T, I>
where
    T: Datastore,
    I: AsyncRead + AsyncWrite + Unpin,
{
    io: PhysLayer<I>,
    session: ConnectionSession<T>,
    shutdown: tokio::sync::mpsc::Receiver<()>,
}

impl<T, I> SessionTask<T, I>
where
    T: Datastore,
    I: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(
        io: PhysLayer<I>,
        session: ConnectionSession<T>,
        shutdown: tokio::sync::mpsc::Receiver<()>,
    ) -> Self {
        Self {
            io,
            session,
            shutdown,
        }
    }

    pub(crate) async fn run(&mut self) -> SessionError {
        self.session.on_connection_established();
        let err = loop {
            if let Err(err) = self.run_one().await {
                break err;
            }
        };
        self.session.on_connection_lost();
        err
    }

    async fn run_one(&mut self) -> Result<(), SessionError> {
        let mut buffer = [0; READ_BUFFER_SIZE];

        tokio::select! {
            count = self.io.read(&mut buffer) => {
                let count = count?;
                if count == 0 {
                    return Err(SessionError::Closed);
                }
                for packet in self.session.on_bytes(&buffer[..count]) {
                    self.io.write(&packet).await?;
                }
                Ok(())
            }
            _ = self.shutdown.recv() => {
                Err(SessionError::Shutdown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::block_on;
    use tokio_test::io::Builder;

    use super::*;
    use crate::datastore::{DataBlock, MemoryStore};
    use crate::decode::DecodeLevel;
    use crate::decode::PhysDecodeLevel;
    use crate::server::context::ServerContext;

    fn context() -> ServerContext<MemoryStore> {
        ServerContext::builder()
            .store(MemoryStore::new().with_coils(DataBlock::filled(0, 8, false)))
            .build()
    }

    #[test]
    fn answers_each_request_then_ends_on_close() {
        let context = context();
        let io = Builder::new()
            .read(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x05, 0x00, 0x02])
            .read(&[0xFF, 0x00])
            .write(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x05, 0x00, 0x02, 0xFF, 0x00])
            .read(&[0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x01, 0x00, 0x00, 0x00, 0x04])
            .write(&[0x00, 0x02, 0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x01, 0x04])
            .build();

        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        let mut task = SessionTask::new(
            PhysLayer::new(io, PhysDecodeLevel::Nothing),
            context.create_session(DecodeLevel::nothing()),
            rx,
        );

        assert!(matches!(block_on(task.run()), SessionError::Closed));
        let counters = context.control().counters();
        assert_eq!(counters.frames_received, 2);
        assert_eq!(counters.active_connections, 0);
        assert_eq!(counters.total_connections, 1);
    }

    #[test]
    fn stops_when_the_shutdown_sender_is_dropped() {
        let context = context();
        let (client, server) = tokio::io::duplex(64);
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let mut task = SessionTask::new(
            PhysLayer::new(server, PhysDecodeLevel::Nothing),
            context.create_session(DecodeLevel::nothing()),
            rx,
        );
        drop(tx);

        assert!(matches!(block_on(task.run()), SessionError::Shutdown));
        // the client end stays open, so only the shutdown can stop the task
        drop(client);
    }
}
