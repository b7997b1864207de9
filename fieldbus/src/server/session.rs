use std::sync::{Arc, Mutex};

use crate::common::frame::{FrameHeader, Framer};
use crate::datastore::Datastore;
use crate::decode::DecodeLevel;
use crate::server::context::ControlBlock;
use crate::server::executor::RequestExecutor;

/// Protocol state of one client connection
///
/// The session is independent of any transport: feed it the bytes that were
/// received with [`on_bytes`](ConnectionSession::on_bytes) and send every packet it returns.
/// Partial frames stay buffered between calls and are dropped with the session.
pub struct ConnectionSession<T: Datastore> {
    store: Arc<Mutex<T>>,
    framer: Box<dyn Framer>,
    executor: RequestExecutor,
    control: Arc<ControlBlock>,
    connected: bool,
}

impl<T: Datastore> ConnectionSession<T> {
    pub(crate) fn new(
        store: Arc<Mutex<T>>,
        framer: Box<dyn Framer>,
        decode: DecodeLevel,
        control: Arc<ControlBlock>,
    ) -> Self {
        Self {
            store,
            framer,
            executor: RequestExecutor::new(decode.pdu),
            control,
            connected: false,
        }
    }

    /// the transport is up
    pub fn on_connection_established(&mut self) {
        if !self.connected {
            self.connected = true;
            self.control.on_connect();
        }
    }

    /// Process received bytes, returning the response packets to send in order
    ///
    /// Frames with an invalid header are discarded without a response.
    pub fn on_bytes(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.framer.add_bytes(data);

        let mut packets = Vec::new();
        loop {
            if let Err(err) = self.framer.check_frame() {
                tracing::warn!("discarding frame: {}", err);
                self.control.on_framing_error();
                self.framer.discard_frame();
                continue;
            }

            let frame = match self.framer.get_frame() {
                Some(frame) => frame,
                None => break,
            };
            self.framer.advance_frame();
            self.control.on_frame();

            if let Some(response) = self.executor.execute(frame.payload(), self.store.as_ref()) {
                if response.exception_code().is_some() {
                    self.control.on_exception();
                }
                let header = FrameHeader::new(frame.header.tx_id, frame.header.unit_id);
                packets.push(self.framer.build_packet(&response.encode(), header));
            }
        }

        packets
    }

    /// the transport is gone, any partial frame is dropped
    pub fn on_connection_lost(&mut self) {
        if self.connected {
            self.connected = false;
            self.control.on_disconnect();
            let remaining = self.framer.buffered();
            if remaining > 0 {
                tracing::info!("dropping {} bytes of an incomplete frame", remaining);
            }
        }
    }
}

impl<T: Datastore> Drop for ConnectionSession<T> {
    fn drop(&mut self) {
        self.on_connection_lost();
    }
}
