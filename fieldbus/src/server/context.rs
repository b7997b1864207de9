use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::common::frame::Framer;
use crate::datastore::{Datastore, MemoryStore};
use crate::decode::{AduDecodeLevel, DecodeLevel};
use crate::server::session::ConnectionSession;
use crate::tcp::frame::MbapFramer;

/// Creates the [`Framer`] owned by each new session
pub type FramerFactory = fn(AduDecodeLevel) -> Box<dyn Framer>;

/// Identification of the device, read-only once the server is built
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceIdentity {
    /// name of the vendor
    pub vendor_name: String,
    /// product code
    pub product_code: String,
    /// major and minor revision
    pub revision: String,
    /// optional vendor url
    pub vendor_url: Option<String>,
    /// optional product name
    pub product_name: Option<String>,
    /// optional model name
    pub model_name: Option<String>,
}

impl DeviceIdentity {
    /// create an identity from the mandatory fields
    pub fn new(vendor_name: &str, product_code: &str, revision: &str) -> Self {
        Self {
            vendor_name: vendor_name.to_string(),
            product_code: product_code.to_string(),
            revision: revision.to_string(),
            vendor_url: None,
            product_name: None,
            model_name: None,
        }
    }

    /// set the vendor url
    pub fn with_vendor_url(mut self, value: &str) -> Self {
        self.vendor_url = Some(value.to_string());
        self
    }

    /// set the product name
    pub fn with_product_name(mut self, value: &str) -> Self {
        self.product_name = Some(value.to_string());
        self
    }

    /// set the model name
    pub fn with_model_name(mut self, value: &str) -> Self {
        self.model_name = Some(value.to_string());
        self
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} rev {}",
            self.vendor_name, self.product_code, self.revision
        )?;
        if let Some(name) = &self.product_name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

/// Counters shared by every session of a server
#[derive(Debug, Default)]
pub struct ControlBlock {
    active_connections: AtomicUsize,
    total_connections: AtomicU64,
    frames_received: AtomicU64,
    exceptions_sent: AtomicU64,
    framing_errors: AtomicU64,
}

/// Point-in-time copy of a [`ControlBlock`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// sessions currently connected
    pub active_connections: usize,
    /// sessions ever connected
    pub total_connections: u64,
    /// complete frames passed to the executor
    pub frames_received: u64,
    /// exception responses sent
    pub exceptions_sent: u64,
    /// frames discarded because their header was invalid
    pub framing_errors: u64,
}

impl ControlBlock {
    pub(crate) fn on_connect(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_disconnect(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn on_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_exception(&self) {
        self.exceptions_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// read all the counters
    pub fn counters(&self) -> Counters {
        Counters {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            exceptions_sent: self.exceptions_sent.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "active: {} total: {} frames: {} exceptions: {} framing errors: {}",
            self.active_connections,
            self.total_connections,
            self.frames_received,
            self.exceptions_sent,
            self.framing_errors
        )
    }
}

/// State shared by every connection of a server: the datastore, the framer
/// strategy, the identity and the counters
///
/// Cloning the context shares the same datastore.
pub struct ServerContext<T: Datastore> {
    store: Arc<Mutex<T>>,
    framer: FramerFactory,
    identity: Option<DeviceIdentity>,
    control: Arc<ControlBlock>,
}

impl<T: Datastore> Clone for ServerContext<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            framer: self.framer,
            identity: self.identity.clone(),
            control: self.control.clone(),
        }
    }
}

/// Builder for a [`ServerContext`]
pub struct ServerContextBuilder<T: Datastore> {
    store: T,
    framer: FramerFactory,
    identity: Option<DeviceIdentity>,
}

impl ServerContext<MemoryStore> {
    /// start building a context with an empty [`MemoryStore`] and the [`MbapFramer`]
    pub fn builder() -> ServerContextBuilder<MemoryStore> {
        ServerContextBuilder {
            store: MemoryStore::default(),
            framer: MbapFramer::boxed,
            identity: None,
        }
    }
}

impl<T: Datastore> ServerContextBuilder<T> {
    /// serve a pre-populated datastore
    pub fn store<S: Datastore>(self, store: S) -> ServerContextBuilder<S> {
        ServerContextBuilder {
            store,
            framer: self.framer,
            identity: self.identity,
        }
    }

    /// use an alternate framing strategy
    pub fn framer(mut self, framer: FramerFactory) -> Self {
        self.framer = framer;
        self
    }

    /// set the identity of the device
    pub fn identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// build the context
    pub fn build(self) -> ServerContext<T> {
        ServerContext {
            store: Arc::new(Mutex::new(self.store)),
            framer: self.framer,
            identity: self.identity,
            control: Arc::new(ControlBlock::default()),
        }
    }
}

impl<T: Datastore> ServerContext<T> {
    /// the shared datastore
    ///
    /// Locking it from the application serializes with every request being executed.
    pub fn store(&self) -> &Arc<Mutex<T>> {
        &self.store
    }

    /// identity of the device, if any
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    /// counters shared by every session
    pub fn control(&self) -> &ControlBlock {
        &self.control
    }

    /// create the session for a new connection, with its own framer
    pub fn create_session(&self, decode: DecodeLevel) -> ConnectionSession<T> {
        ConnectionSession::new(
            self.store.clone(),
            (self.framer)(decode.adu),
            decode,
            self.control.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::DataBlock;
    use crate::types::BlockKind;

    #[test]
    fn default_context_has_an_empty_store() {
        let context = ServerContext::builder().build();
        assert!(!context
            .store()
            .lock()
            .unwrap()
            .validate(BlockKind::Coils, 0, 1));
        assert_eq!(context.identity(), None);
        assert_eq!(context.control().counters(), Counters::default());
    }

    #[test]
    fn clones_share_the_store() {
        let context = ServerContext::builder()
            .store(MemoryStore::new().with_coils(DataBlock::filled(0, 4, false)))
            .identity(DeviceIdentity::new("fieldbus", "FB", "1.0").with_product_name("demo"))
            .build();
        let other = context.clone();

        other
            .store()
            .lock()
            .unwrap()
            .set_bits(BlockKind::Coils, 1, &[true])
            .unwrap();

        assert_eq!(
            context
                .store()
                .lock()
                .unwrap()
                .get_bits(BlockKind::Coils, 0, 2),
            Ok(vec![false, true])
        );
        assert_eq!(
            other.identity().map(|x| x.to_string()),
            Some("fieldbus FB rev 1.0 (demo)".to_string())
        );
    }
}
