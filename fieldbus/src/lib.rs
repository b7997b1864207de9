//! A Modbus TCP server core built on [Tokio](https://docs.rs/tokio).
//!
//! # Features
//!
//! * Panic-free parsing of MBAP frames and PDUs
//! * Tolerates partial reads and pipelined requests
//! * One shared [`Datastore`](crate::datastore::Datastore) serialized by a single lock
//! * Protocol decoding at the PDU, MBAP and physical layers via [`DecodeLevel`]
//!
//! # Supported Functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Write Multiple Coils
//! * Write Multiple Registers
//!
//! # Example
//!
//! ```no_run
//! use fieldbus::datastore::{DataBlock, MemoryStore};
//! use fieldbus::server::{spawn_tcp_server_task, ServerContext};
//! use fieldbus::DecodeLevel;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ServerContext::builder()
//!         .store(MemoryStore::new().with_coils(DataBlock::filled(0, 10, false)))
//!         .build();
//!
//!     let _handle = spawn_tcp_server_task(
//!         10,
//!         "127.0.0.1:502".parse()?,
//!         context,
//!         DecodeLevel::default(),
//!     )
//!     .await?;
//!
//!     // the server runs until the handle is dropped
//!     std::future::pending::<()>().await;
//!     Ok(())
//! }
//! ```

/// Bit packing helpers
pub mod bits {
    pub use crate::common::bits::{pack, unpack};
}
/// Quantity limits enforced by the server
pub use constants::limits;
/// Datastore trait and the in-memory implementation
pub mod datastore;
/// Request and response messages
pub mod pdu;
/// Server API
pub mod server;

mod common;
mod constants;
mod decode;
mod error;
mod exception;
mod tcp;
mod types;

pub use crate::common::frame::{Frame, FrameHeader, Framer, TxId};
pub use crate::common::function::FunctionCode;
pub use crate::common::traits::Serialize;
pub use crate::decode::*;
pub use crate::error::*;
pub use crate::exception::*;
pub use crate::tcp::frame::MbapFramer;
pub use crate::types::*;
