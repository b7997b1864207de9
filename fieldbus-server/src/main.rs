//! Modbus/TCP server with an in-memory datastore
//!
//! Commands read from stdin:
//!
//! * `x` - exit
//! * `uc` - toggle every coil
//! * `udi` - toggle every discrete input
//! * `uhr` - increment every holding register
//! * `uir` - increment every input register
//! * `stats` - print the connection and frame counters

use std::net::SocketAddr;

use clap::Parser;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};

use fieldbus::datastore::{DataBlock, Datastore, MemoryStore};
use fieldbus::server::{spawn_tcp_server_task, DeviceIdentity, ServerContext};
use fieldbus::*;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// address to listen on
    #[clap(short, long, value_parser, default_value = "127.0.0.1:502")]
    address: SocketAddr,
    /// maximum number of concurrent sessions
    #[clap(short, long, value_parser, default_value_t = 10)]
    max_sessions: usize,
    /// number of coils, starting at address 0
    #[clap(long, value_parser, default_value_t = 10)]
    coils: u16,
    /// number of discrete inputs, starting at address 0
    #[clap(long, value_parser, default_value_t = 10)]
    discrete_inputs: u16,
    /// number of holding registers, starting at address 0
    #[clap(long, value_parser, default_value_t = 10)]
    holding_registers: u16,
    /// number of input registers, starting at address 0
    #[clap(long, value_parser, default_value_t = 10)]
    input_registers: u16,
    /// PDU decode level: nothing, function-code, data-headers or data-values
    #[clap(long, default_value_t = PduDecodeLevel::DataHeaders)]
    pdu: PduDecodeLevel,
    /// MBAP decode level: nothing, header or payload
    #[clap(long, default_value_t = AduDecodeLevel::Nothing)]
    adu: AduDecodeLevel,
    /// physical layer decode level: nothing, length or data
    #[clap(long, default_value_t = PhysDecodeLevel::Nothing)]
    phys: PhysDecodeLevel,
    /// vendor name reported in the device identity
    #[clap(long, default_value = "fieldbus")]
    vendor_name: String,
    /// product code reported in the device identity
    #[clap(long, default_value = "FB-SRV")]
    product_code: String,
    /// revision reported in the device identity
    #[clap(long, default_value = env!("CARGO_PKG_VERSION"))]
    revision: String,
}

impl Cli {
    fn decode_level(&self) -> DecodeLevel {
        DecodeLevel::new(self.pdu, self.adu, self.phys)
    }

    fn store(&self) -> MemoryStore {
        MemoryStore::new()
            .with_coils(DataBlock::filled(0, self.coils, false))
            .with_discrete_inputs(DataBlock::filled(0, self.discrete_inputs, false))
            .with_holding_registers(DataBlock::filled(0, self.holding_registers, 0))
            .with_input_registers(DataBlock::filled(0, self.input_registers, 0))
    }
}

fn toggle_bits(store: &mut MemoryStore, block: BlockKind, count: u16) -> Result<(), StoreError> {
    if count == 0 {
        return Ok(());
    }
    let values: Vec<bool> = store
        .get_bits(block, 0, count)?
        .into_iter()
        .map(|x| !x)
        .collect();
    store.set_bits(block, 0, &values)
}

fn increment_registers(
    store: &mut MemoryStore,
    block: BlockKind,
    count: u16,
) -> Result<(), StoreError> {
    if count == 0 {
        return Ok(());
    }
    let values: Vec<u16> = store
        .get_registers(block, 0, count)?
        .into_iter()
        .map(|x| x.wrapping_add(1))
        .collect();
    store.set_registers(block, 0, &values)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    // initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let context = ServerContext::builder()
        .store(args.store())
        .identity(DeviceIdentity::new(
            &args.vendor_name,
            &args.product_code,
            &args.revision,
        ))
        .build();

    // if we ever drop this handle, the server will shutdown
    // along with all of its active sessions
    let server = spawn_tcp_server_task(
        args.max_sessions,
        args.address,
        context.clone(),
        args.decode_level(),
    )
    .await?;

    tracing::info!("listening on {}", server.local_addr());

    let mut reader = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    while let Some(line) = reader.next().await {
        let line = line?;
        let mut store = context
            .store()
            .lock()
            .map_err(|_| "datastore lock is poisoned")?;
        match line.trim() {
            "x" => return Ok(()),
            "uc" => toggle_bits(&mut store, BlockKind::Coils, args.coils)?,
            "udi" => toggle_bits(&mut store, BlockKind::DiscreteInputs, args.discrete_inputs)?,
            "uhr" => increment_registers(
                &mut store,
                BlockKind::HoldingRegisters,
                args.holding_registers,
            )?,
            "uir" => increment_registers(
                &mut store,
                BlockKind::InputRegisters,
                args.input_registers,
            )?,
            "stats" => println!("{}", context.control().counters()),
            _ => println!("unknown command"),
        }
    }

    Ok(())
}
