//! Integration tests for the fieldbus server.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use fieldbus::datastore::{DataBlock, Datastore, MemoryStore};
use fieldbus::pdu::*;
use fieldbus::server::*;
use fieldbus::*;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;

const UNIT_ID: u8 = 0x01;
const TIMEOUT: Duration = Duration::from_secs(5);

struct Client {
    stream: TcpStream,
    tx_id: u16,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            tx_id: 0,
        }
    }

    fn frame(tx_id: u16, pdu: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&tx_id.to_be_bytes());
        frame.extend_from_slice(&[0x00, 0x00]);
        frame.extend_from_slice(&(pdu.len() as u16 + 1).to_be_bytes());
        frame.push(UNIT_ID);
        frame.extend_from_slice(pdu);
        frame
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    async fn receive(&mut self) -> (u16, Response) {
        let mut header = [0; 7];
        tokio::time::timeout(TIMEOUT, self.stream.read_exact(&mut header))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&header[2..4], &[0x00, 0x00]);
        assert_eq!(header[6], UNIT_ID);

        let length = u16::from_be_bytes([header[4], header[5]]) as usize;
        let mut pdu = vec![0; length - 1];
        tokio::time::timeout(TIMEOUT, self.stream.read_exact(&mut pdu))
            .await
            .unwrap()
            .unwrap();

        (
            u16::from_be_bytes([header[0], header[1]]),
            Response::decode(&pdu).unwrap(),
        )
    }

    async fn request(&mut self, request: Request) -> Response {
        self.tx_id = self.tx_id.wrapping_add(1);
        let tx_id = self.tx_id;
        self.send_raw(&Self::frame(tx_id, &request.encode())).await;
        let (received, response) = self.receive().await;
        assert_eq!(received, tx_id);
        response
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_coils(DataBlock::filled(0, 10, false))
        .with_discrete_inputs(DataBlock::sequential(0, vec![true, false, true]))
        .with_holding_registers(DataBlock::filled(0, 10, 0))
        .with_input_registers(DataBlock::sparse([(100, 0xCAFE), (101, 0xBEEF)]))
}

async fn start(max_sessions: usize, context: ServerContext<MemoryStore>) -> ServerHandle {
    spawn_tcp_server_task(
        max_sessions,
        SocketAddr::from_str("127.0.0.1:0").unwrap(),
        context,
        DecodeLevel::new(
            PduDecodeLevel::DataValues,
            AduDecodeLevel::Payload,
            PhysDecodeLevel::Data,
        ),
    )
    .await
    .unwrap()
}

async fn test_requests_and_responses() {
    let context = ServerContext::builder().store(store()).build();
    let server = start(10, context.clone()).await;
    let mut client = Client::connect(server.local_addr()).await;

    assert_eq!(
        client
            .request(Request::ReadDiscreteInputs(ReadBitsRequest::new(0, 3)))
            .await,
        Response::ReadDiscreteInputs(ReadBitsResponse::new(vec![
            true, false, true, false, false, false, false, false
        ]))
    );

    assert_eq!(
        client
            .request(Request::WriteSingleCoil(WriteSingleCoil::new(1, true)))
            .await,
        Response::WriteSingleCoil(WriteSingleCoil::new(1, true))
    );

    assert_eq!(
        client
            .request(Request::WriteMultipleCoils(WriteMultipleCoilsRequest::new(
                5,
                vec![true, true, false, true]
            )))
            .await,
        Response::WriteMultipleCoils(WriteMultipleResponse::new(5, 4))
    );

    match client
        .request(Request::ReadCoils(ReadBitsRequest::new(0, 10)))
        .await
    {
        Response::ReadCoils(x) => {
            let expected = [
                false, true, false, false, false, true, true, false, true, false,
            ];
            for (i, value) in expected.iter().enumerate() {
                assert_eq!(x.get_bit(i), *value, "coil {i}");
            }
        }
        other => panic!("unexpected response: {other:?}"),
    }

    assert_eq!(
        client
            .request(Request::WriteMultipleRegisters(
                WriteMultipleRegistersRequest::new(8, vec![0x0102, 0x0304])
            ))
            .await,
        Response::WriteMultipleRegisters(WriteMultipleResponse::new(8, 2))
    );

    assert_eq!(
        client
            .request(Request::WriteSingleRegister(WriteSingleRegister::new(
                0, 0xFFFF
            )))
            .await,
        Response::WriteSingleRegister(WriteSingleRegister::new(0, 0xFFFF))
    );

    assert_eq!(
        client
            .request(Request::ReadHoldingRegisters(ReadRegistersRequest::new(7, 3)))
            .await,
        Response::ReadHoldingRegisters(ReadRegistersResponse::new(vec![0, 0x0102, 0x0304]))
    );

    assert_eq!(
        client
            .request(Request::ReadInputRegisters(ReadRegistersRequest::new(100, 2)))
            .await,
        Response::ReadInputRegisters(ReadRegistersResponse::new(vec![0xCAFE, 0xBEEF]))
    );

    // the application sees what the clients wrote
    assert_eq!(
        context
            .store()
            .lock()
            .unwrap()
            .get_registers(BlockKind::HoldingRegisters, 0, 1),
        Ok(vec![0xFFFF])
    );

    // exceptions
    assert_eq!(
        client
            .request(Request::ReadCoils(ReadBitsRequest::new(0, 0x800)))
            .await
            .exception_code(),
        Some(ExceptionCode::IllegalDataValue)
    );
    assert_eq!(
        client
            .request(Request::ReadCoils(ReadBitsRequest::new(8, 5)))
            .await
            .exception_code(),
        Some(ExceptionCode::IllegalDataAddress)
    );
    assert_eq!(
        client
            .request(Request::ReadInputRegisters(ReadRegistersRequest::new(101, 2)))
            .await
            .exception_code(),
        Some(ExceptionCode::IllegalDataAddress)
    );

    // unsupported function code
    client.send_raw(&Client::frame(0x1234, &[0x2B, 0x0E, 0x01, 0x00])).await;
    let (tx_id, response) = client.receive().await;
    assert_eq!(tx_id, 0x1234);
    assert_eq!(
        response,
        Response::Exception(ExceptionResponse::new(0x2B, ExceptionCode::IllegalFunction))
    );

    let counters = context.control().counters();
    assert_eq!(counters.active_connections, 1);
    assert_eq!(counters.exceptions_sent, 4);
}

async fn test_pipelined_and_segmented_requests() {
    let context = ServerContext::builder().store(store()).build();
    let server = start(10, context.clone()).await;
    let mut client = Client::connect(server.local_addr()).await;

    // a frame with a bad protocol id, two good frames, and half of a third one
    let mut bytes = vec![0x00, 0x63, 0xCA, 0xFE, 0x00, 0x02, UNIT_ID, 0x01];
    bytes.extend(Client::frame(
        1,
        &Request::ReadDiscreteInputs(ReadBitsRequest::new(0, 1)).encode(),
    ));
    bytes.extend(Client::frame(
        2,
        &Request::WriteSingleCoil(WriteSingleCoil::new(3, true)).encode(),
    ));
    let third = Client::frame(
        3,
        &Request::ReadCoils(ReadBitsRequest::new(3, 1)).encode(),
    );
    let (head, tail) = third.split_at(5);
    bytes.extend_from_slice(head);

    client.send_raw(&bytes).await;
    assert_eq!(
        client.receive().await,
        (
            1,
            Response::ReadDiscreteInputs(ReadBitsResponse::new(vec![
                true, false, false, false, false, false, false, false
            ]))
        )
    );
    assert_eq!(
        client.receive().await,
        (2, Response::WriteSingleCoil(WriteSingleCoil::new(3, true)))
    );

    client.send_raw(tail).await;
    let (tx_id, response) = client.receive().await;
    assert_eq!(tx_id, 3);
    match response {
        Response::ReadCoils(x) => assert!(x.get_bit(0)),
        other => panic!("unexpected response: {other:?}"),
    }

    assert_eq!(context.control().counters().framing_errors, 1);
}

async fn test_bad_header_split_across_writes() {
    let context = ServerContext::builder().store(store()).build();
    let server = start(10, context.clone()).await;
    let mut client = Client::connect(server.local_addr()).await;

    // bad protocol id, the length field claims 6 bytes after the header
    let bad = [0x00, 0x09, 0xCA, 0xFE, 0x00, 0x06, UNIT_ID, 0x01, 0x00, 0x00, 0x00, 0x05];
    let (head, tail) = bad.split_at(8);

    client.send_raw(head).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut bytes = tail.to_vec();
    bytes.extend(Client::frame(
        4,
        &Request::ReadCoils(ReadBitsRequest::new(0, 1)).encode(),
    ));
    client.send_raw(&bytes).await;

    let (tx_id, response) = client.receive().await;
    assert_eq!(tx_id, 4);
    match response {
        Response::ReadCoils(x) => assert!(!x.get_bit(0)),
        other => panic!("unexpected response: {other:?}"),
    }

    assert_eq!(context.control().counters().framing_errors, 1);
}

async fn test_concurrent_clients() {
    const CLIENTS: u16 = 5;

    let context = ServerContext::builder()
        .store(MemoryStore::new().with_holding_registers(DataBlock::filled(0, CLIENTS * 10, 0)))
        .build();
    let server = start(CLIENTS as usize, context.clone()).await;
    let addr = server.local_addr();

    let tasks: Vec<_> = (0..CLIENTS)
        .map(|id| {
            tokio::spawn(async move {
                let mut client = Client::connect(addr).await;
                for i in 0..10 {
                    let address = id * 10 + i;
                    let response = client
                        .request(Request::WriteSingleRegister(WriteSingleRegister::new(
                            address, address,
                        )))
                        .await;
                    assert_eq!(response.exception_code(), None);
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let values = context
        .store()
        .lock()
        .unwrap()
        .get_registers(BlockKind::HoldingRegisters, 0, CLIENTS * 10)
        .unwrap();
    assert_eq!(values, (0..CLIENTS * 10).collect::<Vec<u16>>());
}

async fn test_max_sessions_closes_the_oldest() {
    let context = ServerContext::builder().store(store()).build();
    let server = start(1, context).await;

    let mut first = Client::connect(server.local_addr()).await;
    first
        .request(Request::ReadCoils(ReadBitsRequest::new(0, 1)))
        .await;

    let mut second = Client::connect(server.local_addr()).await;
    second
        .request(Request::ReadCoils(ReadBitsRequest::new(0, 1)))
        .await;

    // the first session was shut down when the second one was accepted
    let mut buffer = [0; 1];
    let count = tokio::time::timeout(TIMEOUT, first.stream.read(&mut buffer))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(count, 0);
}

#[test]
fn can_read_and_write_values() {
    init_logging();
    let rt = Runtime::new().unwrap();
    rt.block_on(test_requests_and_responses())
}

#[test]
fn handles_pipelined_and_segmented_requests() {
    init_logging();
    let rt = Runtime::new().unwrap();
    rt.block_on(test_pipelined_and_segmented_requests())
}

#[test]
fn skips_bad_header_split_across_writes() {
    init_logging();
    let rt = Runtime::new().unwrap();
    rt.block_on(test_bad_header_split_across_writes())
}

#[test]
fn concurrent_clients_write_disjoint_registers() {
    init_logging();
    let rt = Runtime::new().unwrap();
    rt.block_on(test_concurrent_clients())
}

#[test]
fn exceeding_max_sessions_closes_the_oldest() {
    init_logging();
    let rt = Runtime::new().unwrap();
    rt.block_on(test_max_sessions_closes_the_oldest())
}
