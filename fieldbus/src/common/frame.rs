use crate::error::FrameParseError;
use crate::types::UnitId;

pub(crate) mod constants {
    pub(crate) const MAX_PDU_LENGTH: usize = 253;
}

/// MBAP transaction identifier
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub struct TxId {
    value: u16,
}

impl TxId {
    /// wrap a raw value
    pub fn new(value: u16) -> Self {
        TxId { value }
    }

    /// raw value
    pub fn to_u16(self) -> u16 {
        self.value
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

/// Header fields of a received frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// transaction id, echoed in the response
    pub tx_id: TxId,
    /// protocol id, always 0 for Modbus
    pub protocol_id: u16,
    /// number of bytes following the length field, unit id included
    pub length: u16,
    /// unit id, echoed in the response
    pub unit_id: UnitId,
}

impl FrameHeader {
    /// header of a response to a request with the given ids
    pub fn new(tx_id: TxId, unit_id: UnitId) -> Self {
        Self {
            tx_id,
            protocol_id: 0,
            length: 1,
            unit_id,
        }
    }
}

impl std::fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tx_id: {} unit: {} len: {}",
            self.tx_id, self.unit_id, self.length
        )
    }
}

/// A complete frame whose header passed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// header fields
    pub header: FrameHeader,
    payload: Vec<u8>,
}

impl Frame {
    pub(crate) fn new(header: FrameHeader, payload: &[u8]) -> Self {
        Self {
            header,
            payload: payload.to_vec(),
        }
    }

    /// the PDU carried by the frame
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Reassembles frames from a byte stream and formats outgoing frames
///
/// One instance belongs to exactly one connection. Bytes are queued with
/// [`add_bytes`](Framer::add_bytes) and then consumed one frame at a time:
/// [`check_frame`](Framer::check_frame) the header, wait until
/// [`is_frame_ready`](Framer::is_frame_ready), read it with
/// [`get_frame`](Framer::get_frame) and drop it with
/// [`advance_frame`](Framer::advance_frame). A frame that fails its check is
/// removed with [`discard_frame`](Framer::discard_frame).
pub trait Framer: Send {
    /// append received bytes to the buffer
    fn add_bytes(&mut self, data: &[u8]);

    /// true if a complete frame is at the front of the buffer
    fn is_frame_ready(&self) -> bool;

    /// validate the header at the front of the buffer
    ///
    /// Succeeds when no complete header has arrived yet. Never looks at the payload.
    fn check_frame(&self) -> Result<(), FrameParseError>;

    /// the frame at the front of the buffer, `None` if it is not complete
    fn get_frame(&self) -> Option<Frame>;

    /// drop the frame returned by [`get_frame`](Framer::get_frame), keeping any bytes after it
    fn advance_frame(&mut self);

    /// drop the frame at the front of the buffer after it failed
    /// [`check_frame`](Framer::check_frame)
    fn discard_frame(&mut self);

    /// number of bytes waiting in the buffer
    fn buffered(&self) -> usize;

    /// frame an encoded response PDU with the ids of the request
    fn build_packet(&self, pdu: &[u8], header: FrameHeader) -> Vec<u8>;
}
