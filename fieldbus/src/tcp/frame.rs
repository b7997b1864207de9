use crate::common::frame::{Frame, FrameHeader, Framer, TxId};
use crate::common::phys::HexDump;
use crate::decode::AduDecodeLevel;
use crate::error::FrameParseError;
use crate::types::UnitId;

use scursor::{ReadCursor, ReadError};

pub(crate) mod constants {
    /// fixed header plus the unit id
    pub(crate) const HEADER_LENGTH: usize = 7;
    /// the length field counts the unit id
    pub(crate) const MAX_LENGTH_FIELD: usize = crate::common::frame::constants::MAX_PDU_LENGTH + 1;
}

/// [`Framer`] for Modbus TCP (MBAP)
///
/// ```text
/// | tx id (2) | protocol id (2) | length (2) | unit id (1) | pdu (length - 1) |
/// ```
pub struct MbapFramer {
    buffer: Vec<u8>,
    // bytes of a discarded frame that have not arrived yet
    skip: usize,
    decode: AduDecodeLevel,
}

impl MbapFramer {
    /// create a framer with an empty buffer
    pub fn new(decode: AduDecodeLevel) -> Self {
        Self {
            buffer: Vec::new(),
            skip: 0,
            decode,
        }
    }

    /// boxed framer, usable as a framer factory
    pub fn boxed(decode: AduDecodeLevel) -> Box<dyn Framer> {
        Box::new(Self::new(decode))
    }

    fn header(&self) -> Option<FrameHeader> {
        let mut cursor = ReadCursor::new(self.buffer.get(0..constants::HEADER_LENGTH)?);
        Self::parse_header(&mut cursor).ok()
    }

    fn parse_header(cursor: &mut ReadCursor) -> Result<FrameHeader, ReadError> {
        Ok(FrameHeader {
            tx_id: TxId::new(cursor.read_u16_be()?),
            protocol_id: cursor.read_u16_be()?,
            length: cursor.read_u16_be()?,
            unit_id: UnitId::new(cursor.read_u8()?),
        })
    }

    // total size of the frame claimed by a header
    fn frame_length(header: &FrameHeader) -> usize {
        constants::HEADER_LENGTH + (header.length as usize).saturating_sub(1)
    }
}

impl Default for MbapFramer {
    fn default() -> Self {
        Self::new(AduDecodeLevel::Nothing)
    }
}

impl Framer for MbapFramer {
    fn add_bytes(&mut self, data: &[u8]) {
        let skipped = self.skip.min(data.len());
        self.skip -= skipped;
        if let Some(rest) = data.get(skipped..) {
            self.buffer.extend_from_slice(rest);
        }
    }

    fn is_frame_ready(&self) -> bool {
        match self.header() {
            Some(header) => self.buffer.len() >= Self::frame_length(&header),
            None => false,
        }
    }

    fn check_frame(&self) -> Result<(), FrameParseError> {
        let header = match self.header() {
            Some(header) => header,
            None => return Ok(()),
        };

        if header.protocol_id != 0 {
            return Err(FrameParseError::UnknownProtocolId(header.protocol_id));
        }

        // the unit id always counts towards the length, and a request needs a function code
        if header.length < 2 {
            return Err(FrameParseError::MbapLengthTooSmall(header.length as usize));
        }

        if header.length as usize > constants::MAX_LENGTH_FIELD {
            return Err(FrameParseError::MbapLengthTooBig(
                header.length as usize,
                constants::MAX_LENGTH_FIELD,
            ));
        }

        Ok(())
    }

    fn get_frame(&self) -> Option<Frame> {
        let header = self.header()?;
        let payload = self
            .buffer
            .get(constants::HEADER_LENGTH..Self::frame_length(&header))?;

        if self.decode.enabled() {
            tracing::info!("MBAP RX - {}", MbapDisplay::new(self.decode, header, payload));
        }

        Some(Frame::new(header, payload))
    }

    fn advance_frame(&mut self) {
        if let Some(header) = self.header() {
            let length = Self::frame_length(&header).min(self.buffer.len());
            self.buffer.drain(..length);
        }
    }

    fn discard_frame(&mut self) {
        let header = match self.header() {
            Some(header) => header,
            None => {
                self.buffer.clear();
                return;
            }
        };

        // an oversized length cannot be trusted to resynchronize the stream
        if header.length as usize > constants::MAX_LENGTH_FIELD {
            self.buffer.clear();
            return;
        }

        let length = Self::frame_length(&header);
        if self.buffer.len() >= length {
            self.buffer.drain(..length);
        } else {
            // drop the rest of the claimed span as it arrives
            self.skip = length - self.buffer.len();
            self.buffer.clear();
        }
    }

    fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn build_packet(&self, pdu: &[u8], header: FrameHeader) -> Vec<u8> {
        // responses never exceed the maximum PDU size, so the length always fits
        let length = u16::try_from(pdu.len() + 1).unwrap_or(u16::MAX);
        let header = FrameHeader {
            protocol_id: 0,
            length,
            ..header
        };

        let mut packet = Vec::with_capacity(constants::HEADER_LENGTH + pdu.len());
        packet.extend_from_slice(&header.tx_id.to_u16().to_be_bytes());
        packet.extend_from_slice(&header.protocol_id.to_be_bytes());
        packet.extend_from_slice(&header.length.to_be_bytes());
        packet.push(header.unit_id.value);
        packet.extend_from_slice(pdu);

        if self.decode.enabled() {
            tracing::info!("MBAP TX - {}", MbapDisplay::new(self.decode, header, pdu));
        }

        packet
    }
}

pub(crate) struct MbapDisplay<'a> {
    level: AduDecodeLevel,
    header: FrameHeader,
    bytes: &'a [u8],
}

impl<'a> MbapDisplay<'a> {
    pub(crate) fn new(level: AduDecodeLevel, header: FrameHeader, bytes: &'a [u8]) -> Self {
        MbapDisplay {
            level,
            header,
            bytes,
        }
    }
}

impl std::fmt::Display for MbapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.header)?;
        if self.level.payload_enabled() {
            write!(f, "{}", HexDump(self.bytes))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //                            |   tx id  |  proto id |  length  | unit |  payload   |
    const SIMPLE_FRAME: &[u8] = &[0x00, 0x07, 0x00, 0x00, 0x00, 0x03, 0x2A, 0x03, 0x04];

    fn assert_equals_simple_frame(frame: &Frame) {
        assert_eq!(frame.header.tx_id, TxId::new(0x0007));
        assert_eq!(frame.header.unit_id, UnitId::new(0x2A));
        assert_eq!(frame.payload(), &[0x03, 0x04]);
    }

    fn test_segmented_parse(split_at: usize) {
        let (f1, f2) = SIMPLE_FRAME.split_at(split_at);
        let mut framer = MbapFramer::default();
        framer.add_bytes(f1);
        assert!(!framer.is_frame_ready());
        assert_eq!(framer.get_frame(), None);
        framer.add_bytes(f2);
        assert!(framer.is_frame_ready());
        assert_eq!(framer.check_frame(), Ok(()));
        assert_equals_simple_frame(&framer.get_frame().unwrap());
    }

    #[test]
    fn correctly_formats_frame() {
        let framer = MbapFramer::default();
        let output = framer.build_packet(
            &[0x03, 0x04],
            FrameHeader::new(TxId::new(7), UnitId::new(42)),
        );
        assert_eq!(output, SIMPLE_FRAME);
    }

    #[test]
    fn can_parse_frame() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(SIMPLE_FRAME);
        assert!(framer.is_frame_ready());
        assert_equals_simple_frame(&framer.get_frame().unwrap());
        framer.advance_frame();
        assert_eq!(framer.buffered(), 0);
        assert!(!framer.is_frame_ready());
    }

    #[test]
    fn get_frame_does_not_consume() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(SIMPLE_FRAME);
        assert_eq!(framer.get_frame(), framer.get_frame());
        assert_eq!(framer.buffered(), SIMPLE_FRAME.len());
    }

    #[test]
    fn can_parse_maximum_size_frame() {
        // maximum PDU length is 253, so max MBAP length value is 254 which is 0xFE
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x07, 0x00, 0x00, 0x00, 0xFE, 0x2A]);
        framer.add_bytes(&[0xCC; 253]);
        assert_eq!(framer.check_frame(), Ok(()));
        assert!(framer.is_frame_ready());
        assert_eq!(framer.get_frame().unwrap().payload(), [0xCC; 253].as_ref());
    }

    #[test]
    fn can_parse_frame_if_segmented_in_header() {
        test_segmented_parse(4);
    }

    #[test]
    fn can_parse_frame_if_segmented_in_payload() {
        test_segmented_parse(8);
    }

    #[test]
    fn can_parse_frame_delivered_one_byte_at_a_time() {
        let mut framer = MbapFramer::default();
        for (i, byte) in SIMPLE_FRAME.iter().enumerate() {
            assert!(!framer.is_frame_ready(), "ready after {i} bytes");
            framer.add_bytes(&[*byte]);
        }
        assert_equals_simple_frame(&framer.get_frame().unwrap());
    }

    #[test]
    fn pipelined_frames_are_ready_one_after_the_other() {
        let mut framer = MbapFramer::default();
        let mut both = SIMPLE_FRAME.to_vec();
        both.extend_from_slice(&[0x00, 0x08, 0x00, 0x00, 0x00, 0x02, 0x01, 0x05]);
        framer.add_bytes(&both);

        assert!(framer.is_frame_ready());
        assert_equals_simple_frame(&framer.get_frame().unwrap());
        framer.advance_frame();

        assert!(framer.is_frame_ready());
        let second = framer.get_frame().unwrap();
        assert_eq!(second.header.tx_id, TxId::new(8));
        assert_eq!(second.payload(), &[0x05]);
        framer.advance_frame();

        assert!(!framer.is_frame_ready());
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn errors_on_bad_protocol_id() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x07, 0xCA, 0xFE, 0x00, 0x01, 0x2A]);
        assert_eq!(
            framer.check_frame(),
            Err(FrameParseError::UnknownProtocolId(0xCAFE))
        );
    }

    #[test]
    fn errors_on_length_of_zero() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x2A]);
        assert_eq!(
            framer.check_frame(),
            Err(FrameParseError::MbapLengthTooSmall(0))
        );
    }

    #[test]
    fn errors_on_frame_with_only_a_unit_id() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x07, 0x00, 0x00, 0x00, 0x01, 0x2A]);
        assert_eq!(
            framer.check_frame(),
            Err(FrameParseError::MbapLengthTooSmall(1))
        );
    }

    #[test]
    fn errors_when_mbap_length_too_big() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x07, 0x00, 0x00, 0x00, 0xFF, 0x2A]);
        assert_eq!(
            framer.check_frame(),
            Err(FrameParseError::MbapLengthTooBig(0xFF, 0xFE))
        );
    }

    #[test]
    fn incomplete_header_is_not_checked() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x07, 0xCA, 0xFE]);
        assert_eq!(framer.check_frame(), Ok(()));
    }

    #[test]
    fn discard_keeps_the_following_frame() {
        let mut framer = MbapFramer::default();
        // bad protocol id with a complete claimed span, followed by a good frame
        framer.add_bytes(&[0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0x01, 0xAA]);
        framer.add_bytes(SIMPLE_FRAME);
        assert!(framer.check_frame().is_err());
        framer.discard_frame();
        assert_eq!(framer.check_frame(), Ok(()));
        assert_equals_simple_frame(&framer.get_frame().unwrap());
    }

    #[test]
    fn discard_clears_the_buffer_when_the_length_is_too_big() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x07, 0x00, 0x00, 0x01, 0x00, 0x2A, 0x01]);
        assert!(framer.check_frame().is_err());
        framer.discard_frame();
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn discard_skips_the_rest_of_a_partially_received_frame() {
        //                        |  tx id   |  bad proto |  length  | unit | fc  |  address |  count |
        let bad: &[u8] = &[0x00, 0x01, 0xCA, 0xFE, 0x00, 0x06, 0x2A, 0x01, 0x00, 0x00, 0x00, 0x01];
        let (head, tail) = bad.split_at(8);

        let mut framer = MbapFramer::default();
        framer.add_bytes(head);
        assert!(framer.check_frame().is_err());
        framer.discard_frame();
        assert_eq!(framer.buffered(), 0);

        // the remainder of the bad frame arrives together with a good frame
        let mut rest = tail.to_vec();
        rest.extend_from_slice(SIMPLE_FRAME);
        framer.add_bytes(&rest);

        assert_eq!(framer.check_frame(), Ok(()));
        assert!(framer.is_frame_ready());
        assert_equals_simple_frame(&framer.get_frame().unwrap());
        framer.advance_frame();
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn skipped_bytes_may_span_several_reads() {
        let mut framer = MbapFramer::default();
        framer.add_bytes(&[0x00, 0x01, 0xCA, 0xFE, 0x00, 0x06, 0x2A]);
        framer.discard_frame();

        framer.add_bytes(&[0x01, 0x00]);
        framer.add_bytes(&[0x00]);
        assert_eq!(framer.buffered(), 0);

        let mut rest = vec![0x00, 0x01];
        rest.extend_from_slice(SIMPLE_FRAME);
        framer.add_bytes(&rest);
        assert_equals_simple_frame(&framer.get_frame().unwrap());
    }
}
