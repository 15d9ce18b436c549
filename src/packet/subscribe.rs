use heapless::Vec;

use crate::packet::{
    PacketId, QoS,
    codec::{EncodePacket, ReadCursor, WriteCursor},
};
use crate::protocol::PacketType;

/// One SUBACK return code per requested filter; this client sends one
/// filter per SUBSCRIBE, the cap leaves room for permissive brokers.
pub(crate) const MAX_GRANTED: usize = 8;

#[derive(Debug)]
pub(crate) struct Subscribe<'a> {
    pub packet_id: PacketId,
    pub topic_filter: &'a str,
    pub qos: QoS,
}

impl EncodePacket for Subscribe<'_> {
    const PACKET_TYPE: PacketType = PacketType::Subscribe;

    fn flags(&self) -> u8 {
        0b0010
    }

    fn body_len(&self) -> usize {
        2 + 2 + self.topic_filter.len() + 1
    }

    fn encode_body(&self, cursor: &mut WriteCursor) -> Result<(), crate::Error> {
        cursor.write_u16(self.packet_id.0)?;
        cursor.write_utf8(self.topic_filter)?;
        cursor.write_u8(self.qos as u8)
    }
}

#[derive(Debug)]
pub(crate) struct SubAck {
    pub packet_id: PacketId,
    pub return_codes: Vec<SubAckReturnCode, MAX_GRANTED>,
}

impl SubAck {
    pub(crate) fn decode(cursor: &mut ReadCursor) -> Result<Self, crate::Error> {
        let packet_id = PacketId::try_from(cursor.read_u16()?)?;

        let mut return_codes = Vec::new();

        while !cursor.is_empty() {
            let code = SubAckReturnCode::try_from(cursor.read_u8()?)?;
            return_codes
                .push(code)
                .map_err(|_| crate::Error::VectorIsFull)?;
        }

        if return_codes.is_empty() {
            return Err(crate::Error::MalformedPacket);
        }

        Ok(SubAck {
            packet_id,
            return_codes,
        })
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubAckReturnCode {
    MaximumQoS0 = 0x00,
    MaximumQoS1 = 0x01,
    MaximumQoS2 = 0x02,
    Failure = 0x80,
}

impl TryFrom<u8> for SubAckReturnCode {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let code = match value {
            0x00 => Self::MaximumQoS0,
            0x01 => Self::MaximumQoS1,
            0x02 => Self::MaximumQoS2,
            0x80 => Self::Failure,
            _ => return Err(crate::Error::MalformedPacket),
        };

        Ok(code)
    }
}
