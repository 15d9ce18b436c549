use crate::packet::{
    PacketId, QoS,
    codec::{EncodePacket, ReadCursor, WriteCursor},
};
use crate::protocol::PacketType;
use crate::topic;

#[derive(Debug)]
pub struct Publish<'a> {
    pub flags: Flags,
    pub topic: &'a str,
    pub packet_id: Option<PacketId>,
    pub payload: &'a [u8],
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Flags {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
}

impl TryFrom<u8> for Flags {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let dup = value & 0b1000 != 0;
        let qos = QoS::try_from((value >> 1) & 0b11)?;
        let retain = value & 0b0001 != 0;

        Ok(Self { dup, qos, retain })
    }
}

impl From<&Flags> for u8 {
    fn from(value: &Flags) -> Self {
        (value.dup as u8) << 3 | (value.qos as u8) << 1 | (value.retain as u8)
    }
}

impl<'a> Publish<'a> {
    pub(crate) fn decode(cursor: &mut ReadCursor<'a>, flags: u8) -> Result<Self, crate::Error> {
        let flags = Flags::try_from(flags)?;

        // a published topic is a concrete name, never a filter
        let topic = cursor.read_utf8()?;
        topic::check_topic(topic)?;

        let packet_id = if let QoS::AtMostOnce = flags.qos {
            None
        } else {
            Some(PacketId::try_from(cursor.read_u16()?)?)
        };

        let payload = cursor.read_rest();

        Ok(Publish {
            flags,
            topic,
            packet_id,
            payload,
        })
    }
}

impl EncodePacket for Publish<'_> {
    const PACKET_TYPE: PacketType = PacketType::Publish;

    fn flags(&self) -> u8 {
        (&self.flags).into()
    }

    fn body_len(&self) -> usize {
        2 + self.topic.len()
            + self.packet_id.map(|_| 2).unwrap_or(0)
            + self.payload.len()
    }

    fn encode_body(&self, cursor: &mut WriteCursor) -> Result<(), crate::Error> {
        cursor.write_utf8(self.topic)?;

        if let Some(id) = self.packet_id {
            cursor.write_u16(id.0)?;
        }

        // the payload runs to the end of the packet, no length prefix
        cursor.write_bytes(self.payload)
    }
}
