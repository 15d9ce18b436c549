use crate::{
    packet::codec::{ReadCursor, WriteCursor},
    protocol::{FixedHeader, PacketType},
};

pub mod codec;
pub mod connect;
pub mod publish;
pub mod subscribe;
pub mod unsubscribe;

#[derive(Debug)]
pub(crate) enum Packet<'a> {
    Connect(connect::Options<'a>),
    ConnAck(connect::ConnAck),
    Publish(publish::Publish<'a>),
    PubAck(PacketId),
    PubRec(PacketId),
    PubRel(PacketId),
    PubComp(PacketId),
    Subscribe(subscribe::Subscribe<'a>),
    SubAck(subscribe::SubAck),
    Unsubscribe(unsubscribe::Unsubscribe<'a>),
    UnsubAck(PacketId),
    PingReq,
    PingResp,
    Disconnect,
}

impl<'a> Packet<'a> {
    pub(crate) fn encode(&self, cursor: &mut WriteCursor) -> Result<(), crate::Error> {
        match self {
            Self::Connect(packet) => codec::encode_packet(packet, cursor),
            Self::Publish(packet) => codec::encode_packet(packet, cursor),
            Self::Subscribe(packet) => codec::encode_packet(packet, cursor),
            Self::Unsubscribe(packet) => codec::encode_packet(packet, cursor),
            Self::PubAck(id) => only_packet_id(PacketType::PubAck, 0, *id, cursor),
            Self::PubRec(id) => only_packet_id(PacketType::PubRec, 0, *id, cursor),
            Self::PubRel(id) => only_packet_id(PacketType::PubRel, 0b0010, *id, cursor),
            Self::PubComp(id) => only_packet_id(PacketType::PubComp, 0, *id, cursor),
            Self::PingReq => empty_body(PacketType::PingReq, cursor),
            Self::PingResp => empty_body(PacketType::PingResp, cursor),
            Self::Disconnect => empty_body(PacketType::Disconnect, cursor),
            _ => Err(crate::Error::EncodeNotImplemented),
        }
    }

    pub(crate) fn decode(header: &FixedHeader, body: &'a [u8]) -> Result<Self, crate::Error> {
        let cursor = &mut ReadCursor::new(body);

        let packet = match header.packet_type {
            PacketType::ConnAck => connect::ConnAck::decode(cursor).map(Packet::ConnAck)?,
            PacketType::Publish => {
                publish::Publish::decode(cursor, header.flags).map(Packet::Publish)?
            }
            PacketType::PubAck => PacketId::decode(cursor).map(Packet::PubAck)?,
            PacketType::PubRec => PacketId::decode(cursor).map(Packet::PubRec)?,
            PacketType::PubRel => PacketId::decode(cursor).map(Packet::PubRel)?,
            PacketType::PubComp => PacketId::decode(cursor).map(Packet::PubComp)?,
            PacketType::SubAck => subscribe::SubAck::decode(cursor).map(Packet::SubAck)?,
            PacketType::UnsubAck => PacketId::decode(cursor).map(Packet::UnsubAck)?,
            PacketType::PingReq => Packet::PingReq,
            PacketType::PingResp => Packet::PingResp,
            // the broker side of the exchange; a client never receives these
            PacketType::Connect
            | PacketType::Subscribe
            | PacketType::Unsubscribe
            | PacketType::Disconnect => return Err(crate::Error::UnsupportedIncomingPacket),
        };

        cursor.expect_empty()?;

        Ok(packet)
    }
}

fn only_packet_id(
    packet_type: PacketType,
    flags: u8,
    packet_id: PacketId,
    cursor: &mut WriteCursor,
) -> Result<(), crate::Error> {
    cursor.write_u8((packet_type as u8) << 4 | flags)?;
    cursor.write_u8(2)?;
    cursor.write_u16(packet_id.0)
}

fn empty_body(packet_type: PacketType, cursor: &mut WriteCursor) -> Result<(), crate::Error> {
    cursor.write_u8((packet_type as u8) << 4)?;
    cursor.write_u8(0)
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let qos = match value {
            0 => Self::AtMostOnce,
            1 => Self::AtLeastOnce,
            2 => Self::ExactlyOnce,
            _ => return Err(crate::Error::InvalidQoS),
        };

        Ok(qos)
    }
}

/// A nonzero 16-bit packet identifier; zero is reserved on the wire for
/// "no identifier".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketId(pub(crate) u16);

impl PacketId {
    pub const fn get(self) -> u16 {
        self.0
    }

    fn decode(cursor: &mut ReadCursor) -> Result<Self, crate::Error> {
        Self::try_from(cursor.read_u16()?)
    }
}

impl TryFrom<u16> for PacketId {
    type Error = crate::Error;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        if id == 0 {
            return Err(crate::Error::MalformedPacket);
        }

        Ok(Self(id))
    }
}
