use crate::packet::{
    PacketId,
    codec::{EncodePacket, WriteCursor},
};
use crate::protocol::PacketType;

#[derive(Debug)]
pub(crate) struct Unsubscribe<'a> {
    pub packet_id: PacketId,
    pub topic_filter: &'a str,
}

impl EncodePacket for Unsubscribe<'_> {
    const PACKET_TYPE: PacketType = PacketType::Unsubscribe;

    fn flags(&self) -> u8 {
        0b0010
    }

    fn body_len(&self) -> usize {
        2 + 2 + self.topic_filter.len()
    }

    fn encode_body(&self, cursor: &mut WriteCursor) -> Result<(), crate::Error> {
        cursor.write_u16(self.packet_id.0)?;
        cursor.write_utf8(self.topic_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::codec;

    #[test]
    fn unsubscribe_on_the_wire() {
        let packet = Unsubscribe {
            packet_id: PacketId(2),
            topic_filter: "a/+",
        };

        let mut buf = [0u8; 16];
        let mut cursor = WriteCursor::new(&mut buf);
        codec::encode_packet(&packet, &mut cursor).unwrap();

        // [
        //   0xA2, 7,               // UNSUBSCRIBE, remaining length
        //   0, 2,                  // packet id
        //   0, 3,  97, 47, 43,     // "a/+"
        // ]
        assert_eq!(cursor.written(), &[0xA2, 7, 0, 2, 0, 3, b'a', b'/', b'+']);
    }
}
