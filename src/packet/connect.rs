use crate::packet::{
    QoS,
    codec::{EncodePacket, ReadCursor, WriteCursor},
};
use crate::protocol::PacketType;

#[derive(Debug)]
pub struct Options<'a> {
    pub client_id: &'a str,
    pub keep_alive: u16,
    pub clean_session: bool,
    pub will: Option<WillOptions<'a>>,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
}

#[derive(Debug)]
pub struct WillOptions<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

impl EncodePacket for Options<'_> {
    const PACKET_TYPE: PacketType = PacketType::Connect;

    fn flags(&self) -> u8 {
        0
    }

    fn body_len(&self) -> usize {
        // protocol name + level + connect flags + keep alive
        let mut len = 2 + 4 + 1 + 1 + 2;
        len += 2 + self.client_id.len();

        if let Some(will) = &self.will {
            len += 2 + will.topic.len() + 2 + will.payload.len();
        }

        if let Some(username) = self.username {
            len += 2 + username.len();
        }

        if let Some(password) = self.password {
            len += 2 + password.len();
        }

        len
    }

    fn encode_body(&self, cursor: &mut WriteCursor) -> Result<(), crate::Error> {
        cursor.write_utf8("MQTT")?;
        cursor.write_u8(4)?;

        let mut flags = (self.clean_session as u8) << 1;
        if let Some(will) = &self.will {
            flags |= 0b0000_0100 | (will.qos as u8) << 3 | (will.retain as u8) << 5;
        }
        if self.username.is_some() {
            flags |= 0b1000_0000;
        }
        if self.password.is_some() {
            flags |= 0b0100_0000;
        }
        cursor.write_u8(flags)?;

        cursor.write_u16(self.keep_alive)?;
        cursor.write_utf8(self.client_id)?;

        if let Some(will) = &self.will {
            cursor.write_utf8(will.topic)?;
            cursor.write_binary_chunk(will.payload)?;
        }

        if let Some(username) = self.username {
            cursor.write_utf8(username)?;
        }

        if let Some(password) = self.password {
            cursor.write_binary_chunk(password)?;
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct ConnAck {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

impl ConnAck {
    pub(crate) fn decode(cursor: &mut ReadCursor) -> Result<Self, crate::Error> {
        let flags = cursor.read_u8()?;

        if flags & 0b1111_1110 != 0 {
            return Err(crate::Error::MalformedPacket);
        }

        let session_present = (flags & 0b0000_0001) != 0;
        let return_code = ConnectReturnCode::try_from(cursor.read_u8()?)?;

        if return_code != ConnectReturnCode::Accepted && session_present {
            return Err(crate::Error::MalformedPacket);
        }

        Ok(ConnAck {
            session_present,
            return_code,
        })
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadUserNameOrPassword = 4,
    NotAuthorized = 5,
}

impl TryFrom<u8> for ConnectReturnCode {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUserNameOrPassword,
            5 => Self::NotAuthorized,
            _ => return Err(crate::Error::InvalidConnectReturnCode),
        };

        Ok(code)
    }
}
