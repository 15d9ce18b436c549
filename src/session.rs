use crate::packet::{
    PacketId,
    connect::{ConnAck, ConnectReturnCode},
};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum State {
    New,
    Connecting,
    #[cfg(feature = "srv")]
    Resolving,
    Connected,
    Disconnecting,
    Disconnected,
}

pub(crate) struct Session {
    state: State,
    last_mid: u16,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            state: State::New,
            last_mid: 0,
        }
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    /// Next packet identifier. Wraps past the 16-bit maximum back to 1;
    /// zero is reserved for "no identifier" and never produced.
    /// Exclusive access via `&mut self` stands in for the per-session
    /// lock the counter would otherwise need.
    pub(crate) fn next_mid(&mut self) -> PacketId {
        self.last_mid = self.last_mid.wrapping_add(1);
        if self.last_mid == 0 {
            self.last_mid = 1;
        }

        PacketId(self.last_mid)
    }

    pub(crate) fn start_connecting(&mut self) -> Result<(), crate::Error> {
        match self.state {
            State::New | State::Disconnected => {
                self.state = State::Connecting;
                Ok(())
            }
            #[cfg(feature = "srv")]
            State::Resolving => {
                self.state = State::Connecting;
                Ok(())
            }
            _ => Err(crate::Error::InvalidState),
        }
    }

    #[cfg(feature = "srv")]
    pub(crate) fn start_resolving(&mut self) -> Result<(), crate::Error> {
        match self.state {
            State::New | State::Disconnected => {
                self.state = State::Resolving;
                Ok(())
            }
            _ => Err(crate::Error::InvalidState),
        }
    }

    pub(crate) fn on_connack(&mut self, packet: &ConnAck) -> Result<(), crate::Error> {
        if self.state != State::Connecting {
            return Err(crate::Error::ProtocolViolation);
        }

        self.state = if packet.return_code == ConnectReturnCode::Accepted {
            State::Connected
        } else {
            State::Disconnected
        };

        Ok(())
    }

    pub(crate) fn expect_connected(&self) -> Result<(), crate::Error> {
        if self.state != State::Connected {
            return Err(crate::Error::NotConnected);
        }

        Ok(())
    }

    pub(crate) fn begin_disconnect(&mut self) {
        self.state = State::Disconnecting;
    }

    pub(crate) fn force_disconnected(&mut self) {
        self.state = State::Disconnected;
    }
}
