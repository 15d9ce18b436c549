use crate::packet::{
    PacketId, connect::ConnectReturnCode, publish::Publish, subscribe::SubAckReturnCode,
};

/// Why the session went away, as delivered to [`Notify::on_disconnect`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisconnectReason {
    /// A clean disconnect requested by this client.
    Requested = 0,
    /// The connection was lost: keepalive expired or the link dropped.
    Unexpected = 1,
    /// SRV discovery failed before any connection was attempted.
    LookupFailed = 2,
}

/// Connection lifecycle notifications. Every method has an empty
/// default body, so a sink implements only what it cares about.
pub trait Notify {
    fn on_connect(&mut self, _code: ConnectReturnCode) {}
    fn on_disconnect(&mut self, _reason: DisconnectReason) {}
    fn on_publish(&mut self, _packet_id: PacketId) {}
    fn on_message(&mut self, _message: &Publish<'_>) {}
    fn on_subscribe(&mut self, _packet_id: PacketId, _granted: &[SubAckReturnCode]) {}
    fn on_unsubscribe(&mut self, _packet_id: PacketId) {}
}

/// The silent sink.
impl Notify for () {}

impl<N: Notify> Notify for &mut N {
    fn on_connect(&mut self, code: ConnectReturnCode) {
        (**self).on_connect(code)
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        (**self).on_disconnect(reason)
    }

    fn on_publish(&mut self, packet_id: PacketId) {
        (**self).on_publish(packet_id)
    }

    fn on_message(&mut self, message: &Publish<'_>) {
        (**self).on_message(message)
    }

    fn on_subscribe(&mut self, packet_id: PacketId, granted: &[SubAckReturnCode]) {
        (**self).on_subscribe(packet_id, granted)
    }

    fn on_unsubscribe(&mut self, packet_id: PacketId) {
        (**self).on_unsubscribe(packet_id)
    }
}

/// Dispatch wrapper around the user sink. `in_callback` is the
/// re-entrancy sentinel: a sink that finds a way back into the session
/// while a notification is being delivered must not trigger a nested
/// notification on top of it.
pub(crate) struct Notifier<N> {
    sink: N,
    in_callback: bool,
}

impl<N: Notify> Notifier<N> {
    pub(crate) fn new(sink: N) -> Self {
        Self {
            sink,
            in_callback: false,
        }
    }

    pub(crate) fn connected(&mut self, code: ConnectReturnCode) {
        self.dispatch(|sink| sink.on_connect(code));
    }

    pub(crate) fn disconnected(&mut self, reason: DisconnectReason) {
        self.dispatch(|sink| sink.on_disconnect(reason));
    }

    pub(crate) fn published(&mut self, packet_id: PacketId) {
        self.dispatch(|sink| sink.on_publish(packet_id));
    }

    pub(crate) fn message(&mut self, message: &Publish<'_>) {
        self.dispatch(|sink| sink.on_message(message));
    }

    pub(crate) fn subscribed(&mut self, packet_id: PacketId, granted: &[SubAckReturnCode]) {
        self.dispatch(|sink| sink.on_subscribe(packet_id, granted));
    }

    pub(crate) fn unsubscribed(&mut self, packet_id: PacketId) {
        self.dispatch(|sink| sink.on_unsubscribe(packet_id));
    }

    fn dispatch(&mut self, deliver: impl FnOnce(&mut N)) {
        if self.in_callback {
            return;
        }

        self.in_callback = true;
        deliver(&mut self.sink);
        self.in_callback = false;
    }
}
