use embedded_io_async::{Read, ReadExactError, Write};
use embedded_time::{
    Clock,
    duration::{self, Seconds},
};

use crate::{
    keep_alive::KeepAlive,
    notify::{DisconnectReason, Notifier, Notify},
    packet::{
        Packet, PacketId, QoS,
        codec::WriteCursor,
        connect::{ConnectReturnCode, Options},
        publish::{Flags, Publish},
        subscribe::Subscribe,
        unsubscribe::Unsubscribe,
    },
    parser,
    session::{Session, State},
    topic,
    transport::Transport,
};

#[cfg(feature = "srv")]
use crate::srv::{self, Resolver};

/// Per-client configuration that outlives individual connects.
#[derive(Default)]
pub struct Config {
    /// A secure channel is configured on the transport. The core only
    /// uses this to pick the SRV service label.
    pub secure: bool,
    /// Set when this session is an outbound bridge to another broker.
    pub bridge: Option<Bridge>,
}

pub struct Bridge {
    pub start: BridgeStart,
    /// Seconds without outbound traffic before a lazy bridge is torn
    /// down.
    pub idle_timeout: u16,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeStart {
    Automatic,
    Lazy,
}

enum Reply {
    PubAck(PacketId),
    PubRec(PacketId),
    PubRel(PacketId),
    PubComp(PacketId),
    PingResp,
}

/// A single logical broker connection: owns the transport link, the
/// connection state machine, the liveness monitor, and the
/// notification sink. Drive it with [`Client::poll`] whenever inbound
/// data is expected and [`Client::tick`] from a periodic timer, around
/// once per second.
pub struct Client<C, T, N, const BUF: usize = 1024>
where
    C: Clock,
    T: Transport,
    N: Notify,
{
    clock: C,
    transport: T,
    link: Option<T::Link>,
    notifier: Notifier<N>,
    session: Session,
    keep_alive: KeepAlive<C>,
    config: Config,
    rx: [u8; BUF],
    tx: [u8; BUF],
}

impl<C, T, N, const BUF: usize> Client<C, T, N, BUF>
where
    C: Clock,
    Seconds<u32>: TryFrom<duration::Generic<C::T>>,
    T: Transport,
    N: Notify,
{
    pub fn try_new(clock: C, transport: T, sink: N, config: Config) -> Result<Self, crate::Error> {
        let keep_alive = KeepAlive::try_new(&clock, 0)?;

        Ok(Self {
            clock,
            transport,
            link: None,
            notifier: Notifier::new(sink),
            session: Session::new(),
            keep_alive,
            config,
            rx: [0u8; BUF],
            tx: [0u8; BUF],
        })
    }

    pub fn is_connected(&self) -> bool {
        self.session.state() == State::Connected
    }

    /// Opens the transport and sends CONNECT. The broker's answer
    /// arrives through [`Client::poll`] as an `on_connect`
    /// notification.
    pub async fn connect(
        &mut self,
        host: &str,
        port: u16,
        bind_address: Option<&str>,
        options: Options<'_>,
    ) -> Result<(), crate::Error> {
        if let Some(will) = &options.will {
            topic::check_topic(will.topic)?;
        }

        self.session.start_connecting()?;
        self.keep_alive = KeepAlive::try_new(&self.clock, options.keep_alive)?;

        match self.transport.open(host, port, bind_address).await {
            Ok(link) => self.link = Some(link),
            Err(_) => {
                self.session.force_disconnected();
                return Err(crate::Error::TransportError);
            }
        }

        if let Err(err) = self.send_packet(&Packet::Connect(options)).await {
            self.close_link().await;
            self.session.force_disconnected();
            return Err(err);
        }

        Ok(())
    }

    /// Discovers the broker through a DNS SRV lookup, then connects to
    /// the first candidate. A failed lookup is reported through
    /// `on_disconnect` with [`DisconnectReason::LookupFailed`] and no
    /// connection is attempted.
    #[cfg(feature = "srv")]
    pub async fn connect_srv<R: Resolver>(
        &mut self,
        resolver: &mut R,
        host: &str,
        bind_address: Option<&str>,
        options: Options<'_>,
    ) -> Result<(), crate::Error> {
        let query = srv::service_name(host, self.config.secure)?;
        self.session.start_resolving()?;

        let candidate = match resolver.resolve_srv(&query).await {
            Ok(candidates) => candidates
                .into_iter()
                .next()
                .ok_or(crate::Error::ResolutionFailed),
            Err(_) => Err(crate::Error::ResolutionFailed),
        };

        match candidate {
            Ok(candidate) => {
                if self.session.state() != State::Resolving {
                    // torn down while the lookup was in flight
                    return Ok(());
                }

                self.connect(candidate.host.as_str(), candidate.port, bind_address, options)
                    .await
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("srv lookup for {=str} failed", query.as_str());

                self.session.force_disconnected();
                self.notifier.disconnected(DisconnectReason::LookupFailed);
                Ok(())
            }
        }
    }

    #[cfg(not(feature = "srv"))]
    pub async fn connect_srv(
        &mut self,
        _host: &str,
        _bind_address: Option<&str>,
        _options: Options<'_>,
    ) -> Result<(), crate::Error> {
        Err(crate::Error::NotSupported)
    }

    pub async fn disconnect(&mut self) -> Result<(), crate::Error> {
        self.session.expect_connected()?;
        self.session.begin_disconnect();

        // if the send fails the state stays at Disconnecting and the
        // next tick finishes the teardown
        self.send_packet(&Packet::Disconnect).await?;

        self.close_link().await;
        self.session.force_disconnected();
        self.notifier.disconnected(DisconnectReason::Requested);

        Ok(())
    }

    pub async fn publish(
        &mut self,
        topic_name: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<PacketId, crate::Error> {
        topic::check_topic(topic_name)?;
        self.session.expect_connected()?;

        let packet_id = self.session.next_mid();
        let packet = Packet::Publish(Publish {
            flags: Flags {
                dup: false,
                qos,
                retain,
            },
            topic: topic_name,
            packet_id: (qos != QoS::AtMostOnce).then_some(packet_id),
            payload,
        });

        self.send_packet(&packet).await?;

        // nothing further to wait for at QoS 0
        if qos == QoS::AtMostOnce {
            self.notifier.published(packet_id);
        }

        Ok(packet_id)
    }

    pub async fn subscribe(
        &mut self,
        topic_filter: &str,
        qos: QoS,
    ) -> Result<PacketId, crate::Error> {
        topic::check_filter(topic_filter)?;
        self.session.expect_connected()?;

        let packet_id = self.session.next_mid();
        self.send_packet(&Packet::Subscribe(Subscribe {
            packet_id,
            topic_filter,
            qos,
        }))
        .await?;

        Ok(packet_id)
    }

    pub async fn unsubscribe(&mut self, topic_filter: &str) -> Result<PacketId, crate::Error> {
        topic::check_filter(topic_filter)?;
        self.session.expect_connected()?;

        let packet_id = self.session.next_mid();
        self.send_packet(&Packet::Unsubscribe(Unsubscribe {
            packet_id,
            topic_filter,
        }))
        .await?;

        Ok(packet_id)
    }

    /// Reads and handles one inbound packet. On a transport or protocol
    /// failure the link is torn down and `on_disconnect` fires before
    /// the error is returned.
    pub async fn poll(&mut self) -> Result<(), crate::Error> {
        if self.link.is_none() {
            return Err(crate::Error::NotConnected);
        }

        match self.poll_inner().await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail_connection(err).await),
        }
    }

    async fn poll_inner(&mut self) -> Result<(), crate::Error> {
        let link = self.link.as_mut().ok_or(crate::Error::NotConnected)?;

        let header = parser::read_fixed_header(link).await?;
        if header.remaining_len > BUF {
            return Err(crate::Error::BufferTooSmall);
        }

        link.read_exact(&mut self.rx[..header.remaining_len])
            .await
            .map_err(|err| match err {
                ReadExactError::UnexpectedEof => crate::Error::RemoteClosed,
                ReadExactError::Other(_) => crate::Error::TransportError,
            })?;

        let now = self.clock.try_now().map_err(|_| crate::Error::TimeError)?;
        self.keep_alive.on_receive(now);

        let packet = Packet::decode(&header, &self.rx[..header.remaining_len])?;

        let mut reply = None;
        let mut close_after = false;

        match &packet {
            Packet::ConnAck(ack) => {
                self.session.on_connack(ack)?;
                self.notifier.connected(ack.return_code);

                if ack.return_code != ConnectReturnCode::Accepted {
                    close_after = true;
                }
            }
            Packet::Publish(publish) => {
                self.session.expect_connected()?;
                self.notifier.message(publish);

                reply = match publish.flags.qos {
                    QoS::AtMostOnce => None,
                    QoS::AtLeastOnce => publish.packet_id.map(Reply::PubAck),
                    QoS::ExactlyOnce => publish.packet_id.map(Reply::PubRec),
                };
            }
            Packet::PubAck(id) => {
                self.session.expect_connected()?;
                self.notifier.published(*id);
            }
            Packet::PubRec(id) => {
                self.session.expect_connected()?;
                reply = Some(Reply::PubRel(*id));
            }
            Packet::PubRel(id) => {
                self.session.expect_connected()?;
                reply = Some(Reply::PubComp(*id));
            }
            Packet::PubComp(id) => {
                self.session.expect_connected()?;
                self.notifier.published(*id);
            }
            Packet::SubAck(ack) => {
                self.session.expect_connected()?;
                self.notifier.subscribed(ack.packet_id, &ack.return_codes);
            }
            Packet::UnsubAck(id) => {
                self.session.expect_connected()?;
                self.notifier.unsubscribed(*id);
            }
            Packet::PingReq => {
                reply = Some(Reply::PingResp);
            }
            Packet::PingResp => {
                // stray responses are harmless, the clear is idempotent
                self.keep_alive.on_pingresp();
            }
            _ => return Err(crate::Error::UnsupportedIncomingPacket),
        }

        if let Some(reply) = reply {
            let packet = match reply {
                Reply::PubAck(id) => Packet::PubAck(id),
                Reply::PubRec(id) => Packet::PubRec(id),
                Reply::PubRel(id) => Packet::PubRel(id),
                Reply::PubComp(id) => Packet::PubComp(id),
                Reply::PingResp => Packet::PingResp,
            };
            self.send_packet(&packet).await?;
        }

        if close_after {
            self.close_link().await;
            self.session.force_disconnected();
        }

        Ok(())
    }

    /// The periodic liveness pass. Checks the bridge idle policy first,
    /// then the keepalive window: a silent but healthy connection gets
    /// a PINGREQ, a connection that stayed silent through an
    /// outstanding ping is torn down and reported.
    pub async fn tick(&mut self) -> Result<(), crate::Error> {
        let now = self.clock.try_now().map_err(|_| crate::Error::TimeError)?;

        let lazy_idle = match &self.config.bridge {
            Some(bridge) if bridge.start == BridgeStart::Lazy => Some(bridge.idle_timeout),
            _ => None,
        };

        if let Some(idle_secs) = lazy_idle {
            let idle = Seconds(u32::from(idle_secs));

            if self.link.is_some() && self.keep_alive.idle_expired(now, idle)? {
                #[cfg(feature = "defmt")]
                defmt::info!("bridge link exceeded idle timeout, disconnecting");

                self.close_link().await;
                self.session.force_disconnected();
                return Ok(());
            }
        }

        if !self.keep_alive.enabled()
            || self.link.is_none()
            || !self.keep_alive.window_elapsed(now)?
        {
            return Ok(());
        }

        if self.session.state() == State::Connected && !self.keep_alive.ping_outstanding() {
            self.send_packet(&Packet::PingReq).await?;
            self.keep_alive.mark_pinged(now);
        } else {
            let reason = if self.session.state() == State::Disconnecting {
                DisconnectReason::Requested
            } else {
                DisconnectReason::Unexpected
            };

            self.close_link().await;
            self.session.force_disconnected();
            self.notifier.disconnected(reason);
        }

        Ok(())
    }

    async fn send_packet(&mut self, packet: &Packet<'_>) -> Result<(), crate::Error> {
        let link = self.link.as_mut().ok_or(crate::Error::NotConnected)?;

        let mut cursor = WriteCursor::new(&mut self.tx);
        packet.encode(&mut cursor)?;

        link.write_all(cursor.written())
            .await
            .map_err(|_| crate::Error::TransportError)?;
        link.flush()
            .await
            .map_err(|_| crate::Error::TransportError)?;

        let now = self.clock.try_now().map_err(|_| crate::Error::TimeError)?;
        self.keep_alive.on_send(now);

        Ok(())
    }

    async fn fail_connection(&mut self, err: crate::Error) -> crate::Error {
        let reason = if self.session.state() == State::Disconnecting {
            DisconnectReason::Requested
        } else {
            DisconnectReason::Unexpected
        };

        self.close_link().await;
        self.session.force_disconnected();
        self.notifier.disconnected(reason);

        err
    }

    async fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            self.transport.close(link).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::convert::Infallible;

    use embedded_time::{Instant, fraction::Fraction};
    use futures::executor::block_on;
    use heapless::{String, Vec};

    use super::*;
    use crate::packet::subscribe::SubAckReturnCode;

    struct TestClock {
        now: Cell<u64>,
    }

    impl TestClock {
        fn new() -> Self {
            Self { now: Cell::new(0) }
        }

        fn set(&self, secs: u64) {
            self.now.set(secs);
        }
    }

    impl Clock for &TestClock {
        type T = u64;

        const SCALING_FACTOR: Fraction = Fraction::new(1, 1);

        fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
            Ok(Instant::new(self.now.get()))
        }
    }

    struct TestLink {
        input: &'static [u8],
        pos: usize,
    }

    impl embedded_io_async::ErrorType for TestLink {
        type Error = Infallible;
    }

    impl embedded_io_async::Read for TestLink {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.input.len() - self.pos);
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            self.pos += n;

            Ok(n)
        }
    }

    impl embedded_io_async::Write for TestLink {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    struct TestTransport {
        script: &'static [u8],
        opens: Vec<(String<64>, u16), 4>,
        closed: usize,
    }

    impl TestTransport {
        fn new(script: &'static [u8]) -> Self {
            Self {
                script,
                opens: Vec::new(),
                closed: 0,
            }
        }
    }

    impl Transport for TestTransport {
        type Link = TestLink;
        type Error = ();

        async fn open(
            &mut self,
            host: &str,
            port: u16,
            _bind_address: Option<&str>,
        ) -> Result<TestLink, ()> {
            let mut recorded = String::new();
            recorded.push_str(host).unwrap();
            self.opens.push((recorded, port)).unwrap();

            Ok(TestLink {
                input: self.script,
                pos: 0,
            })
        }

        async fn close(&mut self, _link: TestLink) {
            self.closed += 1;
        }
    }

    #[derive(Default)]
    struct Recorder {
        connects: Vec<ConnectReturnCode, 4>,
        disconnects: Vec<DisconnectReason, 4>,
        published: Vec<u16, 4>,
        messages: Vec<(String<64>, Vec<u8, 64>), 4>,
        subscribed: Vec<(u16, SubAckReturnCode), 4>,
        unsubscribed: Vec<u16, 4>,
    }

    impl Notify for Recorder {
        fn on_connect(&mut self, code: ConnectReturnCode) {
            self.connects.push(code).unwrap();
        }

        fn on_disconnect(&mut self, reason: DisconnectReason) {
            self.disconnects.push(reason).unwrap();
        }

        fn on_publish(&mut self, packet_id: PacketId) {
            self.published.push(packet_id.get()).unwrap();
        }

        fn on_message(&mut self, message: &Publish<'_>) {
            let mut topic = String::new();
            topic.push_str(message.topic).unwrap();
            let payload = Vec::from_slice(message.payload).unwrap();
            self.messages.push((topic, payload)).unwrap();
        }

        fn on_subscribe(&mut self, packet_id: PacketId, granted: &[SubAckReturnCode]) {
            self.subscribed.push((packet_id.get(), granted[0])).unwrap();
        }

        fn on_unsubscribe(&mut self, packet_id: PacketId) {
            self.unsubscribed.push(packet_id.get()).unwrap();
        }
    }

    const CONNACK: &[u8] = &[0x20, 0x02, 0x00, 0x00];

    fn options() -> Options<'static> {
        Options {
            client_id: "test",
            keep_alive: 10,
            clean_session: true,
            will: None,
            username: None,
            password: None,
        }
    }

    fn connected_client<'a>(
        clock: &'a TestClock,
        transport: &'a mut TestTransport,
        recorder: &'a mut Recorder,
    ) -> Client<&'a TestClock, &'a mut TestTransport, &'a mut Recorder, 512> {
        let mut client =
            Client::<_, _, _, 512>::try_new(clock, transport, recorder, Config::default()).unwrap();

        block_on(async {
            client.connect("broker.local", 1883, None, options()).await.unwrap();
            client.poll().await.unwrap();
        });

        assert!(client.is_connected());
        client
    }

    #[test]
    fn connack_reaches_the_sink() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();

        {
            let client = connected_client(&clock, &mut transport, &mut recorder);
            drop(client);
        }

        assert_eq!(recorder.connects.as_slice(), &[ConnectReturnCode::Accepted]);
        assert_eq!(
            transport.opens.as_slice(),
            &[(String::try_from("broker.local").unwrap(), 1883)]
        );
    }

    #[test]
    fn refused_connack_closes_the_link() {
        let clock = TestClock::new();
        // CONNACK, return code 5 = not authorized
        let mut transport = TestTransport::new(&[0x20, 0x02, 0x00, 0x05]);
        let mut recorder = Recorder::default();

        {
            let mut client =
                Client::<_, _, _, 512>::try_new(&clock, &mut transport, &mut recorder, Config::default())
                    .unwrap();

            block_on(async {
                client.connect("broker.local", 1883, None, options()).await.unwrap();
                client.poll().await.unwrap();
            });

            assert!(!client.is_connected());
        }

        assert_eq!(
            recorder.connects.as_slice(),
            &[ConnectReturnCode::NotAuthorized]
        );
        assert_eq!(transport.closed, 1);
    }

    #[test]
    fn silent_connection_pings_then_times_out() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();

        {
            let mut client = connected_client(&clock, &mut transport, &mut recorder);

            // first pass past the window: a ping, not a disconnect
            clock.set(11);
            block_on(client.tick()).unwrap();
            assert!(client.is_connected());

            // the ping went unanswered for another full window
            clock.set(22);
            block_on(client.tick()).unwrap();
            assert!(!client.is_connected());
        }

        assert_eq!(
            recorder.disconnects.as_slice(),
            &[DisconnectReason::Unexpected]
        );
        assert_eq!(transport.closed, 1);
    }

    #[test]
    fn fresh_traffic_suppresses_the_ping() {
        let clock = TestClock::new();
        // CONNACK, then a PINGRESP arriving mid-session
        let mut transport = TestTransport::new(&[0x20, 0x02, 0x00, 0x00, 0xD0, 0x00]);
        let mut recorder = Recorder::default();

        {
            let mut client = connected_client(&clock, &mut transport, &mut recorder);

            clock.set(9);
            block_on(client.tick()).unwrap();

            // traffic in both directions inside the window
            clock.set(18);
            block_on(async {
                client.publish("state", b"ok", QoS::AtMostOnce, false).await.unwrap();
                client.poll().await.unwrap();
            });

            clock.set(19);
            block_on(client.tick()).unwrap();
            assert!(client.is_connected());
        }

        assert!(recorder.disconnects.is_empty());
        assert_eq!(transport.closed, 0);
    }

    #[test]
    fn inbound_publish_reaches_the_sink() {
        let clock = TestClock::new();
        // CONNACK, then PUBLISH qos1 packet id 7, topic "a/b", payload "hi"
        let mut transport = TestTransport::new(&[
            0x20, 0x02, 0x00, 0x00, // CONNACK
            0x32, 0x09, 0x00, 0x03, b'a', b'/', b'b', 0x00, 0x07, b'h', b'i',
        ]);
        let mut recorder = Recorder::default();

        {
            let mut client = connected_client(&clock, &mut transport, &mut recorder);
            block_on(client.poll()).unwrap();
        }

        assert_eq!(recorder.messages.len(), 1);
        let (topic, payload) = &recorder.messages[0];
        assert_eq!(topic.as_str(), "a/b");
        assert_eq!(payload.as_slice(), b"hi");
    }

    #[test]
    fn qos0_publish_completes_immediately() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();

        {
            let mut client = connected_client(&clock, &mut transport, &mut recorder);
            let id = block_on(client.publish("state", b"ok", QoS::AtMostOnce, false)).unwrap();
            assert_eq!(id.get(), 1);
        }

        assert_eq!(recorder.published.as_slice(), &[1]);
    }

    #[test]
    fn suback_reports_granted_qos() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(&[
            0x20, 0x02, 0x00, 0x00, // CONNACK
            0x90, 0x03, 0x00, 0x01, 0x01, // SUBACK id 1, granted qos 1
        ]);
        let mut recorder = Recorder::default();

        {
            let mut client = connected_client(&clock, &mut transport, &mut recorder);
            block_on(async {
                client.subscribe("a/+", QoS::AtLeastOnce).await.unwrap();
                client.poll().await.unwrap();
            });
        }

        assert_eq!(
            recorder.subscribed.as_slice(),
            &[(1, SubAckReturnCode::MaximumQoS1)]
        );
    }

    #[test]
    fn wildcard_publish_topic_rejected() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();
        let mut client = connected_client(&clock, &mut transport, &mut recorder);

        let err = block_on(client.publish("a/#", b"", QoS::AtMostOnce, false)).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidTopic));
    }

    #[test]
    fn lazy_bridge_idles_out() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();

        {
            let config = Config {
                secure: false,
                bridge: Some(Bridge {
                    start: BridgeStart::Lazy,
                    idle_timeout: 30,
                }),
            };
            let mut client =
                Client::<_, _, _, 512>::try_new(&clock, &mut transport, &mut recorder, config)
                    .unwrap();

            block_on(async {
                client.connect("peer.local", 1883, None, options()).await.unwrap();
                client.poll().await.unwrap();
            });

            clock.set(31);
            block_on(client.tick()).unwrap();
            assert!(!client.is_connected());
        }

        // the bridge teardown is silent, unlike a keepalive timeout
        assert!(recorder.disconnects.is_empty());
        assert_eq!(transport.closed, 1);
    }

    #[test]
    fn disconnect_notifies_requested() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();

        {
            let mut client = connected_client(&clock, &mut transport, &mut recorder);
            block_on(client.disconnect()).unwrap();
            assert!(!client.is_connected());
        }

        assert_eq!(
            recorder.disconnects.as_slice(),
            &[DisconnectReason::Requested]
        );
        assert_eq!(transport.closed, 1);
    }

    #[test]
    fn remote_close_fails_the_connection() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();

        {
            let mut client = connected_client(&clock, &mut transport, &mut recorder);
            // the script is exhausted, the next read sees EOF
            let err = block_on(client.poll()).unwrap_err();
            assert!(matches!(err, crate::Error::RemoteClosed));
        }

        assert_eq!(
            recorder.disconnects.as_slice(),
            &[DisconnectReason::Unexpected]
        );
        assert_eq!(transport.closed, 1);
    }

    #[cfg(feature = "srv")]
    mod srv {
        use super::*;
        use crate::srv::{MAX_CANDIDATES, Resolver, SrvCandidate};

        struct TestResolver {
            answer: Result<Vec<SrvCandidate, MAX_CANDIDATES>, ()>,
            queries: Vec<String<128>, 2>,
        }

        impl Resolver for TestResolver {
            type Error = ();

            async fn resolve_srv(
                &mut self,
                service: &str,
            ) -> Result<Vec<SrvCandidate, MAX_CANDIDATES>, ()> {
                let mut query = String::new();
                query.push_str(service).unwrap();
                self.queries.push(query).unwrap();

                self.answer.clone()
            }
        }

        fn candidate(host: &str, port: u16) -> SrvCandidate {
            SrvCandidate {
                host: String::try_from(host).unwrap(),
                port,
                priority: 10,
                weight: 0,
            }
        }

        #[test]
        fn resolution_feeds_the_connect_path() {
            let clock = TestClock::new();
            let mut transport = TestTransport::new(CONNACK);
            let mut recorder = Recorder::default();
            let mut answer = Vec::new();
            answer.push(candidate("node1.example.com", 8883)).unwrap();
            answer.push(candidate("node2.example.com", 1883)).unwrap();
            let mut resolver = TestResolver {
                answer: Ok(answer),
                queries: Vec::new(),
            };

            {
                let mut client = Client::<_, _, _, 512>::try_new(
                    &clock,
                    &mut transport,
                    &mut recorder,
                    Config::default(),
                )
                .unwrap();

                block_on(async {
                    client
                        .connect_srv(&mut resolver, "example.com", None, options())
                        .await
                        .unwrap();
                    client.poll().await.unwrap();
                });

                assert!(client.is_connected());
            }

            assert_eq!(
                resolver.queries.as_slice(),
                &[String::<128>::try_from("_mqtt._tcp.example.com").unwrap()]
            );
            // first candidate wins, exactly one connect attempt
            assert_eq!(
                transport.opens.as_slice(),
                &[(String::try_from("node1.example.com").unwrap(), 8883)]
            );
        }

        #[test]
        fn secure_channel_changes_the_service_label() {
            let clock = TestClock::new();
            let mut transport = TestTransport::new(CONNACK);
            let mut recorder = Recorder::default();
            let mut answer = Vec::new();
            answer.push(candidate("node1.example.com", 8883)).unwrap();
            let mut resolver = TestResolver {
                answer: Ok(answer),
                queries: Vec::new(),
            };

            {
                let config = Config {
                    secure: true,
                    bridge: None,
                };
                let mut client =
                    Client::<_, _, _, 512>::try_new(&clock, &mut transport, &mut recorder, config)
                        .unwrap();

                block_on(client.connect_srv(&mut resolver, "example.com", None, options()))
                    .unwrap();
            }

            assert_eq!(
                resolver.queries.as_slice(),
                &[String::<128>::try_from("_secure-mqtt._tcp.example.com").unwrap()]
            );
        }

        #[test]
        fn failed_lookup_notifies_without_connecting() {
            let clock = TestClock::new();
            let mut transport = TestTransport::new(CONNACK);
            let mut recorder = Recorder::default();
            let mut resolver = TestResolver {
                answer: Err(()),
                queries: Vec::new(),
            };

            {
                let mut client = Client::<_, _, _, 512>::try_new(
                    &clock,
                    &mut transport,
                    &mut recorder,
                    Config::default(),
                )
                .unwrap();

                block_on(client.connect_srv(&mut resolver, "example.com", None, options()))
                    .unwrap();
                assert!(!client.is_connected());
            }

            assert!(transport.opens.is_empty());
            assert_eq!(
                recorder.disconnects.as_slice(),
                &[DisconnectReason::LookupFailed]
            );
        }

        #[test]
        fn empty_answer_counts_as_failure() {
            let clock = TestClock::new();
            let mut transport = TestTransport::new(CONNACK);
            let mut recorder = Recorder::default();
            let mut resolver = TestResolver {
                answer: Ok(Vec::new()),
                queries: Vec::new(),
            };

            {
                let mut client = Client::<_, _, _, 512>::try_new(
                    &clock,
                    &mut transport,
                    &mut recorder,
                    Config::default(),
                )
                .unwrap();

                block_on(client.connect_srv(&mut resolver, "example.com", None, options()))
                    .unwrap();
            }

            assert!(transport.opens.is_empty());
            assert_eq!(
                recorder.disconnects.as_slice(),
                &[DisconnectReason::LookupFailed]
            );
        }
    }

    #[cfg(not(feature = "srv"))]
    #[test]
    fn srv_disabled_reports_not_supported() {
        let clock = TestClock::new();
        let mut transport = TestTransport::new(CONNACK);
        let mut recorder = Recorder::default();
        let mut client =
            Client::<_, _, _, 512>::try_new(&clock, &mut transport, &mut recorder, Config::default())
                .unwrap();

        let err = block_on(client.connect_srv("example.com", None, options())).unwrap_err();
        assert!(matches!(err, crate::Error::NotSupported));
    }
}
