use embedded_time::{
    Clock, Instant,
    duration::{self, Seconds},
};

/// Liveness state for one connection: the negotiated keepalive window,
/// the last inbound/outbound traffic instants, and the pending-ping
/// marker. The periodic check itself lives in `Client::tick`.
pub(crate) struct KeepAlive<C: Clock> {
    keep_alive: Seconds<u32>,
    last_msg_in: Instant<C>,
    last_msg_out: Instant<C>,
    ping_t: Option<Instant<C>>,
    enabled: bool,
}

impl<C> KeepAlive<C>
where
    C: Clock,
    Seconds<u32>: TryFrom<duration::Generic<C::T>>,
{
    pub(crate) fn try_new(clock: &C, keep_alive_secs: u16) -> Result<Self, crate::Error> {
        let now = clock.try_now().map_err(|_| crate::Error::TimeError)?;

        Ok(Self {
            keep_alive: Seconds(u32::from(keep_alive_secs)),
            last_msg_in: now,
            last_msg_out: now,
            ping_t: None,
            enabled: keep_alive_secs != 0,
        })
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn ping_outstanding(&self) -> bool {
        self.ping_t.is_some()
    }

    pub(crate) fn on_send(&mut self, now: Instant<C>) {
        self.last_msg_out = now;
    }

    pub(crate) fn on_receive(&mut self, now: Instant<C>) {
        self.last_msg_in = now;
    }

    /// Clears the pending ping. A PINGRESP that arrives when no ping is
    /// outstanding is a no-op.
    pub(crate) fn on_pingresp(&mut self) {
        self.ping_t = None;
    }

    /// Records a sent PINGREQ. Both traffic instants are reset so the
    /// broker gets a full keepalive window to answer before the next
    /// check fires.
    pub(crate) fn mark_pinged(&mut self, now: Instant<C>) {
        self.last_msg_in = now;
        self.last_msg_out = now;
        self.ping_t = Some(now);
    }

    /// True once neither direction has seen traffic within the
    /// keepalive window.
    pub(crate) fn window_elapsed(&self, now: Instant<C>) -> Result<bool, crate::Error> {
        Ok(self.elapsed(now, &self.last_msg_out)? >= self.keep_alive
            || self.elapsed(now, &self.last_msg_in)? >= self.keep_alive)
    }

    /// Bridge idle policy: nothing sent for at least `idle`.
    pub(crate) fn idle_expired(
        &self,
        now: Instant<C>,
        idle: Seconds<u32>,
    ) -> Result<bool, crate::Error> {
        Ok(self.elapsed(now, &self.last_msg_out)? >= idle)
    }

    // the protocol negotiates whole seconds, finer clock ticks round
    // down
    fn elapsed(&self, now: Instant<C>, since: &Instant<C>) -> Result<Seconds<u32>, crate::Error> {
        let elapsed = now
            .checked_duration_since(since)
            .ok_or(crate::Error::TimeError)?;

        Seconds::try_from(elapsed).map_err(|_| crate::Error::TimeError)
    }
}
