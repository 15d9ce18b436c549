use embedded_io_async::{Read, Write};

/// The byte channel the session runs over. `open` dials a broker
/// (secure or not is the transport's business, negotiated before the
/// link is handed back); `close` tears a link down. The session only
/// ever holds one link at a time.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Link: Read + Write;
    type Error: core::fmt::Debug;

    async fn open(
        &mut self,
        host: &str,
        port: u16,
        bind_address: Option<&str>,
    ) -> Result<Self::Link, Self::Error>;

    async fn close(&mut self, link: Self::Link);
}

impl<T: Transport> Transport for &mut T {
    type Link = T::Link;
    type Error = T::Error;

    async fn open(
        &mut self,
        host: &str,
        port: u16,
        bind_address: Option<&str>,
    ) -> Result<Self::Link, Self::Error> {
        (**self).open(host, port, bind_address).await
    }

    async fn close(&mut self, link: Self::Link) {
        (**self).close(link).await
    }
}
