//! SRV-based broker discovery: builds the DNS service name for a
//! domain and hands the lookup to a [`Resolver`] implementation.

use heapless::{String, Vec};

pub const MAX_CANDIDATES: usize = 4;
/// A hostname fits in one DNS name, 253 octets.
pub const MAX_HOST_LEN: usize = 253;

const SERVICE: &str = "_mqtt._tcp.";
const SECURE_SERVICE: &str = "_secure-mqtt._tcp.";

pub(crate) const MAX_QUERY_LEN: usize = MAX_HOST_LEN + SECURE_SERVICE.len();

/// One SRV answer. Candidates are used in the order the resolver
/// returns them; RFC 2782 priority/weight selection is left to the
/// resolver, the fields are carried so it can pre-sort.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SrvCandidate {
    pub host: String<MAX_HOST_LEN>,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

/// Asynchronous SRV lookup collaborator. One call, one answer set;
/// lookup timeouts are whatever the implementation's defaults are.
#[allow(async_fn_in_trait)]
pub trait Resolver {
    type Error: core::fmt::Debug;

    async fn resolve_srv(
        &mut self,
        service: &str,
    ) -> Result<Vec<SrvCandidate, MAX_CANDIDATES>, Self::Error>;
}

impl<R: Resolver> Resolver for &mut R {
    type Error = R::Error;

    async fn resolve_srv(
        &mut self,
        service: &str,
    ) -> Result<Vec<SrvCandidate, MAX_CANDIDATES>, Self::Error> {
        (**self).resolve_srv(service).await
    }
}

/// `_mqtt._tcp.<host>`, or `_secure-mqtt._tcp.<host>` when a secure
/// channel is configured.
pub(crate) fn service_name(host: &str, secure: bool) -> Result<String<MAX_QUERY_LEN>, crate::Error> {
    let prefix = if secure { SECURE_SERVICE } else { SERVICE };

    let mut name = String::new();
    name.push_str(prefix).map_err(|_| crate::Error::BufferTooSmall)?;
    name.push_str(host).map_err(|_| crate::Error::BufferTooSmall)?;

    Ok(name)
}
