//! Caller context: request headers, remote address, and per-payment options.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Headers consulted for the client address, most trusted first.
pub const CLIENT_IP_HEADERS: [&str; 7] = [
    "cf-connecting-ip",
    "x-client-ip",
    "x-forwarded-for",
    "x-forwarded",
    "x-cluster-client-ip",
    "forwarded-for",
    "forwarded",
];

/// Transport-level facts about the request that triggered an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    headers: BTreeMap<String, String>,
    remote_addr: Option<IpAddr>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    /// Best guess at the originating client address.
    ///
    /// Walks [`CLIENT_IP_HEADERS`] in order and takes the first value of the
    /// first header that parses as a public address. Falls back to the remote
    /// address, then to `0.0.0.0`.
    pub fn client_ip(&self) -> IpAddr {
        CLIENT_IP_HEADERS
            .iter()
            .filter_map(|h| self.header(h))
            .filter_map(first_address)
            .find(is_public)
            .or(self.remote_addr)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

/// First comma-separated element of a header value, parsed as an address.
/// Accepts the `for=` form of `Forwarded` and bracketed IPv6.
fn first_address(value: &str) -> Option<IpAddr> {
    let first = value.split(',').next()?.trim();
    let first = first.split(';').next()?.trim();
    let first = first
        .strip_prefix("for=")
        .or_else(|| first.strip_prefix("For="))
        .unwrap_or(first)
        .trim_matches('"');
    if let Some(inner) = first.strip_prefix('[') {
        return inner.split(']').next()?.parse().ok();
    }
    first.parse().ok()
}

/// Neither private nor reserved.
pub fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(*v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_unspecified()
        || ip.is_multicast()
        || a == 0
        || a >= 240
        || (a == 100 && (64..128).contains(&b)))
}

fn is_public_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first == 0x2001 && ip.segments()[1] == 0x0db8))
}

/// Optional inputs to a payment or payment-link request.
#[derive(Debug, Clone, Default)]
pub struct PaymentOptions {
    /// Caller-chosen reference. One is generated when absent.
    pub reference: Option<String>,
    pub callback_url: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub context: RequestContext,
}

impl PaymentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}
