// # ICMP Echo Prober
//
// This crate provides the ICMP echo implementation of the edgepick
// `Prober` trait.
//
// ## Implementation Status
//
// - ✅ IPv4 and IPv6 echo (one socket per family, shared by all probes)
// - ✅ Hostnames resolved through the system resolver
// - ✅ Per-request timeout (1 second)
// - ✅ Never fails: resolution and socket errors become the unreachable sentinel
//
// ## Platform Support
//
// Opening ICMP sockets needs either CAP_NET_RAW or an unprivileged ping
// group (`net.ipv4.ping_group_range` on Linux). Without either the prober
// still works, but every address probes as unreachable.

use edgepick_core::traits::{PingStatistics, ProbeResult, Prober};

use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};

/// Time to wait for a single echo reply
const ECHO_TIMEOUT: Duration = Duration::from_secs(1);

/// Echo payload size, matching the classic `ping` default
const PAYLOAD_SIZE: usize = 56;

/// ICMP echo prober
pub struct IcmpProber {
    v4: Option<Client>,
    v6: Option<Client>,

    /// Next echo identifier; distinct per probe so concurrent replies don't mix
    next_identifier: AtomicU16,
}

impl std::fmt::Debug for IcmpProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpProber")
            .field("v4", &self.v4.is_some())
            .field("v6", &self.v6.is_some())
            .finish()
    }
}

impl IcmpProber {
    /// Open the ICMP sockets
    ///
    /// Must be called inside a tokio runtime. A family whose socket cannot
    /// be opened is disabled with a warning.
    pub fn new() -> Self {
        let v4 = match Client::new(&Config::default()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("IPv4 ICMP socket unavailable: {}", e);
                None
            }
        };

        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::debug!("IPv6 ICMP socket unavailable: {}", e);
                None
            }
        };

        Self::from_clients(v4, v6)
    }

    fn from_clients(v4: Option<Client>, v6: Option<Client>) -> Self {
        Self {
            v4,
            v6,
            next_identifier: AtomicU16::new(std::process::id() as u16),
        }
    }

    /// Whether at least one address family can be probed
    pub fn is_available(&self) -> bool {
        self.v4.is_some() || self.v6.is_some()
    }

    fn client_for(&self, ip: &IpAddr) -> Option<&Client> {
        match ip {
            IpAddr::V4(_) => self.v4.as_ref(),
            IpAddr::V6(_) => self.v6.as_ref(),
        }
    }
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve an address literal or hostname to its first IP
async fn resolve(address: &str) -> Option<IpAddr> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Some(ip);
    }

    tokio::net::lookup_host((address, 0))
        .await
        .ok()?
        .next()
        .map(|socket| socket.ip())
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn probe(&self, address: &str, sample_count: u32) -> ProbeResult {
        let Some(ip) = resolve(address).await else {
            return ProbeResult::unreachable(address);
        };
        let Some(client) = self.client_for(&ip) else {
            return ProbeResult::unreachable(address);
        };

        let identifier = PingIdentifier(self.next_identifier.fetch_add(1, Ordering::Relaxed));
        let mut pinger = client.pinger(ip, identifier).await;
        pinger.timeout(ECHO_TIMEOUT);

        let payload = [0u8; PAYLOAD_SIZE];
        let mut stats = PingStatistics::new(sample_count);
        for sequence in 0..sample_count {
            if let Ok((_, rtt)) = pinger.ping(PingSequence(sequence as u16), &payload).await {
                stats.record(rtt);
            }
        }

        ProbeResult::from_statistics(address, &stats)
    }
}
