//! Port selection for the backend process.
//!
//! A port counts as free when a TCP connect to it fails. This is a
//! best-effort probe, not a reservation: another process may bind the port
//! between the probe and the backend's own bind. A firewall that silently
//! drops the probe also reads as "free".

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use md2docx_core::DEFAULT_SERVER_PORT;

/// Errors from port selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// The preferred port, the scan range and every random fallback were taken.
    #[error("No free port: {start}-{end} occupied and {attempts} random candidate(s) taken")]
    Unavailable { start: u16, end: u16, attempts: usize },
}

/// Chooses the port the backend will listen on.
///
/// Order: preferred port, then the scan range, then random ports from the
/// fallback window that lie outside the scan range.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    host: String,
    scan_range: RangeInclusive<u16>,
    fallback_base: u16,
    fallback_span: u16,
    fallback_attempts: usize,
    probe_timeout: Duration,
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            scan_range: DEFAULT_SERVER_PORT..=DEFAULT_SERVER_PORT + 10,
            fallback_base: DEFAULT_SERVER_PORT,
            fallback_span: 1000,
            fallback_attempts: 8,
            probe_timeout: Duration::from_millis(100),
        }
    }
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host to probe. Defaults to `localhost`.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Contiguous range scanned after the preferred port. Defaults to `8080..=8090`.
    #[must_use]
    pub const fn with_scan_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.scan_range = range;
        self
    }

    /// Random fallback window `[base, base + span)`. Defaults to `8080`, `1000`.
    #[must_use]
    pub const fn with_fallback(mut self, base: u16, span: u16) -> Self {
        self.fallback_base = base;
        self.fallback_span = span;
        self
    }

    /// How many random candidates to probe before giving up.
    #[must_use]
    pub const fn with_fallback_attempts(mut self, attempts: usize) -> Self {
        self.fallback_attempts = attempts;
        self
    }

    /// Per-probe connect timeout. Defaults to 100ms.
    #[must_use]
    pub const fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub const fn scan_range(&self) -> &RangeInclusive<u16> {
        &self.scan_range
    }

    /// True when nothing accepts a connection on `port`.
    ///
    /// A refused connection and a timed-out connect both mean free.
    pub async fn is_port_free(&self, port: u16) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), port));
        match timeout(self.probe_timeout, connect).await {
            Ok(Ok(_stream)) => false,
            Ok(Err(_)) | Err(_) => true,
        }
    }

    /// Pick a port, preferring `preferred` when it is non-zero and free.
    pub async fn choose_port(&self, preferred: Option<u16>) -> Result<u16, PortError> {
        if let Some(port) = preferred.filter(|p| *p != 0) {
            if self.is_port_free(port).await {
                debug!(port, "Preferred port is free");
                return Ok(port);
            }
            debug!(port, "Preferred port is occupied, scanning");
        }

        for port in self.scan_range.clone() {
            if preferred == Some(port) {
                continue;
            }
            if self.is_port_free(port).await {
                info!(port, "Selected port from scan range");
                return Ok(port);
            }
        }

        warn!(
            start = *self.scan_range.start(),
            end = *self.scan_range.end(),
            "Scan range fully occupied, trying random ports"
        );

        for _ in 0..self.fallback_attempts {
            let Some(port) = self.random_fallback() else {
                break;
            };
            if self.is_port_free(port).await {
                info!(port, "Selected random fallback port");
                return Ok(port);
            }
        }

        Err(PortError::Unavailable {
            start: *self.scan_range.start(),
            end: *self.scan_range.end(),
            attempts: self.fallback_attempts,
        })
    }

    /// Uniform pick from the fallback window minus the scan range.
    fn random_fallback(&self) -> Option<u16> {
        let lo = u32::from(self.fallback_base).max(1);
        let hi = (u32::from(self.fallback_base) + u32::from(self.fallback_span)).min(65_536);
        if hi <= lo {
            return None;
        }

        let scan_lo = u32::from(*self.scan_range.start()).max(lo);
        let scan_hi = (u32::from(*self.scan_range.end()) + 1).min(hi);
        let overlap = scan_hi.saturating_sub(scan_lo);
        let allowed = (hi - lo) - overlap;
        if allowed == 0 {
            return None;
        }

        let mut port = lo + rand::rng().random_range(0..allowed);
        if overlap > 0 && port >= scan_lo {
            port += overlap;
        }
        u16::try_from(port).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn fast() -> PortAllocator {
        PortAllocator::new()
            .with_host("127.0.0.1")
            .with_probe_timeout(Duration::from_millis(200))
    }

    /// Bind `count` consecutive ports on 127.0.0.1, retrying until a free run is found.
    fn bind_consecutive(count: u16) -> (u16, Vec<TcpListener>) {
        'outer: for _ in 0..50 {
            let first = TcpListener::bind("127.0.0.1:0").unwrap();
            let start = first.local_addr().unwrap().port();
            if start > u16::MAX - count {
                continue;
            }
            let mut held = vec![first];
            for port in start + 1..start + count {
                match TcpListener::bind(("127.0.0.1", port)) {
                    Ok(l) => held.push(l),
                    Err(_) => continue 'outer,
                }
            }
            return (start, held);
        }
        panic!("could not bind {count} consecutive ports");
    }

    #[tokio::test]
    async fn test_free_preferred_port_is_returned() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert_eq!(fast().choose_port(Some(port)).await, Ok(port));
    }

    #[tokio::test]
    async fn test_occupied_preferred_falls_through_to_scan() {
        let (start, _held) = bind_consecutive(1);
        let allocator = fast().with_scan_range(start..=start.saturating_add(5));

        let chosen = allocator.choose_port(Some(start)).await.unwrap();
        assert_ne!(chosen, start);
        assert!(allocator.scan_range().contains(&chosen));
    }

    #[tokio::test]
    async fn test_full_scan_range_falls_back_outside_it() {
        let (start, _held) = bind_consecutive(3);
        let end = start + 2;
        let base = start.saturating_sub(50).max(1024);
        let allocator = fast()
            .with_scan_range(start..=end)
            .with_fallback(base, 200)
            .with_fallback_attempts(32);

        let chosen = allocator.choose_port(None).await.unwrap();
        assert!(!(start..=end).contains(&chosen), "chose {chosen} inside scan range");
        assert!(chosen >= base);
    }

    #[tokio::test]
    async fn test_zero_preferred_is_ignored() {
        let (start, held) = bind_consecutive(1);
        drop(held);
        let allocator = fast().with_scan_range(start..=start);
        assert_eq!(allocator.choose_port(Some(0)).await, Ok(start));
    }

    #[tokio::test]
    async fn test_unavailable_when_window_is_inside_scan_range() {
        let (start, _held) = bind_consecutive(2);
        let allocator = fast()
            .with_scan_range(start..=start + 1)
            .with_fallback(start, 2);

        assert!(matches!(
            allocator.choose_port(None).await,
            Err(PortError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_random_fallback_never_hits_scan_range() {
        let allocator = PortAllocator::new();
        for _ in 0..2000 {
            let port = allocator.random_fallback().unwrap();
            assert!((8080..9080).contains(&port));
            assert!(!(8080..=8090).contains(&port));
        }
    }

    #[test]
    fn test_random_fallback_with_scan_in_middle() {
        let allocator = PortAllocator::new()
            .with_scan_range(9000..=9009)
            .with_fallback(8995, 20);
        for _ in 0..500 {
            let port = allocator.random_fallback().unwrap();
            assert!((8995..9015).contains(&port));
            assert!(!(9000..=9009).contains(&port));
        }
    }

    #[test]
    fn test_unavailable_message() {
        let err = PortError::Unavailable {
            start: 8080,
            end: 8090,
            attempts: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("8080-8090"));
        assert!(msg.contains('8'));
    }
}
