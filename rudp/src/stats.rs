use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// NetStats counts datagrams seen and datagrams swallowed by the
/// drop injector, in both directions.
#[derive(Debug, Default)]
pub struct NetStats {
    packets_in: AtomicU64,
    packets_in_dropped: AtomicU64,
    packets_out: AtomicU64,
    packets_out_dropped: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct NetStatsSnapshot {
    pub packets_in: u64,
    pub packets_in_dropped: u64,
    pub packets_out: u64,
    pub packets_out_dropped: u64,
}

impl fmt::Display for NetStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in={} in_dropped={} out={} out_dropped={}",
            self.packets_in, self.packets_in_dropped, self.packets_out, self.packets_out_dropped
        )
    }
}

impl NetStats {
    pub fn new() -> Self {
        NetStats::default()
    }

    pub fn mark_packet_in(&self) {
        self.packets_in.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_packet_in_dropped(&self) {
        self.packets_in_dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_packet_out(&self) {
        self.packets_out.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_packet_out_dropped(&self) {
        self.packets_out_dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> NetStatsSnapshot {
        NetStatsSnapshot {
            packets_in: self.packets_in.load(Ordering::SeqCst),
            packets_in_dropped: self.packets_in_dropped.load(Ordering::SeqCst),
            packets_out: self.packets_out.load(Ordering::SeqCst),
            packets_out_dropped: self.packets_out_dropped.load(Ordering::SeqCst),
        }
    }

    pub fn reset(&self) {
        log::warn!("resetting network counters");
        self.packets_in.store(0, Ordering::SeqCst);
        self.packets_in_dropped.store(0, Ordering::SeqCst);
        self.packets_out.store(0, Ordering::SeqCst);
        self.packets_out_dropped.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = NetStats::new();
        stats.mark_packet_in();
        stats.mark_packet_in();
        stats.mark_packet_in_dropped();
        stats.mark_packet_out();
        stats.mark_packet_out_dropped();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_in, 2);
        assert_eq!(snapshot.packets_in_dropped, 1);
        assert_eq!(snapshot.packets_out, 1);
        assert_eq!(snapshot.packets_out_dropped, 1);

        stats.reset();
        assert_eq!(stats.snapshot(), NetStatsSnapshot::default());
    }
}
