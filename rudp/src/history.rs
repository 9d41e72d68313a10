use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::proto::ident::PacketIdent;
use crate::proto::packet::Packet;

/// One retained outbound packet awaiting acknowledgement.
#[derive(Debug, Clone)]
pub struct SendHistoryRecord {
    pub packet: Packet,
    pub addr: SocketAddr,
    pub created_at: Instant,
    pub last_sent: Instant,
}

/// SendHistory keeps every previously sent non-acknowledgement packet until
/// the peer acknowledges it or its TTL elapses, so it can drive
/// retransmission and serve explicit resend requests.
#[derive(Debug, Default)]
pub struct SendHistory {
    records: HashMap<PacketIdent, SendHistoryRecord>,
}

impl SendHistory {
    pub fn new() -> Self {
        SendHistory::default()
    }

    /// Records a send. Re-recording an identifier (a retransmission)
    /// advances the last-sent time but keeps the original creation time, so
    /// the TTL is always measured from the first send.
    pub fn append(&mut self, packet: Packet, addr: SocketAddr) {
        let now = Instant::now();
        self.records
            .entry(packet.ident())
            .and_modify(|record| {
                record.last_sent = now;
            })
            .or_insert(SendHistoryRecord {
                packet,
                addr,
                created_at: now,
                last_sent: now,
            });
    }

    /// Drops the entry on acknowledgement.
    pub fn remove(&mut self, ident: &PacketIdent) -> Option<SendHistoryRecord> {
        self.records.remove(ident)
    }

    pub fn get(&self, ident: &PacketIdent) -> Result<&SendHistoryRecord> {
        self.records.get(ident).ok_or(Error::ErrHistoryMiss)
    }

    pub fn contains(&self, ident: &PacketIdent) -> bool {
        self.records.contains_key(ident)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One retransmission pass: entries older than `ttl` are evicted; the
    /// rest are selected for resend when their last transmission is older
    /// than `retransmit_after` and the packet demands an acknowledgement.
    /// Selected entries have their last-sent time advanced here so the next
    /// tick does not pick them again before the resend happens; the caller
    /// performs the actual socket writes outside the history lock.
    pub fn sweep(
        &mut self,
        ttl: Duration,
        retransmit_after: Duration,
    ) -> Vec<(Packet, SocketAddr)> {
        let now = Instant::now();

        let before = self.records.len();
        self.records
            .retain(|_, record| now.duration_since(record.created_at) <= ttl);
        let expired = before - self.records.len();
        if expired > 0 {
            log::debug!("dropped {expired} send-history entries past their ttl");
        }

        let mut resend = Vec::new();
        for record in self.records.values_mut() {
            if !record.packet.header.flags.ack_required() {
                continue;
            }
            if now.duration_since(record.last_sent) > retransmit_after {
                record.last_sent = now;
                resend.push((record.packet.clone(), record.addr));
            }
        }
        resend
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::proto::flags::Flags;
    use crate::proto::header::PacketHeader;
    use crate::proto::message_id::MessageId;
    use crate::proto::message_type::MessageType;
    use crate::proto::PROTOCOL_V1;

    fn addr() -> SocketAddr {
        "127.0.0.1:4444".parse().unwrap()
    }

    fn packet(ack_required: bool) -> Packet {
        let payload = Bytes::from_static(b"payload");
        let flags = if ack_required {
            Flags::new().with_ack_required()
        } else {
            Flags::new()
        };
        Packet::new(
            PacketHeader {
                version: PROTOCOL_V1,
                message_id: MessageId::generate(),
                message_type: MessageType::Response,
                packet_number: 0,
                total_packets: 1,
                flags,
                payload_length: payload.len() as u16,
            },
            payload,
        )
        .unwrap()
    }

    #[test]
    fn test_append_get_remove() {
        let mut history = SendHistory::new();
        let p = packet(true);
        let ident = p.ident();

        assert_eq!(history.get(&ident).err(), Some(Error::ErrHistoryMiss));

        history.append(p.clone(), addr());
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(&ident).unwrap().packet, p);

        assert!(history.remove(&ident).is_some());
        assert!(history.is_empty());
        assert_eq!(history.get(&ident).err(), Some(Error::ErrHistoryMiss));
    }

    #[test]
    fn test_reappend_keeps_creation_time() {
        let mut history = SendHistory::new();
        let p = packet(true);
        let ident = p.ident();

        history.append(p.clone(), addr());
        let created = history.get(&ident).unwrap().created_at;

        std::thread::sleep(Duration::from_millis(5));
        history.append(p, addr());

        let record = history.get(&ident).unwrap();
        assert_eq!(record.created_at, created);
        assert!(record.last_sent > created);
    }

    #[test]
    fn test_sweep_selects_overdue_ack_required_entries() {
        let mut history = SendHistory::new();
        let acked = packet(true);
        let fire_and_forget = packet(false);
        history.append(acked.clone(), addr());
        history.append(fire_and_forget, addr());

        // nothing is overdue yet
        let resend = history.sweep(Duration::from_secs(60), Duration::from_secs(60));
        assert!(resend.is_empty());

        // everything is overdue at zero, but only the ack-required packet
        // is selected
        let resend = history.sweep(Duration::from_secs(60), Duration::from_millis(0));
        assert_eq!(resend.len(), 1);
        assert_eq!(resend[0].0.ident(), acked.ident());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_sweep_advances_last_sent() {
        let mut history = SendHistory::new();
        history.append(packet(true), addr());

        let first = history.sweep(Duration::from_secs(60), Duration::from_millis(0));
        assert_eq!(first.len(), 1);

        // immediately after, the entry is no longer overdue
        let second = history.sweep(Duration::from_secs(60), Duration::from_millis(50));
        assert!(second.is_empty());
    }

    #[test]
    fn test_sweep_evicts_expired_entries() {
        let mut history = SendHistory::new();
        history.append(packet(true), addr());
        history.append(packet(false), addr());

        let resend = history.sweep(Duration::from_millis(0), Duration::from_millis(0));
        assert!(resend.is_empty());
        assert!(history.is_empty());
    }
}
