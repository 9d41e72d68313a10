
pub(crate) mod partial;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use partial::MessagePartial;

use crate::message::Message;
use crate::proto::ident::PacketIdent;
use crate::proto::message_id::MessageId;
use crate::proto::packet::Packet;

/// The outcome of feeding one packet into the assembler.
#[derive(Debug)]
pub enum UpsertOutcome {
    /// The packet was absorbed; the message is still incomplete.
    Pending,
    /// This packet completed the message. Handed out exactly once per id.
    Completed(Message),
    /// The message id is already in the completed set; the caller should
    /// consult the response cache instead of reassembling.
    Duplicate,
}

/// A gap the sweep wants re-sent: which packet, and which peer to ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendRequest {
    pub origin: SocketAddr,
    pub ident: PacketIdent,
}

/// Assembler tracks every in-flight inbound message and the set of message
/// ids whose reassembly has already finished.
///
/// Packets of one message may arrive in any order; the reassembled payload
/// is the same regardless, and completion is reported exactly once. Once an
/// id is in the completed set, further packets for it are reported as
/// duplicates until the id ages out.
#[derive(Debug, Default)]
pub struct Assembler {
    incomplete: HashMap<MessageId, MessagePartial>,
    complete: HashMap<MessageId, Instant>,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler::default()
    }

    /// Feeds one decoded packet in.
    ///
    /// With `duplicate_filtering` on, packets of an already-completed message
    /// short-circuit to [`UpsertOutcome::Duplicate`]; with it off they start
    /// a fresh partial and will eventually hand the message off again, which
    /// is what turning the filter off is for.
    pub fn upsert(
        &mut self,
        origin: SocketAddr,
        p: &Packet,
        duplicate_filtering: bool,
    ) -> UpsertOutcome {
        let id = p.header.message_id;

        if duplicate_filtering && self.complete.contains_key(&id) {
            log::debug!("message {id} already assembled and handed off");
            return UpsertOutcome::Duplicate;
        }

        let partial = self
            .incomplete
            .entry(id)
            .or_insert_with(|| MessagePartial::new(origin, p.header.total_packets as usize));
        partial.upsert(p);

        if let Some(message) = partial.assemble() {
            self.incomplete.remove(&id);
            self.complete.insert(id, Instant::now());
            log::debug!("message {id} completed");
            return UpsertOutcome::Completed(message);
        }

        UpsertOutcome::Pending
    }

    pub fn is_completed(&self, id: &MessageId) -> bool {
        self.complete.contains_key(id)
    }

    pub fn incomplete_len(&self) -> usize {
        self.incomplete.len()
    }

    pub fn completed_len(&self) -> usize {
        self.complete.len()
    }

    /// Walks the incomplete map: partials idle past `partial_ttl` are
    /// evicted (the peer stopped sending), and partials idle past
    /// `stale_after` yield one resend request per missing packet number.
    /// Runs under the same lock as `upsert`, so a message cannot complete
    /// and be NAK-ed concurrently.
    pub fn sweep(&mut self, stale_after: Duration, partial_ttl: Duration) -> Vec<ResendRequest> {
        let before = self.incomplete.len();
        self.incomplete.retain(|id, partial| {
            if partial.age() > partial_ttl {
                log::warn!(
                    "evicting stale partial {id}: {}/{} packets after {:?}",
                    partial.received(),
                    partial.total(),
                    partial.age()
                );
                false
            } else {
                true
            }
        });
        let evicted = before - self.incomplete.len();
        if evicted > 0 {
            log::debug!("evicted {evicted} stale partials");
        }

        let mut resends = Vec::new();
        for (id, partial) in &self.incomplete {
            if partial.age() < stale_after {
                continue;
            }
            for number in partial.missing() {
                resends.push(ResendRequest {
                    origin: partial.origin(),
                    ident: PacketIdent {
                        message_id: *id,
                        packet_number: number,
                    },
                });
            }
        }
        resends
    }

    /// Ages completed-set entries out once their duplicate-filter window
    /// (the response TTL) has passed.
    pub fn evict_completed(&mut self, ttl: Duration) -> usize {
        let before = self.complete.len();
        self.complete.retain(|_, done_at| done_at.elapsed() <= ttl);
        before - self.complete.len()
    }
}
