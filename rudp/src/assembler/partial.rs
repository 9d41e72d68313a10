use std::net::SocketAddr;
use std::time::Instant;

use bytes::{Bytes, BytesMut};

use crate::message::Message;
use crate::proto::header::DistilledHeader;
use crate::proto::packet::Packet;

/// MessagePartial accumulates the packets of one in-flight inbound message.
///
/// Receipt is tracked in a bitmap sized to the message's packet count, bit
/// `i` set iff packet `i` has arrived; bits are LSB-first within each byte.
/// Once a bit is set its payload slot is immutable.
#[derive(Debug)]
pub(crate) struct MessagePartial {
    header: Option<DistilledHeader>,
    origin: SocketAddr,
    bitmap: Vec<u8>,
    payloads: Vec<Option<Bytes>>,
    total: usize,
    last_updated: Instant,
}

fn bitmap_position(packet_number: u8) -> (usize, u8) {
    (
        packet_number as usize / 8,
        1 << (packet_number % 8),
    )
}

impl MessagePartial {
    pub(crate) fn new(origin: SocketAddr, total: usize) -> Self {
        MessagePartial {
            header: None,
            origin,
            bitmap: vec![0u8; (total + 7) / 8],
            payloads: vec![None; total],
            total,
            last_updated: Instant::now(),
        }
    }

    pub(crate) fn origin(&self) -> SocketAddr {
        self.origin
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn age(&self) -> std::time::Duration {
        self.last_updated.elapsed()
    }

    /// Records the packet's payload. The distilled header is captured from
    /// the first packet seen; re-insertion of an already-set bit is a no-op.
    /// Returns whether the packet was newly inserted.
    pub(crate) fn upsert(&mut self, p: &Packet) -> bool {
        let number = p.header.packet_number as usize;
        if number >= self.total {
            log::warn!(
                "packet {} claims position {} outside partial sized {}",
                p.header.message_id,
                number,
                self.total
            );
            return false;
        }

        let (byte_idx, mask) = bitmap_position(p.header.packet_number);
        if self.bitmap[byte_idx] & mask != 0 {
            log::debug!("packet already added to partial: {}", p.ident());
            return false;
        }

        if self.header.is_none() {
            self.header = Some(p.header.distilled());
        }

        self.bitmap[byte_idx] |= mask;
        self.payloads[number] = Some(p.payload.clone());
        self.last_updated = Instant::now();
        true
    }

    pub(crate) fn received(&self) -> usize {
        self.bitmap.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.received() == self.total
    }

    pub(crate) fn has_packet(&self, packet_number: u8) -> bool {
        let (byte_idx, mask) = bitmap_position(packet_number);
        byte_idx < self.bitmap.len() && self.bitmap[byte_idx] & mask != 0
    }

    /// Packet numbers whose bits are still unset.
    pub(crate) fn missing(&self) -> Vec<u8> {
        (0..self.total as u8)
            .filter(|n| !self.has_packet(*n))
            .collect()
    }

    /// Concatenates the payload slots in packet-number order. Only valid
    /// once the bitmap is full.
    pub(crate) fn assemble(&self) -> Option<Message> {
        if !self.is_complete() {
            return None;
        }
        let header = self.header.clone()?;

        let mut payload = BytesMut::new();
        for slot in self.payloads.iter().flatten() {
            payload.extend_from_slice(slot);
        }

        Some(Message::new(header, payload.freeze()))
    }
}
