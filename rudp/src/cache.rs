use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::proto::message_id::MessageId;
use crate::response::Response;

/// What the cache knows about one request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Never seen, or already evicted.
    Absent,
    /// The request was handed off but its handler has not replied yet.
    Processing,
    /// The recorded reply.
    Complete(Response),
}

#[derive(Debug)]
struct CacheRecord {
    /// None while the handler is still running.
    response: Option<Response>,
    /// The message id the response's packets went out under.
    wire_id: Option<MessageId>,
    updated: Instant,
}

/// ResponseCache makes request execution at-most-once from the peer's
/// perspective: a request id moves from absent to `Processing` when its
/// message is first handed off, to `Complete` when the handler replies, and
/// back to absent after a TTL of inactivity (or once the peer acknowledges
/// receipt of the response).
///
/// Records are keyed by the *request's* message id. A secondary index maps
/// the response's wire message id back to the request id so that an
/// acknowledgement naming any response packet can retire the record.
#[derive(Debug, Default)]
pub struct ResponseCache {
    records: HashMap<MessageId, CacheRecord>,
    wire_index: HashMap<MessageId, MessageId>,
}

impl ResponseCache {
    pub fn new() -> Self {
        ResponseCache::default()
    }

    /// Marks a request as handed off. Re-entry while a record already exists
    /// (still processing, or already complete) is a no-op.
    pub fn set_processing(&mut self, id: MessageId) {
        self.records.entry(id).or_insert(CacheRecord {
            response: None,
            wire_id: None,
            updated: Instant::now(),
        });
    }

    /// Records the completed response under its original request id, along
    /// with the wire id its packets are about to travel under. Overwrites
    /// any earlier response for the same request (a monitor stream replies
    /// repeatedly) and resets the inactivity clock.
    pub fn add_response(&mut self, response: Response, wire_id: MessageId) {
        let id = response.original_message_id;
        if let Some(old) = self.records.get(&id).and_then(|r| r.wire_id) {
            self.wire_index.remove(&old);
        }
        self.records.insert(
            id,
            CacheRecord {
                response: Some(response),
                wire_id: Some(wire_id),
                updated: Instant::now(),
            },
        );
        self.wire_index.insert(wire_id, id);
    }

    /// Looks the request id up, refreshing the inactivity clock on a
    /// complete hit.
    pub fn lookup(&mut self, id: &MessageId) -> CacheLookup {
        match self.records.get_mut(id) {
            None => CacheLookup::Absent,
            Some(record) => match &record.response {
                None => CacheLookup::Processing,
                Some(response) => {
                    record.updated = Instant::now();
                    CacheLookup::Complete(response.clone())
                }
            },
        }
    }

    /// Explicit eviction by request id.
    pub fn remove(&mut self, id: &MessageId) -> bool {
        match self.records.remove(id) {
            Some(record) => {
                if let Some(wire_id) = record.wire_id {
                    self.wire_index.remove(&wire_id);
                }
                true
            }
            None => false,
        }
    }

    /// Eviction keyed by the wire id an acknowledgement names. Returns the
    /// request id that was purged, if the wire id belonged to a cached
    /// response.
    pub fn remove_by_wire_id(&mut self, wire_id: &MessageId) -> Option<MessageId> {
        let id = self.wire_index.remove(wire_id)?;
        self.records.remove(&id);
        log::debug!("response for request {id} acknowledged, cache entry retired");
        Some(id)
    }

    /// Drops records whose last access is older than `ttl`. Returns the
    /// purged request ids.
    pub fn evict_expired(&mut self, ttl: Duration) -> Vec<MessageId> {
        let expired: Vec<MessageId> = self
            .records
            .iter()
            .filter(|(_, record)| record.updated.elapsed() > ttl)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            self.remove(id);
        }
        if !expired.is_empty() {
            log::debug!("cleaned up {} expired responses", expired.len());
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::response::{STATUS_OK};

    fn id(byte: u8) -> MessageId {
        MessageId([byte; 16])
    }

    fn response(request: MessageId) -> Response {
        Response::new(request, STATUS_OK, Bytes::from_static(b"done"))
    }

    #[test]
    fn test_state_transitions() {
        let mut cache = ResponseCache::new();
        let request = id(1);

        assert_eq!(cache.lookup(&request), CacheLookup::Absent);

        cache.set_processing(request);
        assert_eq!(cache.lookup(&request), CacheLookup::Processing);

        let r = response(request);
        cache.add_response(r.clone(), id(2));
        assert_eq!(cache.lookup(&request), CacheLookup::Complete(r));

        assert!(cache.remove(&request));
        assert_eq!(cache.lookup(&request), CacheLookup::Absent);
    }

    #[test]
    fn test_set_processing_does_not_clobber_complete() {
        let mut cache = ResponseCache::new();
        let request = id(1);

        cache.add_response(response(request), id(2));
        cache.set_processing(request);

        assert!(matches!(cache.lookup(&request), CacheLookup::Complete(_)));
    }

    #[test]
    fn test_remove_by_wire_id() {
        let mut cache = ResponseCache::new();
        let request = id(1);
        let wire = id(2);

        cache.add_response(response(request), wire);

        assert_eq!(cache.remove_by_wire_id(&id(3)), None);
        assert_eq!(cache.remove_by_wire_id(&wire), Some(request));
        assert_eq!(cache.lookup(&request), CacheLookup::Absent);
        assert_eq!(cache.remove_by_wire_id(&wire), None);
    }

    #[test]
    fn test_overwriting_response_rebinds_wire_id() {
        let mut cache = ResponseCache::new();
        let request = id(1);

        cache.add_response(response(request), id(2));
        cache.add_response(response(request), id(3));

        // the stale wire id no longer purges anything
        assert_eq!(cache.remove_by_wire_id(&id(2)), None);
        assert!(matches!(cache.lookup(&request), CacheLookup::Complete(_)));

        assert_eq!(cache.remove_by_wire_id(&id(3)), Some(request));
    }

    #[test]
    fn test_eviction_by_inactivity() {
        let mut cache = ResponseCache::new();
        cache.set_processing(id(1));
        cache.add_response(response(id(2)), id(3));

        assert!(cache.evict_expired(Duration::from_secs(60)).is_empty());
        assert_eq!(cache.len(), 2);

        let mut purged = cache.evict_expired(Duration::from_millis(0));
        purged.sort();
        assert_eq!(purged, vec![id(1), id(2)]);
        assert!(cache.is_empty());
        assert!(cache.wire_index.is_empty());
    }

    #[test]
    fn test_lookup_refreshes_inactivity_clock() {
        let mut cache = ResponseCache::new();
        let request = id(1);
        cache.add_response(response(request), id(2));

        std::thread::sleep(Duration::from_millis(10));
        assert!(matches!(cache.lookup(&request), CacheLookup::Complete(_)));

        // a ttl shorter than the sleep but longer than the refresh gap
        assert!(cache.evict_expired(Duration::from_millis(8)).is_empty());
    }
}
