
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};

use crate::assembler::{Assembler, UpsertOutcome};
use crate::cache::{CacheLookup, ResponseCache};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::SendHistory;
use crate::message::Message;
use crate::proto::ack_payload::{new_acknowledge, new_request_resend, AckResendPayload};
use crate::proto::header::DistilledHeader;
use crate::proto::message_id::MessageId;
use crate::proto::message_type::MessageType;
use crate::proto::packet::Packet;
use crate::proto::{MAX_PACKET_SIZE, PROTOCOL_V1};
use crate::response::Response;
use crate::stats::NetStats;

/// How long a partial may go without a new packet before the gap sweep
/// starts requesting its missing fragments.
pub(crate) const PARTIAL_STALE_AFTER: Duration = Duration::from_secs(1);

/// Sweep intervals are runtime-tunable; a zero value would spin, so ticks
/// never go below this.
const MIN_TICK: Duration = Duration::from_millis(1);

/// MessageHandler is the dispatch seam into the application: it receives
/// each reassembled message exactly once per message id and replies through
/// [`Engine::send_response`].
#[async_trait]
pub trait MessageHandler {
    async fn on_message(&self, engine: Arc<Engine>, peer: SocketAddr, message: Message);
}

/// Engine ties the reliability pieces together around one UDP socket: a
/// receive loop feeding the assembler, acknowledgement synthesis, the send
/// history with its retransmission sweep, the response cache with its
/// eviction sweep, and the fault-injecting drop sampler on both directions.
///
/// Construct one per socket with [`Engine::bind`] and drive it with
/// [`Engine::run`]; all state is owned here rather than in process-wide
/// singletons so tests can run several engines side by side.
pub struct Engine {
    socket: Arc<UdpSocket>,
    config: Arc<Config>,
    stats: Arc<NetStats>,
    history: Arc<Mutex<SendHistory>>,
    assembler: Arc<Mutex<Assembler>>,
    cache: Arc<Mutex<ResponseCache>>,
    handler: Arc<dyn MessageHandler + Send + Sync>,
    close_tx: broadcast::Sender<()>,
}

impl Engine {
    /// Binds the UDP socket on the configured port (0 lets the OS pick) and
    /// starts the three periodic sweeps. The receive loop is not started
    /// until [`Engine::run`] is called.
    pub async fn bind(
        config: Arc<Config>,
        handler: Arc<dyn MessageHandler + Send + Sync>,
    ) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(("0.0.0.0", config.server_port()))
            .await
            .map_err(|e| Error::ErrBindFailed(e.to_string()))?;

        let (close_tx, _) = broadcast::channel(1);

        let engine = Arc::new(Engine {
            socket: Arc::new(socket),
            config,
            stats: Arc::new(NetStats::new()),
            history: Arc::new(Mutex::new(SendHistory::new())),
            assembler: Arc::new(Mutex::new(Assembler::new())),
            cache: Arc::new(Mutex::new(ResponseCache::new())),
            handler,
            close_tx,
        });

        engine.spawn_sweeps();

        Ok(engine)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| Error::Other(e.to_string()))
    }

    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn stats(&self) -> Arc<NetStats> {
        Arc::clone(&self.stats)
    }

    /// Stops the receive loop and the periodic sweeps.
    pub fn close(&self) {
        let _ = self.close_tx.send(());
    }

    /// The blocking receive loop: reads datagrams and spins each one onto
    /// its own task, so one slow handler never stalls the socket.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let mut close_rx = self.close_tx.subscribe();
        let mut buffer = vec![0u8; MAX_PACKET_SIZE];

        log::info!("listening on {:?}", self.socket.local_addr());

        loop {
            tokio::select! {
                _ = close_rx.recv() => break,
                result = self.socket.recv_from(&mut buffer) => {
                    let (n, peer) = match result {
                        Ok(v) => v,
                        Err(err) => {
                            log::warn!("error reading from socket: {err}");
                            continue;
                        }
                    };
                    let data = Bytes::copy_from_slice(&buffer[..n]);
                    let engine = Arc::clone(self);
                    tokio::spawn(async move {
                        engine.handle_datagram(peer, data).await;
                    });
                }
            }
        }

        Ok(())
    }

    /// The ingress pipeline for one datagram: count, sample the drop
    /// injector, validate and decode, synthesize the acknowledgement, then
    /// dispatch by message type.
    pub(crate) async fn handle_datagram(self: Arc<Self>, peer: SocketAddr, data: Bytes) {
        self.stats.mark_packet_in();

        if self.sample_drop() {
            self.stats.mark_packet_in_dropped();
            log::debug!("drop injector swallowed {} inbound bytes from {peer}", data.len());
            return;
        }

        let packet = match Packet::unmarshal(&data) {
            Ok(p) => p,
            Err(err) => {
                log::warn!("discarding datagram from {peer}: {err}");
                return;
            }
        };
        log::debug!("received {packet} from {peer}");

        if packet.header.flags.ack_required()
            && packet.header.message_type != MessageType::Acknowledge
        {
            match new_acknowledge(packet.ident()) {
                Ok(ack) => {
                    if let Err(err) = self.send_packet(peer, &ack).await {
                        log::warn!("unable to acknowledge {}: {err}", packet.ident());
                    }
                }
                Err(err) => log::warn!("unable to build acknowledgement: {err}"),
            }
        }

        match packet.header.message_type {
            MessageType::Acknowledge => self.handle_acknowledge(&packet).await,
            MessageType::RequestResend => self.handle_request_resend(peer, &packet).await,
            _ => self.handle_data_packet(peer, &packet).await,
        }
    }

    /// An acknowledgement retires the named send-history entry; the first
    /// acknowledgement of any response packet also retires the cached copy
    /// of that response.
    async fn handle_acknowledge(&self, packet: &Packet) {
        let named = match AckResendPayload::unmarshal(&packet.payload) {
            Ok(p) => p,
            Err(err) => {
                log::warn!("unable to unmarshal acknowledge payload: {err}");
                return;
            }
        };

        self.history.lock().await.remove(&named.ident());
        log::debug!("acknowledged {}", named.ident());

        self.cache.lock().await.remove_by_wire_id(&named.message_id);
    }

    /// An explicit resend request is served straight from the send history;
    /// a miss is logged and ignored (the entry expired or the send was
    /// never recorded).
    async fn handle_request_resend(&self, peer: SocketAddr, packet: &Packet) {
        let named = match AckResendPayload::unmarshal(&packet.payload) {
            Ok(p) => p,
            Err(err) => {
                log::warn!("unable to unmarshal resend payload: {err}");
                return;
            }
        };

        let record = {
            let history = self.history.lock().await;
            history.get(&named.ident()).map(|r| r.packet.clone())
        };

        match record {
            Ok(missing) => {
                if let Err(err) = self.send_packet(peer, &missing).await {
                    log::warn!("unable to resend {}: {err}", named.ident());
                } else {
                    log::debug!("resent {} on request", named.ident());
                }
            }
            Err(err) => {
                log::warn!("resend request for {}: {err}", named.ident());
            }
        }
    }

    /// Everything that is not an acknowledgement or a resend request feeds
    /// the assembler. A completed message is handed to the application
    /// exactly once; packets of an already-completed message replay the
    /// cached response instead.
    async fn handle_data_packet(self: &Arc<Self>, peer: SocketAddr, packet: &Packet) {
        let outcome = {
            let mut assembler = self.assembler.lock().await;
            assembler.upsert(peer, packet, self.config.duplicate_filtering())
        };

        match outcome {
            UpsertOutcome::Pending => {}
            UpsertOutcome::Completed(message) => {
                log::debug!("handing off {message} from {peer}");
                let handler = Arc::clone(&self.handler);
                handler.on_message(Arc::clone(self), peer, message).await;
            }
            UpsertOutcome::Duplicate => {
                self.replay_cached_response(peer, packet.header.message_id)
                    .await;
            }
        }
    }

    async fn replay_cached_response(&self, peer: SocketAddr, id: MessageId) {
        let lookup = {
            let mut cache = self.cache.lock().await;
            cache.lookup(&id)
        };

        match lookup {
            CacheLookup::Complete(response) => {
                log::debug!("duplicate request {id}, resending cached response");
                if let Err(err) = self.send_response(peer, &response).await {
                    log::warn!("unable to resend cached response for {id}: {err}");
                }
            }
            CacheLookup::Processing => {
                log::debug!("duplicate request {id} while still processing, suppressed");
            }
            CacheLookup::Absent => {
                log::debug!("duplicate request {id} with no cached response, suppressed");
            }
        }
    }

    /// Marks a request id as handed off; the dispatch layer calls this the
    /// moment it starts executing a request.
    pub async fn mark_processing(&self, id: MessageId) {
        self.cache.lock().await.set_processing(id);
    }

    /// What the response cache knows about a request id.
    pub async fn response_state(&self, id: &MessageId) -> CacheLookup {
        self.cache.lock().await.lookup(id)
    }

    /// Records the response in the cache, fragments it, and transmits it
    /// reliably (every packet demands an acknowledgement and enters the
    /// send history).
    pub async fn send_response(&self, peer: SocketAddr, response: &Response) -> Result<()> {
        let message = Message::new(
            DistilledHeader {
                version: PROTOCOL_V1,
                message_id: MessageId::generate(),
                message_type: MessageType::Response,
                ack_required: true,
            },
            response.marshal(),
        );

        {
            let mut cache = self.cache.lock().await;
            cache.add_response(response.clone(), message.header.message_id);
        }

        self.send_message(peer, &message).await
    }

    /// Fragments and transmits one outbound message.
    pub async fn send_message(&self, peer: SocketAddr, message: &Message) -> Result<()> {
        for packet in message.to_packets()? {
            self.send_packet(peer, &packet).await?;
        }
        Ok(())
    }

    /// The egress pipeline for one packet: count, sample the drop injector,
    /// marshal, write, and record into the send history. A drop is reported
    /// as success; for packets already in the history the retransmission
    /// sweep retries, and for first sends recovery rides on the peer's
    /// resend requests or request retransmission.
    pub(crate) async fn send_packet(&self, peer: SocketAddr, packet: &Packet) -> Result<()> {
        self.stats.mark_packet_out();

        if self.sample_drop() {
            self.stats.mark_packet_out_dropped();
            log::debug!("drop injector swallowed outbound {packet} to {peer}");
            return Ok(());
        }

        let raw = packet.marshal()?;
        self.socket
            .send_to(&raw, peer)
            .await
            .map_err(|e| Error::ErrSendFailed(e.to_string()))?;
        log::debug!("sent {packet} to {peer}");

        if packet.header.message_type != MessageType::Acknowledge {
            self.history.lock().await.append(packet.clone(), peer);
        }

        Ok(())
    }

    fn sample_drop(&self) -> bool {
        rand::random::<f32>() < self.config.drop_rate()
    }

    /// The three periodic tasks: the assembler gap sweep, the send-history
    /// retransmitter, and the response-cache evictor. Each loop re-reads its
    /// interval every tick so admin-shell changes apply, alternates the tick
    /// against the close signal, and holds only a weak handle so a dropped
    /// engine winds its tasks down even without an explicit close.
    fn spawn_sweeps(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut close_rx = self.close_tx.subscribe();
        tokio::spawn(async move {
            loop {
                let interval = match weak.upgrade() {
                    Some(engine) => engine.config.assembler_interval(),
                    None => break,
                };
                let timer = tokio::time::sleep(interval.max(MIN_TICK));
                tokio::pin!(timer);

                tokio::select! {
                    _ = timer.as_mut() => {
                        match weak.upgrade() {
                            Some(engine) => engine.sweep_assembler().await,
                            None => break,
                        }
                    }
                    _ = close_rx.recv() => break,
                }
            }
        });

        let weak = Arc::downgrade(self);
        let mut close_rx = self.close_tx.subscribe();
        tokio::spawn(async move {
            loop {
                let interval = match weak.upgrade() {
                    Some(engine) => engine.config.packet_receive_timeout(),
                    None => break,
                };
                let timer = tokio::time::sleep(interval.max(MIN_TICK));
                tokio::pin!(timer);

                tokio::select! {
                    _ = timer.as_mut() => {
                        match weak.upgrade() {
                            Some(engine) => engine.sweep_history().await,
                            None => break,
                        }
                    }
                    _ = close_rx.recv() => break,
                }
            }
        });

        let weak = Arc::downgrade(self);
        let mut close_rx = self.close_tx.subscribe();
        tokio::spawn(async move {
            loop {
                let interval = match weak.upgrade() {
                    Some(engine) => engine.config.response_interval(),
                    None => break,
                };
                let timer = tokio::time::sleep(interval.max(MIN_TICK));
                tokio::pin!(timer);

                tokio::select! {
                    _ = timer.as_mut() => {
                        match weak.upgrade() {
                            Some(engine) => engine.sweep_cache().await,
                            None => break,
                        }
                    }
                    _ = close_rx.recv() => break,
                }
            }
        });
    }

    /// Requests the missing fragments of partials that went quiet, and
    /// evicts partials past the packet TTL.
    async fn sweep_assembler(&self) {
        let resends = {
            let mut assembler = self.assembler.lock().await;
            assembler.sweep(PARTIAL_STALE_AFTER, self.config.packet_ttl())
        };

        for request in resends {
            match new_request_resend(request.ident) {
                Ok(packet) => {
                    log::debug!("requesting resend of {}", request.ident);
                    if let Err(err) = self.send_packet(request.origin, &packet).await {
                        log::warn!("unable to request resend of {}: {err}", request.ident);
                    }
                }
                Err(err) => log::warn!("unable to build resend request: {err}"),
            }
        }
    }

    /// Retransmits overdue unacknowledged packets and drops entries past
    /// their TTL. Socket writes happen after the history lock is released.
    async fn sweep_history(&self) {
        let resend = {
            let mut history = self.history.lock().await;
            history.sweep(self.config.packet_ttl(), self.config.packet_receive_timeout())
        };

        for (packet, addr) in resend {
            log::debug!("retransmitting unacknowledged {packet}");
            if let Err(err) = self.send_packet(addr, &packet).await {
                log::warn!("unable to retransmit {}: {err}", packet.ident());
            }
        }
    }

    /// Evicts idle response-cache entries and ages the completed-message
    /// set out on the same clock.
    async fn sweep_cache(&self) {
        let ttl = self.config.response_ttl();
        {
            let mut cache = self.cache.lock().await;
            cache.evict_expired(ttl);
        }
        {
            let mut assembler = self.assembler.lock().await;
            assembler.evict_completed(ttl);
        }
    }
}
