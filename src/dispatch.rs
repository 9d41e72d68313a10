use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rudp::cache::CacheLookup;
use rudp::engine::{Engine, MessageHandler};
use rudp::message::Message;
use rudp::proto::message_id::MessageId;
use rudp::proto::message_type::MessageType;
use rudp::response::{
    Response, STATUS_BAD_REQUEST, STATUS_INTERNAL_SERVER_ERROR, STATUS_OK,
};

use crate::booking::Manager;
use crate::error::Error;
use crate::rpc::booking_delete::BookingDeletePayload;
use crate::rpc::booking_make::BookingMakePayload;
use crate::rpc::booking_update::BookingUpdatePayload;
use crate::rpc::facility_create::FacilityCreatePayload;
use crate::rpc::facility_delete::FacilityDeletePayload;
use crate::rpc::facility_monitor::FacilityMonitorPayload;
use crate::rpc::facility_query::FacilityQueryPayload;
use crate::rpc::method::*;
use crate::rpc::Request;

/// Dispatcher routes each completed request message to its booking-domain
/// handler and turns domain results into wire responses.
pub struct Dispatcher {
    manager: Arc<Manager>,
}

#[async_trait]
impl MessageHandler for Dispatcher {
    async fn on_message(&self, engine: Arc<Engine>, peer: SocketAddr, message: Message) {
        log::info!(
            "handling message {} of type {}",
            message.header.message_id,
            message.header.message_type
        );

        match message.header.message_type {
            MessageType::Request => self.handle_request(engine, peer, &message).await,
            other => log::error!("message type not supported yet: {other}"),
        }
    }
}

impl Dispatcher {
    pub fn new(manager: Arc<Manager>) -> Self {
        Dispatcher { manager }
    }

    async fn handle_request(&self, engine: Arc<Engine>, peer: SocketAddr, message: &Message) {
        let id = message.header.message_id;

        // a duplicate may reach this layer when assembler-level filtering is
        // off; the cache still keeps execution at-most-once
        match engine.response_state(&id).await {
            CacheLookup::Processing => {
                log::info!("request {id} is still being processed, ignoring duplicate");
                return;
            }
            CacheLookup::Complete(response) => {
                log::info!("request {id} already answered, resending response");
                if let Err(err) = engine.send_response(peer, &response).await {
                    log::error!("unable to resend historical response: {err}");
                }
                return;
            }
            CacheLookup::Absent => {}
        }
        engine.mark_processing(id).await;

        let request = match Request::unmarshal(&message.payload) {
            Ok(r) => r,
            Err(err) => {
                log::error!("unable to determine target method for {id}: {err}");
                self.respond(
                    &engine,
                    peer,
                    Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
                )
                .await;
                return;
            }
        };
        log::info!("request {id} invokes {}", request.method);

        let response = match request.method {
            METHOD_FACILITY_CREATE => self.facility_create(id, &request.payload).await,
            METHOD_FACILITY_QUERY => self.facility_query(id, &request.payload).await,
            METHOD_FACILITY_MONITOR => {
                self.facility_monitor(Arc::clone(&engine), peer, id, &request.payload)
                    .await
            }
            METHOD_FACILITY_DELETE => self.facility_delete(id, &request.payload).await,
            METHOD_BOOKING_MAKE => self.booking_make(id, &request.payload).await,
            METHOD_BOOKING_UPDATE => self.booking_update(id, &request.payload).await,
            METHOD_BOOKING_DELETE => self.booking_delete(id, &request.payload).await,
            other => {
                log::error!("request type not supported: {other}");
                let err = Error::ErrUnknownMethod { method: other.0 };
                Response::error(id, STATUS_BAD_REQUEST, &err.to_string())
            }
        };

        self.respond(&engine, peer, response).await;
    }

    async fn respond(&self, engine: &Engine, peer: SocketAddr, response: Response) {
        if let Err(err) = engine.send_response(peer, &response).await {
            log::error!(
                "unable to send response for {}: {err}",
                response.original_message_id
            );
        }
    }

    async fn facility_create(&self, id: MessageId, payload: &Bytes) -> Response {
        let p = match FacilityCreatePayload::unmarshal(payload) {
            Ok(p) => p,
            Err(err) => return Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        match self.manager.create_facility(&p.name).await {
            Ok(()) => Response::ok(id),
            Err(err) => Response::error(id, STATUS_BAD_REQUEST, &err.to_string()),
        }
    }

    async fn facility_query(&self, id: MessageId, payload: &Bytes) -> Response {
        let p = match FacilityQueryPayload::unmarshal(payload) {
            Ok(p) => p,
            Err(err) => return Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        match self.manager.query_availability(&p.name, p.days).await {
            Ok(schedule) => Response::new(id, STATUS_OK, Bytes::from(schedule)),
            Err(err) => Response::error(id, STATUS_BAD_REQUEST, &err.to_string()),
        }
    }

    async fn facility_delete(&self, id: MessageId, payload: &Bytes) -> Response {
        let p = match FacilityDeletePayload::unmarshal(payload) {
            Ok(p) => p,
            Err(err) => return Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        match self.manager.delete_facility(&p.name).await {
            Ok(()) => Response::ok(id),
            Err(err) => Response::error(id, STATUS_BAD_REQUEST, &err.to_string()),
        }
    }

    /// Replies immediately, then keeps streaming one response per monitor
    /// update (all under the original request id) until the watch TTL
    /// lapses or the facility's watchers are cleared.
    async fn facility_monitor(
        &self,
        engine: Arc<Engine>,
        peer: SocketAddr,
        id: MessageId,
        payload: &Bytes,
    ) -> Response {
        let p = match FacilityMonitorPayload::unmarshal(payload) {
            Ok(p) => p,
            Err(err) => return Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        let mut updates = self.manager.monitor().watch(&p.name).await;
        let ttl = Duration::from_secs(p.ttl_seconds as u64);
        let name = p.name.clone();

        tokio::spawn(async move {
            let deadline = tokio::time::sleep(ttl);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    update = updates.recv() => {
                        match update {
                            Some(text) => {
                                let response = Response::ok_with_text(id, &text);
                                if let Err(err) = engine.send_response(peer, &response).await {
                                    log::error!("unable to stream monitor update: {err}");
                                }
                            }
                            None => {
                                log::info!("watchers for {name} cleared, ending monitor stream");
                                let response =
                                    Response::ok_with_text(id, "Monitoring stopped (facility gone)");
                                let _ = engine.send_response(peer, &response).await;
                                return;
                            }
                        }
                    }
                    _ = deadline.as_mut() => {
                        log::info!("monitor watch on {name} expired");
                        let response = Response::ok_with_text(id, "Monitoring over");
                        let _ = engine.send_response(peer, &response).await;
                        return;
                    }
                }
            }
        });

        Response::ok_with_text(
            id,
            &format!("Monitoring {} for {} seconds", p.name, p.ttl_seconds),
        )
    }

    async fn booking_make(&self, id: MessageId, payload: &Bytes) -> Response {
        let p = match BookingMakePayload::unmarshal(payload) {
            Ok(p) => p,
            Err(err) => return Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        let booking = match p.booking() {
            Ok(b) => b,
            Err(err) => return Response::error(id, STATUS_BAD_REQUEST, &err.to_string()),
        };

        match self.manager.make_booking(&p.name, booking).await {
            Ok(()) => Response::ok(id),
            Err(err) => Response::error(id, STATUS_BAD_REQUEST, &err.to_string()),
        }
    }

    async fn booking_update(&self, id: MessageId, payload: &Bytes) -> Response {
        let p = match BookingUpdatePayload::unmarshal(payload) {
            Ok(p) => p,
            Err(err) => return Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        match self.manager.update_booking_by_id(p.id, p.delta_hours).await {
            Ok(()) => Response::ok(id),
            Err(err) => Response::error(id, STATUS_BAD_REQUEST, &err.to_string()),
        }
    }

    async fn booking_delete(&self, id: MessageId, payload: &Bytes) -> Response {
        let p = match BookingDeletePayload::unmarshal(payload) {
            Ok(p) => p,
            Err(err) => return Response::error(id, STATUS_INTERNAL_SERVER_ERROR, &err.to_string()),
        };

        match self.manager.delete_booking_by_id(p.id).await {
            Ok(()) => Response::ok(id),
            Err(err) => Response::error(id, STATUS_BAD_REQUEST, &err.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use rudp::config::{Config, EnvSettings};
    use rudp::proto::header::DistilledHeader;
    use rudp::proto::packet::Packet;
    use rudp::proto::{MAX_PACKET_SIZE, PROTOCOL_V1};
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    use super::*;

    fn test_settings() -> EnvSettings {
        EnvSettings {
            server_port: 0,
            packet_drop_rate: 0.0,
            packet_timeout_receive: 100,
            packet_ttl: 2000,
            message_assembler_interval: 100,
            response_ttl: 5000,
            response_interval: 100,
            ..Default::default()
        }
    }

    async fn start_server() -> (Arc<Engine>, Arc<Manager>, SocketAddr) {
        let manager = Arc::new(Manager::new());
        let handler: Arc<dyn MessageHandler + Send + Sync> =
            Arc::new(Dispatcher::new(Arc::clone(&manager)));

        let config = Arc::new(Config::new(test_settings()));
        let engine = Engine::bind(config, handler).await.unwrap();

        let runner = Arc::clone(&engine);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let port = engine.local_addr().unwrap().port();
        let server = format!("127.0.0.1:{port}").parse().unwrap();
        (engine, manager, server)
    }

    struct Client {
        socket: UdpSocket,
        server: SocketAddr,
    }

    impl Client {
        async fn new(server: SocketAddr) -> Self {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            Client { socket, server }
        }

        async fn send_request(&self, request: &Request) -> MessageId {
            let message = Message::new(
                DistilledHeader {
                    version: PROTOCOL_V1,
                    message_id: MessageId::generate(),
                    message_type: MessageType::Request,
                    ack_required: true,
                },
                request.marshal(),
            );
            for packet in message.to_packets().unwrap() {
                self.socket
                    .send_to(&packet.marshal().unwrap(), self.server)
                    .await
                    .unwrap();
            }
            message.header.message_id
        }

        async fn recv_response(&self, wait: Duration) -> Option<Response> {
            let deadline = tokio::time::Instant::now() + wait;
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];
            loop {
                let remaining = deadline.checked_duration_since(tokio::time::Instant::now())?;
                let (n, _) = timeout(remaining, self.socket.recv_from(&mut buffer))
                    .await
                    .ok()?
                    .ok()?;
                let packet =
                    match Packet::unmarshal(&Bytes::copy_from_slice(&buffer[..n])) {
                        Ok(p) => p,
                        Err(_) => continue,
                    };
                if packet.header.message_type == MessageType::Response {
                    return Response::unmarshal(&packet.payload).ok();
                }
            }
        }
    }

    #[tokio::test]
    async fn test_facility_create_and_duplicate_name() {
        let (engine, manager, server) = start_server().await;
        let client = Client::new(server).await;

        let payload = FacilityCreatePayload {
            name: "Gym".to_string(),
        };
        let request = Request::new(METHOD_FACILITY_CREATE, payload.marshal());

        let id = client.send_request(&request).await;
        let response = client
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no response");
        assert_eq!(response.original_message_id, id);
        assert_eq!(response.status_code, STATUS_OK);
        assert_eq!(manager.facility_count().await, 1);

        // a fresh request (new message id) with the same name is a domain
        // error, not a duplicate
        let second = client.send_request(&request).await;
        let response = client
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no second response");
        assert_eq!(response.original_message_id, second);
        assert_eq!(response.status_code, STATUS_BAD_REQUEST);
        assert_eq!(manager.facility_count().await, 1);

        engine.close();
    }

    #[tokio::test]
    async fn test_query_returns_schedule_bitmap() {
        let (engine, manager, server) = start_server().await;
        manager.create_facility("Pool").await.unwrap();
        let client = Client::new(server).await;

        let request = Request::new(
            METHOD_FACILITY_QUERY,
            FacilityQueryPayload {
                name: "Pool".to_string(),
                days: 4,
            }
            .marshal(),
        );
        client.send_request(&request).await;

        let response = client
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no response");
        assert_eq!(response.status_code, STATUS_OK);
        assert_eq!(response.payload.len(), 4 * 3);

        engine.close();
    }

    #[tokio::test]
    async fn test_unknown_method_is_a_bad_request() {
        let (engine, _manager, server) = start_server().await;
        let client = Client::new(server).await;

        let request = Request::new(Method(0x6f), Bytes::new());
        client.send_request(&request).await;

        let response = client
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no response");
        assert_eq!(response.status_code, STATUS_BAD_REQUEST);

        engine.close();
    }

    #[tokio::test]
    async fn test_monitor_streams_updates() {
        let (engine, manager, server) = start_server().await;
        manager.create_facility("Gym").await.unwrap();

        let watcher = Client::new(server).await;
        let request = Request::new(
            METHOD_FACILITY_MONITOR,
            FacilityMonitorPayload {
                name: "Gym".to_string(),
                ttl_seconds: 60,
            }
            .marshal(),
        );
        watcher.send_request(&request).await;

        let greeting = watcher
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no monitor greeting");
        assert!(String::from_utf8_lossy(&greeting.payload).contains("Monitoring Gym"));

        // a mutation by anyone shows up on the watcher's stream
        manager
            .make_booking(
                "Gym",
                crate::booking::Booking::with_random_id(
                    std::time::SystemTime::now() + Duration::from_secs(3600),
                    std::time::SystemTime::now() + Duration::from_secs(7200),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let update = watcher
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no streamed update");
        assert!(
            String::from_utf8_lossy(&update.payload).contains("Successfully made"),
            "unexpected update: {:?}",
            update.payload
        );

        engine.close();
    }

    #[tokio::test]
    async fn test_booking_flow_over_the_wire() {
        let (engine, manager, server) = start_server().await;
        manager.create_facility("Gym").await.unwrap();
        let client = Client::new(server).await;

        // pick hours well in the future so `clean` keeps the booking
        let start_hour =
            (std::time::SystemTime::now()
                .duration_since(std::time::SystemTime::UNIX_EPOCH)
                .unwrap()
                .as_secs()
                / 3600) as u32
                + 48;

        let request = Request::new(
            METHOD_BOOKING_MAKE,
            BookingMakePayload {
                name: "Gym".to_string(),
                start_hour,
                end_hour: start_hour + 2,
            }
            .marshal(),
        );
        client.send_request(&request).await;
        let response = client
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no booking response");
        assert_eq!(response.status_code, STATUS_OK);

        // same slot again clashes
        client.send_request(&request).await;
        let clash = client
            .recv_response(Duration::from_secs(2))
            .await
            .expect("no clash response");
        assert_eq!(clash.status_code, STATUS_BAD_REQUEST);

        engine.close();
    }
}
