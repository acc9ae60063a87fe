// ABOUTME: End-to-end session tests: real ESME and SMSC sessions over loopback TCP
// ABOUTME: Raw framed connections stand in for misbehaving peers where the API forbids misbehavior

use smpp_session::connection::split;
use smpp_session::datatypes::{
    Bind, BindType, CommandStatus, DeliverSm, EnquireLink, EnquireLinkResponse, MessageState,
    NumericPlanIndicator, QuerySm, QuerySmResponse, SubmitSm, SubmitSmResponse, TypeOfNumber,
    Unbind,
};
use smpp_session::codec::Pdu;
use smpp_session::session::{
    BindCredentials, DeliveryHandler, EsmeSession, MessageStatus, ProcessRequestError,
    SessionConfig, SessionIdentity, SessionState, SessionStateListener, SmppError, SmscHandler,
    SmscSession, SmscSessionBuilder,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

fn test_config() -> SessionConfig {
    SessionConfig::default()
        .with_transaction_timer(Duration::from_secs(2))
        .with_bind_timer(Duration::from_secs(2))
}

/// An in-memory message store playing the SMSC role.
struct MemorySmsc {
    next_id: AtomicU64,
    store: Mutex<HashMap<String, String>>,
}

impl MemorySmsc {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            store: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl SmscHandler for MemorySmsc {
    async fn on_submit_sm(&self, submit: SubmitSm) -> Result<String, ProcessRequestError> {
        let id = format!("msg-{:04}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.store
            .lock()
            .unwrap()
            .insert(id.clone(), submit.destination_addr.clone());
        Ok(id)
    }

    async fn on_query_sm(&self, query: QuerySm) -> Result<MessageStatus, ProcessRequestError> {
        if self.store.lock().unwrap().contains_key(&query.message_id) {
            Ok(MessageStatus {
                message_id: query.message_id,
                final_date: None,
                message_state: MessageState::Enroute,
                error_code: 0,
            })
        } else {
            Err(ProcessRequestError::new(CommandStatus::InvalidMessageId))
        }
    }
}

/// Accept one connection, accept its bind, and hand the live session back.
async fn spawn_smsc(
    handler: Arc<dyn SmscHandler>,
    config: SessionConfig,
) -> (SocketAddr, oneshot::Receiver<SmscSession>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut session = SmscSessionBuilder::new(handler)
            .with_config(config)
            .accept(stream)
            .unwrap();
        let request = session.wait_for_bind().await.unwrap();
        request.accept("TESTSMSC").await.unwrap();
        let _ = tx.send(session);
    });

    (addr, rx)
}

fn sample_submit(dest: &str) -> SubmitSm {
    SubmitSm::builder()
        .source_addr("12345")
        .destination_addr(dest)
        .short_message("hello from the test suite")
        .build()
        .unwrap()
}

#[tokio::test]
async fn bind_submit_unbind_lifecycle() {
    let (addr, server) = spawn_smsc(MemorySmsc::new(), test_config()).await;

    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(test_config())
        .connect_and_bind(addr)
        .await
        .unwrap();
    assert_eq!(session.peer_system_id(), "TESTSMSC");
    assert_eq!(session.state(), SessionState::BoundTrx);

    let message_id = session.submit_sm(sample_submit("447700900000")).await.unwrap();
    assert_eq!(message_id, "msg-0001");

    let smsc = server.await.unwrap();
    assert_eq!(smsc.state(), SessionState::BoundTrx);

    session.unbind_and_close().await.unwrap();
}

#[tokio::test]
async fn rejected_bind_surfaces_the_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut session = SmscSessionBuilder::new(MemorySmsc::new())
            .with_config(test_config())
            .accept(stream)
            .unwrap();
        let request = session.wait_for_bind().await.unwrap();
        assert_eq!(request.bind().system_id, "badguy");
        request.reject(CommandStatus::InvalidSystemId).await.unwrap();
        // Hold the session so the socket is not torn down before the
        // client reads the response
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(session);
    });

    let result = EsmeSession::builder(BindCredentials::transmitter("badguy", "secret"))
        .with_config(test_config())
        .connect_and_bind(addr)
        .await;
    match result {
        Err(SmppError::NegativeResponse(status)) => {
            assert_eq!(status, CommandStatus::InvalidSystemId)
        }
        other => panic!("expected negative bind response, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_requires_a_transmitter_session() {
    let (addr, _server) = spawn_smsc(MemorySmsc::new(), test_config()).await;

    let session = EsmeSession::builder(BindCredentials::receiver("esme01", "secret"))
        .with_config(test_config())
        .connect_and_bind(addr)
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::BoundRx);

    match session.submit_sm(sample_submit("447700900000")).await {
        Err(SmppError::ProtocolState { state, operation }) => {
            assert_eq!(state, SessionState::BoundRx);
            assert_eq!(operation, "submit_sm");
        }
        other => panic!("expected protocol state error, got {other:?}"),
    }

    session.close().await;
}

struct CapturingHandler {
    tx: mpsc::UnboundedSender<DeliverSm>,
}

#[async_trait]
impl DeliveryHandler for CapturingHandler {
    async fn on_deliver_sm(&self, deliver: DeliverSm) -> Result<(), ProcessRequestError> {
        self.tx.send(deliver).unwrap();
        Ok(())
    }
}

#[tokio::test]
async fn delivery_reaches_the_handler() {
    let (addr, server) = spawn_smsc(MemorySmsc::new(), test_config()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(test_config())
        .with_handler(Arc::new(CapturingHandler { tx }))
        .connect_and_bind(addr)
        .await
        .unwrap();

    let smsc = server.await.unwrap();
    let deliver = DeliverSm::builder()
        .source_addr("447700900000")
        .destination_addr("12345")
        .short_message("mobile originated")
        .build()
        .unwrap();
    smsc.deliver_sm(deliver).await.unwrap();

    let received = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.source_addr, "447700900000");

    session.close().await;
}

#[tokio::test]
async fn delivery_requires_a_receiver_session() {
    let (addr, server) = spawn_smsc(MemorySmsc::new(), test_config()).await;

    let session = EsmeSession::builder(BindCredentials::transmitter("esme01", "secret"))
        .with_config(test_config())
        .connect_and_bind(addr)
        .await
        .unwrap();

    let smsc = server.await.unwrap();
    let deliver = DeliverSm::builder()
        .source_addr("447700900000")
        .destination_addr("12345")
        .short_message("misdirected")
        .build()
        .unwrap();
    match smsc.deliver_sm(deliver).await {
        Err(SmppError::ProtocolState { state, operation }) => {
            assert_eq!(state, SessionState::BoundTx);
            assert_eq!(operation, "deliver_sm");
        }
        other => panic!("expected protocol state error, got {other:?}"),
    }

    session.close().await;
}

#[tokio::test]
async fn query_reports_message_state() {
    let (addr, _server) = spawn_smsc(MemorySmsc::new(), test_config()).await;

    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(test_config())
        .connect_and_bind(addr)
        .await
        .unwrap();

    let message_id = session.submit_sm(sample_submit("447700900000")).await.unwrap();

    let query = QuerySm::new(
        0,
        message_id.clone(),
        TypeOfNumber::Unknown,
        NumericPlanIndicator::Unknown,
        "12345",
    )
    .unwrap();
    let status = session.query_sm(query).await.unwrap();
    assert_eq!(status.message_id, message_id);
    assert_eq!(status.message_state, MessageState::Enroute);
    assert_eq!(status.final_date, None);

    // Unknown id comes back as a negative response, not a protocol failure
    let query = QuerySm::new(
        0,
        "no-such-id",
        TypeOfNumber::Unknown,
        NumericPlanIndicator::Unknown,
        "12345",
    )
    .unwrap();
    match session.query_sm(query).await {
        Err(SmppError::NegativeResponse(status)) => {
            assert_eq!(status, CommandStatus::InvalidMessageId)
        }
        other => panic!("expected negative response, got {other:?}"),
    }

    session.close().await;
}

#[tokio::test]
async fn concurrent_submits_resolve_independently() {
    let (addr, _server) = spawn_smsc(MemorySmsc::new(), test_config()).await;

    let session = Arc::new(
        EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
            .with_config(test_config())
            .connect_and_bind(addr)
            .await
            .unwrap(),
    );

    let mut tasks = Vec::new();
    for i in 0..8 {
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            session
                .submit_sm(sample_submit(&format!("4477009000{i:02}")))
                .await
                .unwrap()
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8, "every submit must get its own message_id");
}

#[tokio::test]
async fn enquire_link_works_in_both_directions() {
    let (addr, server) = spawn_smsc(MemorySmsc::new(), test_config()).await;

    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(test_config())
        .connect_and_bind(addr)
        .await
        .unwrap();
    let smsc = server.await.unwrap();

    session.enquire_link().await.unwrap();
    smsc.enquire_link().await.unwrap();

    session.close().await;
}

struct StateLog(Mutex<Vec<(SessionState, SessionState)>>);

impl SessionStateListener for StateLog {
    fn on_state_change(&self, new: SessionState, old: SessionState, _session: &SessionIdentity) {
        self.0.lock().unwrap().push((old, new));
    }
}

#[tokio::test]
async fn peer_unbind_drives_the_server_through_unbound() {
    let log = Arc::new(StateLog(Mutex::new(Vec::new())));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_log = Arc::clone(&log);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut session = SmscSessionBuilder::new(MemorySmsc::new())
            .with_config(test_config())
            .with_state_listener(server_log)
            .accept(stream)
            .unwrap();
        let request = session.wait_for_bind().await.unwrap();
        request.accept("TESTSMSC").await.unwrap();
        let _ = tx.send(session);
    });

    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(test_config())
        .connect_and_bind(addr)
        .await
        .unwrap();
    let _smsc = rx.await.unwrap();

    session.unbind_and_close().await.unwrap();

    // The server's reader observes unbind then the closed socket
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let transitions = log.0.lock().unwrap().clone();
        if transitions.contains(&(SessionState::BoundTrx, SessionState::Unbound))
            && transitions.last().map(|(_, new)| *new) == Some(SessionState::Closed)
        {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "server never reached Unbound then Closed: {transitions:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// A raw framed connection standing in for a peer the session API would
/// not let misbehave.
struct RawPeer {
    reader: smpp_session::connection::FrameReader,
    writer: smpp_session::connection::FrameWriter,
}

impl RawPeer {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = split(stream);
        Self { reader, writer }
    }

    async fn send(&mut self, pdu: Pdu) {
        self.writer.write_pdu(&pdu).await.unwrap();
    }

    async fn recv(&mut self) -> Pdu {
        timeout(Duration::from_secs(2), self.reader.read_pdu())
            .await
            .unwrap()
            .unwrap()
            .expect("peer closed the connection")
    }
}

#[tokio::test]
async fn submit_before_bind_is_rejected_with_bind_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, _rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let session = SmscSessionBuilder::new(MemorySmsc::new())
            .with_config(test_config())
            .accept(stream)
            .unwrap();
        let _ = tx.send(session);
    });

    let mut peer = RawPeer::connect(addr).await;
    let mut submit = sample_submit("447700900000");
    submit.sequence_number = 1;
    peer.send(Pdu::SubmitSm(Box::new(submit))).await;

    let response = peer.recv().await;
    match response {
        Pdu::SubmitSmResp(resp) => {
            assert_eq!(resp.sequence_number, 1);
            assert_eq!(resp.command_status, CommandStatus::IncorrectBindStatus);
        }
        other => panic!("expected submit_sm_resp, got {other:?}"),
    }
}

#[tokio::test]
async fn second_bind_is_rejected_as_already_bound() {
    let (addr, server) = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut session = SmscSessionBuilder::new(MemorySmsc::new())
                .with_config(test_config())
                .accept(stream)
                .unwrap();
            let request = session.wait_for_bind().await.unwrap();
            request.accept("TESTSMSC").await.unwrap();
            let _ = tx.send(session);
        });
        (addr, rx)
    };

    let mut peer = RawPeer::connect(addr).await;
    let mut bind = Bind::new(BindType::Transceiver, 1);
    bind.system_id = "esme01".to_string();
    bind.password = Some("secret".to_string());
    peer.send(Pdu::Bind(bind.clone())).await;

    match peer.recv().await {
        Pdu::BindResp(resp) => assert_eq!(resp.command_status, CommandStatus::Ok),
        other => panic!("expected bind_resp, got {other:?}"),
    }
    let _smsc = server.await.unwrap();

    bind.sequence_number = 2;
    peer.send(Pdu::Bind(bind)).await;
    match peer.recv().await {
        Pdu::BindResp(resp) => {
            assert_eq!(resp.sequence_number, 2);
            assert_eq!(resp.command_status, CommandStatus::AlreadyBound);
        }
        other => panic!("expected bind_resp, got {other:?}"),
    }
}

#[tokio::test]
async fn outbind_invites_the_esme_to_bind() {
    // The ESME listens; the SMSC dials out and sends outbind
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let builder = EsmeSession::builder(BindCredentials::receiver("esme01", "secret"))
            .with_config(test_config());
        let (outbind, outbound) = builder.accept_outbound(stream).await.unwrap();
        assert_eq!(outbind.system_id, "TESTSMSC");
        let session = outbound.bind().await.unwrap();
        let _ = tx.send(session);
    });

    let smsc_builder = SmscSessionBuilder::new(MemorySmsc::new()).with_config(test_config());
    let mut smsc = smsc_builder
        .connect_and_outbind(addr, "TESTSMSC", Some("secret".to_string()))
        .await
        .unwrap();

    let request = smsc.wait_for_bind().await.unwrap();
    assert_eq!(request.bind().system_id, "esme01");
    assert_eq!(request.bind().bind_type, BindType::Receiver);
    request.accept("TESTSMSC").await.unwrap();

    let esme = rx.await.unwrap();
    assert_eq!(esme.state(), SessionState::BoundRx);
    assert_eq!(smsc.state(), SessionState::BoundRx);

    // The reversed handshake ends in an ordinary session
    let deliver = DeliverSm::builder()
        .source_addr("447700900000")
        .destination_addr("12345")
        .short_message("via outbind")
        .build()
        .unwrap();
    smsc.deliver_sm(deliver).await.unwrap();

    esme.close().await;
}

#[tokio::test]
async fn requests_time_out_against_a_silent_peer() {
    // A raw peer that binds the session but never answers anything else
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = split(stream);
        while let Ok(Some(pdu)) = reader.read_pdu().await {
            if let Pdu::Bind(bind) = pdu {
                let resp = smpp_session::datatypes::BindResponse::new(
                    bind.bind_type,
                    bind.sequence_number,
                    "SILENT",
                );
                writer.write_pdu(&Pdu::BindResp(resp)).await.unwrap();
            }
            // Everything after the bind goes unanswered
        }
    });

    let config = test_config().with_transaction_timer(Duration::from_millis(200));
    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(config)
        .connect_and_bind(addr)
        .await
        .unwrap();

    match session.submit_sm(sample_submit("447700900000")).await {
        Err(SmppError::Timeout) => {}
        other => panic!("expected timeout, got {other:?}"),
    }

    // The session survives an individual transaction timeout
    assert_eq!(session.state(), SessionState::BoundTrx);
    session.close().await;
}

#[tokio::test]
async fn receiver_bound_server_rejects_submit_without_invoking_the_handler() {
    let handler = MemorySmsc::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_handler = Arc::clone(&handler);
    let (tx, _rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut session = SmscSessionBuilder::new(server_handler)
            .with_config(test_config())
            .accept(stream)
            .unwrap();
        let request = session.wait_for_bind().await.unwrap();
        request.accept("TESTSMSC").await.unwrap();
        let _ = tx.send(session);
    });

    let mut peer = RawPeer::connect(addr).await;
    let mut bind = Bind::new(BindType::Receiver, 1);
    bind.system_id = "esme01".to_string();
    bind.password = Some("secret".to_string());
    peer.send(Pdu::Bind(bind)).await;
    match peer.recv().await {
        Pdu::BindResp(resp) => assert_eq!(resp.command_status, CommandStatus::Ok),
        other => panic!("expected bind_resp, got {other:?}"),
    }

    let mut submit = sample_submit("447700900000");
    submit.sequence_number = 2;
    peer.send(Pdu::SubmitSm(Box::new(submit))).await;
    match peer.recv().await {
        Pdu::SubmitSmResp(resp) => {
            assert_eq!(resp.sequence_number, 2);
            assert_eq!(resp.command_status, CommandStatus::IncorrectBindStatus);
        }
        other => panic!("expected submit_sm_resp, got {other:?}"),
    }

    assert!(
        handler.store.lock().unwrap().is_empty(),
        "the submit callback must not run for an illegal request"
    );
}

#[tokio::test]
async fn peer_unbind_holds_even_when_the_socket_dies() {
    // The peer sends unbind and vanishes without reading unbind_resp; the
    // Unbound transition must still be recorded before the session closes
    let log = Arc::new(StateLog(Mutex::new(Vec::new())));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_log = Arc::clone(&log);
    let (tx, _rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut session = SmscSessionBuilder::new(MemorySmsc::new())
            .with_config(test_config())
            .with_state_listener(server_log)
            .accept(stream)
            .unwrap();
        let request = session.wait_for_bind().await.unwrap();
        request.accept("TESTSMSC").await.unwrap();
        let _ = tx.send(session);
    });

    let mut peer = RawPeer::connect(addr).await;
    let mut bind = Bind::new(BindType::Transceiver, 1);
    bind.system_id = "esme01".to_string();
    bind.password = Some("secret".to_string());
    peer.send(Pdu::Bind(bind)).await;
    match peer.recv().await {
        Pdu::BindResp(resp) => assert_eq!(resp.command_status, CommandStatus::Ok),
        other => panic!("expected bind_resp, got {other:?}"),
    }

    peer.send(Pdu::Unbind(Unbind::new(2))).await;
    drop(peer);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let transitions = log.0.lock().unwrap().clone();
        if transitions.last().map(|(_, new)| *new) == Some(SessionState::Closed) {
            assert!(
                transitions.contains(&(SessionState::BoundTrx, SessionState::Unbound)),
                "Unbound must be recorded even though the reply could not be read: {transitions:?}"
            );
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "server never closed: {transitions:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn unsolicited_responses_follow_the_nack_policy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, _rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let session = SmscSessionBuilder::new(MemorySmsc::new())
            .with_config(test_config())
            .accept(stream)
            .unwrap();
        let _ = tx.send(session);
    });

    let mut peer = RawPeer::connect(addr).await;

    // query_sm_resp with no matching request draws a generic_nack
    let resp = QuerySmResponse::new(99, "bogus", None, MessageState::Enroute, 0).unwrap();
    peer.send(Pdu::QuerySmResp(resp)).await;
    match peer.recv().await {
        Pdu::GenericNack(nack) => {
            assert_eq!(nack.sequence_number, 99);
            assert_eq!(
                nack.command_status,
                CommandStatus::InvalidPredefinedMessageId
            );
        }
        other => panic!("expected generic_nack, got {other:?}"),
    }

    // An unmatched submit_sm_resp is only logged; the enquire_link behind it
    // proves nothing else came back in between
    peer.send(Pdu::SubmitSmResp(SubmitSmResponse::new(100, "bogus-id")))
        .await;
    peer.send(Pdu::EnquireLink(EnquireLink::new(101))).await;
    match peer.recv().await {
        Pdu::EnquireLinkResp(resp) => assert_eq!(resp.sequence_number, 101),
        other => panic!("expected enquire_link_resp, got {other:?}"),
    }
}

#[tokio::test]
async fn idle_sessions_probe_with_enquire_link() {
    // A raw SMSC that answers the bind and then the first keepalive probe
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (probed_tx, probed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = split(stream);
        let mut probed_tx = Some(probed_tx);
        while let Ok(Some(pdu)) = reader.read_pdu().await {
            match pdu {
                Pdu::Bind(bind) => {
                    let resp = smpp_session::datatypes::BindResponse::new(
                        bind.bind_type,
                        bind.sequence_number,
                        "KEEPALIVE",
                    );
                    writer.write_pdu(&Pdu::BindResp(resp)).await.unwrap();
                }
                Pdu::EnquireLink(probe) => {
                    writer
                        .write_pdu(&Pdu::EnquireLinkResp(EnquireLinkResponse::new(
                            probe.sequence_number,
                        )))
                        .await
                        .unwrap();
                    if let Some(tx) = probed_tx.take() {
                        let _ = tx.send(());
                    }
                }
                other => panic!("unexpected PDU from an idle client: {other:?}"),
            }
        }
    });

    let config = test_config()
        .with_enquire_link_interval(Duration::from_millis(100))
        .with_keepalive_granularity(Duration::from_millis(50));
    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(config)
        .connect_and_bind(addr)
        .await
        .unwrap();

    timeout(Duration::from_secs(2), probed_rx)
        .await
        .expect("no enquire_link within the interval")
        .unwrap();

    // An answered probe leaves the session bound
    assert_eq!(session.state(), SessionState::BoundTrx);
    session.close().await;
}

#[tokio::test]
async fn unanswered_read_timeout_probe_closes_the_session() {
    // A raw SMSC that answers the bind and then goes silent for good
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (probed_tx, probed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = split(stream);
        let mut probed_tx = Some(probed_tx);
        while let Ok(Some(pdu)) = reader.read_pdu().await {
            match pdu {
                Pdu::Bind(bind) => {
                    let resp = smpp_session::datatypes::BindResponse::new(
                        bind.bind_type,
                        bind.sequence_number,
                        "SILENT",
                    );
                    writer.write_pdu(&Pdu::BindResp(resp)).await.unwrap();
                }
                Pdu::EnquireLink(_) => {
                    if let Some(tx) = probed_tx.take() {
                        let _ = tx.send(());
                    }
                    // The probe goes unanswered
                }
                _ => {}
            }
        }
    });

    // Read timeout well below the enquire-link interval so the reader's own
    // probe branch, not the keepalive loop, is the one that fires
    let config = test_config()
        .with_session_timer(Duration::from_millis(150))
        .with_enquire_link_interval(Duration::from_secs(60))
        .with_transaction_timer(Duration::from_millis(200));
    let session = EsmeSession::builder(BindCredentials::transceiver("esme01", "secret"))
        .with_config(config)
        .connect_and_bind(addr)
        .await
        .unwrap();

    timeout(Duration::from_secs(2), probed_rx)
        .await
        .expect("read timeout never triggered a probe")
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while session.state() != SessionState::Closed {
        assert!(
            tokio::time::Instant::now() < deadline,
            "unanswered probe must tear the session down, still {:?}",
            session.state()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
