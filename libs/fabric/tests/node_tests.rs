use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tether::{Client, Error, Message, PeerConfig, Responder, Scope};
use tether_fabric::{
    codec::{BincodeCodec, Codec, JsonCodec},
    transport::{Address, FrameOptions, Transport},
    Ack, Endpoints, Node, NodeConfig,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn tcp_pair<C: Codec>(codec: C) -> (Node<C>, Node<C>) {
    nodes(Endpoints::default(), Endpoints::default(), codec).await
}

async fn nodes<C: Codec>(
    listen_a: Endpoints,
    listen_b: Endpoints,
    codec: C,
) -> (Node<C>, Node<C>) {
    let a = Node::bind(&listen_a, codec.clone()).await.unwrap();
    let b = Node::bind(&listen_b, codec).await.unwrap();
    let (a_local, b_local) = (a.local_endpoints().clone(), b.local_endpoints().clone());

    (
        a.start(b_local, PeerConfig::default()),
        b.start(a_local, PeerConfig::default()),
    )
}

fn socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tether_node_{}_{}.sock", name, std::process::id()))
}

fn serve_greet<C: Codec>(node: &Node<C>) {
    node.peer().register_with_responder(
        "greet",
        |_: Scope, message: Message, responder: Responder| async move {
            let name: String = serde_json::from_slice(&message.data)
                .map_err(|e| Error::Codec(e.to_string()))?;
            let reply = serde_json::to_vec(&format!("hello, {name}"))
                .map_err(|e| Error::Codec(e.to_string()))?;
            responder.respond(reply).await
        },
    );
}

#[tokio::test]
async fn greet_over_tcp_with_json() {
    init_tracing();
    let (a, b) = tcp_pair(JsonCodec).await;
    serve_greet(&b);

    let (mut responses, stop) = a
        .peer()
        .call_with_response(Message::new("t1", "greet", br#""a""#.to_vec()))
        .await
        .unwrap();

    let reply = timeout(Duration::from_secs(2), responses.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.id, "t1");
    assert_eq!(reply.kind, "greet");
    assert_eq!(reply.data, br#""hello, a""#.to_vec());

    stop.stop();
    assert!(responses.recv().await.is_none());

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn greet_over_unix_sockets() {
    let listen_a = Endpoints::new(
        Address::Unix(socket_path("a_req")),
        Address::Unix(socket_path("a_res")),
    );
    let listen_b = Endpoints::new(
        Address::Unix(socket_path("b_req")),
        Address::Unix(socket_path("b_res")),
    );
    let (a, b) = nodes(listen_a.clone(), listen_b, JsonCodec).await;
    assert_eq!(a.local_endpoints(), &listen_a);
    serve_greet(&b);

    let (mut responses, stop) = a
        .peer()
        .call_with_response(Message::new("u1", "greet", br#""unix""#.to_vec()))
        .await
        .unwrap();

    let reply = timeout(Duration::from_secs(2), responses.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.data, br#""hello, unix""#.to_vec());
    stop.stop();

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn deadline_cuts_a_count_short_over_bincode() {
    init_tracing();
    let (a, b) = tcp_pair(BincodeCodec).await;

    b.peer().register_with_responder(
        "count",
        |_: Scope, message: Message, responder: Responder| async move {
            let target = message.data.first().copied().unwrap_or(0);
            for n in 1..=target {
                sleep(Duration::from_millis(200)).await;
                responder.respond(vec![n]).await?;
            }
            Ok(())
        },
    );

    let (mut responses, _stop) = a
        .peer()
        .call_with_deadline(
            Message::new("c1", "count", vec![3]),
            Utc::now() + chrono::Duration::milliseconds(500),
        )
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Some(message) = responses.recv().await {
        seen.extend(message.data);
    }
    assert_eq!(seen, vec![1, 2]);

    sleep(Duration::from_millis(300)).await;
    assert!(a.peer().correlator().is_empty());

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn unknown_type_is_refused_by_the_remote() {
    let (a, b) = tcp_pair(JsonCodec).await;

    let err = a
        .peer()
        .call(Message::new("x1", "nobody-serves-this", Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CallFailed(reason) if reason.contains("nobody-serves-this")));

    let err = a
        .peer()
        .call_with_response(Message::new("x2", "nobody-serves-this", Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CallFailed(_)));
    assert!(a.peer().correlator().is_empty());

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn non_json_payload_never_leaves_a_json_node() {
    let (a, b) = tcp_pair(JsonCodec).await;
    serve_greet(&b);

    let err = a
        .peer()
        .call_with_response(Message::new("j1", "greet", b"plain text".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(a.peer().correlator().is_empty());

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn undecodable_frame_is_rejected() {
    let (a, b) = tcp_pair(JsonCodec).await;

    let mut transport = a
        .local_endpoints()
        .requests
        .connect(None, FrameOptions::default())
        .await
        .unwrap();
    transport.send(b"{ not an envelope").await.unwrap();
    let ack: Ack = JsonCodec.decode(&transport.receive().await.unwrap()).unwrap();
    assert!(matches!(ack, Ack::Rejected(_)));

    // The connection stays usable for further frames.
    transport
        .send(br#"{"id":"","type":"greet","data":null,"deadline":null}"#)
        .await
        .unwrap();
    let ack: Ack = JsonCodec.decode(&transport.receive().await.unwrap()).unwrap();
    assert!(matches!(ack, Ack::Rejected(reason) if reason.contains("id")));

    drop(transport);
    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn connection_dropped_mid_frame_does_not_stop_serving() {
    init_tracing();
    let (a, b) = tcp_pair(JsonCodec).await;
    serve_greet(&b);

    let Address::Tcp(requests) = b.local_endpoints().requests.clone() else {
        panic!("tcp endpoints expected");
    };
    let mut stream = tokio::net::TcpStream::connect(requests).await.unwrap();
    stream.write_u32(64).await.unwrap();
    stream.write_all(b"{\"id\"").await.unwrap();
    drop(stream);

    let (mut responses, stop) = a
        .peer()
        .call_with_response(Message::new("m1", "greet", br#""again""#.to_vec()))
        .await
        .unwrap();
    let reply = timeout(Duration::from_secs(2), responses.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.data, br#""hello, again""#.to_vec());
    stop.stop();

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn plain_handler_calls_back_across_nodes() {
    let (a, b) = tcp_pair(BincodeCodec).await;
    let (tx, mut said) = mpsc::unbounded_channel();

    a.peer()
        .register("say", move |_: Scope, message: Message, _: Client| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message.data);
                Ok::<(), Error>(())
            }
        });
    b.peer()
        .register("relay", |_: Scope, message: Message, client: Client| async move {
            client
                .call(Message::new(format!("{}-echo", message.id), "say", message.data))
                .await
        });

    a.peer()
        .call(Message::new("r1", "relay", vec![0xde, 0xad]))
        .await
        .unwrap();

    let echoed = timeout(Duration::from_secs(2), said.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, vec![0xde, 0xad]);

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn node_starts_from_config() {
    let b = Node::bind(&Endpoints::default(), JsonCodec).await.unwrap();
    let b_local = b.local_endpoints().clone();

    let config = NodeConfig::new(Endpoints::default(), b_local)
        .connect_timeout(Duration::from_secs(1))
        .io_timeout(Duration::from_secs(1))
        .peer(PeerConfig::new().subscription_capacity(4));
    let a = Node::start(config, JsonCodec).await.unwrap();
    let b = b.start(a.local_endpoints().clone(), PeerConfig::default());
    serve_greet(&b);

    let (mut responses, stop) = a
        .peer()
        .call_with_response(Message::new("cfg1", "greet", br#""config""#.to_vec()))
        .await
        .unwrap();
    let reply = timeout(Duration::from_secs(2), responses.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.data, br#""hello, config""#.to_vec());
    stop.stop();

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn calls_fail_once_the_remote_has_shut_down() {
    let (a, b) = tcp_pair(JsonCodec).await;
    serve_greet(&b);
    b.shutdown().await;

    let err = a
        .peer()
        .call(Message::new("s1", "greet", br#""late""#.to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));

    a.shutdown().await;
}

#[test]
fn node_config_reads_from_json() {
    let config: NodeConfig = serde_json::from_str(
        r#"{
            "listen": {"requests": "tcp://127.0.0.1:7001", "responses": "unix:///tmp/a.sock"},
            "remote": {"requests": "127.0.0.1:7002", "responses": "tcp://127.0.0.1:7003"},
            "peer": {"subscription_capacity": 32}
        }"#,
    )
    .unwrap();

    assert_eq!(
        config.listen.responses,
        Address::Unix(PathBuf::from("/tmp/a.sock"))
    );
    assert_eq!(
        config.remote.requests,
        Address::Tcp("127.0.0.1:7002".parse().unwrap())
    );
    assert_eq!(config.peer.subscription_capacity, 32);
    assert_eq!(config.peer.response_buffer, 1);
    assert_eq!(config.max_frame_len, 100 * 1024 * 1024);
    assert_eq!(config.connect_timeout, None);
}
