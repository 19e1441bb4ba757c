use crate::broker::TopicRegistry;
use crate::config::Settings;
use crate::transport::websocket::serve;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(settings: Settings) -> (String, Arc<TopicRegistry>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("local_addr");
    let registry = Arc::new(TopicRegistry::default());

    tokio::spawn(serve(listener, registry.clone(), settings));

    (format!("ws://{addr}/ws"), registry)
}

async fn open(url: &str) -> Ws {
    let (ws, _) = connect_async(url)
        .await
        .expect("WebSocket handshake failed");
    ws
}

async fn send(ws: &mut Ws, function: &str, parameters: Value) {
    let request = json!({ "function": function, "parameters": parameters });
    ws.send(WsMessage::text(request.to_string()))
        .await
        .expect("Failed to send request");
}

async fn recv(ws: &mut Ws) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Did not receive response")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(text.as_str())
                .unwrap_or_else(|e| panic!("Failed to parse '{}': {e}", text.as_str()));
        }
    }
}

async fn call(ws: &mut Ws, function: &str, parameters: Value) -> Value {
    send(ws, function, parameters).await;
    recv(ws).await
}

/// Publish and split the publisher's response from its own update push,
/// which may arrive in either order.
async fn publish(ws: &mut Ws, topic: &str, message: &str) -> (Value, Value) {
    send(ws, "PUBLISH_TOPIC", json!({ "name": topic, "message": message })).await;
    let first = recv(ws).await;
    let second = recv(ws).await;
    if first["function"] == "UPDATE_TOPIC" {
        (second, first)
    } else {
        (first, second)
    }
}

async fn assert_silent(ws: &mut Ws) {
    let res = timeout(Duration::from_millis(200), ws.next()).await;
    assert!(res.is_err(), "unexpected frame: {res:?}");
}

#[tokio::test]
async fn test_single_client_lifecycle() {
    let (url, _registry) = start_server(Settings::default()).await;
    let mut a = open(&url).await;

    let sub = call(&mut a, "SUBSCRIBE_TOPIC", json!({ "name": "news" })).await;
    assert_eq!(
        sub,
        json!({ "status": "success", "function": "SUBSCRIBE_TOPIC", "data": { "topic": "news" }, "error": "" })
    );

    let list = call(&mut a, "LIST_TOPICS", json!({})).await;
    assert_eq!(list["data"], json!({ "topic_list": ["news"] }));

    let (response, update) = publish(&mut a, "news", "hi").await;
    assert_eq!(response["status"], "success");
    assert_eq!(response["data"], json!({ "topic": "news", "message": "hi" }));
    assert_eq!(update["function"], "UPDATE_TOPIC");
    assert_eq!(update["data"]["name"], "news");
    assert_eq!(update["data"]["message"], "hi");

    let status = call(&mut a, "GET_TOPIC_STATUS", json!({ "name": "news" })).await;
    assert_eq!(status["data"]["topic_status"], "subscribed");
    assert_eq!(status["data"]["subscribers"], 1);
    assert_eq!(status["data"]["last_update"], update["data"]["timestamp"]);

    let unsub = call(&mut a, "UNSUBSCRIBE_TOPIC", json!({ "name": "news" })).await;
    assert_eq!(unsub["status"], "success");

    let list = call(&mut a, "LIST_TOPICS", json!({})).await;
    assert_eq!(list["data"], json!({ "topic_list": [] }));

    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_publish_fans_out_to_topic_members_only() {
    let (url, _registry) = start_server(Settings::default()).await;
    let mut b = open(&url).await;
    let mut c = open(&url).await;
    let mut d = open(&url).await;

    call(&mut b, "SUBSCRIBE_TOPIC", json!({ "name": "t" })).await;
    call(&mut c, "SUBSCRIBE_TOPIC", json!({ "name": "t" })).await;
    call(&mut d, "SUBSCRIBE_TOPIC", json!({ "name": "elsewhere" })).await;

    let (response, own_update) = publish(&mut b, "t", "x").await;
    assert_eq!(response["function"], "PUBLISH_TOPIC");
    assert_eq!(own_update["data"]["message"], "x");

    let update = recv(&mut c).await;
    assert_eq!(update["function"], "UPDATE_TOPIC");
    assert_eq!(update["data"]["message"], "x");
    assert_eq!(update["data"]["timestamp"], own_update["data"]["timestamp"]);

    assert_silent(&mut b).await;
    assert_silent(&mut c).await;
    assert_silent(&mut d).await;
}

#[tokio::test]
async fn test_bad_requests_keep_connection_open() {
    let (url, _registry) = start_server(Settings::default()).await;
    let mut a = open(&url).await;

    a.send(WsMessage::text("definitely not json")).await.unwrap();
    assert_eq!(
        recv(&mut a).await,
        json!({ "status": "failure", "error": "could not interpret request" })
    );

    a.send(WsMessage::binary(vec![1u8, 2, 3])).await.unwrap();
    assert_eq!(recv(&mut a).await["error"], "could not interpret request");

    let publish = call(&mut a, "PUBLISH_TOPIC", json!({ "name": "nope", "message": "m" })).await;
    assert_eq!(publish["error"], "topic does not exist");

    let list = call(&mut a, "LIST_TOPICS", json!({})).await;
    assert_eq!(list["status"], "success");
}

#[tokio::test]
async fn test_disconnect_removes_subscriptions() {
    let (url, registry) = start_server(Settings::default()).await;
    let mut a = open(&url).await;
    let mut b = open(&url).await;

    call(&mut a, "SUBSCRIBE_TOPIC", json!({ "name": "shared" })).await;
    call(&mut b, "SUBSCRIBE_TOPIC", json!({ "name": "shared" })).await;
    call(&mut b, "SUBSCRIBE_TOPIC", json!({ "name": "ghost" })).await;

    b.close(None).await.expect("Failed to close WebSocket");
    drop(b);

    let mut cleaned = false;
    for _ in 0..40 {
        if registry.list() == vec!["shared".to_string()] {
            cleaned = true;
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert!(cleaned, "topics after disconnect: {:?}", registry.list());

    let status = call(&mut a, "GET_TOPIC_STATUS", json!({ "name": "shared" })).await;
    assert_eq!(status["data"]["subscribers"], 1);
}

#[tokio::test]
async fn test_connection_limit_refuses_extra_clients() {
    let mut settings = Settings::default();
    settings.server.max_connections = 1;
    let (url, _registry) = start_server(settings).await;

    let mut first = open(&url).await;
    assert!(connect_async(url.as_str()).await.is_err());

    let list = call(&mut first, "LIST_TOPICS", json!({})).await;
    assert_eq!(list["status"], "success");
}
