//! Full server over real TCP/WebSocket connections.

use std::net::SocketAddr;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chat_room::{server, ChatRoom, Message, ServerConfig};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (SocketAddr, ChatRoom) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (chat, _room_task) = ChatRoom::start(&ServerConfig::default());

    let serving = chat.clone();
    tokio::spawn(server::serve(listener, serving, std::future::pending()));
    (addr, chat)
}

async fn connect(addr: SocketAddr, cookie: Option<&str>) -> Result<Socket, tokio_tungstenite::tungstenite::Error> {
    let mut request = format!("ws://{}/room", addr).into_client_request().unwrap();
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
    }
    connect_async(request).await.map(|(ws, _)| ws)
}

fn auth_cookie(user_json: &str) -> String {
    format!("auth={}", general_purpose::STANDARD.encode(user_json))
}

async fn wait_for_members(chat: &ChatRoom, count: usize) {
    for _ in 0..100 {
        if chat.room().members().await.unwrap().len() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("room never reached {} members", count);
}

async fn next_message(ws: &mut Socket) -> Message {
    loop {
        match ws.next().await.unwrap().unwrap() {
            WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_broadcast_over_websocket() {
    let (addr, chat) = start_server().await;

    let alice_cookie = auth_cookie(r#"{"name":"Alice","avatar_url":"http://a/alice.png"}"#);
    let mut alice = connect(addr, Some(&alice_cookie)).await.unwrap();
    let mut bob = connect(addr, Some(&auth_cookie(r#"{"name":"Bob"}"#)))
        .await
        .unwrap();
    wait_for_members(&chat, 2).await;

    alice
        .send(WsMessage::Text(r#"{"message":"hello"}"#.to_string().into()))
        .await
        .unwrap();

    let at_bob = next_message(&mut bob).await;
    assert_eq!(at_bob.name, "Alice");
    assert_eq!(at_bob.message, "hello");
    assert_eq!(at_bob.avatar_url, "http://a/alice.png");

    // Default policy echoes to the sender too
    let at_alice = next_message(&mut alice).await;
    assert_eq!(at_alice.message, "hello");

    bob.close(None).await.unwrap();
    wait_for_members(&chat, 1).await;
}

#[tokio::test]
async fn test_missing_cookie_is_rejected() {
    let (addr, chat) = start_server().await;

    assert!(connect(addr, None).await.is_err());
    assert!(connect(addr, Some("auth=not-base64!")).await.is_err());

    // The room keeps working for everyone else
    let _carol = connect(addr, Some(&auth_cookie(r#"{"name":"Carol"}"#)))
        .await
        .unwrap();
    wait_for_members(&chat, 1).await;
}

#[tokio::test]
async fn test_malformed_frame_disconnects_client() {
    let (addr, chat) = start_server().await;

    let mut dave = connect(addr, Some(&auth_cookie(r#"{"name":"Dave"}"#)))
        .await
        .unwrap();
    wait_for_members(&chat, 1).await;

    dave.send(WsMessage::Text("not json".to_string().into()))
        .await
        .unwrap();

    wait_for_members(&chat, 0).await;
}
