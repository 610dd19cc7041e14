//! Integration tests for the bot's HTTP surface: liveness routes plus
//! the Telegram webhook route, served together the way `main` wires
//! them.

use std::time::Duration;

use futures::StreamExt;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::time::timeout;

use docferry::channels::{Channel, TelegramChannel, UpdateMode};
use docferry::health::health_routes;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN: &str = "123456:TEST_TOKEN";

/// Serve health routes merged with the channel's webhook route, the
/// same composition `main` builds.
async fn spawn_bot_server(channel: &TelegramChannel) -> u16 {
    let app = health_routes().merge(channel.router());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

fn make_channel() -> TelegramChannel {
    // Polling mode so `start` does not try to register a webhook; the
    // webhook route itself works regardless of mode.
    TelegramChannel::new(SecretString::from(TOKEN), UpdateMode::Polling)
}

fn text_update(update_id: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": 1,
            "text": text,
            "chat": {"id": 555, "type": "private"},
            "from": {"id": 42, "username": "ada", "first_name": "Ada"},
        },
    })
}

#[tokio::test]
async fn health_routes_serve_alongside_webhook() {
    timeout(TEST_TIMEOUT, async {
        let channel = make_channel();
        let port = spawn_bot_server(&channel).await;

        for path in ["/", "/health"] {
            let resp = reqwest::get(format!("http://127.0.0.1:{port}{path}"))
                .await
                .unwrap();
            assert_eq!(resp.status().as_u16(), 200);
            assert_eq!(resp.text().await.unwrap(), "OK");
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn webhook_update_reaches_message_stream() {
    timeout(TEST_TIMEOUT, async {
        let channel = make_channel();
        let port = spawn_bot_server(&channel).await;

        let resp = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{port}/{TOKEN}"))
            .json(&text_update(1, "https://scribd.com/document/99/report"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        let mut stream = channel.start().await.unwrap();
        let msg = stream.next().await.unwrap();
        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.text, "https://scribd.com/document/99/report");
        assert_eq!(msg.chat_id(), Some("555"));
        assert_eq!(msg.sender, "42");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn textless_update_is_acknowledged_but_not_streamed() {
    timeout(TEST_TIMEOUT, async {
        let channel = make_channel();
        let port = spawn_bot_server(&channel).await;
        let client = reqwest::Client::new();

        // Sticker-style update without text. Telegram redelivers on any
        // non-200, so the route must still acknowledge it.
        let resp = client
            .post(format!("http://127.0.0.1:{port}/{TOKEN}"))
            .json(&serde_json::json!({
                "update_id": 2,
                "message": {
                    "message_id": 3,
                    "chat": {"id": 555, "type": "private"},
                    "sticker": {"file_id": "abc"},
                },
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        client
            .post(format!("http://127.0.0.1:{port}/{TOKEN}"))
            .json(&text_update(3, "/start"))
            .send()
            .await
            .unwrap();

        let mut stream = channel.start().await.unwrap();
        let msg = stream.next().await.unwrap();
        assert_eq!(msg.text, "/start");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_route_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let channel = make_channel();
        let port = spawn_bot_server(&channel).await;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/wrong-token"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);
    })
    .await
    .expect("test timed out");
}
