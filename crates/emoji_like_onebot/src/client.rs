use anyhow::{Context, Result};
use async_trait::async_trait;
use emoji_like_core::{EmojiId, MessageEvent, ReactionHost};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::event::{Action, OneBotEvent, OneBotResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Forward-WebSocket connection to a OneBot v11 implementation (NapCat, LLOneBot).
///
/// Actions are queued onto the socket task and not correlated with their
/// responses; failed responses are only logged.
#[derive(Clone)]
pub struct OneBotClient {
    tx: mpsc::Sender<String>, // Channel to send outgoing frames to the WS task
}

impl OneBotClient {
    pub fn connect(
        url: &str,
        access_token: Option<String>,
    ) -> Result<(Self, mpsc::Receiver<MessageEvent>)> {
        let ws_url = Url::parse(url).context("Invalid OneBot WS URL")?;
        // Fail fast on a token that cannot be put in a header.
        build_request(&ws_url, access_token.as_deref())?;

        let (tx, mut rx) = mpsc::channel::<String>(64);
        let (event_tx, event_rx) = mpsc::channel::<MessageEvent>(64);

        tokio::spawn(async move {
            let mut retry_count = 0;
            loop {
                tracing::info!("Connecting to OneBot at {}...", ws_url);
                let request = match build_request(&ws_url, access_token.as_deref()) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::error!("Cannot build OneBot request: {:#}", e);
                        return;
                    }
                };
                match connect_async(request).await {
                    Ok((ws_stream, _)) => {
                        tracing::info!("Connected to OneBot");
                        retry_count = 0;
                        if let Err(e) = Self::handle_connection(ws_stream, &mut rx, &event_tx).await {
                            tracing::error!("OneBot connection error: {:#}", e);
                        }
                        if event_tx.is_closed() {
                            tracing::info!("Event receiver dropped, stopping OneBot task");
                            return;
                        }
                    }
                    Err(e) => {
                        let wait_secs = 5u64.min(2u64.pow(retry_count));
                        tracing::error!("Failed to connect to OneBot: {}. Retrying in {}s...", e, wait_secs);
                        tokio::time::sleep(tokio::time::Duration::from_secs(wait_secs)).await;
                        if retry_count < 6 {
                            retry_count += 1;
                        }
                        continue;
                    }
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            }
        });

        Ok((Self { tx }, event_rx))
    }

    async fn handle_connection(
        stream: WsStream,
        rx: &mut mpsc::Receiver<String>,
        event_tx: &mpsc::Sender<MessageEvent>,
    ) -> Result<()> {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                incoming = read.next() => {
                    let Some(msg) = incoming else {
                        anyhow::bail!("OneBot closed the connection");
                    };
                    match msg? {
                        Message::Text(text) => {
                            if let Some(event) = decode_frame(&text) {
                                if event_tx.send(event).await.is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        Message::Close(frame) => {
                            anyhow::bail!("OneBot sent close frame: {:?}", frame);
                        }
                        _ => {}
                    }
                }

                outgoing = rx.recv() => {
                    let Some(payload) = outgoing else {
                        // Every client handle dropped.
                        return Ok(());
                    };
                    write.send(Message::Text(payload)).await?;
                }
            }
        }
    }

    pub async fn send_action(&self, action: &Action) -> Result<()> {
        let json = serde_json::to_string(action)?;
        tracing::debug!(action = action.action, "Queueing OneBot action");
        self.tx
            .send(json)
            .await
            .map_err(|_| anyhow::anyhow!("WS task dropped"))?;
        Ok(())
    }
}

#[async_trait]
impl ReactionHost for OneBotClient {
    async fn set_reaction(&self, message_id: &str, emoji: EmojiId, enabled: bool) -> Result<()> {
        self.send_action(&Action::set_msg_emoji_like(message_id, emoji, enabled))
            .await
    }

    async fn reply(&self, event: &MessageEvent, text: &str) -> Result<()> {
        let action = match event.group_id {
            Some(group_id) => Action::send_group_msg(group_id, text),
            None => {
                let user_id: i64 = event
                    .sender_id
                    .parse()
                    .with_context(|| format!("Non-numeric QQ user id: {}", event.sender_id))?;
                Action::send_private_msg(user_id, text)
            }
        };
        self.send_action(&action).await
    }
}

fn build_request(url: &Url, access_token: Option<&str>) -> Result<Request> {
    let mut request = url.as_str().into_client_request()?;
    if let Some(token) = access_token.filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Access token is not a valid header value")?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Decode one text frame. Returns the message event, if it is one.
fn decode_frame(text: &str) -> Option<MessageEvent> {
    match serde_json::from_str::<OneBotEvent>(text) {
        Ok(OneBotEvent::Message(msg)) => Some(msg.into_core()),
        Ok(_) => None,
        Err(_) => {
            match serde_json::from_str::<OneBotResponse>(text) {
                Ok(resp) if !resp.is_ok() => {
                    tracing::warn!(
                        retcode = resp.retcode,
                        "OneBot action failed: {} {}",
                        resp.message,
                        resp.wording
                    );
                }
                Ok(_) => {}
                Err(_) => tracing::debug!("Ignored unparseable OneBot frame"),
            }
            None
        }
    }
}
