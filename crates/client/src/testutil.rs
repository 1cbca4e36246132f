//! In-process servers and fakes shared by the client tests.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

use crate::config::TransferConfig;
use crate::events::EventBus;
use crate::identity::StaticIdentity;
use crate::saver::FileSaver;
use crate::session::CloseInfo;
use crate::TransferClient;

pub(crate) const TEST_USER_ID: u64 = 7;
pub(crate) const TEST_TOKEN: &str = "secrettoken123";

/// Serves one HTTP response and hands back the raw request head.
pub(crate) async fn serve_http_once(
    status: u16,
    body: &str,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();
    let body = body.to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());

        let response = format!(
            "HTTP/1.1 {status} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    });

    (format!("http://127.0.0.1:{port}/api/v1"), rx)
}

/// One step of a scripted WebSocket server.
#[derive(Debug, Clone)]
pub(crate) enum ServerAction {
    /// Wait for the next data message from the client and record it.
    Expect,
    /// Wait `Duration`; any data message arriving meanwhile is recorded
    /// and counted as unexpected.
    Quiet(Duration),
    SendText(String),
    SendBinary(Vec<u8>),
    Close(u16, String),
    /// Drop the connection without a close frame.
    Drop,
}

/// A data message received by the mock server.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Received {
    Text(String),
    Binary(Vec<u8>),
}

/// What the mock server observed.
#[derive(Debug, Default)]
pub(crate) struct ServerLog {
    pub uri: String,
    pub received: Vec<Received>,
    pub unexpected: usize,
    pub client_close: Option<CloseInfo>,
}

impl ServerLog {
    pub(crate) fn received_texts(&self) -> Vec<String> {
        self.received
            .iter()
            .filter_map(|r| match r {
                Received::Text(t) => Some(t.clone()),
                Received::Binary(_) => None,
            })
            .collect()
    }

    pub(crate) fn received_binaries(&self) -> Vec<Vec<u8>> {
        self.received
            .iter()
            .filter_map(|r| match r {
                Received::Binary(b) => Some(b.clone()),
                Received::Text(_) => None,
            })
            .collect()
    }
}

/// WebSocket server that accepts one connection and runs a script.
pub(crate) struct MockServer {
    port: u16,
    handle: tokio::task::JoinHandle<ServerLog>,
}

type Ws = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

enum Next {
    Data(Received),
    Closed(Option<CloseInfo>),
}

async fn next_data(ws: &mut Ws) -> Next {
    loop {
        match ws.next().await {
            Some(Ok(tungstenite::Message::Text(t))) => {
                return Next::Data(Received::Text(t.as_str().to_owned()));
            }
            Some(Ok(tungstenite::Message::Binary(b))) => {
                return Next::Data(Received::Binary(b.to_vec()));
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                return Next::Closed(frame.map(|f| CloseInfo {
                    code: u16::from(f.code),
                    reason: f.reason.as_str().to_owned(),
                }));
            }
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return Next::Closed(None),
        }
    }
}

impl MockServer {
    pub(crate) async fn start(script: Vec<ServerAction>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let mut log = ServerLog::default();
            let (stream, _) = listener.accept().await.unwrap();

            let uri = Arc::new(Mutex::new(String::new()));
            let captured = uri.clone();
            let mut ws = tokio_tungstenite::accept_hdr_async(
                stream,
                move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    *captured.lock().unwrap() = req.uri().to_string();
                    Ok(resp)
                },
            )
            .await
            .unwrap();
            log.uri = uri.lock().unwrap().clone();

            let mut closed = false;
            for action in script {
                match action {
                    ServerAction::Expect => match next_data(&mut ws).await {
                        Next::Data(d) => log.received.push(d),
                        Next::Closed(info) => {
                            log.client_close = info;
                            return log;
                        }
                    },
                    ServerAction::Quiet(d) => {
                        if let Ok(next) = tokio::time::timeout(d, next_data(&mut ws)).await {
                            match next {
                                Next::Data(data) => {
                                    log.unexpected += 1;
                                    log.received.push(data);
                                }
                                Next::Closed(info) => {
                                    log.client_close = info;
                                    return log;
                                }
                            }
                        }
                    }
                    ServerAction::SendText(t) => {
                        let _ = ws.send(tungstenite::Message::Text(t.into())).await;
                    }
                    ServerAction::SendBinary(b) => {
                        let _ = ws.send(tungstenite::Message::Binary(b.into())).await;
                    }
                    ServerAction::Close(code, reason) => {
                        let _ = ws
                            .close(Some(CloseFrame {
                                code: code.into(),
                                reason: reason.into(),
                            }))
                            .await;
                        closed = true;
                    }
                    ServerAction::Drop => return log,
                }
            }

            // Drain until the client goes away so its close is observed.
            let drain = async {
                loop {
                    match next_data(&mut ws).await {
                        Next::Data(d) => {
                            if !closed {
                                log.received.push(d);
                            }
                        }
                        Next::Closed(info) => {
                            log.client_close = info;
                            break;
                        }
                    }
                }
            };
            let _ = tokio::time::timeout(Duration::from_secs(5), drain).await;
            log
        });

        Self { port, handle }
    }

    /// URL of `path` on this server.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("ws://127.0.0.1:{}{path}", self.port)
    }

    /// WebSocket base URL, as configured in [`TransferConfig::ws_url`].
    pub(crate) fn ws_base(&self) -> String {
        self.url("/api/v1")
    }

    /// Waits for the script to finish and returns the log.
    pub(crate) async fn finish(self) -> ServerLog {
        self.handle.await.unwrap()
    }
}

/// Accepts TCP connections and drops them before the WebSocket handshake.
pub(crate) async fn refusing_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    format!("ws://127.0.0.1:{port}/api/v1")
}

/// A [`FileSaver`] that keeps files in memory.
#[derive(Default)]
pub(crate) struct MemorySaver {
    pub files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FileSaver for MemorySaver {
    fn save<'a>(
        &'a self,
        name: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn std::future::Future<Output = std::io::Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            self.files
                .lock()
                .unwrap()
                .push((name.to_string(), data.to_vec()));
            Ok(PathBuf::from("/memory").join(name))
        })
    }
}

/// Short timeouts so failing tests fail fast.
pub(crate) fn test_config(ws_base: &str) -> TransferConfig {
    TransferConfig {
        ws_url: ws_base.to_string(),
        connect_timeout: Duration::from_secs(5),
        ack_timeout: Duration::from_secs(5),
        fragment_timeout: Duration::from_secs(5),
        close_timeout: Duration::from_secs(5),
        ..TransferConfig::default()
    }
}

/// A client for user 7 backed by a [`MemorySaver`].
pub(crate) fn test_client(config: TransferConfig) -> (TransferClient, Arc<MemorySaver>) {
    let saver = Arc::new(MemorySaver::default());
    let client = TransferClient::new(
        config,
        Arc::new(StaticIdentity::new(TEST_USER_ID, TEST_TOKEN)),
        Arc::new(EventBus::new()),
        saver.clone(),
    );
    (client, saver)
}
