//! Shared fixtures for tests that drive a session against a mock device.
#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use twinkly_client::{ChallengeSource, DeviceSession, SessionOptions};

pub const TOKEN: &str = "iF8gdkZuxyPDXK8dU6C9DA==";
pub const CHALLENGE_RESPONSE: &str = "d0e7ba4ed1f83ac2ba10b4cdef8b4a6e9a5d2c3b";

pub const LOGIN_PATH: &str = "/xled/v1/login";
pub const VERIFY_PATH: &str = "/xled/v1/verify";
pub const MODE_PATH: &str = "/xled/v1/led/mode";
pub const GESTALT_PATH: &str = "/xled/v1/gestalt";
pub const BRIGHTNESS_PATH: &str = "/xled/v1/led/out/brightness";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A challenge source that always yields `byte` repeated.
pub fn fixed_challenge(byte: u8) -> impl ChallengeSource {
    move |buf: &mut [u8]| buf.fill(byte)
}

pub fn challenge_b64(byte: u8) -> String {
    STANDARD.encode([byte; 32])
}

pub fn login_body(token: &str, challenge_response: &str) -> String {
    json!({
        "authentication_token": token,
        "authentication_token_expires_in": 14400,
        "challenge-response": challenge_response,
        "code": 1000
    })
    .to_string()
}

pub async fn mock_json(
    server: &mut ServerGuard,
    method: &str,
    path: &str,
    status: usize,
    body: Value,
) -> Mock {
    server
        .mock(method, path)
        .match_header("X-Auth-Token", TOKEN)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

pub async fn mock_login(server: &mut ServerGuard, token: &str, challenge_response: &str) -> Mock {
    server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(login_body(token, challenge_response))
        .create_async()
        .await
}

pub async fn mock_verify(
    server: &mut ServerGuard,
    token: &str,
    challenge_response: &str,
    status: usize,
) -> Mock {
    server
        .mock("POST", VERIFY_PATH)
        .match_header("X-Auth-Token", token)
        .match_body(Matcher::Json(json!({ "challenge-response": challenge_response })))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(json!({ "code": 1000 }).to_string())
        .create_async()
        .await
}

/// A session that went through a successful handshake and holds [`TOKEN`].
pub async fn authenticated_session(server: &mut ServerGuard) -> anyhow::Result<DeviceSession> {
    init_logger();
    let login = mock_login(server, TOKEN, CHALLENGE_RESPONSE).await;
    let verify = mock_verify(server, TOKEN, CHALLENGE_RESPONSE, 200).await;

    let options = SessionOptions::default().with_challenge_source(fixed_challenge(0x42));
    let session = DeviceSession::with_options(server.host_with_port(), options)?;
    session.authenticate().await?;

    login.assert_async().await;
    verify.assert_async().await;
    Ok(session)
}

/// Accepts connections and never answers.
pub async fn silent_device() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    Ok(address)
}

/**
A device whose `login` never answers, while `GET led/mode` keeps working for
requests carrying `token` (anything else gets a 401).
 */
pub async fn stalled_login_device(token: &'static str) -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_stalled_login(socket, token));
        }
    });
    Ok(address)
}

async fn serve_stalled_login(mut socket: TcpStream, token: &'static str) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let read = socket.read(&mut buf).await?;
        if read == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..read]);
    }
    let head = String::from_utf8_lossy(&head).to_lowercase();

    if head.starts_with("post /xled/v1/login") {
        std::future::pending::<()>().await;
    }

    let authorized = head.contains(&format!("x-auth-token: {}", token.to_lowercase()));
    let (status, body) = if head.starts_with("get /xled/v1/led/mode") && authorized {
        ("200 OK", json!({ "mode": "movie", "code": 1000 }).to_string())
    } else {
        ("401 Unauthorized", String::new())
    };
    let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
