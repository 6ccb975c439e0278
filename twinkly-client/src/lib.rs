//! # Twinkly Client
//!
//! `twinkly-client` is an async client for Twinkly LED controllers. It performs the
//! device's challenge-response login, holds the resulting token, and exposes the
//! operations that need it: reading and setting the LED mode and brightness,
//! turning the lights on and off, and fetching device information.
//!
//! Each [`DeviceSession`] talks to exactly one device over plain HTTP with JSON
//! bodies, rooted at `http://<device>/xled/v1/`.
//!
//! ## Example
//!
//! ```no_run
//! use twinkly_client::DeviceSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = DeviceSession::new("192.168.1.100")?;
//!     session.authenticate().await?;
//!
//!     if !session.is_on().await? {
//!         session.turn_on().await?;
//!     }
//!     session.set_brightness(40).await?;
//!     println!("Brightness: {}", session.get_brightness().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Disclaimer
//!
//! This project is not affiliated with, authorized by, endorsed by, or in any way officially connected
//! with Twinkly or its affiliates. The official Twinkly website can be found at [https://www.twinkly.com](https://www.twinkly.com).
//!
//! ## License
//!
//! This project is dual-licensed under the MIT License and the Apache License, Version 2.0.
//! You may choose to use either license, depending on your project needs.

// The `session` module holds the device session: the login/verify handshake,
// the token it yields, and every operation that requires that token.
pub mod session;

pub mod error;

// Device reply envelopes and the response codes they carry.
pub mod response;

pub mod types;

// Helpers for the handshake: challenge generation and the device's
// expected challenge-response.
pub mod util;

pub use error::{Error, HandshakeStage, Result};
pub use response::ResponseCode;
pub use session::{DeviceSession, SessionOptions, SessionState, SessionStatus};
pub use types::{AuthToken, Brightness, DeviceAddress, Mode};
pub use util::auth::{ChallengeSource, ThreadRngChallengeSource};
