use std::sync::{PoisonError, RwLock};

use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Error, HandshakeStage, Result};
use crate::response::{
    BrightnessRequest, BrightnessResponse, LoginRequest, LoginResponse, ModeRequest,
    ModeResponse, ResponseCode, VerifyRequest,
};
use crate::types::{AuthToken, Brightness, DeviceAddress, Mode};
use crate::util::auth::{Auth, Challenge};

pub mod options;

pub use options::SessionOptions;

const AUTH_HEADER: &str = "X-Auth-Token";

const LOGIN: &str = "login";
const VERIFY: &str = "verify";
const MODE: &str = "led/mode";
const GESTALT: &str = "gestalt";
const BRIGHTNESS: &str = "led/out/brightness";

/// Credential held by a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(AuthToken),
}

/// Observable progress of a session. `Authenticating` is only reported while
/// a handshake runs and no token is held yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/**
A session with one Twinkly device.

Construct it, call [`authenticate`](Self::authenticate), then use the
authorized operations. Those fail fast with [`Error::AuthRequired`] while no
token is held, and with [`Error::TokenExpired`] when the device stops
accepting the token, which also drops it from the session.

Authorized operations take `&self` and may run concurrently, including while a
re-authentication is in flight. Handshakes are serialised internally: a second
`authenticate` waits for the first to finish.
 */
#[derive(Debug)]
pub struct DeviceSession {
    address: DeviceAddress,
    client: Client,
    options: SessionOptions,
    state: RwLock<SessionState>,
    handshake: Mutex<()>,
}

impl DeviceSession {
    pub fn new(address: impl Into<DeviceAddress>) -> Result<Self> {
        Self::with_options(address, SessionOptions::default())
    }

    pub fn with_options(address: impl Into<DeviceAddress>, options: SessionOptions) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(DeviceSession {
            address: address.into(),
            client: builder.build()?,
            options,
            state: RwLock::new(SessionState::Unauthenticated),
            handshake: Mutex::new(()),
        })
    }

    /**
    Starts the session with a token obtained elsewhere, skipping the handshake.
    If the device does not accept it, operations fail with [`Error::TokenExpired`].
     */
    pub fn with_auth_token(self, auth_token: impl Into<String>) -> Self {
        self.commit(AuthToken::new(auth_token));
        self
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_authenticated() {
            SessionStatus::Authenticated
        } else if self.handshake.try_lock().is_err() {
            SessionStatus::Authenticating
        } else {
            SessionStatus::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Authenticated(_))
    }

    pub fn auth_token(&self) -> Option<AuthToken> {
        match self.state() {
            SessionState::Authenticated(token) => Some(token),
            SessionState::Unauthenticated => None,
        }
    }

    /**
    Runs the login/verify handshake with a fresh challenge.

    The new token replaces the held one only once the device has verified it.
    Until then, concurrent operations keep using the current token, and a
    failed or dropped handshake leaves the session as it was.
     */
    pub async fn authenticate(&self) -> Result<()> {
        let _handshake = self.handshake.lock().await;

        let challenge = Challenge::generate(self.options.challenge_source.as_ref());
        let expected_response = match &self.options.hardware_address {
            Some(mac) => Some(Auth::make_challenge_response(challenge.as_bytes(), mac)?),
            None => None,
        };

        let (challenge_response, token) = self.send_challenge(&challenge).await?;
        drop(challenge);

        if let Some(expected) = expected_response {
            if !expected.eq_ignore_ascii_case(&challenge_response) {
                warn!("Device at {} answered the challenge incorrectly", self.address);
                return Err(Error::rejected(
                    HandshakeStage::Login,
                    "challenge-response does not match the device's hardware address",
                ));
            }
        }

        self.send_verify(&token, &challenge_response).await?;
        self.commit(token);
        info!("Authenticated with {}", self.address);
        Ok(())
    }

    /// Like [`authenticate`](Self::authenticate), reporting only success.
    pub async fn reauthenticate(&self) -> bool {
        match self.authenticate().await {
            Ok(()) => true,
            Err(err) => {
                warn!("Re-authentication with {} failed: {}", self.address, err);
                false
            }
        }
    }

    async fn send_challenge(&self, challenge: &Challenge) -> Result<(String, AuthToken)> {
        let url = self.address.endpoint(LOGIN);
        debug!("Sending authentication challenge to {}", url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                challenge: challenge.to_base64(),
            })
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!("Login at {} failed with status: {}", self.address, response.status());
            return Err(Error::rejected(
                HandshakeStage::Login,
                format!("status {}", response.status()),
            ));
        }

        let content = response.text().await?;
        let login: LoginResponse = serde_json::from_str(&content)?;
        if login.code.is_error() {
            warn!("Login at {} failed with code: {}", self.address, login.code.code());
            return Err(Error::rejected(
                HandshakeStage::Login,
                format!("code {} ({})", login.code.code(), login.code.message()),
            ));
        }

        let challenge_response = login
            .challenge_response
            .ok_or_else(|| Error::Decode("login response has no challenge-response".into()))?;
        let token = login
            .authentication_token
            .ok_or_else(|| Error::Decode("login response has no authentication_token".into()))?;
        if let Some(expires_in) = login.authentication_token_expires_in {
            debug!("Device reports token lifetime of {}", expires_in);
        }
        Ok((challenge_response, AuthToken::new(token)))
    }

    async fn send_verify(&self, token: &AuthToken, challenge_response: &str) -> Result<()> {
        let url = self.address.endpoint(VERIFY);
        debug!("Sending verification to {}", url);
        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, token.as_str())
            .json(&VerifyRequest { challenge_response })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => {
                warn!("Verification at {} failed with status: {}", self.address, status);
                Err(Error::rejected(
                    HandshakeStage::Verify,
                    format!("status {}", status),
                ))
            }
        }
    }

    fn commit(&self, token: AuthToken) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            SessionState::Authenticated(token);
    }

    /// Drops `rejected` unless a newer handshake already replaced it.
    fn expire(&self, rejected: &AuthToken) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(&*state, SessionState::Authenticated(current) if current == rejected) {
            warn!("Device at {} rejected the session token", self.address);
            *state = SessionState::Unauthenticated;
        }
    }

    fn current_token(&self) -> Result<AuthToken> {
        self.auth_token().ok_or(Error::AuthRequired)
    }

    async fn get_json(&self, path: &'static str) -> Result<Value> {
        let token = self.current_token()?;
        let request = self.client.get(self.address.endpoint(path));
        self.dispatch(request, token, path).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &'static str, body: &B) -> Result<Value> {
        let token = self.current_token()?;
        let request = self.client.post(self.address.endpoint(path)).json(body);
        self.dispatch(request, token, path).await
    }

    async fn dispatch(
        &self,
        request: RequestBuilder,
        token: AuthToken,
        path: &'static str,
    ) -> Result<Value> {
        debug!("Requesting {} from {}", path, self.address);
        let response = request.header(AUTH_HEADER, token.as_str()).send().await?;

        match response.status() {
            StatusCode::OK => {
                let content = response.text().await?;
                Ok(serde_json::from_str(&content)?)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.expire(&token);
                Err(Error::TokenExpired)
            }
            status => Err(Error::UnexpectedStatus {
                endpoint: path,
                status,
            }),
        }
    }

    fn decode<T: DeserializeOwned>(payload: Value) -> Result<T> {
        Ok(serde_json::from_value(payload)?)
    }

    /// The gestalt payload, untouched.
    pub async fn get_device_info(&self) -> Result<Value> {
        self.get_json(GESTALT).await
    }

    /// The mode as the device reports it, which may be outside [`Mode`].
    pub async fn get_mode(&self) -> Result<String> {
        let mode: ModeResponse = Self::decode(self.get_json(MODE).await?)?;
        Ok(mode.mode)
    }

    /// Returns the raw reply; inspect its `code` to confirm the change.
    pub async fn set_mode(&self, mode: Mode) -> Result<Value> {
        self.post_json(MODE, &ModeRequest { mode }).await
    }

    /// Parses `mode` first; names outside movie/demo/off never reach the device.
    pub async fn set_mode_named(&self, mode: &str) -> Result<Value> {
        let mode: Mode = mode.parse()?;
        self.set_mode(mode).await
    }

    pub async fn get_brightness(&self) -> Result<Brightness> {
        let brightness: BrightnessResponse = Self::decode(self.get_json(BRIGHTNESS).await?)?;
        brightness.brightness()
    }

    /**
    Sets brightness in percent.

    # Arguments
    - `brightness`: Range is 0..=100. 100 is sent as "dimming disabled",
                    the device has no numeric representation for it.
     */
    pub async fn set_brightness(&self, brightness: u8) -> Result<bool> {
        let brightness = Brightness::new(brightness)?;
        let payload = self
            .post_json(BRIGHTNESS, &BrightnessRequest::from(brightness))
            .await?;
        Ok(ResponseCode::from_payload(&payload)?.is_ok())
    }

    pub async fn turn_on(&self) -> Result<bool> {
        let payload = self.set_mode(Mode::Movie).await?;
        Ok(ResponseCode::from_payload(&payload)?.is_ok())
    }

    pub async fn turn_off(&self) -> Result<bool> {
        let payload = self.set_mode(Mode::Off).await?;
        Ok(ResponseCode::from_payload(&payload)?.is_ok())
    }

    /// Anything but "off" counts as on, including modes this crate does not know.
    pub async fn is_on(&self) -> Result<bool> {
        Ok(self.get_mode().await? != Mode::Off.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DeviceSession {
        DeviceSession::new("192.0.2.1").unwrap()
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = session();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(session.auth_token().is_none());
        assert_eq!(session.address().host(), "192.0.2.1");
    }

    #[test]
    fn test_with_auth_token() {
        let session = session().with_auth_token("abc");
        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.auth_token(), Some(AuthToken::new("abc")));
    }

    #[test]
    fn test_expire_only_drops_matching_token() {
        let session = session().with_auth_token("new");
        session.expire(&AuthToken::new("old"));
        assert!(session.is_authenticated());
        session.expire(&AuthToken::new("new"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_operations_require_token() {
        let session = session();
        assert!(matches!(session.get_mode().await, Err(Error::AuthRequired)));
        assert!(matches!(session.get_device_info().await, Err(Error::AuthRequired)));
        assert!(matches!(session.get_brightness().await, Err(Error::AuthRequired)));
        assert!(matches!(session.turn_on().await, Err(Error::AuthRequired)));
        assert!(matches!(session.is_on().await, Err(Error::AuthRequired)));
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_auth_check() {
        let session = session();
        assert!(matches!(
            session.set_brightness(101).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            session.set_mode_named("rt").await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_hardware_address_fails_before_login() {
        let options = SessionOptions::default().with_hardware_address("not-a-mac");
        let session = DeviceSession::with_options("192.0.2.1", options)
            .unwrap()
            .with_auth_token("held");
        assert!(matches!(
            session.authenticate().await,
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(session.auth_token(), Some(AuthToken::new("held")));
        assert_eq!(session.status(), SessionStatus::Authenticated);

        let fresh = DeviceSession::with_options(
            "192.0.2.1",
            SessionOptions::default().with_hardware_address("not-a-mac"),
        )
        .unwrap();
        assert!(fresh.authenticate().await.is_err());
        assert_eq!(fresh.status(), SessionStatus::Unauthenticated);
    }
}
