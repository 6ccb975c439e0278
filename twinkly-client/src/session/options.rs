use std::sync::Arc;
use std::time::Duration;

use derivative::Derivative;

use crate::util::auth::{ChallengeSource, ThreadRngChallengeSource};

/// Knobs for a [`DeviceSession`](super::DeviceSession).
#[derive(Derivative, Clone)]
#[derivative(Debug, Default)]
pub struct SessionOptions {
    /// Applied to every request, handshake included. `None` leaves reqwest's default.
    pub request_timeout: Option<Duration>,

    /**
    MAC address of the device, e.g. `98:cd:ac:1a:2b:3c`.

    When set, the device's answer to the login challenge is checked against the
    value a genuine device would compute, and the handshake is rejected on mismatch.
    */
    pub hardware_address: Option<String>,

    #[derivative(
        Debug = "ignore",
        Default(value = "Arc::new(ThreadRngChallengeSource)")
    )]
    pub challenge_source: Arc<dyn ChallengeSource>,
}

impl SessionOptions {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_hardware_address(mut self, mac: impl Into<String>) -> Self {
        self.hardware_address = Some(mac.into());
        self
    }

    pub fn with_challenge_source(mut self, source: impl ChallengeSource + 'static) -> Self {
        self.challenge_source = Arc::new(source);
        self
    }
}
