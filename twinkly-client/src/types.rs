use std::fmt;
use std::str::FromStr;

use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Host (optionally with port) of a device. All endpoint URLs are built from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new(host: impl Into<String>) -> Self {
        DeviceAddress(host.into())
    }

    pub fn host(&self) -> &str {
        &self.0
    }

    /// `http://<host>/xled/v1/`
    pub fn base_url(&self) -> String {
        format!("http://{}/xled/v1/", self.0)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(host: &str) -> Self {
        DeviceAddress::new(host)
    }
}

impl From<String> for DeviceAddress {
    fn from(host: String) -> Self {
        DeviceAddress(host)
    }
}

/// Token issued by the device after a successful handshake.
///
/// Sent as `X-Auth-Token` on every authorized request. The value is kept out
/// of `Debug` output so sessions can be logged freely.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct AuthToken(#[derivative(Debug = "ignore")] String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        AuthToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Modes a client is allowed to set.
///
/// The device reports more modes than these (`rt`, `playlist`, `color`, ...);
/// reads hand those back as plain strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Movie,
    Demo,
    Off,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Movie => "movie",
            Mode::Demo => "demo",
            Mode::Off => "off",
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "movie" => Ok(Mode::Movie),
            "demo" => Ok(Mode::Demo),
            "off" => Ok(Mode::Off),
            other => Err(Error::InvalidArgument(format!(
                "mode must be one of movie, demo, off; got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Brightness percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Brightness(u8);

impl Brightness {
    pub const MAX: Brightness = Brightness(100);

    pub fn new(percent: u8) -> Result<Self> {
        if percent > Self::MAX.0 {
            return Err(Error::InvalidArgument(format!(
                "brightness must be within 0..=100, got {}",
                percent
            )));
        }
        Ok(Brightness(percent))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// The device has no numeric 100: full brightness is "dimming disabled".
    pub fn is_max(&self) -> bool {
        *self == Self::MAX
    }
}

impl TryFrom<i64> for Brightness {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u8::try_from(value)
            .map_err(|_| {
                Error::InvalidArgument(format!("brightness must be within 0..=100, got {}", value))
            })
            .and_then(Brightness::new)
    }
}

impl From<Brightness> for u8 {
    fn from(b: Brightness) -> u8 {
        b.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
