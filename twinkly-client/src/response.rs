use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Brightness, Mode};

/// The response code carried in every device reply.
///
/// The HTTP status only tells whether a request was received; whether it was
/// valid and processed is reported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ResponseCode(pub u32);

impl ResponseCode {
    pub fn code(&self) -> u32 {
        self.0
    }

    /// Use this instead of comparing against `1000` directly.
    pub fn is_ok(&self) -> bool {
        *self == OK
    }

    pub fn is_error(&self) -> bool {
        !self.is_ok()
    }

    pub fn message(&self) -> &'static str {
        KNOWN_CODES
            .iter()
            .find(|(code, _)| code == self)
            .map_or("Unknown", |(_, message)| *message)
    }

    /// Reads the `code` field out of a raw payload.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        payload
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|code| u32::try_from(code).ok())
            .map(ResponseCode)
            .ok_or_else(|| Error::Decode("response has no numeric `code` field".to_string()))
    }
}

// Codes from https://xled-docs.readthedocs.io/en/latest/rest_api.html#http-responses.
pub const OK: ResponseCode = ResponseCode(1000);
pub const ERROR: ResponseCode = ResponseCode(1001);
pub const ERROR_INVALID_ARGUMENT: ResponseCode = ResponseCode(1101);
pub const ERROR2: ResponseCode = ResponseCode(1102);
pub const ERROR_VALUE_WRONG_MISSING_KEY: ResponseCode = ResponseCode(1103);
pub const ERROR_MALFORMED_JSON_INPUT: ResponseCode = ResponseCode(1104);
pub const ERROR_INVALID_ARGUMENT_KEY: ResponseCode = ResponseCode(1105);
pub const OK2: ResponseCode = ResponseCode(1107);
pub const OK3: ResponseCode = ResponseCode(1108);
pub const FIRMWARE_UPGRADE_ERROR: ResponseCode = ResponseCode(1205);

/// Every named code with its meaning. New codes go here and nowhere else.
pub const KNOWN_CODES: &[(ResponseCode, &str)] = &[
    (OK, "Ok"),
    (ERROR, "Error"),
    (ERROR_INVALID_ARGUMENT, "Invalid argument value"),
    (ERROR2, "Error"),
    (
        ERROR_VALUE_WRONG_MISSING_KEY,
        "Error - value too long? Or missing required object key?",
    ),
    (ERROR_MALFORMED_JSON_INPUT, "Error - malformed JSON on input?"),
    (ERROR_INVALID_ARGUMENT_KEY, "Invalid argument key"),
    (OK2, "OK?"),
    (OK3, "OK?"),
    (
        FIRMWARE_UPGRADE_ERROR,
        "Error with firmware upgrade - SHA1SUM does not match",
    ),
];

#[derive(Serialize, Debug)]
pub(crate) struct LoginRequest {
    pub challenge: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct LoginResponse {
    pub code: ResponseCode,
    #[serde(rename = "challenge-response")]
    pub challenge_response: Option<String>,
    pub authentication_token: Option<String>,
    /// Seconds; only logged, the client does not track expiry.
    pub authentication_token_expires_in: Option<i64>,
}

#[derive(Serialize, Debug)]
pub(crate) struct VerifyRequest<'a> {
    #[serde(rename = "challenge-response")]
    pub challenge_response: &'a str,
}

#[derive(Serialize, Debug)]
pub(crate) struct ModeRequest {
    pub mode: Mode,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ModeResponse {
    pub mode: String,
}

/// Brightness as the device reports it.
#[derive(Deserialize, Debug)]
pub(crate) struct BrightnessResponse {
    /// Either "enabled" or "disabled".
    pub mode: String,
    /// An integer on most firmware; a numeric string or a whole float on some.
    pub value: Option<Value>,
}

impl BrightnessResponse {
    /// "disabled" means dimming is off, which is full brightness. Any value
    /// field next to it is ignored.
    pub fn brightness(&self) -> Result<Brightness> {
        if self.mode == "disabled" {
            return Ok(Brightness::MAX);
        }
        let raw = match &self.value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            Error::Decode(format!(
                "brightness value missing or not an integer: {:?}",
                self.value
            ))
        })?;
        Brightness::try_from(raw)
            .map_err(|_| Error::Decode(format!("brightness value out of range: {}", raw)))
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct BrightnessRequest {
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<Brightness> for BrightnessRequest {
    /// 100 cannot be sent as a number; the device wants dimming disabled instead.
    fn from(brightness: Brightness) -> Self {
        if brightness.is_max() {
            BrightnessRequest {
                mode: "disabled",
                kind: "A",
                value: None,
            }
        } else {
            BrightnessRequest {
                mode: "enabled",
                kind: "A",
                value: Some(brightness.value().to_string()),
            }
        }
    }
}
