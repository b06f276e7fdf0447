// ── Inner messages ──
//
// The decrypted payload of every datagram, discriminated by `t`.
// Outbound requests and inbound responses are closed enums; anything the
// appliance sends with an unrecognised `t` lands in `Response::Unknown`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── StatusValue ──────────────────────────────────────────────────────

/// A status-table value. Appliances report integers for nearly every
/// column and strings for a few descriptive ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Int(i64),
    Text(String),
}

impl StatusValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for StatusValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for StatusValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u8> for StatusValue {
    fn from(v: u8) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for StatusValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for StatusValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// ── Outbound ─────────────────────────────────────────────────────────

/// Messages the client sends to the appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Request {
    /// Discovery probe. Sent as bare JSON, never packed.
    #[serde(rename = "scan")]
    Scan,

    /// Key exchange request, sealed with the well-known key.
    #[serde(rename = "bind")]
    Bind { mac: String, uid: u32 },

    /// Periodic status poll for the listed columns.
    #[serde(rename = "status")]
    Status { mac: String, cols: Vec<String> },

    /// Set one or more columns. `opt` and `p` are parallel arrays.
    #[serde(rename = "cmd")]
    Command {
        opt: Vec<String>,
        p: Vec<StatusValue>,
    },
}

impl Request {
    pub fn bind(mac: impl Into<String>) -> Self {
        Self::Bind {
            mac: mac.into(),
            uid: 0,
        }
    }

    /// Whether this request travels inside a packed frame.
    pub fn is_packed(&self) -> bool {
        !matches!(self, Self::Scan)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Bind { .. } => "bind",
            Self::Status { .. } => "status",
            Self::Command { .. } => "cmd",
        }
    }
}

// ── Inbound ──────────────────────────────────────────────────────────

/// Messages the appliance sends back, after decryption.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "t")]
pub enum Response {
    #[serde(rename = "dev")]
    Announcement(Announcement),

    #[serde(rename = "bindok")]
    BindAck(BindAck),

    #[serde(rename = "dat")]
    StatusData(StatusData),

    #[serde(rename = "res")]
    CommandAck(CommandAck),

    /// Any other `t`. Ignored by the session.
    #[serde(other)]
    Unknown,
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Announcement(_) => "dev",
            Self::BindAck(_) => "bindok",
            Self::StatusData(_) => "dat",
            Self::CommandAck(_) => "res",
            Self::Unknown => "unknown",
        }
    }
}

/// Reply to a scan: the appliance introducing itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ver: Option<String>,
}

impl Announcement {
    /// The appliance identifier, preferring `mac` over `cid`.
    pub fn identifier(&self) -> Option<&str> {
        first_non_empty(self.mac.as_deref(), self.cid.as_deref())
    }
}

/// Reply to a bind: carries the session key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BindAck {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

impl BindAck {
    pub fn identifier(&self) -> Option<&str> {
        first_non_empty(self.mac.as_deref(), self.cid.as_deref())
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Reply to a status poll.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusData {
    #[serde(default)]
    pub cols: Vec<String>,
    #[serde(default)]
    pub dat: Vec<StatusValue>,
}

impl StatusData {
    /// `(code, value)` pairs zipped by position.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &StatusValue)> {
        self.cols.iter().map(String::as_str).zip(self.dat.iter())
    }
}

/// Reply to a command.
///
/// Some firmwares confirm with `val`, others only echo the request's `p`;
/// the two are indistinguishable to the client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub opt: Vec<String>,
    #[serde(default)]
    pub val: Option<Vec<StatusValue>>,
    #[serde(default)]
    pub p: Option<Vec<StatusValue>>,
}

impl CommandAck {
    /// Confirmed values, falling back to the echoed request values.
    pub fn values(&self) -> &[StatusValue] {
        self.val
            .as_deref()
            .or(self.p.as_deref())
            .unwrap_or_default()
    }

    /// `(code, value)` pairs zipped by position.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &StatusValue)> {
        self.opt.iter().map(String::as_str).zip(self.values().iter())
    }
}

fn first_non_empty<'a>(a: Option<&'a str>, b: Option<&'a str>) -> Option<&'a str> {
    a.filter(|s| !s.is_empty())
        .or_else(|| b.filter(|s| !s.is_empty()))
}
