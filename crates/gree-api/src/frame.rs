// ── Outer frame + codec ──
//
// Every packed datagram is a small JSON object whose `pack` field holds the
// encrypted inner message. `FrameCodec` turns `Request`s into datagram bytes
// and datagram bytes back into `Response`s, choosing the key per frame.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cipher::{AesEcbCipher, PackCipher, SessionKey};
use crate::error::Error;
use crate::message::{Request, Response};

/// Client identifier placed in the `cid` field of outbound frames.
pub const DEFAULT_CLIENT_ID: &str = "app";

const PACK_TYPE: &str = "pack";

/// The unencrypted outer JSON object of a packed datagram.
///
/// Inbound frames carry extra fields (`tcid`, ...) which are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub cid: String,
    /// `1` when `pack` was sealed with the well-known key, else `0`.
    #[serde(default)]
    pub i: u8,
    pub t: String,
    #[serde(default)]
    pub uid: u32,
    pub pack: String,
}

impl Frame {
    pub fn uses_generic_key(&self) -> bool {
        self.i == 1
    }
}

/// Encodes outbound requests and decodes inbound datagrams.
#[derive(Clone)]
pub struct FrameCodec {
    cipher: Arc<dyn PackCipher>,
    client_id: String,
}

impl FrameCodec {
    pub fn new(cipher: Arc<dyn PackCipher>, client_id: impl Into<String>) -> Self {
        Self {
            cipher,
            client_id: client_id.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Seal a request into a `pack` string.
    pub fn encrypt(&self, request: &Request, key: Option<&SessionKey>) -> Result<String, Error> {
        let inner = serde_json::to_vec(request)?;
        self.cipher.seal(&inner, key)
    }

    /// Open a `pack` string into a response.
    pub fn decrypt(&self, pack: &str, key: Option<&SessionKey>) -> Result<Response, Error> {
        let inner = self.cipher.open(pack, key)?;
        Ok(serde_json::from_slice(&inner)?)
    }

    /// Build the full datagram for a request.
    ///
    /// Scans go out as bare JSON; everything else is wrapped in a frame
    /// sealed with `key`, or the well-known key when `key` is `None`.
    pub fn encode(&self, request: &Request, key: Option<&SessionKey>) -> Result<Vec<u8>, Error> {
        if !request.is_packed() {
            return Ok(serde_json::to_vec(request)?);
        }

        let frame = Frame {
            cid: self.client_id.clone(),
            i: u8::from(key.is_none()),
            t: PACK_TYPE.into(),
            uid: 0,
            pack: self.encrypt(request, key)?,
        };
        Ok(serde_json::to_vec(&frame)?)
    }

    /// Parse and decrypt an inbound datagram.
    ///
    /// A frame flagged `i = 1` is opened with the well-known key no matter
    /// which session key is current.
    pub fn decode(&self, datagram: &[u8], key: Option<&SessionKey>) -> Result<Response, Error> {
        let frame: Frame = serde_json::from_slice(datagram)?;
        let key = if frame.uses_generic_key() { None } else { key };
        self.decrypt(&frame.pack, key)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(Arc::new(AesEcbCipher), DEFAULT_CLIENT_ID)
    }
}

impl std::fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::message::StatusValue;

    fn device_datagram(inner: &serde_json::Value, key: Option<&SessionKey>) -> Vec<u8> {
        let pack = AesEcbCipher
            .seal(inner.to_string().as_bytes(), key)
            .unwrap();
        json!({
            "t": "pack",
            "i": u8::from(key.is_none()),
            "uid": 0,
            "cid": "f4911e7af2f2",
            "tcid": "",
            "pack": pack,
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn scan_is_not_wrapped() {
        let bytes = FrameCodec::default().encode(&Request::Scan, None).unwrap();
        assert_eq!(bytes, br#"{"t":"scan"}"#);
    }

    #[test]
    fn unbound_requests_flag_generic_key() {
        let codec = FrameCodec::default();
        let bytes = codec.encode(&Request::bind("f4911e7af2f2"), None).unwrap();
        let frame: Frame = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(frame.cid, "app");
        assert_eq!(frame.i, 1);
        assert_eq!(frame.t, "pack");
        assert_eq!(frame.uid, 0);

        let inner = AesEcbCipher.open(&frame.pack, None).unwrap();
        let inner: serde_json::Value = serde_json::from_slice(&inner).unwrap();
        assert_eq!(inner, json!({ "t": "bind", "mac": "f4911e7af2f2", "uid": 0 }));
    }

    #[test]
    fn bound_requests_use_session_key() {
        let codec = FrameCodec::default();
        let key = SessionKey::new("0123456789abcdef");
        let req = Request::Command {
            opt: vec!["Pow".into()],
            p: vec![StatusValue::Int(1)],
        };
        let bytes = codec.encode(&req, Some(&key)).unwrap();
        let frame: Frame = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(frame.i, 0);
        let inner = AesEcbCipher.open(&frame.pack, Some(&key)).unwrap();
        let inner: serde_json::Value = serde_json::from_slice(&inner).unwrap();
        assert_eq!(inner, json!({ "t": "cmd", "opt": ["Pow"], "p": [1] }));
    }

    #[test]
    fn decode_honours_generic_flag_even_when_bound() {
        let codec = FrameCodec::default();
        let session = SessionKey::new("0123456789abcdef");
        let datagram = device_datagram(
            &json!({ "t": "bindok", "mac": "f4911e7af2f2", "key": "fedcba9876543210" }),
            None,
        );

        let resp = codec.decode(&datagram, Some(&session)).unwrap();
        assert_eq!(resp.kind(), "bindok");
    }

    #[test]
    fn decode_uses_session_key_for_unflagged_frames() {
        let codec = FrameCodec::default();
        let session = SessionKey::new("0123456789abcdef");
        let datagram = device_datagram(
            &json!({ "t": "dat", "cols": ["Pow"], "dat": [1] }),
            Some(&session),
        );

        let Response::StatusData(data) = codec.decode(&datagram, Some(&session)).unwrap() else {
            panic!("expected status data");
        };
        assert_eq!(data.cols, vec!["Pow".to_string()]);
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = FrameCodec::default().decode(b"\x00\x01garbage", None).unwrap_err();
        assert!(err.is_malformed_input());
    }
}
