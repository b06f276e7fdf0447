// ── Session state machine ──
//
// Consumes events (socket opened, retry elapsed, poll tick, inbound
// response, outbound command) and returns the actions the driver must
// perform. Owns the appliance identity, the session key and the phase.
// Status-table writes happen here so that one inbound message maps to
// exactly one mutation followed by one `Notify`.

use std::sync::Arc;

use gree_api::{
    Announcement, BindAck, CommandAck, FrameCodec, Request, Response, SessionKey, StatusData,
};
use tracing::{debug, info, trace, warn};

use super::phase::SessionPhase;
use crate::command::CommandBatch;
use crate::config::DeviceConfig;
use crate::store::StatusTable;

/// Side effects requested by the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Encode and transmit a request.
    Send(Request),
    /// Replace the retry slot with a timer for the given phase.
    ArmRetry(SessionPhase),
    /// Start the periodic status poll. Emitted at most once per session.
    StartPolling,
    /// Fire the change notifier; the table was just written.
    Notify,
}

pub struct SessionMachine {
    phase: SessionPhase,
    mac: Option<String>,
    key: Option<SessionKey>,
    polling: bool,
    poll_columns: Vec<String>,
    table: Arc<StatusTable>,
    codec: FrameCodec,
}

impl SessionMachine {
    pub fn new(config: &DeviceConfig, table: Arc<StatusTable>, codec: FrameCodec) -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            mac: config.mac.clone(),
            key: None,
            polling: false,
            poll_columns: config.poll_columns(),
            table,
            codec,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn identifier(&self) -> Option<&str> {
        self.mac.as_deref()
    }

    pub fn session_key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn table(&self) -> &Arc<StatusTable> {
        &self.table
    }

    // ── Codec ────────────────────────────────────────────────────────

    /// Encode a request under the current key (well-known key until bound).
    pub fn encode(&self, request: &Request) -> Result<Vec<u8>, gree_api::Error> {
        self.codec.encode(request, self.key.as_ref())
    }

    pub fn decode(&self, datagram: &[u8]) -> Result<Response, gree_api::Error> {
        self.codec.decode(datagram, self.key.as_ref())
    }

    // ── Events ───────────────────────────────────────────────────────

    /// The socket is up: bind straight away if the identifier is known,
    /// otherwise start scanning.
    pub fn socket_opened(&mut self) -> Vec<Action> {
        match self.mac.clone() {
            Some(mac) => {
                debug!(%mac, "identifier pre-seeded, binding");
                self.enter_binding(mac)
            }
            None => {
                self.phase = SessionPhase::Discovering;
                vec![
                    Action::Send(Request::Scan),
                    Action::ArmRetry(SessionPhase::Discovering),
                ]
            }
        }
    }

    /// A retry armed for `armed_for` fired. Does nothing unless the session
    /// is still in that phase.
    pub fn retry_elapsed(&mut self, armed_for: SessionPhase) -> Vec<Action> {
        if armed_for != self.phase {
            trace!(%armed_for, phase = %self.phase, "stale retry ignored");
            return Vec::new();
        }

        match (self.phase, self.mac.clone()) {
            (SessionPhase::Discovering, _) => {
                warn!("appliance not found, rescanning");
                vec![
                    Action::Send(Request::Scan),
                    Action::ArmRetry(SessionPhase::Discovering),
                ]
            }
            (SessionPhase::Binding, Some(mac)) => {
                warn!(%mac, "no bind acknowledgement, retrying");
                vec![
                    Action::Send(Request::bind(mac)),
                    Action::ArmRetry(SessionPhase::Binding),
                ]
            }
            _ => Vec::new(),
        }
    }

    /// The poll timer fired.
    pub fn poll_elapsed(&mut self) -> Vec<Action> {
        if !self.phase.is_bound() {
            return Vec::new();
        }
        vec![Action::Send(Request::Status {
            mac: self.mac.clone().unwrap_or_default(),
            cols: self.poll_columns.clone(),
        })]
    }

    /// A caller asked to send a batch of writes.
    pub fn command(&mut self, batch: CommandBatch) -> Vec<Action> {
        if !self.phase.is_bound() {
            debug!(
                phase = %self.phase,
                "sending command before bind; the appliance will likely reject it"
            );
        }
        debug!(codes = ?batch.codes().collect::<Vec<_>>(), "sending command");
        vec![Action::Send(batch.into_request())]
    }

    /// A datagram was decoded into a response.
    pub fn handle(&mut self, response: Response) -> Vec<Action> {
        match response {
            Response::Announcement(dev) => self.on_announcement(&dev),
            Response::BindAck(ack) => self.on_bind_ack(&ack),
            Response::StatusData(data) => self.on_status_data(&data),
            Response::CommandAck(ack) => self.on_command_ack(&ack),
            Response::Unknown => {
                debug!("ignoring message of unknown type");
                Vec::new()
            }
        }
    }

    /// The session is being torn down.
    pub fn close(&mut self) {
        self.phase = SessionPhase::Disconnected;
        self.polling = false;
    }

    // ── Handlers ─────────────────────────────────────────────────────

    fn on_announcement(&mut self, dev: &Announcement) -> Vec<Action> {
        if self.phase.is_bound() {
            debug!("announcement while bound, ignored");
            return Vec::new();
        }
        let Some(mac) = dev.identifier() else {
            warn!("announcement without mac or cid, dropped");
            return Vec::new();
        };
        info!(
            %mac,
            name = dev.name.as_deref().unwrap_or_default(),
            "found appliance"
        );
        self.enter_binding(mac.to_owned())
    }

    fn on_bind_ack(&mut self, ack: &BindAck) -> Vec<Action> {
        let Some(key) = ack.key() else {
            warn!("bind acknowledgement without key, dropped");
            return Vec::new();
        };
        if let Some(mac) = ack.identifier() {
            self.mac = Some(mac.to_owned());
        }
        self.key = Some(SessionKey::new(key));

        if self.phase.is_bound() {
            debug!(mac = self.identifier().unwrap_or_default(), "session key refreshed");
            return Vec::new();
        }

        self.phase = SessionPhase::Bound;
        info!(mac = self.identifier().unwrap_or_default(), "bound to appliance");

        if self.polling {
            Vec::new()
        } else {
            self.polling = true;
            vec![Action::StartPolling]
        }
    }

    fn on_status_data(&mut self, data: &StatusData) -> Vec<Action> {
        let written = self.table.apply(data.pairs());
        debug!(written, "status updated");
        vec![Action::Notify]
    }

    fn on_command_ack(&mut self, ack: &CommandAck) -> Vec<Action> {
        let written = self.table.apply_ack(ack.pairs());
        debug!(written, "command acknowledged");
        vec![Action::Notify]
    }

    fn enter_binding(&mut self, mac: String) -> Vec<Action> {
        self.phase = SessionPhase::Binding;
        self.mac = Some(mac.clone());
        vec![
            Action::Send(Request::bind(mac)),
            Action::ArmRetry(SessionPhase::Binding),
        ]
    }
}

impl std::fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMachine")
            .field("phase", &self.phase)
            .field("mac", &self.mac)
            .field("key", &self.key)
            .field("polling", &self.polling)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gree_api::{Frame, GENERIC_KEY, PackCipher, StatusValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    /// Stand-in cipher: `pack = "<key>|<plaintext>"`. Accepts keys of any
    /// length and fails loudly on a key mismatch.
    struct TaggingCipher;

    impl PackCipher for TaggingCipher {
        fn seal(&self, plaintext: &[u8], key: Option<&SessionKey>) -> Result<String, gree_api::Error> {
            let key = key.map_or(GENERIC_KEY, SessionKey::expose);
            Ok(format!("{key}|{}", String::from_utf8_lossy(plaintext)))
        }

        fn open(&self, pack: &str, key: Option<&SessionKey>) -> Result<Vec<u8>, gree_api::Error> {
            let key = key.map_or(GENERIC_KEY, SessionKey::expose);
            match pack.split_once('|') {
                Some((k, body)) if k == key => Ok(body.as_bytes().to_vec()),
                _ => Err(gree_api::Error::Padding("wrong key")),
            }
        }
    }

    fn machine(mac: Option<&str>) -> SessionMachine {
        let mut config = DeviceConfig::new("192.168.1.50".parse().unwrap());
        config.mac = mac.map(str::to_owned);
        let codec = FrameCodec::new(Arc::new(TaggingCipher), "app");
        SessionMachine::new(&config, Arc::new(StatusTable::new()), codec)
    }

    fn response(value: serde_json::Value) -> Response {
        serde_json::from_value(value).unwrap()
    }

    fn bound(mac: &str, key: &str) -> SessionMachine {
        let mut m = machine(Some(mac));
        m.socket_opened();
        m.handle(response(json!({ "t": "bindok", "mac": mac, "key": key })));
        m
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    #[test]
    fn unknown_identifier_starts_discovery() {
        let mut m = machine(None);
        let actions = m.socket_opened();
        assert_eq!(m.phase(), SessionPhase::Discovering);
        assert_eq!(
            actions,
            vec![
                Action::Send(Request::Scan),
                Action::ArmRetry(SessionPhase::Discovering)
            ]
        );
    }

    #[test]
    fn preseeded_identifier_skips_discovery() {
        let mut m = machine(Some("f4911e7af2f2"));
        let actions = m.socket_opened();
        assert_eq!(m.phase(), SessionPhase::Binding);
        assert_eq!(
            actions,
            vec![
                Action::Send(Request::bind("f4911e7af2f2")),
                Action::ArmRetry(SessionPhase::Binding)
            ]
        );
    }

    #[test]
    fn announcement_moves_to_binding() {
        let mut m = machine(None);
        m.socket_opened();
        let actions = m.handle(response(json!({ "t": "dev", "cid": "c0ffee", "name": "ac" })));
        assert_eq!(m.phase(), SessionPhase::Binding);
        assert_eq!(m.identifier(), Some("c0ffee"));
        assert_eq!(actions[0], Action::Send(Request::bind("c0ffee")));
        assert_eq!(actions[1], Action::ArmRetry(SessionPhase::Binding));
    }

    #[test]
    fn announcement_without_identifier_is_dropped() {
        let mut m = machine(None);
        m.socket_opened();
        assert!(m.handle(response(json!({ "t": "dev" }))).is_empty());
        assert_eq!(m.phase(), SessionPhase::Discovering);
    }

    #[test]
    fn bind_ack_binds_and_starts_polling_once() {
        let mut m = machine(Some("AA:BB"));
        m.socket_opened();

        let actions = m.handle(response(json!({ "t": "bindok", "mac": "AA:BB", "key": "k1" })));
        assert_eq!(actions, vec![Action::StartPolling]);
        assert_eq!(m.phase(), SessionPhase::Bound);
        assert_eq!(m.session_key(), Some(&SessionKey::new("k1")));
        assert!(m.is_polling());
    }

    #[test]
    fn duplicate_bind_ack_overwrites_identity_without_second_poll_timer() {
        let mut m = bound("AA:BB", "k1");

        let actions = m.handle(response(json!({ "t": "bindok", "mac": "CC:DD", "key": "k2" })));
        assert!(actions.is_empty());
        assert_eq!(m.phase(), SessionPhase::Bound);
        assert_eq!(m.identifier(), Some("CC:DD"));
        assert_eq!(m.session_key(), Some(&SessionKey::new("k2")));
    }

    #[test]
    fn bind_ack_without_key_is_dropped() {
        let mut m = machine(Some("AA:BB"));
        m.socket_opened();
        assert!(m.handle(response(json!({ "t": "bindok", "mac": "AA:BB" }))).is_empty());
        assert_eq!(m.phase(), SessionPhase::Binding);
        assert!(m.session_key().is_none());
    }

    #[test]
    fn announcement_while_binding_resends_bind() {
        let mut m = machine(None);
        m.socket_opened();
        m.handle(response(json!({ "t": "dev", "mac": "AA:BB" })));

        let actions = m.handle(response(json!({ "t": "dev", "mac": "AA:BB" })));
        assert_eq!(
            actions,
            vec![
                Action::Send(Request::bind("AA:BB")),
                Action::ArmRetry(SessionPhase::Binding)
            ]
        );
    }

    #[test]
    fn announcement_while_bound_is_ignored() {
        let mut m = bound("AA:BB", "k1");
        assert!(m.handle(response(json!({ "t": "dev", "mac": "EE:FF" }))).is_empty());
        assert_eq!(m.identifier(), Some("AA:BB"));
    }

    // ── Retries ──────────────────────────────────────────────────────

    #[test]
    fn retry_in_armed_phase_resends_and_rearms() {
        let mut m = machine(None);
        m.socket_opened();
        assert_eq!(
            m.retry_elapsed(SessionPhase::Discovering),
            vec![
                Action::Send(Request::Scan),
                Action::ArmRetry(SessionPhase::Discovering)
            ]
        );

        m.handle(response(json!({ "t": "dev", "mac": "AA:BB" })));
        assert_eq!(
            m.retry_elapsed(SessionPhase::Binding),
            vec![
                Action::Send(Request::bind("AA:BB")),
                Action::ArmRetry(SessionPhase::Binding)
            ]
        );
    }

    #[test]
    fn retry_after_phase_advance_is_a_no_op() {
        let mut m = machine(None);
        m.socket_opened();
        m.handle(response(json!({ "t": "dev", "mac": "AA:BB" })));
        assert!(m.retry_elapsed(SessionPhase::Discovering).is_empty());

        m.handle(response(json!({ "t": "bindok", "key": "k1" })));
        assert!(m.retry_elapsed(SessionPhase::Discovering).is_empty());
        assert!(m.retry_elapsed(SessionPhase::Binding).is_empty());
        assert_eq!(m.phase(), SessionPhase::Bound);
    }

    // ── Polling and status ───────────────────────────────────────────

    #[test]
    fn poll_requests_every_registered_code() {
        let mut m = bound("AA:BB", "k1");
        let actions = m.poll_elapsed();
        let [Action::Send(Request::Status { mac, cols })] = actions.as_slice() else {
            panic!("expected one status request, got {actions:?}");
        };
        assert_eq!(mac, "AA:BB");
        assert_eq!(cols.len(), 11);
        assert_eq!(cols[0], "Pow");
    }

    #[test]
    fn poll_before_bind_sends_nothing() {
        let mut m = machine(None);
        m.socket_opened();
        assert!(m.poll_elapsed().is_empty());
    }

    #[test]
    fn status_data_merges_and_notifies_once() {
        let mut m = bound("AA:BB", "k1");
        m.handle(response(json!({ "t": "dat", "cols": ["Pow", "SetTem"], "dat": [1, 24] })));
        let actions = m.handle(response(json!({ "t": "dat", "cols": ["SetTem"], "dat": [26] })));

        assert_eq!(actions, vec![Action::Notify]);
        let snap = m.table().snapshot();
        assert_eq!(snap["Pow"], StatusValue::Int(1));
        assert_eq!(snap["SetTem"], StatusValue::Int(26));
    }

    #[test]
    fn command_ack_updates_only_listed_codes() {
        let mut m = bound("AA:BB", "k1");
        m.handle(response(json!({ "t": "dat", "cols": ["Pow", "Mod"], "dat": [0, 1] })));

        let actions = m.handle(response(json!({ "t": "res", "opt": ["Pow"], "p": [1] })));
        assert_eq!(actions, vec![Action::Notify]);
        let snap = m.table().snapshot();
        assert_eq!(snap["Pow"], StatusValue::Int(1));
        assert_eq!(snap["Mod"], StatusValue::Int(1));
    }

    #[test]
    fn unknown_messages_change_nothing() {
        let mut m = bound("AA:BB", "k1");
        assert!(m.handle(Response::Unknown).is_empty());
        assert!(m.table().is_empty());
    }

    // ── Keys ─────────────────────────────────────────────────────────

    #[test]
    fn requests_use_generic_key_before_bind() {
        let mut m = machine(Some("AA:BB"));
        let actions = m.socket_opened();
        let Action::Send(bind) = &actions[0] else {
            panic!("expected bind");
        };
        let frame: Frame = serde_json::from_slice(&m.encode(bind).unwrap()).unwrap();
        assert_eq!(frame.i, 1);
        assert!(frame.pack.starts_with(&format!("{GENERIC_KEY}|")));
    }

    #[test]
    fn commands_after_bind_are_sealed_with_session_key() {
        let mut m = bound("AA:BB", "k1");
        let actions = m.command(CommandBatch::new().power(true));
        let [Action::Send(cmd)] = actions.as_slice() else {
            panic!("expected a single send, got {actions:?}");
        };

        let frame: Frame = serde_json::from_slice(&m.encode(cmd).unwrap()).unwrap();
        assert_eq!(frame.i, 0);
        assert_eq!(frame.cid, "app");
        let (key, body) = frame.pack.split_once('|').unwrap();
        assert_eq!(key, "k1");
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, json!({ "t": "cmd", "opt": ["Pow"], "p": [1] }));
    }

    #[test]
    fn commands_before_bind_are_still_sent() {
        let mut m = machine(None);
        m.socket_opened();
        let actions = m.command(CommandBatch::new().power(false));
        assert_eq!(actions.len(), 1);
        let Action::Send(cmd) = &actions[0] else {
            panic!("expected send");
        };
        let frame: Frame = serde_json::from_slice(&m.encode(cmd).unwrap()).unwrap();
        assert_eq!(frame.i, 1);
    }

    #[test]
    fn decode_follows_the_generic_flag() {
        let m = bound("AA:BB", "k1");
        let generic = json!({
            "t": "pack", "i": 1, "uid": 0, "cid": "AA:BB",
            "pack": format!("{GENERIC_KEY}|{}", json!({ "t": "bindok", "key": "k9" })),
        });
        let session = json!({
            "t": "pack", "i": 0, "uid": 0, "cid": "AA:BB",
            "pack": format!("k1|{}", json!({ "t": "dat", "cols": [], "dat": [] })),
        });

        assert_eq!(m.decode(generic.to_string().as_bytes()).unwrap().kind(), "bindok");
        assert_eq!(m.decode(session.to_string().as_bytes()).unwrap().kind(), "dat");
    }

    #[test]
    fn close_returns_to_disconnected() {
        let mut m = bound("AA:BB", "k1");
        m.close();
        assert_eq!(m.phase(), SessionPhase::Disconnected);
        assert!(!m.is_polling());
        assert!(m.poll_elapsed().is_empty());
    }
}
