// ── Device handle ──
//
// Lifecycle management for one appliance session. `connect()` spawns a
// single task that owns the socket, the state machine, the retry slot and
// the poll timer; `close()` cancels it. Status reads never touch the task:
// they go straight to the shared `StatusTable`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gree_api::{FrameCodec, StatusValue, UdpTransport};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::CommandBatch;
use crate::config::DeviceConfig;
use crate::error::CoreError;
use crate::model::StatusCode;
use crate::notify::ChangeNotifier;
use crate::session::{Action, SessionMachine, SessionPhase};
use crate::store::{AckedValues, StatusSnapshot, StatusTable};
use crate::stream::StatusStream;

// ── Device ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<DeviceInner>`. Dropping the last clone
/// cancels a running session.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    config: DeviceConfig,
    codec: FrameCodec,
    shared: Arc<Shared>,
    session: Mutex<Option<RunningSession>>,
}

/// State observed by consumers and written by the session task.
struct Shared {
    table: Arc<StatusTable>,
    notifier: ChangeNotifier,
    phase: watch::Sender<SessionPhase>,
    identifier: watch::Sender<Option<String>>,
}

struct RunningSession {
    cancel: CancellationToken,
    command_tx: mpsc::UnboundedSender<CommandBatch>,
    handle: JoinHandle<()>,
}

impl Device {
    /// Create a device handle. Does NOT open a socket -- call
    /// [`connect()`](Self::connect) to start the session.
    pub fn new(config: DeviceConfig) -> Self {
        Self::build(config, ChangeNotifier::none(), FrameCodec::default())
    }

    /// Like [`new`](Self::new), with a callback fired after every status
    /// update (once per inbound `dat` or `res` message).
    pub fn with_notifier<F>(config: DeviceConfig, on_change: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(config, ChangeNotifier::new(on_change), FrameCodec::default())
    }

    /// Full control over the notifier and the codec (e.g. a different
    /// pack cipher).
    pub fn with_codec(config: DeviceConfig, notifier: ChangeNotifier, codec: FrameCodec) -> Self {
        Self::build(config, notifier, codec)
    }

    fn build(config: DeviceConfig, notifier: ChangeNotifier, codec: FrameCodec) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Disconnected);
        let (identifier, _) = watch::channel(config.mac.clone());

        Self {
            inner: Arc::new(DeviceInner {
                config,
                codec,
                shared: Arc::new(Shared {
                    table: Arc::new(StatusTable::new()),
                    notifier,
                    phase,
                    identifier,
                }),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the session task. Returns immediately; the task keeps
    /// opening the socket, scanning and binding until it succeeds or
    /// [`close()`](Self::close) is called. Calling `connect()` on a running
    /// device does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<(), CoreError> {
        self.inner.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::Internal(format!("no tokio runtime: {e}")))?;

        let mut slot = self.inner.lock_session();
        if slot.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            debug!("session already running");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let machine = SessionMachine::new(
            &self.inner.config,
            Arc::clone(&self.inner.shared.table),
            self.inner.codec.clone(),
        );

        let handle = runtime.spawn(session_task(
            SessionTask {
                remote: self.inner.config.remote(),
                retry_interval: self.inner.config.retry_interval,
                poll_interval: self.inner.config.poll_interval,
                shared: Arc::clone(&self.inner.shared),
                machine,
            },
            command_rx,
            cancel.clone(),
        ));

        *slot = Some(RunningSession {
            cancel,
            command_tx,
            handle,
        });
        info!(remote = %self.inner.config.remote(), "session started");
        Ok(())
    }

    /// Stop the session: cancel pending retries and polls, release the
    /// socket and return to `Disconnected`. Safe to call repeatedly.
    pub async fn close(&self) {
        let session = self.inner.lock_session().take();
        if let Some(session) = session {
            session.cancel.cancel();
            if let Err(e) = session.handle.await {
                warn!(error = %e, "session task ended abnormally");
            }
            debug!("session closed");
        }
        self.inner.shared.set_phase(SessionPhase::Disconnected);
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .lock_session()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Queue a batch of writes for immediate transmission. Does not wait
    /// for the appliance: its acknowledgement arrives later as a status
    /// update. Before the session is bound the batch is still sent, under
    /// the well-known key, and will most likely be ignored.
    pub fn send_commands(&self, commands: impl Into<CommandBatch>) -> Result<(), CoreError> {
        let batch = commands.into();
        if batch.is_empty() {
            return Ok(());
        }
        let slot = self.inner.lock_session();
        let session = slot.as_ref().ok_or(CoreError::NotConnected)?;
        session
            .command_tx
            .send(batch)
            .map_err(|_| CoreError::NotConnected)
    }

    // ── State ────────────────────────────────────────────────────

    /// Read-only snapshot of the status table.
    pub fn status(&self) -> StatusSnapshot {
        self.inner.shared.table.snapshot()
    }

    pub fn status_value(&self, code: &str) -> Option<StatusValue> {
        self.inner.shared.table.get(code)
    }

    pub fn known_value(&self, code: StatusCode) -> Option<StatusValue> {
        self.inner.shared.table.get_known(code)
    }

    pub fn status_table(&self) -> &Arc<StatusTable> {
        &self.inner.shared.table
    }

    pub fn subscribe_status(&self) -> StatusStream {
        self.inner.shared.table.subscribe()
    }

    /// Pairs confirmed by each command acknowledgement from now on.
    /// Subscribe before sending to be sure to see the reply.
    pub fn subscribe_acks(&self) -> broadcast::Receiver<AckedValues> {
        self.inner.shared.table.subscribe_acks()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.inner.shared.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.inner.shared.phase.subscribe()
    }

    /// The appliance identifier: pre-seeded, or learnt from discovery.
    pub fn identifier(&self) -> Option<String> {
        self.inner.shared.identifier.borrow().clone()
    }

    /// Wait until the session reaches `Bound`.
    pub async fn wait_bound(&self, timeout: Duration) -> Result<(), CoreError> {
        if !self.is_running() {
            return Err(CoreError::NotConnected);
        }
        let mut rx = self.subscribe_phase();
        match tokio::time::timeout(timeout, rx.wait_for(|p| p.is_bound())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CoreError::NotConnected),
            Err(_) => Err(CoreError::timeout(timeout, "bind")),
        }
    }

    /// Wait for the next status-table mutation after this call.
    pub async fn wait_update(&self, timeout: Duration) -> Result<StatusSnapshot, CoreError> {
        let mut stream = self.subscribe_status();
        match tokio::time::timeout(timeout, stream.changed()).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(CoreError::NotConnected),
            Err(_) => Err(CoreError::timeout(timeout, "status update")),
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("remote", &self.inner.config.remote())
            .field("phase", &self.phase())
            .field("identifier", &self.identifier())
            .finish_non_exhaustive()
    }
}

impl DeviceInner {
    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<RunningSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = session.take() {
            session.cancel.cancel();
        }
    }
}

impl Shared {
    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_if_modified(|current| {
            if *current == phase {
                return false;
            }
            debug!(from = %current, to = %phase, "phase changed");
            *current = phase;
            true
        });
    }

    fn set_identifier(&self, identifier: Option<&str>) {
        self.identifier.send_if_modified(|current| {
            if current.as_deref() == identifier {
                return false;
            }
            *current = identifier.map(str::to_owned);
            true
        });
    }
}

// ── Session task ─────────────────────────────────────────────────

struct SessionTask {
    remote: std::net::SocketAddr,
    retry_interval: Duration,
    poll_interval: Duration,
    shared: Arc<Shared>,
    machine: SessionMachine,
}

/// The single pending retry: which phase it was armed for and when it fires.
type RetrySlot = Option<(SessionPhase, Instant)>;

async fn session_task(
    mut task: SessionTask,
    mut commands: mpsc::UnboundedReceiver<CommandBatch>,
    cancel: CancellationToken,
) {
    let Some(transport) = open_socket(task.remote, task.retry_interval, &cancel).await else {
        return;
    };

    let mut retry: RetrySlot = None;
    let mut poll: Option<Interval> = None;

    let actions = task.machine.socket_opened();
    task.execute(actions, &transport, &mut retry, &mut poll).await;

    loop {
        let retry_at = retry.map_or_else(Instant::now, |(_, at)| at);

        let actions = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = transport.recv() => match received {
                Ok(datagram) => match task.machine.decode(&datagram) {
                    Ok(response) => {
                        debug!(kind = response.kind(), "received");
                        task.machine.handle(response)
                    }
                    Err(e) if e.is_malformed_input() => {
                        debug!(error = %e, len = datagram.len(), "dropping undecodable datagram");
                        continue;
                    }
                    Err(e) => {
                        warn!(error = %e, "dropping datagram");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(error = %e, "receive failed");
                    continue;
                }
            },
            Some(batch) = commands.recv() => task.machine.command(batch),
            () = tokio::time::sleep_until(retry_at), if retry.is_some() => {
                let Some((armed_for, _)) = retry.take() else { continue };
                task.machine.retry_elapsed(armed_for)
            }
            () = tick(&mut poll), if poll.is_some() => task.machine.poll_elapsed(),
        };

        task.execute(actions, &transport, &mut retry, &mut poll).await;
    }

    task.machine.close();
    task.shared.set_phase(SessionPhase::Disconnected);
    debug!("session task stopped");
}

/// Bind the socket, retrying every `retry_interval` until it works or the
/// session is cancelled.
async fn open_socket(
    remote: std::net::SocketAddr,
    retry_interval: Duration,
    cancel: &CancellationToken,
) -> Option<UdpTransport> {
    loop {
        let attempt = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            attempt = UdpTransport::open(remote) => attempt,
        };
        match attempt {
            Ok(transport) => return Some(transport),
            Err(e) => {
                warn!(error = %e, retry_in = ?retry_interval, "failed to open socket, retrying");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return None,
                    () = tokio::time::sleep(retry_interval) => {}
                }
            }
        }
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl SessionTask {
    async fn execute(
        &self,
        actions: Vec<Action>,
        transport: &UdpTransport,
        retry: &mut RetrySlot,
        poll: &mut Option<Interval>,
    ) {
        for action in actions {
            match action {
                Action::Send(request) => match self.machine.encode(&request) {
                    Ok(datagram) => {
                        debug!(kind = request.kind(), "sending");
                        transport.send(&datagram).await;
                    }
                    Err(e) => warn!(error = %e, kind = request.kind(), "failed to encode request"),
                },
                Action::ArmRetry(phase) => {
                    *retry = Some((phase, Instant::now() + self.retry_interval));
                }
                Action::StartPolling => {
                    let mut interval = tokio::time::interval_at(
                        Instant::now() + self.poll_interval,
                        self.poll_interval,
                    );
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    *poll = Some(interval);
                }
                Action::Notify => self.shared.notifier.notify(),
            }
        }

        self.shared.set_phase(self.machine.phase());
        self.shared.set_identifier(self.machine.identifier());
    }
}
