//! The launcher: boots a server on its own thread and stops it.
//!
//! A [`Launcher`] is a cloneable handle. Booting spawns a dedicated OS
//! thread (`pulsar-server`) that owns a multi-threaded tokio runtime, binds
//! every configured address and serves until stopped. The booting thread
//! blocks until the bind has succeeded or failed, then runs the readiness
//! callback on its own stack.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Booting -> Running -> Stopped
//!            \___________________/
//!               (boot failure)
//! ```
//!
//! Nothing leaves `Stopped`.
//!
//! # Example
//!
//! ```no_run
//! use pulsar_config::{ConfigResolver, Options};
//! use pulsar_server::{AppRequest, AppResponse, Launcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigResolver::resolve_options(&Options::new().port(0))?;
//! let launcher = Launcher::new(config);
//!
//! launcher.boot(
//!     |req: AppRequest| AppResponse::text(200, req.path_info),
//!     |launcher, _event| println!("listening on {:?}", launcher.connected_port()),
//! )?;
//!
//! launcher.stop();
//! # Ok(())
//! # }
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use pulsar_config::EffectiveConfig;

use crate::app::Application;
use crate::events::Events;
use crate::server::{self, BoundAddr};
use crate::shutdown::ShutdownSignal;
use crate::ServerError;

/// Name of the server thread.
pub const SERVER_THREAD_NAME: &str = "pulsar-server";

/// How long runtime teardown waits for blocked application calls.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

static NEXT_LAUNCHER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Launcher whose server thread or runtime owns the current thread.
    static OWNING_LAUNCHER: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Lifecycle state of a [`Launcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LauncherState {
    /// Created, not yet booted.
    Idle,
    /// Binding listeners.
    Booting,
    /// Every listener is bound and serving.
    Running,
    /// Listeners are closed. Terminal.
    Stopped,
}

impl fmt::Display for LauncherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Booting => "booting",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Passed to the readiness callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyEvent {
    bound: Vec<BoundAddr>,
    boot_duration: Duration,
}

impl ReadyEvent {
    /// Every address the server listens on, in bind order.
    pub fn bound(&self) -> &[BoundAddr] {
        &self.bound
    }

    /// Time from the `boot` call until every listener was bound.
    pub fn boot_duration(&self) -> Duration {
        self.boot_duration
    }
}

type BootOutcome = Result<Vec<BoundAddr>, ServerError>;

struct Shared {
    state: LauncherState,
    bound: Vec<BoundAddr>,
    // Bind result reported by the server thread, taken by `boot`.
    boot: Option<BootOutcome>,
}

struct Inner {
    id: u64,
    config: Arc<EffectiveConfig>,
    events: Events,
    shared: Mutex<Shared>,
    changed: Condvar,
    shutdown: ShutdownSignal,
    os_signals: AtomicBool,
}

impl Inner {
    fn report_boot(&self, outcome: BootOutcome) {
        let mut shared = self.shared.lock();
        shared.boot = Some(outcome);
        self.changed.notify_all();
    }

    fn finish(&self) {
        let mut shared = self.shared.lock();
        shared.state = LauncherState::Stopped;
        shared.bound.clear();
        self.changed.notify_all();
    }

    fn owns_current_thread(&self) -> bool {
        OWNING_LAUNCHER.with(|owner| owner.get() == Some(self.id))
    }
}

// Marks the launcher stopped even if the server thread unwinds.
struct FinishOnDrop(Arc<Inner>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Handle to a server instance.
///
/// Clones refer to the same server.
#[derive(Clone)]
pub struct Launcher {
    inner: Arc<Inner>,
}

impl Launcher {
    /// Creates an idle launcher for `config`.
    pub fn new(config: impl Into<Arc<EffectiveConfig>>) -> Self {
        let config = config.into();
        let events = Events::for_config(&config);
        let os_signals = AtomicBool::new(config.signals());
        Self {
            inner: Arc::new(Inner {
                id: NEXT_LAUNCHER_ID.fetch_add(1, Ordering::Relaxed),
                config,
                events,
                shared: Mutex::new(Shared {
                    state: LauncherState::Idle,
                    bound: Vec::new(),
                    boot: None,
                }),
                changed: Condvar::new(),
                shutdown: ShutdownSignal::new(),
                os_signals,
            }),
        }
    }

    /// Makes SIGINT and SIGTERM stop the server.
    ///
    /// Defaults to the `Signals` option. Takes effect at the next boot.
    #[must_use]
    pub fn handle_os_signals(self, enabled: bool) -> Self {
        self.inner.os_signals.store(enabled, Ordering::SeqCst);
        self
    }

    /// Returns `true` if SIGINT and SIGTERM will stop the server.
    pub fn handles_os_signals(&self) -> bool {
        self.inner.os_signals.load(Ordering::SeqCst)
    }

    /// The configuration this launcher boots from.
    pub fn config(&self) -> &EffectiveConfig {
        &self.inner.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LauncherState {
        self.inner.shared.lock().state
    }

    /// Returns `true` while the server is running.
    pub fn is_running(&self) -> bool {
        self.state() == LauncherState::Running
    }

    /// Addresses the server listens on. Empty unless running.
    pub fn bound_addrs(&self) -> Vec<BoundAddr> {
        self.inner.shared.lock().bound.clone()
    }

    /// Port of the first TCP listener. `None` unless running.
    pub fn connected_port(&self) -> Option<u16> {
        let shared = self.inner.shared.lock();
        if shared.state != LauncherState::Running {
            return None;
        }
        shared.bound.iter().find_map(BoundAddr::port)
    }

    /// The shutdown signal shared with the serving loop.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.inner.shutdown.clone()
    }

    /// Boots the server and runs `on_ready` once every listener is bound.
    ///
    /// Blocks until the bind has completed, then invokes `on_ready` exactly
    /// once on the calling thread and returns. The server keeps running on
    /// its own thread until [`stop`](Self::stop). The launcher reports
    /// `Running` and a [`connected_port`](Self::connected_port) only from the
    /// moment `on_ready` is invoked.
    ///
    /// If the launcher is stopped while booting, `on_ready` is skipped and
    /// `boot` returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if any address cannot be bound. In that
    /// case `on_ready` is not called, no socket stays open and the launcher
    /// is `Stopped`. A launcher can only boot once.
    pub fn boot<A, F>(&self, app: A, on_ready: F) -> Result<(), ServerError>
    where
        A: Application,
        F: FnOnce(&Launcher, &ReadyEvent),
    {
        let started = Instant::now();
        self.begin_boot()?;
        self.spawn_server(Arc::new(app))?;
        self.await_ready(started, on_ready)
    }

    fn begin_boot(&self) -> Result<(), ServerError> {
        let mut shared = self.inner.shared.lock();
        if shared.state != LauncherState::Idle {
            return Err(ServerError::Unsupported(format!(
                "launcher is {}, it can only boot once",
                shared.state
            )));
        }
        shared.state = LauncherState::Booting;
        Ok(())
    }

    fn spawn_server(&self, app: Arc<dyn Application>) -> Result<(), ServerError> {
        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name(SERVER_THREAD_NAME.to_string())
            .spawn(move || {
                let _finish = FinishOnDrop(Arc::clone(&inner));
                run_server(&inner, app);
            });

        spawned.map(drop).map_err(|e| {
            self.inner.finish();
            ServerError::ThreadSpawn(e)
        })
    }

    fn await_ready<F>(&self, started: Instant, on_ready: F) -> Result<(), ServerError>
    where
        F: FnOnce(&Launcher, &ReadyEvent),
    {
        let mut shared = self.inner.shared.lock();
        let outcome = loop {
            if let Some(outcome) = shared.boot.take() {
                break Some(outcome);
            }
            if shared.state == LauncherState::Stopped {
                break None;
            }
            self.inner.changed.wait(&mut shared);
        };

        let bound = match outcome {
            Some(Ok(bound)) => bound,
            Some(Err(e)) => {
                drop(shared);
                self.wait();
                return Err(e);
            }
            None => {
                return Err(ServerError::Runtime(std::io::Error::other(
                    "server thread exited before binding",
                )))
            }
        };

        if shared.state != LauncherState::Booting || self.inner.shutdown.is_shutdown() {
            tracing::debug!(state = %shared.state, "stopped while booting, skipping ready callback");
            return Ok(());
        }

        let event = ReadyEvent {
            bound,
            boot_duration: started.elapsed(),
        };
        for addr in &event.bound {
            self.inner.events.listening(addr);
        }
        self.inner.events.ready(event.boot_duration);

        shared.state = LauncherState::Running;
        shared.bound = event.bound.clone();
        drop(shared);

        on_ready(self, &event);
        Ok(())
    }

    /// Stops the server and waits until its sockets are released.
    ///
    /// Idempotent and callable from any thread. Does nothing on a launcher
    /// that never booted. Called from within the server's own runtime it
    /// only signals, since waiting there would never finish.
    ///
    /// Application calls still blocked after a short grace period are
    /// detached rather than joined: their threads may outlive `stop`, but
    /// they no longer hold any listener.
    pub fn stop(&self) {
        let mut shared = self.inner.shared.lock();
        match shared.state {
            LauncherState::Idle | LauncherState::Stopped => return,
            LauncherState::Booting | LauncherState::Running => {}
        }

        self.inner.shutdown.trigger();
        if self.inner.owns_current_thread() {
            tracing::debug!("stop requested from the server runtime, not waiting");
            return;
        }

        while shared.state != LauncherState::Stopped {
            self.inner.changed.wait(&mut shared);
        }
    }

    /// Blocks until the launcher is stopped.
    ///
    /// Returns immediately if it never booted.
    pub fn wait(&self) {
        if self.inner.owns_current_thread() {
            return;
        }
        let mut shared = self.inner.shared.lock();
        while matches!(
            shared.state,
            LauncherState::Booting | LauncherState::Running
        ) {
            self.inner.changed.wait(&mut shared);
        }
    }
}

impl fmt::Debug for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.inner.shared.lock();
        f.debug_struct("Launcher")
            .field("id", &self.inner.id)
            .field("state", &shared.state)
            .field("bound", &shared.bound)
            .finish_non_exhaustive()
    }
}

fn run_server(inner: &Arc<Inner>, app: Arc<dyn Application>) {
    let id = inner.id;
    OWNING_LAUNCHER.with(|owner| owner.set(Some(id)));

    let threads = inner.config.threads();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads.min.max(1))
        .max_blocking_threads(threads.max)
        .thread_name("pulsar-worker")
        .on_thread_start(move || OWNING_LAUNCHER.with(|owner| owner.set(Some(id))))
        .enable_all()
        .build();

    let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(e) => {
            inner.report_boot(Err(ServerError::Runtime(e)));
            return;
        }
    };

    let events = inner.events;
    events.booting(&inner.config);

    let served = runtime.block_on(async {
        let listeners = match server::bind_all(inner.config.binds()).await {
            Ok(listeners) => listeners,
            Err(e) => {
                tracing::error!(error = %e, "boot failed");
                inner.report_boot(Err(e));
                return false;
            }
        };

        if inner.os_signals.load(Ordering::SeqCst) {
            inner.shutdown.trigger_on_os_signals();
        }

        let bound = listeners.iter().map(|(_, addr)| addr.clone()).collect();
        inner.report_boot(Ok(bound));

        server::serve(listeners, app, events, inner.shutdown.clone()).await;
        true
    });

    // Blocked application calls past the timeout are detached.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    if served {
        events.stopped();
    }
}
