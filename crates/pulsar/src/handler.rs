//! The `config` and `run` entry points.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use pulsar_config::{ConfigResolver, EffectiveConfig, Options};
use pulsar_server::{Application, Launcher, ReadyEvent, SharedApp};
use pulsar_telemetry::LogConfig;

use crate::Result;

type AppBuilder<A> = Box<dyn FnOnce() -> A + Send>;

/// Resolved configuration plus a lazily built application.
///
/// Returned by [`config`]. The application builder runs at most once, the
/// first time the application is needed.
pub struct Configuration<A> {
    effective: Arc<EffectiveConfig>,
    app: OnceLock<Arc<A>>,
    builder: Mutex<Option<AppBuilder<A>>>,
}

impl<A> Configuration<A> {
    /// The resolved configuration.
    pub fn effective(&self) -> &EffectiveConfig {
        &self.effective
    }

    /// The application, built on first access.
    ///
    /// # Panics
    ///
    /// Panics if an earlier call's builder panicked.
    pub fn app(&self) -> &A {
        self.shared_app()
    }

    /// Returns `true` once the application has been built.
    pub fn is_app_built(&self) -> bool {
        self.app.get().is_some()
    }

    /// A new idle launcher for this configuration.
    pub fn launcher(&self) -> Launcher {
        Launcher::new(Arc::clone(&self.effective))
    }

    /// Logging settings matching this configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig::for_config(&self.effective)
    }

    /// Installs the global subscriber from [`log_config`](Self::log_config).
    ///
    /// Fails if the host already installed one.
    pub fn init_logging(&self) -> Result<()> {
        pulsar_telemetry::init_logging(&self.log_config())?;
        Ok(())
    }

    fn shared_app(&self) -> &Arc<A> {
        self.app.get_or_init(|| match self.builder.lock().take() {
            Some(build) => Arc::new(build()),
            None => panic!("application builder panicked on an earlier call"),
        })
    }
}

impl<A: Application> Configuration<A> {
    /// Boots the application, runs `on_ready` once listening, then blocks
    /// until the launcher is stopped.
    pub fn run<F>(&self, on_ready: F) -> Result<()>
    where
        F: FnOnce(&Launcher, &ReadyEvent),
    {
        let app: Arc<dyn Application> = Arc::<A>::clone(self.shared_app());
        let launcher = self.launcher();

        launcher.boot(SharedApp::from(app), on_ready)?;
        launcher.wait();
        Ok(())
    }
}

impl<A> fmt::Debug for Configuration<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("effective", &self.effective)
            .field("app_built", &self.is_app_built())
            .finish()
    }
}

/// Resolves configuration for an application.
///
/// Merges defaults, the configuration script under the base directory and
/// `options`. `app_builder` is not called here.
///
/// # Example
///
/// ```no_run
/// use pulsar::{AppRequest, AppResponse, OptionKey, Options};
///
/// # fn main() -> pulsar::Result<()> {
/// let options = Options::new().port(5001).user_supplied_options([OptionKey::Port]);
/// let config = pulsar::config(|| |_req: AppRequest| AppResponse::ok("hi"), options)?;
///
/// assert_eq!(config.effective().bind_urls(), vec!["tcp://0.0.0.0:5001"]);
/// # Ok(())
/// # }
/// ```
pub fn config<A, B>(app_builder: B, options: Options) -> Result<Configuration<A>>
where
    B: FnOnce() -> A + Send + 'static,
{
    let effective = ConfigResolver::resolve_options(&options)?;
    tracing::debug!(binds = ?effective.bind_urls(), "configuration resolved");

    Ok(Configuration {
        effective: Arc::new(effective),
        app: OnceLock::new(),
        builder: Mutex::new(Some(Box::new(app_builder))),
    })
}

/// Serves `app` until stopped.
///
/// Resolves configuration, boots, calls `on_ready` exactly once when every
/// listener is bound and blocks the calling thread until the launcher
/// passed to `on_ready` is stopped.
///
/// # Errors
///
/// Configuration and bind failures are returned before `on_ready` could
/// run.
pub fn run<A, F>(app: A, options: Options, on_ready: F) -> Result<()>
where
    A: Application,
    F: FnOnce(&Launcher, &ReadyEvent),
{
    config(move || app, options)?.run(on_ready)
}

/// Help text for the recognized caller options.
pub fn valid_options() -> &'static [(&'static str, &'static str)] {
    pulsar_config::valid_options()
}
