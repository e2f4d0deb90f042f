//! Status output of the launcher, captured through a global subscriber.
//!
//! Kept in its own test binary so the subscriber sees only this test.

use std::io;
use std::net::TcpListener;
use std::sync::Arc;

use parking_lot::Mutex;
use pulsar_config::{ConfigResolver, Options};
use pulsar_server::{AppRequest, AppResponse, Launcher};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn stopped_lines(&self) -> usize {
        let bytes = self.0.lock();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.trim_end().ends_with("stopped"))
            .count()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn launcher(options: Options) -> Launcher {
    let config = ConfigResolver::new().with_options(&options).resolve().unwrap();
    Launcher::new(config)
}

fn app(_req: AppRequest) -> AppResponse {
    AppResponse::new(204)
}

#[test]
fn test_stopped_reported_only_after_successful_boot() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let failed = launcher(Options::new().host("127.0.0.1").port(port));
    assert!(failed.boot(app, |_, _| {}).unwrap_err().is_bind_error());
    assert_eq!(captured.stopped_lines(), 0);

    let served = launcher(Options::new().host("127.0.0.1").port(0));
    served.boot(app, |_, _| {}).unwrap();
    served.stop();
    assert_eq!(captured.stopped_lines(), 1);
}
