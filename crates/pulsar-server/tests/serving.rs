//! End-to-end tests against a real socket.

use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pulsar_config::{ConfigResolver, Options};
use pulsar_server::{AppRequest, AppResponse, Launcher, LauncherState};
use std::sync::Arc;

fn launcher(options: Options) -> Launcher {
    let config = ConfigResolver::new()
        .with_options(&options.silent(true))
        .resolve()
        .unwrap();
    Launcher::new(config)
}

fn refused_within(addr: SocketAddr, window: Duration) -> bool {
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        if TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_err() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn test_request_reaches_application() {
    let seen: Arc<Mutex<Option<AppRequest>>> = Arc::default();
    let app = {
        let seen = Arc::clone(&seen);
        move |req: AppRequest| {
            let body = format!("{} {}", req.method, req.path_info);
            *seen.lock() = Some(req);
            AppResponse::text(200, body)
        }
    };

    let launcher = launcher(Options::new().host("127.0.0.1").port(0));
    let (ready_tx, ready_rx) = mpsc::channel();
    launcher
        .boot(app, move |l, _| ready_tx.send(l.connected_port()).unwrap())
        .unwrap();

    let port = ready_rx
        .recv_timeout(Duration::from_secs(5))
        .unwrap()
        .expect("running launcher has a port");
    assert!(port > 0);

    let response = reqwest::blocking::get(format!("http://127.0.0.1:{port}/test?x=1")).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().unwrap(), "GET /test");

    {
        let seen = seen.lock();
        let req = seen.as_ref().expect("application was called");
        assert_eq!(req.path_info, "/test");
        assert_eq!(req.query_string, "x=1");
        assert_eq!(req.server_port, Some(port));
        assert!(req.remote_addr.is_some());
    }

    launcher.stop();
}

#[test]
fn test_connection_refused_after_stop() {
    let launcher = launcher(Options::new().host("127.0.0.1").port(0));
    launcher
        .boot(|_req: AppRequest| AppResponse::new(204), |_, _| {})
        .unwrap();
    let addr: SocketAddr = ([127, 0, 0, 1], launcher.connected_port().unwrap()).into();

    launcher.stop();
    launcher.stop();

    assert_eq!(launcher.state(), LauncherState::Stopped);
    assert!(refused_within(addr, Duration::from_secs(2)));
}

#[test]
fn test_panicking_application_returns_500() {
    let launcher = launcher(Options::new().host("127.0.0.1").port(0));
    launcher
        .boot(
            |req: AppRequest| -> AppResponse { panic!("boom at {}", req.path_info) },
            |_, _| {},
        )
        .unwrap();
    let port = launcher.connected_port().unwrap();

    let response = reqwest::blocking::get(format!("http://127.0.0.1:{port}/explode")).unwrap();
    assert_eq!(response.status(), 500);

    launcher.stop();
}

#[test]
fn test_multiple_binds() {
    let launcher = launcher(Options::new().binds(["tcp://127.0.0.1:0", "tcp://127.0.0.1:0"]));
    let (ready_tx, ready_rx) = mpsc::channel();
    launcher
        .boot(
            |req: AppRequest| AppResponse::text(200, req.server_port.unwrap_or(0).to_string()),
            move |_, event| ready_tx.send(event.bound().to_vec()).unwrap(),
        )
        .unwrap();

    let bound = ready_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(bound.len(), 2);

    for addr in &bound {
        let port = addr.port().unwrap();
        let body = reqwest::blocking::get(format!("http://127.0.0.1:{port}/"))
            .unwrap()
            .text()
            .unwrap();
        assert_eq!(body, port.to_string());
    }

    launcher.stop();
}

#[test]
fn test_stop_from_application_thread() {
    let slot: Arc<Mutex<Option<Launcher>>> = Arc::default();
    let app = {
        let slot = Arc::clone(&slot);
        move |_req: AppRequest| {
            if let Some(launcher) = slot.lock().as_ref() {
                launcher.stop();
            }
            AppResponse::new(204)
        }
    };

    let launcher = launcher(Options::new().host("127.0.0.1").port(0));
    *slot.lock() = Some(launcher.clone());
    launcher.boot(app, |_, _| {}).unwrap();
    let port = launcher.connected_port().unwrap();

    // The connection may be closed before the response is written.
    let _ = reqwest::blocking::get(format!("http://127.0.0.1:{port}/stop"));

    launcher.wait();
    assert_eq!(launcher.state(), LauncherState::Stopped);
}

#[cfg(unix)]
#[test]
fn test_unix_socket_bind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulsar.sock");

    let launcher = launcher(Options::new().host(path.to_string_lossy()));
    launcher
        .boot(|_req: AppRequest| AppResponse::new(204), |_, _| {})
        .unwrap();

    assert!(path.exists());
    assert_eq!(launcher.connected_port(), None);

    launcher.stop();
    assert!(!path.exists());
}

#[test]
fn test_hung_application_does_not_block_stop() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let entered_tx = Mutex::new(entered_tx);
    let app = move |_req: AppRequest| {
        let _ = entered_tx.lock().send(());
        thread::sleep(Duration::from_secs(5));
        AppResponse::new(204)
    };

    let launcher = launcher(Options::new().host("127.0.0.1").port(0));
    launcher.boot(app, |_, _| {}).unwrap();
    let port = launcher.connected_port().unwrap();

    let client = thread::spawn(move || {
        let _ = reqwest::blocking::get(format!("http://127.0.0.1:{port}/slow"));
    });
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let started = Instant::now();
    launcher.stop();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(launcher.state(), LauncherState::Stopped);
    assert!(refused_within(
        SocketAddr::from(([127, 0, 0, 1], port)),
        Duration::from_secs(2)
    ));
    client.join().unwrap();
}
