//! `HttpsDaemon::run` stops on a termination signal.
//!
//! Kept in its own test binary so the raised signals reach no other test.

#![cfg(unix)]

use nix::sys::signal::{raise, Signal};
use std::time::Duration;
use warezbot_daemon::shutdown::ShutdownSignal;
use warezbot_daemon::{HttpsDaemon, Timeouts, TlsMaterial};

fn material() -> TlsMaterial {
    TlsMaterial {
        cert_pem: include_str!("fixtures/server.pem").to_string(),
        key_pem: include_str!("fixtures/server.key").to_string(),
        ca_pem: include_str!("fixtures/ca.pem").to_string(),
        require_client_cert: false,
    }
}

#[tokio::test]
async fn test_sigterm_stops_run_cleanly() {
    // Registering a handler first keeps SIGTERM from taking the default
    // action while `run` is still installing its own.
    let _guard = ShutdownSignal::install().unwrap();

    let daemon = HttpsDaemon::new(&material(), axum::Router::new(), Timeouts::default())
        .unwrap();
    let run = tokio::spawn(async move { daemon.run("127.0.0.1:0").await });

    let result = tokio::time::timeout(Duration::from_secs(10), async {
        // A signal raised before `run` registers is not seen by it, so keep
        // raising until the daemon returns.
        loop {
            raise(Signal::SIGTERM).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            if run.is_finished() {
                break;
            }
        }
        run.await.unwrap()
    })
    .await
    .unwrap();

    assert!(result.is_ok());
}
