//! TLS-terminating HTTP/1.1 daemon.
//!
//! The daemon owns the listening socket, the certificate material and the
//! shutdown lifecycle. Each accepted connection is served in its own task.
//! On shutdown the listener is closed, open connections are asked to finish
//! their in-flight request, and the daemon waits up to the grace period
//! before closing whatever is left.

use crate::error::DaemonError;
use crate::shutdown::ShutdownSignal;
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use rustls::pki_types::CertificateDer;
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_io_timeout::TimeoutStream;
use tokio_rustls::TlsAcceptor;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info, warn};
use warezbot_core::config::{HttpSettings, ServerConfig, TlsSettings};

/// Pause after a failed `accept` so that fd exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// PEM text for the server identity and the CA pool.
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    pub cert_pem: String,
    pub key_pem: String,
    pub ca_pem: String,
    /// Reject clients without a certificate chaining to the CA pool.
    pub require_client_cert: bool,
}

impl From<&TlsSettings> for TlsMaterial {
    fn from(settings: &TlsSettings) -> Self {
        Self {
            cert_pem: settings.cert_pem.clone(),
            key_pem: settings.key_pem.clone(),
            ca_pem: settings.ca_pem.clone(),
            require_client_cert: settings.require_client_cert,
        }
    }
}

/// Connection timeouts. A zero duration means "use the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeouts {
    /// Close a connection whose socket has been read-idle this long.
    pub idle: Duration,
    /// Bound on the TLS handshake and on reading request headers.
    pub read_header: Duration,
    /// Bound on request handling and socket writes.
    pub write: Duration,
}

impl Timeouts {
    /// Replace zero durations with the defaults.
    pub fn resolved(self) -> Self {
        fn or_default(value: Duration, default: Duration) -> Duration {
            if value.is_zero() {
                default
            } else {
                value
            }
        }
        Self {
            idle: or_default(self.idle, ServerConfig::IDLE_TIMEOUT),
            read_header: or_default(self.read_header, ServerConfig::READ_HEADER_TIMEOUT),
            write: or_default(self.write, ServerConfig::WRITE_TIMEOUT),
        }
    }
}

impl From<&HttpSettings> for Timeouts {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            idle: Duration::from_secs(settings.idle_timeout_secs),
            read_header: Duration::from_secs(settings.read_header_timeout_secs),
            write: Duration::from_secs(settings.write_timeout_secs),
        }
    }
}

/// Map a listen address of the form `:port` to all interfaces.
pub fn normalize_listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// Build the rustls server config from PEM material.
pub fn load_tls_config(material: &TlsMaterial) -> Result<rustls::ServerConfig, DaemonError> {
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut material.cert_pem.as_bytes())
            .collect::<Result<_, _>>()
            .map_err(|e| DaemonError::TlsConfig(format!("invalid certificate PEM: {}", e)))?;
    if certs.is_empty() {
        return Err(DaemonError::TlsConfig(
            "no certificates found in certificate PEM".into(),
        ));
    }

    let key = rustls_pemfile::private_key(&mut material.key_pem.as_bytes())
        .map_err(|e| DaemonError::TlsConfig(format!("invalid private key PEM: {}", e)))?
        .ok_or_else(|| DaemonError::TlsConfig("no private key found in key PEM".into()))?;

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut material.ca_pem.as_bytes()) {
        let cert = cert.map_err(|e| DaemonError::TlsConfig(format!("invalid CA PEM: {}", e)))?;
        roots
            .add(cert)
            .map_err(|e| DaemonError::TlsConfig(format!("invalid CA certificate: {}", e)))?;
    }
    if roots.is_empty() {
        return Err(DaemonError::TlsConfig(
            "failed to append CA certs: no certificates found".into(),
        ));
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| DaemonError::TlsConfig(e.to_string()))?;
    let builder = if material.require_client_cert {
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| DaemonError::TlsConfig(format!("invalid client verifier: {}", e)))?;
        builder.with_client_cert_verifier(verifier)
    } else {
        builder.with_no_client_auth()
    };

    let mut config = builder
        .with_single_cert(certs, key)
        .map_err(|e| DaemonError::TlsConfig(format!("failed to load x509 key pair: {}", e)))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

/// HTTPS server for the webhook router.
pub struct HttpsDaemon {
    acceptor: TlsAcceptor,
    router: Router,
    timeouts: Timeouts,
    grace_period: Duration,
}

impl HttpsDaemon {
    /// Parse the TLS material and prepare the router. Fails if any PEM input
    /// is unusable.
    pub fn new(
        material: &TlsMaterial,
        router: Router,
        timeouts: Timeouts,
    ) -> Result<Self, DaemonError> {
        let config = load_tls_config(material)?;
        let timeouts = timeouts.resolved();
        Ok(Self {
            acceptor: TlsAcceptor::from(Arc::new(config)),
            router: router.layer(TimeoutLayer::new(timeouts.write)),
            timeouts,
            grace_period: ServerConfig::SHUTDOWN_GRACE_PERIOD,
        })
    }

    /// Override how long shutdown waits for in-flight requests.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Serve until SIGINT, SIGTERM or SIGHUP.
    pub async fn run(self, listen_addr: &str) -> Result<(), DaemonError> {
        let signal = ShutdownSignal::install().map_err(DaemonError::Signal)?;
        self.run_until(listen_addr, signal.recv()).await
    }

    /// Bind `listen_addr` and serve until `shutdown` resolves.
    ///
    /// A bind failure takes the same path as a requested shutdown: it is
    /// logged and the call returns `Ok`.
    pub async fn run_until<F>(self, listen_addr: &str, shutdown: F) -> Result<(), DaemonError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = normalize_listen_addr(listen_addr);
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to start HTTPS server on {}: {}", addr, e);
                info!("Terminating HTTPS server");
                return Ok(());
            }
        };
        self.serve(listener, shutdown).await
    }

    /// Serve an already-bound listener until `shutdown` resolves, then drain.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), DaemonError>
    where
        F: Future<Output = ()> + Send,
    {
        if let Ok(addr) = listener.local_addr() {
            info!("Starting HTTPS server on {}", addr);
        }

        let (quit_tx, quit_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            self.acceptor.clone(),
                            self.router.clone(),
                            self.timeouts,
                            quit_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!("Connection task failed: {}", e);
                    }
                }
            }
        }

        drop(listener);
        info!("Terminating HTTPS server");
        let _ = quit_tx.send(true);

        let grace = self.grace_period;
        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => {
                info!("HTTPS server stopped");
                Ok(())
            }
            Err(_) => {
                warn!(
                    "{} connection(s) still open after {:?}, closing them",
                    connections.len(),
                    grace
                );
                connections.abort_all();
                Err(DaemonError::ShutdownTimedOut(grace))
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    router: Router,
    timeouts: Timeouts,
    mut quit: watch::Receiver<bool>,
) {
    let tls = match tokio::time::timeout(timeouts.read_header, acceptor.accept(stream)).await {
        Ok(Ok(tls)) => tls,
        Ok(Err(e)) => {
            debug!("TLS handshake with {} failed: {}", peer, e);
            return;
        }
        Err(_) => {
            debug!("TLS handshake with {} timed out", peer);
            return;
        }
    };

    let mut io = TimeoutStream::new(tls);
    io.set_read_timeout(Some(timeouts.idle));
    io.set_write_timeout(Some(timeouts.write));
    let io = TokioIo::new(Box::pin(io));

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read_header)
        .keep_alive(true);
    let conn = builder.serve_connection(io, TowerToHyperService::new(router));
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = quit.changed() => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };
    if let Err(e) = result {
        debug!("Connection from {} closed with error: {}", peer, e);
    }
}
