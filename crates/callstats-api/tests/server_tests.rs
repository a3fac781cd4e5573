//! Listener lifecycle tests over a real socket.
//!
//! The server is bound to an ephemeral port and spoken to with a plain
//! HTTP/1.1 request over a `TcpStream`, then stopped through its shutdown
//! future.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use callstats_api::{AppState, CredentialStore, ServerError, bind, serve};
use callstats_core::config::HttpConfig;
use callstats_core::directory::{DirectoryStore, MemoryDirectoryStore};
use callstats_core::monitor::MonitorService;
use callstats_core::provision::Provisioner;
use callstats_core::queues::QueueService;
use callstats_core::registry::StaticQueueRegistry;
use callstats_esl::{CommandSet, ScriptedConnector};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

fn state() -> Arc<AppState<ScriptedConnector>> {
    let connector = Arc::new(ScriptedConnector::new());
    let directory: Arc<dyn DirectoryStore> = Arc::new(MemoryDirectoryStore::new());
    let queues = QueueService::new(
        Arc::clone(&connector),
        Arc::new(StaticQueueRegistry::new(["support", "sales"])),
        Arc::clone(&directory),
        CommandSet::default(),
        "default",
    );
    let monitor = MonitorService::new(Arc::clone(&connector), CommandSet::default());
    let provisioner = Provisioner::new(connector, directory);
    Arc::new(AppState::new(
        queues,
        monitor,
        provisioner,
        CredentialStore::Static(String::from("letmein")),
    ))
}

fn loopback() -> HttpConfig {
    HttpConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    }
}

async fn http_get(addr: std::net::SocketAddr, path: &str, key: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {path} HTTP/1.1\r\nHost: localhost\r\nX-Access-Key: {key}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_until_shutdown() {
    let listener = bind(&loopback()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, state(), async move {
        let _ = stopped.await;
    }));

    let response = http_get(addr, "/queues/fetch", "letmein").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#"{"msg":["sales","support"]}"#), "{response}");

    let response = http_get(addr, "/queues/fetch", "wrong").await;
    assert!(response.starts_with("HTTP/1.1 401"), "{response}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn malformed_host_is_a_bind_error() {
    let config = HttpConfig {
        host: String::from("not an address"),
        port: 8080,
    };
    assert!(matches!(bind(&config).await, Err(ServerError::Bind(_))));
}

#[tokio::test]
async fn port_in_use_is_a_bind_error() {
    let first = bind(&loopback()).await.unwrap();
    let taken = HttpConfig {
        host: String::from("127.0.0.1"),
        port: first.local_addr().unwrap().port(),
    };
    assert!(matches!(bind(&taken).await, Err(ServerError::Bind(_))));
}
