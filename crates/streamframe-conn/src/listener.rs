use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use streamframe_frame::FrameConfig;
use streamframe_transport::{UnixDomainSocket, UnixStreamTransport};
use tracing::debug;

use crate::error::Result;
use crate::handler::ConnectionHandler;
use crate::monitor::{Connection, ConnectionConfig};

/// Listens for and accepts framed connections on a Unix domain socket.
pub struct ConnectionListener {
    socket: UnixDomainSocket,
    config: ConnectionConfig,
    accepted: AtomicU64,
}

impl ConnectionListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let socket = UnixDomainSocket::bind(path)?;
        Ok(Self {
            socket,
            config: ConnectionConfig::default(),
            accepted: AtomicU64::new(0),
        })
    }

    /// Override the configuration applied to accepted connections.
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the frame size bound for accepted connections.
    pub fn with_max_payload(mut self, max_payload_size: usize) -> Self {
        self.config.frame = FrameConfig::with_max_payload(max_payload_size);
        self
    }

    /// Accept the next connection (blocking) and attach `handler`.
    pub fn accept<H>(&self, handler: H) -> Result<Connection<UnixStreamTransport, H>>
    where
        H: ConnectionHandler,
    {
        self.accept_with_config(handler, self.config.clone())
    }

    /// Accept the next connection with a per-connection configuration.
    pub fn accept_with_config<H>(
        &self,
        handler: H,
        config: ConnectionConfig,
    ) -> Result<Connection<UnixStreamTransport, H>>
    where
        H: ConnectionHandler,
    {
        let transport = self.socket.accept()?;
        let seq = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(seq, peer = ?transport.peer_credentials(), "accepted framed connection");
        Ok(Connection::attach_with_config(transport, handler, config))
    }

    /// Number of connections accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Configuration applied to accepted connections.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::thread;

    use bytes::Bytes;

    use super::*;
    use crate::connector::connect;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sfl-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("listener.sock")
    }

    #[test]
    fn accepts_multiple_sequential_connections() {
        let sock_path = make_sock_path("multi");
        let listener = ConnectionListener::bind(&sock_path).expect("listener should bind");
        assert_eq!(listener.path(), sock_path.as_path());

        let path = sock_path.clone();
        let clients = thread::spawn(move || {
            let c1 = connect(&path, Vec::<Bytes>::new()).expect("first client should connect");
            let c2 = connect(&path, Vec::<Bytes>::new()).expect("second client should connect");
            (c1, c2)
        });

        let first = listener.accept(Vec::<Bytes>::new()).expect("first accept");
        let second = listener.accept(Vec::<Bytes>::new()).expect("second accept");
        let _clients = clients.join().expect("client thread should finish");

        assert!(first.is_open());
        assert!(second.is_open());
        assert_eq!(listener.accepted(), 2);

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn accepted_connections_use_listener_limit() {
        let sock_path = make_sock_path("limit");
        let listener = ConnectionListener::bind(&sock_path)
            .expect("listener should bind")
            .with_max_payload(8);

        let _client = connect(&sock_path, Vec::<Bytes>::new()).expect("client should connect");
        let mut server = listener.accept(Vec::<Bytes>::new()).expect("accept");

        assert_eq!(listener.config().frame.max_payload_size, 8);
        assert!(server.send_frame(b"way more than eight").is_err());
        assert!(server.is_open());

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn per_connection_config_overrides_listener() {
        let sock_path = make_sock_path("override");
        let listener = ConnectionListener::bind(&sock_path).expect("listener should bind");

        let _client = connect(&sock_path, Vec::<Bytes>::new()).expect("client should connect");
        let mut server = listener
            .accept_with_config(
                Vec::<Bytes>::new(),
                ConnectionConfig {
                    frame: FrameConfig::with_max_payload(2),
                    ..ConnectionConfig::default()
                },
            )
            .expect("accept");

        assert!(server.send_frame(b"abc").is_err());
        server.send_frame(b"ab").expect("small frame should send");
        assert_eq!(
            listener.config().frame.max_payload_size,
            streamframe_frame::DEFAULT_MAX_PAYLOAD
        );

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
