use std::path::Path;

use streamframe_transport::{UnixDomainSocket, UnixStreamTransport};

use crate::error::Result;
use crate::handler::ConnectionHandler;
use crate::monitor::{Connection, ConnectionConfig};

/// Connect to a listening Unix domain socket and attach `handler`.
pub fn connect<H>(path: impl AsRef<Path>, handler: H) -> Result<Connection<UnixStreamTransport, H>>
where
    H: ConnectionHandler,
{
    connect_with_config(path, handler, ConnectionConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config<H>(
    path: impl AsRef<Path>,
    handler: H,
    config: ConnectionConfig,
) -> Result<Connection<UnixStreamTransport, H>>
where
    H: ConnectionHandler,
{
    let transport = UnixDomainSocket::connect(path)?;
    Ok(Connection::attach_with_config(transport, handler, config))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use streamframe_transport::TransportError;

    use super::*;
    use crate::error::ConnectionError;
    use crate::listener::ConnectionListener;

    fn make_sock_path(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sfc-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("conn.sock")
    }

    #[test]
    fn connect_and_send() {
        let sock_path = make_sock_path("connect");
        let listener = ConnectionListener::bind(&sock_path).expect("listener should bind");

        let mut client = connect(&sock_path, Vec::<Bytes>::new()).expect("client should connect");
        let mut server = listener
            .accept(Vec::<Bytes>::new())
            .expect("listener should accept");

        client.send_frame(b"hello").expect("send should succeed");

        while server.frames_received() == 0 {
            assert!(server
                .transport()
                .poll_readable(Some(Duration::from_secs(2)))
                .expect("poll should succeed"));
            server.on_readable().expect("read should succeed");
        }
        assert_eq!(server.handler(), &vec![Bytes::from_static(b"hello")]);

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let sock_path = make_sock_path("missing");

        let err = connect(&sock_path, Vec::<Bytes>::new()).unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Transport(TransportError::Connect { .. })
        ));

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
