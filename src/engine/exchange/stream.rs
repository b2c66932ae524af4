use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// A connected duplex byte stream to a worker.
///
/// The session keeps one handle for shutdown and hands clones to its reader and
/// writer, so shutting the original down unblocks both.
pub trait ExchangeStream: Read + Write + Send + Sync + 'static {
    fn try_clone_stream(&self) -> io::Result<Self>
    where
        Self: Sized;

    fn shutdown_stream(&self, how: Shutdown) -> io::Result<()>;

    fn describe(&self) -> String {
        "stream".to_string()
    }
}

impl ExchangeStream for TcpStream {
    fn try_clone_stream(&self) -> io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_stream(&self, how: Shutdown) -> io::Result<()> {
        self.shutdown(how)
    }

    fn describe(&self) -> String {
        self.peer_addr()
            .map(|addr| format!("tcp://{addr}"))
            .unwrap_or_else(|_| "tcp://<disconnected>".to_string())
    }
}

#[cfg(unix)]
impl ExchangeStream for UnixStream {
    fn try_clone_stream(&self) -> io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_stream(&self, how: Shutdown) -> io::Result<()> {
        self.shutdown(how)
    }

    fn describe(&self) -> String {
        "unix".to_string()
    }
}

/// Shutdown that treats an already disconnected socket as done.
pub(crate) fn shutdown_quietly<S: ExchangeStream>(stream: &S, how: Shutdown) -> io::Result<()> {
    match stream.shutdown_stream(how) {
        Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}
