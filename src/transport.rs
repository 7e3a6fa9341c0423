//! Control-socket transport.
//!
//! Every command opens a fresh connection to the HAProxy admin socket, sends a
//! single line and reads until the peer closes its side. Nothing is pooled or
//! reused between calls.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::error::UnavailableError;

/// Well-known location of the HAProxy stats socket.
pub const DEFAULT_SOCKET: &str = "/var/lib/haproxy/stats";

/// Size of a single read from the socket.
pub const RECV_SIZE: usize = 1024;

/// Default bound for a complete command/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can answer a control-socket command with the raw response text.
pub trait ControlSocket {
    fn communicate(&self, command: &str) -> Result<String, UnavailableError>;
}

/// Unix stream socket connection settings for the HAProxy admin socket.
#[derive(Debug, Clone)]
pub struct StatsSocket {
    path: PathBuf,
    timeout: Duration,
}

impl StatsSocket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bounds every write, every read and the whole exchange by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timed_out(&self) -> UnavailableError {
        UnavailableError::TimedOut {
            path: self.path.clone(),
            timeout: self.timeout,
        }
    }

    fn connect(&self) -> Result<UnixStream, UnavailableError> {
        let stream = UnixStream::connect(&self.path).map_err(|source| UnavailableError::Connect {
            path: self.path.clone(),
            source,
        })?;

        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|source| UnavailableError::Connect {
                path: self.path.clone(),
                source,
            })?;

        Ok(stream)
    }
}

impl Default for StatsSocket {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET)
    }
}

impl ControlSocket for StatsSocket {
    fn communicate(&self, command: &str) -> Result<String, UnavailableError> {
        let started = Instant::now();
        let mut stream = self.connect()?;

        let mut line = command.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }

        stream
            .write_all(line.as_bytes())
            .map_err(|source| match source.kind() {
                ErrorKind::WouldBlock | ErrorKind::TimedOut => self.timed_out(),
                _ => UnavailableError::Write {
                    path: self.path.clone(),
                    source,
                },
            })?;

        let mut response = Vec::new();
        let mut buf = [0u8; RECV_SIZE];
        loop {
            // Each read may only wait for what is left of the overall budget.
            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(self.timed_out());
            }
            stream
                .set_read_timeout(Some(remaining))
                .map_err(|source| UnavailableError::Read {
                    path: self.path.clone(),
                    source,
                })?;

            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => response.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(self.timed_out());
                }
                Err(source) => {
                    return Err(UnavailableError::Read {
                        path: self.path.clone(),
                        source,
                    })
                }
            }
            trace!("Read {} bytes so far from {}", response.len(), self.path.display());
        }

        debug!(
            "`{}` answered with {} bytes in {:.2}ms",
            command.trim_end(),
            response.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::io::BufReader;
    use std::os::unix::net::UnixListener;
    use std::thread;

    /// Accepts one connection, records the received line and answers with `reply`.
    fn serve_once(listener: UnixListener, reply: String) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut received = String::new();
            reader.read_line(&mut received).expect("read command");
            let mut stream = reader.into_inner();
            stream.write_all(reply.as_bytes()).expect("write reply");
            received
        })
    }

    #[test]
    fn test_communicate_appends_newline_and_reads_until_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = serve_once(listener, "Name: HAProxy\nUptime_sec: 12\n".to_string());

        let socket = StatsSocket::new(&path);
        let response = socket.communicate("show info").unwrap();

        assert_eq!(response, "Name: HAProxy\nUptime_sec: 12\n");
        assert_eq!(handle.join().unwrap(), "show info\n");
    }

    #[test]
    fn test_communicate_reads_responses_larger_than_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let handle = serve_once(listener, "x".repeat(RECV_SIZE * 3 + 17));

        let response = StatsSocket::new(&path).communicate("show stat\n").unwrap();
        assert_eq!(response.len(), RECV_SIZE * 3 + 17);
        assert_eq!(handle.join().unwrap(), "show stat\n");
    }

    #[test]
    fn test_missing_socket_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let socket = StatsSocket::new(dir.path().join("absent.sock"));

        let err = socket.communicate("show info").unwrap_err();
        assert!(matches!(err, UnavailableError::Connect { .. }));
    }

    #[test]
    fn test_silent_peer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.sock");
        let listener = UnixListener::bind(&path).unwrap();

        // Accept and hold the connection open without answering.
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            thread::sleep(Duration::from_millis(500));
            drop(stream);
        });

        let socket = StatsSocket::new(&path).with_timeout(Duration::from_millis(100));
        let err = socket.communicate("show info").unwrap_err();
        assert!(matches!(err, UnavailableError::TimedOut { .. }));

        handle.join().unwrap();
    }

    #[test]
    fn test_trickling_peer_is_bounded_by_total_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.sock");
        let listener = UnixListener::bind(&path).unwrap();

        // One byte just before the deadline, then silence.
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            thread::sleep(Duration::from_millis(250));
            let _ = stream.write_all(b"N");
            thread::sleep(Duration::from_millis(1000));
        });

        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let err = StatsSocket::new(&path)
            .with_timeout(timeout)
            .communicate("show info")
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, UnavailableError::TimedOut { .. }));
        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);

        handle.join().unwrap();
    }
}
