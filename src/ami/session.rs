//! Wire session abstraction
//!
//! A [`WireSession`] owns the connection to the manager and moves raw
//! blocks in both directions. The dispatcher and correlator only ever see
//! this trait, so tests can swap in [`super::memory::MemorySession`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::common::{Error, Result};

use super::codec;
use super::framing::ListFraming;

/// Block-level access to a persistent manager connection
#[async_trait]
pub trait WireSession: Send {
    /// Whether the connection has been closed or has failed
    fn is_closed(&self) -> bool;

    /// Write one encoded block
    async fn send_block(&mut self, block: &str) -> Result<()>;

    /// Read the next raw inbound block
    async fn read_block(&mut self) -> Result<String>;

    /// Where listing replies end on this connection
    fn list_framing(&self) -> &ListFraming;
}

/// Session over any buffered tokio stream pair
pub struct StreamSession<R, W> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
    closed: bool,
    framing: ListFraming,
    read_timeout: Option<Duration>,
    banner: Option<String>,
    /// Bytes of a block whose read timed out, resumed by the next read
    pending: Vec<u8>,
}

/// Session over a TCP connection
pub type TcpSession = StreamSession<OwnedReadHalf, OwnedWriteHalf>;

impl<R, W> StreamSession<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            closed: false,
            framing: ListFraming::default(),
            read_timeout: None,
            banner: None,
            pending: Vec::new(),
        }
    }

    pub fn with_framing(mut self, framing: ListFraming) -> Self {
        self.framing = framing;
        self
    }

    /// Bound every read by a wall-clock timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Greeting line sent by the server on connect, if it was read
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Consume the single greeting line the manager sends before any block
    pub async fn read_banner(&mut self) -> Result<&str> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line);
        let bytes_read = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| Error::ReadTimeout(limit))??,
            None => read.await?,
        };

        if bytes_read == 0 {
            self.closed = true;
            return Err(Error::SessionClosed);
        }

        Ok(self.banner.insert(line.trim().to_string()).as_str())
    }

    fn note_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(
            result,
            Err(Error::SessionClosed | Error::Io(_) | Error::Transport(_))
        ) {
            self.closed = true;
        }
        result
    }
}

#[async_trait]
impl<R, W> WireSession for StreamSession<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn send_block(&mut self, block: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let result = codec::write_block(&mut self.writer, block).await;
        self.note_failure(result)
    }

    async fn read_block(&mut self) -> Result<String> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let read = codec::read_block_into(&mut self.reader, &mut self.pending);
        let result = match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => {
                    if !self.pending.is_empty() {
                        tracing::debug!(
                            "Read timed out with {} bytes of a block pending",
                            self.pending.len()
                        );
                    }
                    Err(Error::ReadTimeout(limit))
                }
            },
            None => read.await,
        };
        self.note_failure(result)
    }

    fn list_framing(&self) -> &ListFraming {
        &self.framing
    }
}

/// Open a TCP session to the manager and consume its banner
pub async fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    framing: ListFraming,
) -> Result<TcpSession> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| Error::ConnectTimeout(connect_timeout))?
        .map_err(|e| Error::Transport(format!("connect to {}:{} failed: {}", host, port, e)))?;

    let (reader, writer) = stream.into_split();
    let mut session = StreamSession::new(reader, writer)
        .with_framing(framing)
        .with_read_timeout(read_timeout);

    let banner = session.read_banner().await?;
    tracing::info!("Connected to {}:{} ({})", host, port, banner);

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, AsyncWriteExt};

    #[tokio::test]
    async fn test_banner_then_blocks() {
        let (client, mut server) = duplex(1024);
        let (r, w) = split(client);
        let mut session = StreamSession::new(r, w);

        server
            .write_all(b"Asterisk Call Manager/2.10.0\r\nResponse: Success\r\n\r\n")
            .await
            .unwrap();

        assert_eq!(
            session.read_banner().await.unwrap(),
            "Asterisk Call Manager/2.10.0"
        );
        assert_eq!(session.banner(), Some("Asterisk Call Manager/2.10.0"));
        assert_eq!(session.read_block().await.unwrap(), "Response: Success\r\n");
    }

    #[tokio::test]
    async fn test_peer_close_marks_session_closed() {
        let (client, server) = duplex(64);
        let (r, w) = split(client);
        let mut session = StreamSession::new(r, w);
        drop(server);

        assert!(matches!(
            session.read_block().await,
            Err(Error::SessionClosed)
        ));
        assert!(session.is_closed());
        assert!(matches!(
            session.send_block("Action: Ping\r\n\r\n").await,
            Err(Error::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (client, _server) = duplex(64);
        let (r, w) = split(client);
        let mut session =
            StreamSession::new(r, w).with_read_timeout(Some(Duration::from_millis(20)));

        assert!(matches!(
            session.read_block().await,
            Err(Error::ReadTimeout(_))
        ));
        // A stalled read is not a dead connection
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn test_timeout_mid_block_resumes_same_block() {
        let (client, mut server) = duplex(1024);
        let (r, w) = split(client);
        let mut session =
            StreamSession::new(r, w).with_read_timeout(Some(Duration::from_millis(50)));

        server
            .write_all(b"Response: Success\r\nEventList: start\r\n")
            .await
            .unwrap();
        let err = session.read_block().await.unwrap_err();
        assert!(matches!(err, Error::ReadTimeout(_)));
        assert!(err.to_string().contains("50ms"), "{err}");
        assert!(!session.is_closed());

        server.write_all(b"Message: tail\r\n\r\n").await.unwrap();
        let block = session.read_block().await.unwrap();
        assert_eq!(
            block,
            "Response: Success\r\nEventList: start\r\nMessage: tail\r\n"
        );

        let reply = codec::decode(&block).unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.get("Message"), Some("tail"));
    }
}
