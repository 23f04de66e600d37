// src/protocol/listener.rs

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::errors::Result;
use crate::protocol::header::{EventHeader, ListenerEvent};

const READY: &[u8] = b"READY\n";
const RESULT_OK: &[u8] = b"RESULT 2\nOK";

/// What [`EventListener::next`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Event(ListenerEvent),
    /// A record that could not be parsed. It still has to be acknowledged.
    Malformed(String),
    /// The event source closed (EOF on stdin).
    Closed,
}

/// supervisord eventlistener endpoint.
///
/// The cycle is: [`ready`](Self::ready), [`next`](Self::next), handle the
/// event, [`ack`](Self::ack). supervisord will not send another event until
/// the previous one is acknowledged and the listener is READY again.
pub struct EventListener<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> EventListener<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub async fn ready(&mut self) -> Result<()> {
        trace!("listener: READY");
        self.writer.write_all(READY).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one header line and its payload.
    pub async fn next(&mut self) -> Result<Incoming> {
        let mut raw = Vec::new();
        if self.reader.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(Incoming::Closed);
        }
        let line = String::from_utf8_lossy(&raw);
        if line.trim().is_empty() {
            return Ok(Incoming::Malformed("empty header line".to_string()));
        }

        let header = match EventHeader::parse(&line) {
            Ok(h) => h,
            Err(e) => return Ok(Incoming::Malformed(e.to_string())),
        };

        let mut payload = vec![0u8; header.len];
        if let Err(e) = self.reader.read_exact(&mut payload).await {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                warn!(eventname = %header.eventname, "event source closed mid-payload");
                return Ok(Incoming::Closed);
            }
            return Err(e.into());
        }
        let payload = String::from_utf8_lossy(&payload);
        debug!(eventname = %header.eventname, payload = %payload.trim_end(), "received event");

        Ok(match ListenerEvent::from_parts(&header, &payload) {
            Ok(event) => Incoming::Event(event),
            Err(e) => Incoming::Malformed(e.to_string()),
        })
    }

    /// Acknowledge the current event as handled.
    pub async fn ack(&mut self) -> Result<()> {
        trace!("listener: RESULT 2 OK");
        self.writer.write_all(RESULT_OK).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
