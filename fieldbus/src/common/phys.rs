use crate::decode::PhysDecodeLevel;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Byte stream of a connection that logs the traffic crossing it
pub(crate) struct PhysLayer<T> {
    io: T,
    level: PhysDecodeLevel,
}

impl<T> PhysLayer<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(io: T, level: PhysDecodeLevel) -> Self {
        Self { io, level }
    }

    /// read whatever is available, returning 0 when the peer has closed the stream
    pub(crate) async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, std::io::Error> {
        let count = self.io.read(buffer).await?;
        if let Some(received) = buffer.get(..count) {
            self.trace("RX", received);
        }
        Ok(count)
    }

    pub(crate) async fn write(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        self.trace("TX", data);
        self.io.write_all(data).await
    }

    fn trace(&self, direction: &str, data: &[u8]) {
        if !self.level.enabled() {
            return;
        }
        if self.level.data_enabled() {
            tracing::info!("PHYS {direction} - {} bytes{}", data.len(), HexDump(data));
        } else {
            tracing::info!("PHYS {direction} - {} bytes", data.len());
        }
    }
}

/// Renders bytes as rows of upper-case hex, each row on a new line
pub(crate) struct HexDump<'a>(pub(crate) &'a [u8]);

const BYTES_PER_ROW: usize = 18;

impl std::fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for row in self.0.chunks(BYTES_PER_ROW) {
            writeln!(f)?;
            for (i, byte) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{byte:02X}")?;
            }
        }
        Ok(())
    }
}
