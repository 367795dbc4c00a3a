use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::Receiver;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Status line, header lines and the blank separator line.
pub fn serialize_head(status: &str, headers: &[(String, String)]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(128);

    // Status line
    buf.put_slice(HTTP_VERSION.as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(status.as_bytes());
    buf.put_slice(b"\r\n");

    // Headers
    for (k, v) in headers {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    // Header/body separator
    buf.put_slice(b"\r\n");

    buf
}

/// Writes one frame to the socket, tolerating short writes.
pub struct ResponseWriter {
    buffer: Bytes,
    written: usize,
}

impl ResponseWriter {
    pub fn new(frame: Bytes) -> Self {
        Self {
            buffer: frame,
            written: 0,
        }
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        Ok(())
    }
}

/// Forwards frames to `stream` until every sender is gone.
///
/// Returns the number of frames written.
pub async fn transmit<W>(stream: &mut W, frames: &mut Receiver<Bytes>) -> anyhow::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut count = 0;
    while let Some(frame) = frames.recv().await {
        ResponseWriter::new(frame).write_to_stream(stream).await?;
        count += 1;
    }
    stream.flush().await?;
    Ok(count)
}
