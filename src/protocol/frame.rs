//! Length-prefixed framing
//!
//! Every frame is a fixed-width header carrying the decimal ASCII length of
//! the payload, right-padded with spaces to [`HEADER_WIDTH`] bytes, followed
//! by exactly that many UTF-8 payload bytes:
//!
//! ```text
//! "11" + 62 spaces | "hello world"
//! ```
//!
//! The acknowledgement sent in reply to publish/subscribe is the single raw
//! byte [`ACK_BYTE`], written outside this framing.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::utils::{BrokerError, Result};

/// Width of the length header, and the largest single payload read.
pub const HEADER_WIDTH: usize = 64;

pub const ACK_BYTE: u8 = b'1';

/// Encode `payload` into a header + payload frame.
pub fn encode(payload: &str) -> Vec<u8> {
    let body = payload.as_bytes();
    let mut frame = format!("{:<width$}", body.len(), width = HEADER_WIDTH).into_bytes();
    frame.extend_from_slice(body);
    frame
}

/// Parse a header into the payload length it announces.
pub fn parse_header(header: &[u8]) -> Result<usize> {
    let text = String::from_utf8_lossy(header);
    let digits = text.trim_end_matches([' ', '\0']);
    digits
        .parse::<usize>()
        .map_err(|_| BrokerError::MalformedFrame(digits.to_string()))
}

/// Read one frame and return its payload.
///
/// The payload is consumed in reads of at most `HEADER_WIDTH` bytes, each
/// limited to what is still owed, so a frame never reads into the next one.
/// EOF or a reset surfaces as `BrokerError::ConnectionReset`.
pub async fn read_frame<R>(reader: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_WIDTH];
    reader.read_exact(&mut header).await?;
    let len = parse_header(&header)?;

    // The header is untrusted: grow with what actually arrives.
    let mut payload = Vec::with_capacity(len.min(HEADER_WIDTH));
    let mut chunk = [0u8; HEADER_WIDTH];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(HEADER_WIDTH);
        reader.read_exact(&mut chunk[..n]).await?;
        payload.extend_from_slice(&chunk[..n]);
        remaining -= n;
    }

    Ok(String::from_utf8(payload)?)
}

pub async fn write_frame<W>(writer: &mut W, payload: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(payload)).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_ack<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[ACK_BYTE]).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the one-byte acknowledgement.
pub async fn read_ack<R>(reader: &mut R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte).await?;
    match byte[0] {
        ACK_BYTE => Ok(()),
        other => Err(BrokerError::BadAcknowledgement(other)),
    }
}
