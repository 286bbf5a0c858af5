//! Newline-delimited JSON frames

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};

use crate::{IpcError, IpcResult};

pub(crate) async fn write_frame<W, T>(writer: &mut W, value: &T) -> IpcResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut frame = serde_json::to_vec(value)?;
    frame.push(b'\n');
    writer.write_all(&frame).await?;
    Ok(())
}

/// Next non-blank line decoded as `T`. End of stream is `ConnectionClosed`.
pub(crate) async fn read_frame<R, T>(lines: &mut Lines<R>) -> IpcResult<T>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    loop {
        let Some(line) = lines.next_line().await? else {
            return Err(IpcError::ConnectionClosed);
        };
        if !line.trim().is_empty() {
            return Ok(serde_json::from_str(&line)?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargepool_api::{Command, Request};
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let input: &[u8] = b"\n  \n{\"request_id\":7,\"api_version\":1,\"command\":{\"type\":\"ping\"}}\n";
        let mut lines = BufReader::new(input).lines();

        let request: Request = read_frame(&mut lines).await.unwrap();
        assert_eq!(request.request_id, 7);
        assert!(matches!(request.command, Command::Ping));

        assert!(matches!(
            read_frame::<_, Request>(&mut lines).await,
            Err(IpcError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn frames_end_with_newline() {
        let mut out = Vec::new();
        write_frame(&mut out, &Request::new(3, Command::Ping)).await.unwrap();
        assert_eq!(out.last(), Some(&b'\n'));
        assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 1);
    }
}
