//! `Content-Length` framing over any async byte stream.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Error;

/// Reads one `Content-Length`-framed DAP message body from `reader`.
///
/// Returns `Ok(None)` on clean EOF before any header bytes are read
/// (the adapter closed the stream between messages). A partial header
/// or body followed by EOF is a `ProtocolError`.
pub async fn read_frame<R>(reader: &mut BufReader<R>) -> Result<Option<Vec<u8>>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| Error::ProtocolError(format!("reading header: {e}")))?;
        if n == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(Error::ProtocolError(
                "stream closed mid-header".to_string(),
            ));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                let value = value.trim();
                content_length = Some(value.parse().map_err(|_| {
                    Error::ProtocolError(format!("bad Content-Length: {value}"))
                })?);
            }
        }
    }

    let len = content_length
        .ok_or_else(|| Error::ProtocolError("missing Content-Length header".to_string()))?;
    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| Error::ProtocolError(format!("reading body: {e}")))?;
    Ok(Some(body))
}

/// Writes `body` as a single `Content-Length`-framed message.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trips_a_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, br#"{"seq":1}"#).await.unwrap();
        let mut reader = BufReader::new(Cursor::new(buf));
        let body = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(body, br#"{"seq":1}"#);
    }

    #[tokio::test]
    async fn clean_eof_before_any_header_is_none() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_mid_header_is_protocol_error() {
        let mut reader = BufReader::new(Cursor::new(b"Content-Length: 10\r\n".to_vec()));
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolError(_)));
    }

    #[tokio::test]
    async fn header_name_is_case_insensitive() {
        let mut reader = BufReader::new(Cursor::new(b"content-LENGTH: 9\r\n\r\n{\"seq\":1}".to_vec()));
        let body = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(body, br#"{"seq":1}"#);
    }

    #[tokio::test]
    async fn malformed_length_is_protocol_error() {
        let mut reader = BufReader::new(Cursor::new(
            b"Content-Length: not-a-number\r\n\r\n".to_vec(),
        ));
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolError(_)));
    }

    #[tokio::test]
    async fn reads_two_consecutive_frames() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"one").await.unwrap();
        write_frame(&mut buf, b"two").await.unwrap();
        let mut reader = BufReader::new(Cursor::new(buf));
        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), b"one");
        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), b"two");
    }
}
