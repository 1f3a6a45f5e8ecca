//! Newline framing with a length cap.
//!
//! A bad line (invalid UTF-8, or longer than the cap) is reported as a
//! [`FrameError`] for that line only; the stream stays usable and the next
//! line is read normally. I/O errors and EOF end the stream.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
    #[error("line exceeds {limit} bytes")]
    TooLong { limit: usize },
}

/// Reads `\n`-terminated lines from a buffered reader.
///
/// Partial lines are kept in `self`, so `next_line` can be used as a
/// `select!` branch and called again after being cancelled.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_len: usize,
    discarding: bool,
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            max_len,
            discarding: false,
        }
    }

    /// Next line without its terminator (`\n` or `\r\n`).
    ///
    /// `Ok(None)` at EOF. A trailing unterminated line is returned before EOF.
    pub async fn next_line(&mut self) -> std::io::Result<Option<Result<String, FrameError>>> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if self.buf.is_empty() && !self.discarding {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            let (chunk_len, terminated) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i, true),
                None => (available.len(), false),
            };

            if !self.discarding {
                if self.buf.len() + chunk_len > self.max_len {
                    self.discarding = true;
                    self.buf.clear();
                } else {
                    self.buf.extend_from_slice(&available[..chunk_len]);
                }
            }

            let consumed = if terminated { chunk_len + 1 } else { chunk_len };
            self.inner.consume(consumed);

            if terminated {
                return Ok(Some(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> Result<String, FrameError> {
        if std::mem::take(&mut self.discarding) {
            self.buf.clear();
            return Err(FrameError::TooLong {
                limit: self.max_len,
            });
        }
        let mut bytes = std::mem::take(&mut self.buf);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        String::from_utf8(bytes).map_err(|_| FrameError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    fn reader(mock: tokio_test::io::Mock, max_len: usize) -> LineReader<BufReader<tokio_test::io::Mock>> {
        LineReader::new(BufReader::new(mock), max_len)
    }

    #[tokio::test]
    async fn test_lines_split_across_reads() {
        let mock = Builder::new().read(b"{\"a\":").read(b"1}\r\n{\"b\"").read(b":2}\n").build();
        let mut lines = reader(mock, 64);
        assert_eq!(lines.next_line().await.unwrap(), Some(Ok("{\"a\":1}".to_string())));
        assert_eq!(lines.next_line().await.unwrap(), Some(Ok("{\"b\":2}".to_string())));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_only_costs_one_line() {
        let mock = Builder::new().read(b"\xff\xfe garbage\nok\n").build();
        let mut lines = reader(mock, 64);
        assert_eq!(lines.next_line().await.unwrap(), Some(Err(FrameError::InvalidUtf8)));
        assert_eq!(lines.next_line().await.unwrap(), Some(Ok("ok".to_string())));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_line_is_skipped() {
        let mock = Builder::new()
            .read(b"0123456789")
            .read(b"abcdef\nshort\n")
            .build();
        let mut lines = reader(mock, 12);
        assert_eq!(
            lines.next_line().await.unwrap(),
            Some(Err(FrameError::TooLong { limit: 12 }))
        );
        assert_eq!(lines.next_line().await.unwrap(), Some(Ok("short".to_string())));
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_returned() {
        let mock = Builder::new().read(b"last").build();
        let mut lines = reader(mock, 64);
        assert_eq!(lines.next_line().await.unwrap(), Some(Ok("last".to_string())));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }
}
