use bytes::BytesMut;
use memchr::memchr;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

/// Reads `\n`-terminated text lines off any `AsyncRead`.
///
/// Player input is text, so lines come back as owned `String`s with the
/// terminator (and an optional `\r`) stripped. Invalid UTF-8 is replaced
/// rather than rejected; telnet clients send all sorts of junk.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
    max_line_len: usize,
}

impl<R> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(1024),
            max_line_len: 1024,
        }
    }

    pub fn max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max.max(1);
        self
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Read one line.
    ///
    /// Returns:
    /// - `Ok(Some(line))` for a complete line (may be empty),
    /// - `Ok(None)` on EOF. A final unterminated line is delivered before
    ///   the `None`, so nothing a client typed is lost on hangup.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(i) = memchr(b'\n', &self.buf) {
                let raw = self.buf.split_to(i + 1);
                return Ok(Some(to_line(&raw[..i])));
            }

            if self.buf.len() > self.max_line_len {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "line too long",
                ));
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let raw = self.buf.split();
                return Ok(Some(to_line(&raw)));
            }
        }
    }
}

fn to_line(mut b: &[u8]) -> String {
    if let Some(stripped) = b.strip_suffix(b"\r") {
        b = stripped;
    }
    String::from_utf8_lossy(b).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_crlf_and_lf() {
        let (a, b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut b = b;
            b.write_all(b"north\r\nsay hi\n").await.unwrap();
        });

        let mut lr = LineReader::new(a);
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("north"));
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("say hi"));
    }

    #[tokio::test]
    async fn delivers_final_partial_line_then_eof() {
        let (a, b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut b = b;
            b.write_all(b"quit").await.unwrap();
            // drop: EOF
        });

        let mut lr = LineReader::new(a);
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("quit"));
        assert_eq!(lr.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_overlong_line() {
        let (a, b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            let mut b = b;
            b.write_all(&[b'x'; 64]).await.unwrap();
        });

        let mut lr = LineReader::new(a).max_line_len(16);
        let err = lr.read_line().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
