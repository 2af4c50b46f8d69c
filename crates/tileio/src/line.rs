use bytes::{Bytes, BytesMut};
use memchr::memchr;
use tokio::io::{AsyncRead, AsyncReadExt};

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
            buf: BytesMut::with_capacity(4 * 1024),
            max_line_len: 4 * 1024,
        }
    }

    pub fn max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max.max(1);
        self
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Read one line of UTF-8 text, stripping trailing `\n` and optional `\r`.
    ///
    /// Returns:
    /// - `Ok(Some(line))` for a line (may be empty),
    /// - `Ok(None)` on clean EOF with no buffered data.
    ///
    /// A final unterminated line before EOF is returned as a line.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(i) = memchr(b'\n', &self.buf) {
                let raw = self.buf.split_to(i + 1).freeze();
                return self.finish(raw).map(Some);
            }

            // Room for the line plus its CRLF.
            if self.buf.len() > self.max_line_len + 2 {
                return Err(too_long());
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let raw = self.buf.split().freeze();
                return self.finish(raw).map(Some);
            }
        }
    }

    /// The line's length is checked without its terminator; an overlong line is consumed.
    fn finish(&self, raw: Bytes) -> std::io::Result<String> {
        let line = trim_crlf(raw);
        if line.len() > self.max_line_len {
            return Err(too_long());
        }
        decode(line)
    }
}

fn too_long() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, "line too long")
}

fn decode(b: Bytes) -> std::io::Result<String> {
    String::from_utf8(b.to_vec())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "line is not utf-8"))
}

fn trim_crlf(mut b: Bytes) -> Bytes {
    let mut end = b.len();
    if end > 0 && b[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && b[end - 1] == b'\r' {
        end -= 1;
    }
    b.truncate(end);
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_crlf_lf_and_empty_lines() {
        let (a, b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut b = b;
            b.write_all(b"d3\r\n\nattack\n").await.unwrap();
        });

        let mut lr = LineReader::new(a);
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("d3"));
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("attack"));
        assert_eq!(lr.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unterminated_tail_is_a_line() {
        let (a, b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut b = b;
            b.write_all(b"quit").await.unwrap();
        });

        let mut lr = LineReader::new(a);
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("quit"));
        assert_eq!(lr.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_overlong_lines() {
        let (a, b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            let mut b = b;
            b.write_all(&[b'x'; 200]).await.unwrap();
            b.write_all(b"\n").await.unwrap();
        });

        let mut lr = LineReader::new(a).max_line_len(16);
        let err = lr.read_line().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn overlong_line_in_one_read_is_rejected() {
        let mut input = vec![b'x'; 40];
        input.extend_from_slice(b"\nok\n");
        let mut lr = LineReader::new(&input[..]).max_line_len(16);
        let err = lr.read_line().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        // The bad line is gone; the next one still reads.
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn overlong_tail_at_eof_is_rejected() {
        let input = vec![b'y'; 20];
        let mut lr = LineReader::new(&input[..]).max_line_len(16);
        assert!(lr.read_line().await.is_err());
    }

    #[tokio::test]
    async fn line_at_the_limit_passes_with_crlf() {
        let mut input = vec![b'z'; 16];
        input.extend_from_slice(b"\r\n");
        let mut lr = LineReader::new(&input[..]).max_line_len(16);
        assert_eq!(lr.read_line().await.unwrap().map(|l| l.len()), Some(16));
    }
}
