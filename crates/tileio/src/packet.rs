use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Largest number of characters carried by one framed packet.
pub const MAX_PACKET_SIZE: usize = 10_000;

pub const BEGIN_MARKER: &str = "/begin/";
pub const END_MARKER: &str = "/end/";

/// Writes responses as one or more `/begin/` .. `/end/` framed packets.
#[derive(Debug)]
pub struct PacketWriter<W> {
    inner: W,
    max_packet: usize,
}

impl<W> PacketWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            max_packet: MAX_PACKET_SIZE,
        }
    }

    pub fn max_packet(mut self, max: usize) -> Self {
        self.max_packet = max.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> PacketWriter<W> {
    /// Send `text`, splitting it into packets of at most `max_packet` characters.
    /// An empty response is still sent as one (empty) packet.
    pub async fn send(&mut self, text: &str) -> std::io::Result<()> {
        for chunk in chunks(text, self.max_packet) {
            self.inner.write_all(&frame(chunk)).await?;
        }
        self.inner.flush().await
    }
}

fn frame(chunk: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(chunk.len() + BEGIN_MARKER.len() + END_MARKER.len() + 3);
    out.extend_from_slice(BEGIN_MARKER.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(chunk.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(END_MARKER.as_bytes());
    out.push(b'\n');
    out
}

/// Split on char boundaries so every chunk holds at most `max` chars.
pub fn chunks(text: &str, max: usize) -> Vec<&str> {
    let max = max.max(1);
    let mut out = Vec::new();
    let mut rest = text;
    while rest.chars().count() > max {
        let (cut, _) = rest.char_indices().nth(max).unwrap_or((rest.len(), ' '));
        let (head, tail) = rest.split_at(cut);
        out.push(head);
        rest = tail;
    }
    out.push(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn chunks_respect_char_boundaries() {
        let s = "ééééé";
        let c = chunks(s, 2);
        assert_eq!(c, vec!["éé", "éé", "é"]);
        assert_eq!(chunks("", 4), vec![""]);
        assert_eq!(chunks("abcd", 4), vec!["abcd"]);
    }

    #[tokio::test]
    async fn frames_and_chunks_long_responses() {
        let (a, mut b) = tokio::io::duplex(1024);
        let mut pw = PacketWriter::new(a).max_packet(4);
        pw.send("abcdefghij").await.unwrap();
        drop(pw);

        let mut got = String::new();
        b.read_to_string(&mut got).await.unwrap();
        assert_eq!(
            got,
            "/begin/\nabcd\n/end/\n/begin/\nefgh\n/end/\n/begin/\nij\n/end/\n"
        );
    }
}
