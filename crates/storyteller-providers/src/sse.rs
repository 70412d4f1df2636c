//! Line framing for server-sent event bodies.

/// Buffers response bytes and yields the payload of each complete
/// `data:` line.
///
/// Bytes are held until a newline arrives, so a multibyte character split
/// across network chunks is decoded intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Appends `bytes` and returns the `data:` payloads of every line they
    /// complete. Comments, blank lines and other fields are skipped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = line.trim().strip_prefix("data:") {
                payloads.push(data.trim_start().to_owned());
            }
        }
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_split_across_chunks_is_reassembled() {
        let mut buffer = SseLineBuffer::default();

        let first = buffer.push(b"data: {\"a\":");
        let second = buffer.push(b"1}\n\ndata: [DONE]\n");

        assert!(first.is_empty());
        assert_eq!(second, vec!["{\"a\":1}".to_owned(), "[DONE]".to_owned()]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut buffer = SseLineBuffer::default();
        let line = "data: café\n".as_bytes();
        let (head, tail) = line.split_at(10);

        buffer.push(head);
        let payloads = buffer.push(tail);

        assert_eq!(payloads, vec!["café".to_owned()]);
    }

    #[test]
    fn test_non_data_lines_are_skipped() {
        let mut buffer = SseLineBuffer::default();

        let payloads = buffer.push(b": keep-alive\nevent: ping\r\n\r\ndata:x\r\n");

        assert_eq!(payloads, vec!["x".to_owned()]);
    }
}
