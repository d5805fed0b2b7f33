pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Helper output, keeping at most `capacity` bytes of the most recent text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedOutput {
    text: String,
    capacity: usize,
    dropped: usize,
}

impl Default for CapturedOutput {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl CapturedOutput {
    pub fn with_capacity(capacity: usize) -> Self {
        CapturedOutput {
            text: String::new(),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        if self.text.len() <= self.capacity {
            return;
        }

        let mut cut = self.text.len() - self.capacity;
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }
        self.text.drain(..cut);
        self.dropped += cut;
    }

    /// Decode a raw chunk. Chunks that are not UTF-8 are discarded.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> bool {
        match std::str::from_utf8(chunk) {
            Ok(text) => {
                self.push(text);
                true
            }
            Err(e) => {
                log::debug!("Dropping undecodable output chunk: {}", e);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.dropped = 0;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends() {
        let mut output = CapturedOutput::default();

        output.push("hello ");
        output.push("world");

        assert_eq!(output.as_str(), "hello world");
        assert_eq!(output.dropped(), 0);
    }

    #[test]
    fn keeps_most_recent_text() {
        let mut output = CapturedOutput::with_capacity(8);

        output.push("0123456789");
        output.push("ab");

        assert_eq!(output.as_str(), "456789ab");
        assert_eq!(output.dropped(), 4);
    }

    #[test]
    fn trims_on_char_boundary() {
        let mut output = CapturedOutput::with_capacity(4);

        output.push("aé€");

        assert_eq!(output.as_str(), "€");
    }

    #[test]
    fn drops_invalid_utf8() {
        let mut output = CapturedOutput::default();

        assert!(output.push_bytes(b"ok "));
        assert!(!output.push_bytes(&[0xff, 0xfe]));
        assert!(output.push_bytes(b"still ok"));

        assert_eq!(output.as_str(), "ok still ok");
    }

    #[test]
    fn clear_resets() {
        let mut output = CapturedOutput::with_capacity(2);
        output.push("abc");

        output.clear();

        assert_eq!(output.as_str(), "");
        assert_eq!(output.dropped(), 0);
    }
}
