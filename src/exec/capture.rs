// src/exec/capture.rs

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of child output, trailing newline included when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    /// Decode raw pipe bytes; invalid UTF-8 is replaced, never dropped.
    pub fn from_bytes(stream: OutputStream, bytes: &[u8]) -> Self {
        Self {
            stream,
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Combined stdout/stderr of a run, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct CaptureBuffer {
    text: String,
    lines: usize,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: &OutputLine) {
        self.text.push_str(&line.text);
        self.lines += 1;
    }

    /// Append text that did not come from the child (e.g. the timeout notice).
    pub fn append_notice(&mut self, notice: &str) {
        self.text.push_str(notice);
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_streams_in_arrival_order() {
        let mut buf = CaptureBuffer::new();
        buf.push(&OutputLine::from_bytes(OutputStream::Stdout, b"epoch 1\n"));
        buf.push(&OutputLine::from_bytes(OutputStream::Stderr, b"warning\n"));
        buf.push(&OutputLine::from_bytes(OutputStream::Stdout, b"done"));
        assert_eq!(buf.as_str(), "epoch 1\nwarning\ndone");
        assert_eq!(buf.line_count(), 3);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let line = OutputLine::from_bytes(OutputStream::Stdout, b"loss \xff\n");
        assert_eq!(line.text, "loss \u{fffd}\n");
    }
}
