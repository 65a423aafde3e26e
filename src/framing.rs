//! Brace-depth framing of the intel_gpu_top JSON stream.
//!
//! The tool pretty-prints records over a pipe with no alignment between
//! record boundaries and read chunks, so frames are recovered by tracking
//! `{`/`}` nesting depth one character at a time. State persists across
//! `feed` calls.

/// Upper bound on one accumulated frame. intel_gpu_top records are a few
/// hundred bytes; anything this large means the stream lost a closing brace.
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Incremental extractor of complete brace-balanced records from a raw
/// byte stream.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    buf: String,
    depth: usize,
    started: bool,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of raw bytes, returning every frame completed by it.
    ///
    /// Characters before the first `{` while idle are discarded. A chunk
    /// ending mid-record leaves the partial frame buffered for the next
    /// call. Braces inside JSON string values would confuse the depth
    /// count; intel_gpu_top never emits them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        for ch in String::from_utf8_lossy(chunk).chars() {
            if !self.started {
                if ch == '{' {
                    self.started = true;
                    self.depth = 1;
                    self.buf.clear();
                    self.buf.push('{');
                }
                continue;
            }

            self.buf.push(ch);
            match ch {
                '{' => self.depth += 1,
                '}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        frames.push(std::mem::take(&mut self.buf));
                        self.started = false;
                    }
                }
                _ => {}
            }

            if self.buf.len() > MAX_FRAME_LEN {
                tracing::warn!(
                    "dropping unterminated frame after {} bytes",
                    self.buf.len()
                );
                self.buf.clear();
                self.buf.shrink_to_fit();
                self.depth = 0;
                self.started = false;
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_RECORDS: &str = r#"{"a":1,"nested":{"b":2}},{"c":3}"#;

    fn feed_str(extractor: &mut FrameExtractor, s: &str) -> Vec<String> {
        extractor.feed(s.as_bytes())
    }

    #[test]
    fn single_chunk_yields_all_frames() {
        let mut ex = FrameExtractor::new();
        let frames = feed_str(&mut ex, TWO_RECORDS);
        assert_eq!(frames.len(), 2, "should extract both records");
        assert_eq!(frames[0], r#"{"a":1,"nested":{"b":2}}"#);
        assert_eq!(frames[1], r#"{"c":3}"#);
    }

    #[test]
    fn framing_is_identical_across_arbitrary_splits() {
        let mut whole = FrameExtractor::new();
        let expected = feed_str(&mut whole, TWO_RECORDS);

        for split in 1..TWO_RECORDS.len() {
            let mut ex = FrameExtractor::new();
            let mut frames = feed_str(&mut ex, &TWO_RECORDS[..split]);
            frames.extend(feed_str(&mut ex, &TWO_RECORDS[split..]));
            assert_eq!(frames, expected, "split at byte {split} changed framing");
        }
    }

    #[test]
    fn framing_survives_byte_at_a_time_feeding() {
        let mut whole = FrameExtractor::new();
        let expected = feed_str(&mut whole, TWO_RECORDS);

        let mut ex = FrameExtractor::new();
        let mut frames = Vec::new();
        for b in TWO_RECORDS.as_bytes() {
            frames.extend(ex.feed(std::slice::from_ref(b)));
        }
        assert_eq!(frames, expected, "one-byte chunks changed framing");
    }

    #[test]
    fn partial_frame_yields_nothing_until_completed() {
        let mut ex = FrameExtractor::new();
        assert!(
            feed_str(&mut ex, r#"{"engines":{"Video""#).is_empty(),
            "mid-record chunk must yield no frames"
        );
        let frames = feed_str(&mut ex, r#":{"busy":1}}}"#);
        assert_eq!(frames, vec![r#"{"engines":{"Video":{"busy":1}}}"#]);
    }

    #[test]
    fn stray_bytes_between_records_are_skipped() {
        let mut ex = FrameExtractor::new();
        let frames = feed_str(&mut ex, "  \n,{\"a\":1}\n,, \t{\"b\":2}");
        assert_eq!(frames, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn stream_ending_mid_frame_drops_the_partial() {
        let mut ex = FrameExtractor::new();
        assert!(feed_str(&mut ex, r#"{"a":"#).is_empty());
        // A later stream restart picks up cleanly at the next `{`.
        let frames = feed_str(&mut ex, r#"1}{"b":2}"#);
        assert_eq!(frames.len(), 2);
    }

    #[test_log::test]
    fn oversized_frame_is_dropped_and_state_resets() {
        let mut ex = FrameExtractor::new();
        let huge = format!("{{\"pad\":\"{}\"", "x".repeat(MAX_FRAME_LEN + 16));
        assert!(feed_str(&mut ex, &huge).is_empty());
        // Extractor is idle again and frames normally afterwards.
        let frames = feed_str(&mut ex, r#"{"a":1}"#);
        assert_eq!(frames, vec![r#"{"a":1}"#]);
    }

    #[test]
    fn non_utf8_bytes_do_not_break_framing() {
        let mut ex = FrameExtractor::new();
        let mut chunk = b"{\"a\":1}".to_vec();
        chunk.insert(4, 0xFF);
        let frames = ex.feed(&chunk);
        assert_eq!(frames.len(), 1, "lossy decoding must preserve braces");
    }
}
