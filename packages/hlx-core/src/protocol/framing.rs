//! Byte-stream framing of bracketed HLX messages.
//!
//! `(BODY)` is the only frame shape on the wire. [`FrameAccumulator`] turns
//! an arbitrary byte stream into zero or more complete frame bodies,
//! discarding noise before the first `(` and resynchronizing after a
//! framing error.

use crate::error::{HlxError, HlxResult};

/// Frames longer than this (bytes between `(` and a matching `)`) are
/// rejected as malformed rather than buffered forever.
pub const MAX_FRAME_LEN: usize = 1024;

/// Accumulates inbound bytes and extracts complete `(BODY)` frames.
///
/// Bytes before the first `(` are discarded as protocol noise. A `)`
/// without a preceding `(` is reported once via the caller's log and the
/// stream resynchronizes on the next `(`.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    buf: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feeds newly-received bytes and extracts every complete frame body
    /// available so far (bracket contents, with the `(`/`)` stripped).
    ///
    /// On a framing error (unclosed frame past [`MAX_FRAME_LEN`], or a
    /// stray `)`), the offending region is dropped and scanning resumes
    /// at the next `(`; the error is surfaced once per occurrence via the
    /// returned `Vec`, alongside any successfully-extracted frames.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<HlxResult<Vec<u8>>> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();

        loop {
            // Discard noise (and stray `)`) before the next `(`.
            match self.buf.iter().position(|&b| b == b'(') {
                Some(start) => {
                    if start > 0 {
                        if self.buf[..start].contains(&b')') {
                            frames.push(Err(HlxError::BadCommand(
                                        "unmatched ')' before next frame".into(),
                                    )));
                        }
                        self.buf.drain(..start);
                    }
                }
                None => {
                    if self.buf.contains(&b')') {
                        frames.push(Err(HlxError::BadCommand(
                                    "unmatched ')' with no open frame".into(),
                                )));
                    }
                    self.buf.clear();
                    break;
                }
            }

            // self.buf[0] == '(' now.
            match self.buf.iter().position(|&b| b == b')') {
                Some(end) => {
                    let body = self.buf[1..end].to_vec();
                    self.buf.drain(..=end);
                    frames.push(Ok(body));
                }
                None => {
                    if self.buf.len() > MAX_FRAME_LEN {
                        frames.push(Err(HlxError::BadCommand(format!(
                                        "frame exceeded {MAX_FRAME_LEN} bytes without closing ')'"
                                    ))));
                        self.buf.drain(..1); // drop the stale '(' and resync
                        continue;
                    }
                    break; // wait for more bytes
                }
            }
        }

        frames
    }
}

/// Renders a frame body as a full wire frame: `(BODY)`.
pub fn render_frame(body: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(b'(');
    out.extend_from_slice(body.as_bytes());
    out.push(b')');
    out
}
