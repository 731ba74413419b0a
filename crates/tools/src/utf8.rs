//! Incremental UTF-8 decoding for byte-oriented document sources.
//!
//! Multi-byte characters split across chunk boundaries are carried to the next
//! chunk; invalid sequences are replaced with U+FFFD so decoding always makes
//! forward progress.

const REPLACEMENT: char = '\u{FFFD}';

/// Streaming UTF-8 decoder.
///
/// Invariant: `carry[..carry_len]` is a strict prefix of a well-started
/// multi-byte sequence (at most 3 bytes).
#[derive(Clone, Debug, Default)]
pub struct Utf8ChunkDecoder {
    carry: [u8; 4],
    carry_len: usize,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back waiting for the rest of a character.
    pub fn pending(&self) -> &[u8] {
        &self.carry[..self.carry_len]
    }

    /// Decode `bytes` and append the result to `out`.
    pub fn push(&mut self, bytes: &[u8], out: &mut String) {
        let rest = self.complete_carry(bytes, out);
        self.decode_into(rest, out);
    }

    /// Flush carried bytes lossily; the stream is never silently truncated.
    pub fn finish(&mut self, out: &mut String) {
        if self.carry_len > 0 {
            out.push(REPLACEMENT);
            self.carry_len = 0;
        }
    }

    /// Feed continuation bytes into a carried sequence. Returns the unconsumed input.
    fn complete_carry<'b>(&mut self, mut bytes: &'b [u8], out: &mut String) -> &'b [u8] {
        if self.carry_len == 0 {
            return bytes;
        }
        let expected = sequence_len(self.carry[0]);
        while self.carry_len < expected {
            let Some((&next, tail)) = bytes.split_first() else {
                return bytes;
            };
            self.carry[self.carry_len] = next;
            if let Err(err) = std::str::from_utf8(&self.carry[..=self.carry_len])
                && err.error_len().is_some()
            {
                // `next` cannot extend the sequence: replace it and re-decode `next` normally.
                out.push(REPLACEMENT);
                self.carry_len = 0;
                return bytes;
            }
            self.carry_len += 1;
            bytes = tail;
        }
        out.push_str(&String::from_utf8_lossy(&self.carry[..self.carry_len]));
        self.carry_len = 0;
        bytes
    }

    fn decode_into(&mut self, mut bytes: &[u8], out: &mut String) {
        while !bytes.is_empty() {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, after) = bytes.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(REPLACEMENT);
                            bytes = &after[invalid..];
                        }
                        None => {
                            self.carry[..after.len()].copy_from_slice(after);
                            self.carry_len = after.len();
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn sequence_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    }
}
