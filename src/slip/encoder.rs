use core::iter;

use super::{END, ESC, ESC_END, ESC_ESC};
use crate::{buffer::RingBuffer, Error};

/// Speculative writer that stages escaped bytes ahead of the ring's head.
///
/// Nothing becomes visible to the ring's reader until [`finish`](Self::finish)
/// commits. Once a byte does not fit, `offset` turns to `None` and every further
/// write is ignored, so the ring is left exactly as it was found.
struct SlipWriter<'r, 'a> {
    ring: &'r mut RingBuffer<'a>,
    space: usize,
    offset: Option<usize>,
}

impl<'r, 'a> SlipWriter<'r, 'a> {
    fn new(ring: &'r mut RingBuffer<'a>) -> Self {
        let space = ring.space_left();

        Self {
            ring,
            space,
            offset: Some(0),
        }
    }

    fn write_end(&mut self) {
        if let Some(offset) = self.offset {
            self.offset = if offset < self.space {
                self.ring.write_ahead(offset, END);
                Some(offset + 1)
            } else {
                None
            };
        }
    }

    fn write_chunk(&mut self, data: &[u8]) {
        let Some(mut offset) = self.offset else {
            return;
        };

        if data.len().saturating_mul(2) <= self.space - offset {
            // Even if every byte needs escaping the chunk fits.
            for &byte in data {
                offset = self.put_escaped(offset, byte);
            }
        } else {
            for &byte in data {
                let needed = if byte == END || byte == ESC { 2 } else { 1 };

                if self.space - offset < needed {
                    self.offset = None;
                    return;
                }

                offset = self.put_escaped(offset, byte);
            }
        }

        self.offset = Some(offset);
    }

    fn put_escaped(&mut self, offset: usize, byte: u8) -> usize {
        match byte {
            END => {
                self.ring.write_ahead(offset, ESC);
                self.ring.write_ahead(offset + 1, ESC_END);
                offset + 2
            }
            ESC => {
                self.ring.write_ahead(offset, ESC);
                self.ring.write_ahead(offset + 1, ESC_ESC);
                offset + 2
            }
            _ => {
                self.ring.write_ahead(offset, byte);
                offset + 1
            }
        }
    }

    fn finish(self) -> Option<usize> {
        let count = self.offset?;
        self.ring.commit(count);
        Some(count)
    }
}

/// Number of bytes `spans` occupy once SLIP framed, both delimiters included.
pub fn encoded_len<'s>(spans: impl IntoIterator<Item = &'s [u8]>) -> usize {
    spans
        .into_iter()
        .flatten()
        .map(|&byte| if byte == END || byte == ESC { 2 } else { 1 })
        .sum::<usize>()
        + 2
}

/// Encodes the concatenation of `spans` as a single SLIP frame into `ring`.
///
/// On success the whole frame is published at once and the number of bytes
/// written is returned. On [`Error::EncodeOverflow`] the ring is untouched.
pub fn encode_spans<'s, I>(ring: &mut RingBuffer<'_>, spans: I) -> Result<usize, Error>
where
    I: IntoIterator<Item = &'s [u8]>,
    I::IntoIter: Clone,
{
    let spans = spans.into_iter();
    let available = ring.space_left();
    let raw: usize = spans.clone().map(<[u8]>::len).sum();

    // Not even the unescaped frame would fit.
    if available < raw + 2 {
        return Err(Error::EncodeOverflow {
            needed: encoded_len(spans),
            available,
        });
    }

    let mut writer = SlipWriter::new(ring);
    writer.write_end();
    for span in spans.clone() {
        writer.write_chunk(span);
    }
    writer.write_end();

    writer.finish().ok_or_else(|| {
        let needed = encoded_len(spans);
        trace!("slip frame of {} bytes does not fit {} free", needed, available);
        Error::EncodeOverflow { needed, available }
    })
}

/// Encodes `data` as one SLIP frame.
pub fn encode(ring: &mut RingBuffer<'_>, data: &[u8]) -> Result<usize, Error> {
    encode_spans(ring, iter::once(data))
}

/// Encodes `head`, `body` and `tail` back to back as one SLIP frame.
///
/// Any of the three may be empty.
pub fn encode_hbt(
    ring: &mut RingBuffer<'_>,
    head: &[u8],
    body: &[u8],
    tail: &[u8],
) -> Result<usize, Error> {
    encode_spans(ring, [head, body, tail])
}

/// Encodes an arbitrary list of chunks back to back as one SLIP frame.
pub fn encode_chunks(ring: &mut RingBuffer<'_>, chunks: &[&[u8]]) -> Result<usize, Error> {
    encode_spans(ring, chunks.iter().copied())
}
