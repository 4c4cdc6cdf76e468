use super::{END, ESC, ESC_END, ESC_ESC};
use crate::{buffer::Buf, MAX_FRAME_LEN};

/// State machine for reading a SLIP frame.
///
/// +---------------+  END   +-----------+  ESC   +----------------+
/// | AwaitingStart |------->| Receiving |------->| AwaitingEscape |
/// +---------------+        +-----------+<-------+----------------+
///         ^                     |    ESC_END, ESC_ESC    |
///         | END (frame done)    |                        |
///         +---------------------+                        |
///         +----------------------------------------------+
///                          anything else
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeState {
    AwaitingStart,
    Receiving,
    AwaitingEscape,
}

/// Counters kept by a [`SlipDecoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderStats {
    /// Frames dropped because they did not fit the assembly buffer.
    pub overrun: u32,
    /// Frames dropped for any reason, overruns included.
    pub rx_error: u32,
    /// Frames handed to the caller.
    pub rx_success: u32,
}

/// Reassembles SLIP frames from a byte stream.
///
/// `N` bounds the unescaped frame length. A frame of exactly `N` bytes is still
/// delivered; one more byte and the frame is dropped as an overrun.
pub struct SlipDecoder<const N: usize = MAX_FRAME_LEN> {
    state: DecodeState,
    buf: Buf<N>,
    stats: DecoderStats,
}

impl<const N: usize> SlipDecoder<N> {
    /// Creates a new `SlipDecoder` waiting for a frame start.
    pub const fn new() -> Self {
        Self {
            state: DecodeState::AwaitingStart,
            buf: Buf::new(),
            stats: DecoderStats {
                overrun: 0,
                rx_error: 0,
                rx_success: 0,
            },
        }
    }

    /// Drops any partial frame and waits for the next frame start.
    ///
    /// Counters are kept.
    pub fn reset(&mut self) {
        self.state = DecodeState::AwaitingStart;
        self.buf.clear();
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Number of unescaped bytes in the frame being assembled.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Consumes a byte and returns a complete, unescaped frame if one just ended.
    ///
    /// The frame borrows the decoder's buffer and is only valid until the next push.
    pub fn push_byte(&mut self, byte: u8) -> Option<&[u8]> {
        match self.state {
            DecodeState::AwaitingStart => {
                if byte == END {
                    self.buf.clear();
                    self.state = DecodeState::Receiving;
                }
            }
            DecodeState::Receiving => match byte {
                // Back-to-back delimiters: treat the second as a fresh start.
                END if self.buf.len() == 0 => {}
                END => {
                    self.state = DecodeState::AwaitingStart;
                    self.stats.rx_success = self.stats.rx_success.wrapping_add(1);
                    return Some(self.buf.data());
                }
                ESC => self.state = DecodeState::AwaitingEscape,
                _ => self.append(byte),
            },
            DecodeState::AwaitingEscape => match byte {
                ESC_END => {
                    self.state = DecodeState::Receiving;
                    self.append(END);
                }
                ESC_ESC => {
                    self.state = DecodeState::Receiving;
                    self.append(ESC);
                }
                _ => {
                    debug!("slip escape followed by {:?}, dropping frame", byte);
                    self.drop_frame();
                }
            },
        }

        None
    }

    /// Consumes bytes until a frame completes, returning it along with the bytes
    /// left unread.
    pub fn push_bytes<'a, 'b>(&'a mut self, data: &'b [u8]) -> Option<(&'a [u8], &'b [u8])> {
        let end = self.scan(data)?;
        let frame = self.push_byte(data[end])?;
        Some((frame, &data[end + 1..]))
    }

    /// Feeds bytes until the one that would complete a frame, returning its index.
    fn scan(&mut self, data: &[u8]) -> Option<usize> {
        for (i, &byte) in data.iter().enumerate() {
            if byte == END && self.state == DecodeState::Receiving && self.buf.len() > 0 {
                return Some(i);
            }
            // Never completes a frame here.
            let _ = self.push_byte(byte);
        }

        None
    }

    fn append(&mut self, byte: u8) {
        if !self.buf.push(byte) {
            warn!("slip frame longer than {} bytes, dropping", N);
            self.stats.overrun = self.stats.overrun.wrapping_add(1);
            self.drop_frame();
        }
    }

    fn drop_frame(&mut self) {
        self.stats.rx_error = self.stats.rx_error.wrapping_add(1);
        self.reset();
    }
}

impl<const N: usize> Default for SlipDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::{DecodeState, SlipDecoder};
    use crate::slip::{END, ESC, ESC_END, ESC_ESC};

    fn collect<const N: usize>(decoder: &mut SlipDecoder<N>, data: &[u8]) -> Vec<Vec<u8>> {
        data.iter()
            .filter_map(|&b| decoder.push_byte(b).map(|f| f.to_vec()))
            .collect()
    }

    #[test]
    fn test_decoder_unescapes_frame() {
        let mut decoder = SlipDecoder::<16>::new();

        let frames = collect(
            &mut decoder,
            &[END, 0x01, ESC, ESC_END, 0x02, ESC, ESC_ESC, END],
        );
        assert_eq!(frames, [[0x01, END, 0x02, ESC]]);
        assert_eq!(decoder.stats().rx_success, 1);
        assert_eq!(decoder.state(), DecodeState::AwaitingStart);
    }

    #[test]
    fn test_decoder_ignores_bytes_before_start() {
        let mut decoder = SlipDecoder::<16>::new();

        let frames = collect(&mut decoder, &[0x39, 0x58, ESC, END, 0x07, END]);
        assert_eq!(frames, [[0x07]]);
        assert_eq!(decoder.stats().rx_error, 0);
    }

    #[test]
    fn test_decoder_back_to_back_delimiters() {
        let mut decoder = SlipDecoder::<16>::new();

        // Shared delimiters and empty frames between real ones.
        let frames = collect(&mut decoder, &[END, END, END, 0x01, END, END, 0x02, END]);
        assert_eq!(frames, [[0x01], [0x02]]);
    }

    #[test]
    fn test_decoder_bad_escape_drops_frame() {
        let mut decoder = SlipDecoder::<16>::new();

        let frames = collect(&mut decoder, &[END, 0x01, ESC, 0x42, 0x03, END, END, 0x04, END]);
        assert_eq!(frames, [[0x04]]);
        assert_eq!(decoder.stats().rx_error, 1);
        assert_eq!(decoder.stats().overrun, 0);
    }

    #[test]
    fn test_decoder_exact_capacity_frame_is_delivered() {
        let mut decoder = SlipDecoder::<4>::new();

        let frames = collect(&mut decoder, &[END, 1, 2, 3, 4, END]);
        assert_eq!(frames, [[1, 2, 3, 4]]);
        assert_eq!(decoder.stats().overrun, 0);
    }

    #[test]
    fn test_decoder_overrun_resynchronizes() {
        let mut decoder = SlipDecoder::<4>::new();

        let frames = collect(&mut decoder, &[END, 1, 2, 3, 4, 5, 6, END, 7, END]);
        assert_eq!(frames, [[7]]);
        assert_eq!(decoder.stats().overrun, 1);
        assert_eq!(decoder.stats().rx_error, 1);
        assert_eq!(decoder.stats().rx_success, 1);
    }

    #[test]
    fn test_decoder_reset_discards_partial_frame() {
        let mut decoder = SlipDecoder::<16>::new();

        assert!(collect(&mut decoder, &[END, 1, 2]).is_empty());
        assert_eq!(decoder.pending_len(), 2);

        decoder.reset();
        assert_eq!(decoder.state(), DecodeState::AwaitingStart);
        assert_eq!(decoder.pending_len(), 0);

        // Without a fresh start the old bytes never come back.
        assert!(collect(&mut decoder, &[3, END]).is_empty());
        assert_eq!(collect(&mut decoder, &[3, END]), [[3]]);
    }

    #[test]
    fn test_decoder_push_bytes_returns_remaining() {
        let mut decoder = SlipDecoder::<16>::new();
        let data = [0x55, END, 0x01, 0x02, END, END, 0x03, END];

        let (frame, rest) = decoder.push_bytes(&data).expect("frame expected");
        assert_eq!(frame, &[0x01, 0x02]);
        assert_eq!(rest, &[END, 0x03, END]);

        let (frame, rest) = decoder.push_bytes(rest).expect("frame expected");
        assert_eq!(frame, &[0x03]);
        assert!(rest.is_empty());

        assert!(decoder.push_bytes(&[END, 0x09]).is_none());
        assert_eq!(decoder.pending_len(), 1);
    }
}
