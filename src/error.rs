use snafu::Snafu;

/// Enum of link and protocol errors.
///
/// Only ring construction and message generation hand these back to the caller.
/// Receive-side errors are absorbed into the per-link counters instead.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[snafu(display("Ring capacity {capacity} is not a power of two"))]
    CapacityNotPowerOfTwo { capacity: usize },
    #[snafu(display("Transmit buffer overflow: need at least {needed} bytes, {available} free"))]
    EncodeOverflow { needed: usize, available: usize },
    #[snafu(display("Command {command} is not supported"))]
    Unsupported { command: u8 },
    #[snafu(display("Payload of {len} bytes does not fit the length field"))]
    PayloadTooLong { len: usize },
    #[snafu(display("Frame of {len} bytes is shorter than the minimum frame"))]
    FrameTooShort { len: usize },
    #[snafu(display("Declared payload length {declared} but {actual} bytes present"))]
    LengthMismatch { declared: u8, actual: usize },
    #[snafu(display("Crc checksum mismatch: expected {expected:#06x}, got {actual:#06x}"))]
    ChecksumMismatch { expected: u16, actual: u16 },
}
