use bitfields::bitfield;
use crc::Crc;

use crate::{Error, CRC_LEN, HEADER_LEN, MIN_FRAME_LEN};

mod command;
pub use command::*;

mod port;
pub use port::*;

/// Layout of the first byte of every frame.
#[bitfield(u8)]
#[derive(Clone, Copy, PartialEq)]
struct CommandByte {
    #[bits(7)]
    id: u8,
    ack: bool,
}

/// Packs a 7-bit command id and the acknowledgement request into one byte.
pub(crate) fn command_byte(id: u8, ack: bool) -> u8 {
    let mut byte = CommandByte::new();
    byte.set_id(id & 0x7F);
    byte.set_ack(ack);
    byte.into_bits()
}

/// Represents a received frame after its checksum has been verified.
///
/// The payload borrows the receive buffer it was parsed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame<'a> {
    /// Command id, with the acknowledgement bit stripped.
    pub command: u8,
    /// Whether the sender asked for an acknowledgement.
    pub ack: bool,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Parses an unescaped `[command][len][payload][crc lo][crc hi]` frame.
    ///
    /// Checks run in order: minimum size, the checksum over every byte before
    /// it, then the declared length against the payload bytes present. A
    /// corrupted length byte therefore shows up as a checksum mismatch.
    pub fn parse(buf: &'a [u8], crc: &Crc<u16>) -> Result<Self, Error> {
        if buf.len() < MIN_FRAME_LEN {
            return Err(Error::FrameTooShort { len: buf.len() });
        }

        let (body, checksum) = buf.split_at(buf.len() - CRC_LEN);
        let expected = u16::from_le_bytes([checksum[0], checksum[1]]);
        let computed = crc.checksum(body);

        if computed != expected {
            return Err(Error::ChecksumMismatch {
                expected,
                actual: computed,
            });
        }

        let (header, payload) = body.split_at(HEADER_LEN);
        let declared = header[1];

        if payload.len() != declared as usize {
            return Err(Error::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }

        let command = CommandByte::from_bits(header[0]);

        Ok(Self {
            command: command.id(),
            ack: command.ack(),
            payload,
        })
    }

    /// Returns the command as a known [`Command`], if it is one.
    pub fn known_command(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }

    /// Returns the payload as a fixed-size array when its length is exactly `N`.
    pub fn payload_exact<const N: usize>(&self) -> Option<&'a [u8; N]> {
        self.payload.try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{command_byte, Frame};
    use crate::{Command, Error, CRC16};

    #[test]
    fn test_command_byte_layout() {
        assert_eq!(command_byte(2, false), 0x02);
        assert_eq!(command_byte(2, true), 0x82);
        assert_eq!(command_byte(127, true), 0xFF);
        // Ids are masked to 7 bits
        assert_eq!(command_byte(0x85, false), 0x05);
    }

    #[test]
    fn test_frame_parse() {
        let buf = [0x02, 0x01, 0x01, 0xEC, 0x81];
        let frame = Frame::parse(&buf, &CRC16).expect("frame expected");

        assert_eq!(frame.command, 2);
        assert!(!frame.ack);
        assert_eq!(frame.payload, &[0x01]);
        assert_eq!(frame.known_command(), Some(Command::Ping));
        assert_eq!(frame.payload_exact::<1>(), Some(&[0x01]));
        assert_eq!(frame.payload_exact::<2>(), None);
        assert_eq!(frame.payload_exact::<0>(), None);
    }

    #[test]
    fn test_frame_parse_ack_bit() {
        // Ping with the acknowledgement bit, empty payload
        let buf = [0x82, 0x00, 0xF5, 0x60];
        let frame = Frame::parse(&buf, &CRC16).expect("frame expected");

        assert_eq!(frame.command, 2);
        assert!(frame.ack);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_frame_parse_errors() {
        assert_eq!(
            Frame::parse(&[0x02, 0x00, 0x6D], &CRC16),
            Err(Error::FrameTooShort { len: 3 })
        );
        assert_eq!(
            Frame::parse(&[0x02, 0x03, 0x01, 0x8E, 0xE7], &CRC16),
            Err(Error::LengthMismatch {
                declared: 3,
                actual: 1
            })
        );
        assert_eq!(
            Frame::parse(&[0x02, 0x01, 0x01, 0xEC, 0x80], &CRC16),
            Err(Error::ChecksumMismatch {
                expected: 0x80EC,
                actual: 0x81EC
            })
        );
    }
}
