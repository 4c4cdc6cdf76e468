//! SLIP framing over the transmit ring and the receive-side frame assembler.
//!
//! A frame on the wire is `END, <escaped bytes...>, END`. Inside a frame an `END`
//! byte is sent as `ESC, ESC_END` and an `ESC` byte as `ESC, ESC_ESC`.

mod decoder;
pub use decoder::*;

mod encoder;
pub use encoder::*;

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape prefix.
pub const ESC: u8 = 0xDB;
/// Follows `ESC` to stand for a literal `END`.
pub const ESC_END: u8 = 0xDC;
/// Follows `ESC` to stand for a literal `ESC`.
pub const ESC_ESC: u8 = 0xDD;
