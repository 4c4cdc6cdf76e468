//! This crate provides a `no-std` SLIP link layer and command protocol for flight-controller
//! serial links.
//!
//! Every link carries frames of the form `[command][len][payload][crc16]`, SLIP encoded on the
//! wire. Inbound frames are decoded per link and dispatched through a [`CommandTable`]; outbound
//! frames are encoded straight into a per-port transmit ring that a transport driver drains.
//! # Usage
//! ### Sending
//! ```rust
//! use flightlink::{CommandTable, Config, Port, Protocol, RingBuffer};
//!
//! let mut usb = [0u8; 256];
//! let mut aux = [[0u8; 16]; 4];
//! let [a1, a2, a3, a4] = aux.each_mut();
//! let rings = [
//!     RingBuffer::new(&mut usb).unwrap(),
//!     RingBuffer::new(a1).unwrap(),
//!     RingBuffer::new(a2).unwrap(),
//!     RingBuffer::new(a3).unwrap(),
//!     RingBuffer::new(a4).unwrap(),
//! ];
//!
//! let table = CommandTable::new();
//! let protocol = Protocol::new(&table, rings, &(), Config::default());
//!
//! protocol.generate_custom(2u8, &[0x01], Port::Usb).unwrap();
//!
//! let mut out = [0u8; 16];
//! let len = protocol.drain_into(Port::Usb, &mut out);
//! assert_eq!(&out[..len], &[0xC0, 0x02, 0x01, 0x01, 0xEC, 0x81, 0xC0]);
//! ```
//! ### Receiving
//! ```rust
//! use flightlink::{handler_fn, Command, CommandTable, Config, LinkMux, Port, Protocol, RingBuffer};
//! use core::sync::atomic::{AtomicU32, Ordering};
//!
//! let pings = AtomicU32::new(0);
//! let on_ping = handler_fn(|_frame, _reply| {
//!     pings.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! let mut table = CommandTable::new();
//! table.register_handler(Command::Ping, &on_ping).unwrap();
//!
//! let mut storage = [[0u8; 64]; 5];
//! let rings = storage.each_mut().map(|buf| RingBuffer::new(buf).unwrap());
//! let protocol = Protocol::new(&table, rings, &(), Config::default());
//!
//! let mut links: LinkMux = LinkMux::new(&protocol);
//! links.feed_bytes(Port::Aux2, &[0xC0, 0x02, 0x01, 0x01, 0xEC, 0x81, 0xC0]);
//!
//! assert_eq!(pings.load(Ordering::Relaxed), 1);
//! assert_eq!(links.stats(Port::Aux2).success, 1);
//! ```

#![no_std]

#[macro_use]
mod fmt;

mod buffer;
pub use buffer::*;

mod error;
pub use error::*;

mod link;
pub use link::*;

mod packet;
pub use packet::*;

mod protocol;
pub use protocol::*;

pub mod slip;

mod table;
pub use table::*;


/// Command byte plus length byte.
pub const HEADER_LEN: usize = 2;
/// Trailing checksum.
pub const CRC_LEN: usize = 2;
/// Smallest valid frame: a header and a checksum around an empty payload.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CRC_LEN;
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;
/// Largest unescaped frame, and the default receive buffer size of a link.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN + CRC_LEN;

/// Number of command ids, the acknowledgement bit excluded.
pub const COMMAND_COUNT: usize = 128;
pub const PORT_COUNT: usize = 5;
/// Set in the command byte to request an acknowledgement.
pub const ACK_BIT: u8 = 0x80;

/// CRC-16/IBM-3740 (polynomial `0x1021`, initial value `0xFFFF`), the frame checksum.
pub static CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_3740);
