use core::iter;

use crc::Crc;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};

use crate::{
    buffer::{RingBuffer, TransmitRing},
    packet::command_byte,
    slip, Command, CommandTable, Error, Frame, LinkStats, Port, Ports, ACK_BIT, CRC16,
    MAX_PAYLOAD_LEN, PORT_COUNT,
};

/// Struct for configuring a [`Protocol`].
#[non_exhaustive]
#[derive(Clone, Copy)]
pub struct Config {
    /// Checksum algorithm shared by both directions. Default is [`CRC16`].
    pub crc: &'static Crc<u16>,
    /// Whether to answer frames carrying the acknowledgement bit with an `Ack`.
    /// Default is `true`.
    pub honor_ack: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crc: &CRC16,
            honor_ack: true,
        }
    }
}

/// Hook telling a transport driver that its transmit ring has new data.
///
/// Called once per successfully generated message, after the ring has been
/// released.
pub trait TransmitNotify: Sync {
    fn start_transmission(&self, port: Port);
}

/// No driver to wake; rings are polled instead.
impl TransmitNotify for () {
    fn start_transmission(&self, _port: Port) {}
}

/// Builds a single frame for a fixed command into a claimed transmit ring.
///
/// Handed to every [`MessageGenerator`](crate::MessageGenerator). The checksum
/// is computed incrementally over command byte, length byte and payload, then
/// appended little-endian. Each `send_*` method consumes the encoder, so one
/// claim produces at most one frame.
pub struct FrameEncoder<'r, 'a> {
    ring: &'r mut RingBuffer<'a>,
    command: u8,
    crc: &'static Crc<u16>,
}

impl<'r, 'a> FrameEncoder<'r, 'a> {
    pub(crate) fn new(ring: &'r mut RingBuffer<'a>, command: u8, crc: &'static Crc<u16>) -> Self {
        Self { ring, command, crc }
    }

    /// Command id the frame will carry.
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Free bytes in the claimed ring.
    pub fn space_left(&self) -> usize {
        self.ring.space_left()
    }

    /// Sends a frame with an empty payload.
    pub fn send_header_only(self) -> Result<usize, Error> {
        self.send_payload(&[])
    }

    /// Sends a frame carrying `payload`.
    pub fn send_payload(self, payload: &[u8]) -> Result<usize, Error> {
        let header = self.header(payload.len())?;

        let mut digest = self.crc.digest();
        digest.update(&header);
        digest.update(payload);
        let crc = digest.finalize().to_le_bytes();

        slip::encode_hbt(self.ring, &header, payload, &crc)
    }

    /// Sends a frame whose payload is the concatenation of `chunks`.
    ///
    /// Useful when the payload lives in several places, for example a fixed
    /// prefix followed by a borrowed structure.
    pub fn send_chunks(self, chunks: &[&[u8]]) -> Result<usize, Error> {
        let len = chunks.iter().map(|chunk| chunk.len()).sum();
        let header = self.header(len)?;

        let mut digest = self.crc.digest();
        digest.update(&header);
        for chunk in chunks {
            digest.update(chunk);
        }
        let crc = digest.finalize().to_le_bytes();

        let spans = iter::once(&header[..])
            .chain(chunks.iter().copied())
            .chain(iter::once(&crc[..]));
        slip::encode_spans(self.ring, spans)
    }

    fn header(&self, len: usize) -> Result<[u8; 2], Error> {
        if len > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLong { len });
        }

        Ok([command_byte(self.command, false), len as u8])
    }
}

/// Outbound half of a [`Protocol`], independent of its lock type.
pub(crate) trait Outbound {
    fn generate(&self, command: u8, port: Port) -> Result<usize, Error>;
    fn generate_custom(&self, command: u8, payload: &[u8], port: Port) -> Result<usize, Error>;
}

impl<M: RawMutex> Outbound for Protocol<'_, M> {
    fn generate(&self, command: u8, port: Port) -> Result<usize, Error> {
        Protocol::generate(self, command, port)
    }

    fn generate_custom(&self, command: u8, payload: &[u8], port: Port) -> Result<usize, Error> {
        Protocol::generate_custom(self, command, payload, port)
    }
}

/// Handle passed to a [`CommandHandler`](crate::CommandHandler) for answering
/// on the port the frame came in on.
pub struct Reply<'p> {
    outbound: &'p dyn Outbound,
    port: Port,
}

impl Reply<'_> {
    pub fn port(&self) -> Port {
        self.port
    }

    /// Sends the registered message for `command` back on the same port.
    pub fn send(&self, command: impl Into<u8>) -> Result<usize, Error> {
        self.outbound.generate(command.into(), self.port)
    }

    /// Sends `payload` under `command` back on the same port.
    pub fn send_custom(&self, command: impl Into<u8>, payload: &[u8]) -> Result<usize, Error> {
        self.outbound.generate_custom(command.into(), payload, self.port)
    }
}

/// Outbound side of the protocol plus the inbound dispatcher.
///
/// Owns one [`TransmitRing`] per port, each behind its own `M` lock.
/// Generation may be called from any context the lock covers; every write into
/// a ring happens under that ring's lock and is published as a whole frame or
/// not at all.
pub struct Protocol<'a, M: RawMutex = CriticalSectionRawMutex> {
    table: &'a CommandTable<'a>,
    rings: [TransmitRing<'a, M>; PORT_COUNT],
    notify: &'a dyn TransmitNotify,
    config: Config,
}

impl<'a> Protocol<'a> {
    /// Creates a `Protocol` with `rings` indexed by [`Port::index`], each
    /// guarded by a critical section.
    pub fn new(
        table: &'a CommandTable<'a>,
        rings: [RingBuffer<'a>; PORT_COUNT],
        notify: &'a dyn TransmitNotify,
        config: Config,
    ) -> Self {
        Self::with_raw_mutex(table, rings, notify, config)
    }
}

impl<'a, M: RawMutex> Protocol<'a, M> {
    /// Like [`Protocol::new`], with every ring guarded by an `M` lock.
    pub fn with_raw_mutex(
        table: &'a CommandTable<'a>,
        rings: [RingBuffer<'a>; PORT_COUNT],
        notify: &'a dyn TransmitNotify,
        config: Config,
    ) -> Self {
        Self {
            table,
            rings: rings.map(TransmitRing::new),
            notify,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> &'a CommandTable<'a> {
        self.table
    }

    pub fn transmit_ring(&self, port: Port) -> &TransmitRing<'a, M> {
        &self.rings[port.index()]
    }

    /// Moves pending bytes of `port`'s ring into `out`, returning the count.
    pub fn drain_into(&self, port: Port, out: &mut [u8]) -> usize {
        self.transmit_ring(port).drain_into(out)
    }

    /// Generates the registered message for `command` on `port`.
    ///
    /// Fails with [`Error::Unsupported`] if no generator is registered, or with
    /// the generator's own error. Returns the number of bytes queued.
    pub fn generate(&self, command: impl Into<u8>, port: Port) -> Result<usize, Error> {
        let command = command.into();

        let Some(generator) = self.table.generator(command) else {
            debug!("no generator for command {} on {:?}", command, port);
            return Err(Error::Unsupported { command });
        };

        self.transmit(command, port, |out| generator.generate(out))
    }

    /// Generates a frame with an arbitrary `payload` under `command` on `port`,
    /// bypassing the table.
    pub fn generate_custom(
        &self,
        command: impl Into<u8>,
        payload: &[u8],
        port: Port,
    ) -> Result<usize, Error> {
        let command = command.into();

        if command == 0 || command & ACK_BIT != 0 {
            return Err(Error::Unsupported { command });
        }

        self.transmit(command, port, |out| out.send_payload(payload))
    }

    /// Generates `command` on every port in `ports`.
    ///
    /// Returns the ports the message was queued on. Ports whose ring is full
    /// are skipped without affecting the others.
    pub fn broadcast(&self, command: impl Into<u8>, ports: Ports) -> Ports {
        let command = command.into();

        ports
            .ports()
            .filter(|&port| self.generate(command, port).is_ok())
            .fold(Ports::empty(), |sent, port| sent | Ports::from_port(port))
    }

    /// Claims `port`'s ring, runs `f` and wakes the driver if it succeeded.
    fn transmit<F>(&self, command: u8, port: Port, f: F) -> Result<usize, Error>
    where
        F: FnOnce(FrameEncoder<'_, 'a>) -> Result<usize, Error>,
    {
        let crc = self.config.crc;
        let result = self
            .transmit_ring(port)
            .claim(|ring| f(FrameEncoder::new(ring, command, crc)));

        match result {
            Ok(written) => {
                trace!("queued command {} ({} bytes) on {:?}", command, written, port);
                self.notify.start_transmission(port);
            }
            Err(e) => warn!("command {} not queued on {:?}: {:?}", command, port, e),
        }

        result
    }

    /// Checks a decoded frame from `port` and hands it to its handler.
    ///
    /// Every outcome lands in exactly one counter of `stats`.
    pub(crate) fn dispatch(&self, port: Port, buf: &[u8], stats: &mut LinkStats) {
        let frame = match Frame::parse(buf, self.config.crc) {
            Ok(frame) => frame,
            Err(Error::ChecksumMismatch { expected, actual }) => {
                warn!(
                    "checksum mismatch on {:?}: expected {}, got {}",
                    port, expected, actual
                );
                stats.checksum_errors = stats.checksum_errors.wrapping_add(1);
                return;
            }
            Err(e) => {
                debug!("malformed frame on {:?}: {:?}", port, e);
                stats.size_errors = stats.size_errors.wrapping_add(1);
                return;
            }
        };

        let Some(handler) = self.table.handler(frame.command) else {
            debug!("unsupported command {} on {:?}", frame.command, port);
            stats.command_errors = stats.command_errors.wrapping_add(1);
            return;
        };

        handler.handle(&frame, &Reply {
            outbound: self,
            port,
        });
        stats.success = stats.success.wrapping_add(1);

        if frame.ack && self.config.honor_ack {
            if let Err(e) = self.transmit(Command::Ack.id(), port, |out| out.send_header_only()) {
                debug!("ack for command {} on {:?} dropped: {:?}", frame.command, port, e);
            }
        }
    }
}
