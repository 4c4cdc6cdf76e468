use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};

use crate::{
    slip::{DecoderStats, SlipDecoder},
    Port, Protocol, MAX_FRAME_LEN, PORT_COUNT,
};

/// Per-link receive counters.
///
/// Each decoded frame increments exactly one of these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames handed to a handler.
    pub success: u32,
    /// Frames for a command with no handler.
    pub command_errors: u32,
    /// Frames too short, or whose length byte disagrees with the bytes received.
    pub size_errors: u32,
    pub checksum_errors: u32,
}

/// Receive side of one port: a SLIP decoder feeding the protocol dispatcher.
///
/// `RX` bounds the unescaped frame length accepted on this link.
pub struct Link<'a, const RX: usize = MAX_FRAME_LEN, M: RawMutex = CriticalSectionRawMutex> {
    port: Port,
    decoder: SlipDecoder<RX>,
    stats: LinkStats,
    protocol: &'a Protocol<'a, M>,
}

impl<'a, const RX: usize, M: RawMutex> Link<'a, RX, M> {
    pub fn new(port: Port, protocol: &'a Protocol<'a, M>) -> Self {
        Self {
            port,
            decoder: SlipDecoder::new(),
            stats: LinkStats {
                success: 0,
                command_errors: 0,
                size_errors: 0,
                checksum_errors: 0,
            },
            protocol,
        }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    /// Consumes one received byte, dispatching a frame if it completes one.
    pub fn feed(&mut self, byte: u8) {
        if let Some(frame) = self.decoder.push_byte(byte) {
            self.protocol.dispatch(self.port, frame, &mut self.stats);
        }
    }

    pub fn feed_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.feed(byte);
        }
    }

    /// Drops any partially received frame.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn decoder_stats(&self) -> &DecoderStats {
        self.decoder.stats()
    }
}

/// One [`Link`] per port, sharing a [`Protocol`].
///
/// Links never share decoding state, so bytes fed to one port can not corrupt a
/// frame in progress on another. Use [`into_links`](Self::into_links) to drive
/// each link from its own receive context.
pub struct LinkMux<'a, const RX: usize = MAX_FRAME_LEN, M: RawMutex = CriticalSectionRawMutex> {
    links: [Link<'a, RX, M>; PORT_COUNT],
}

impl<'a, const RX: usize, M: RawMutex> LinkMux<'a, RX, M> {
    pub fn new(protocol: &'a Protocol<'a, M>) -> Self {
        Self {
            links: Port::ALL.map(|port| Link::new(port, protocol)),
        }
    }

    pub fn feed(&mut self, port: Port, byte: u8) {
        self.links[port.index()].feed(byte);
    }

    pub fn feed_bytes(&mut self, port: Port, data: &[u8]) {
        self.links[port.index()].feed_bytes(data);
    }

    pub fn link(&self, port: Port) -> &Link<'a, RX, M> {
        &self.links[port.index()]
    }

    pub fn link_mut(&mut self, port: Port) -> &mut Link<'a, RX, M> {
        &mut self.links[port.index()]
    }

    pub fn stats(&self, port: Port) -> &LinkStats {
        self.link(port).stats()
    }

    pub fn into_links(self) -> [Link<'a, RX, M>; PORT_COUNT] {
        self.links
    }
}

#[cfg(test)]
mod tests {
    use super::{Link, LinkMux, LinkStats};
    use crate::{CommandTable, Config, Port, Protocol, RingBuffer, PORT_COUNT};

    #[test]
    fn test_link_counts_each_outcome_once() {
        let mut storage = [[0u8; 64]; PORT_COUNT];
        let rings = storage.each_mut().map(|buf| RingBuffer::new(buf).unwrap());
        let table = CommandTable::with_defaults();
        let protocol = Protocol::new(&table, rings, &(), Config::default());
        let mut link: Link<'_> = Link::new(Port::Aux1, &protocol);

        // Ping, answered by the default handler
        link.feed_bytes(&[0xC0, 0x02, 0x00, 0x6D, 0x7B, 0xC0]);
        // Same frame with a corrupted checksum
        link.feed_bytes(&[0xC0, 0x02, 0x00, 0x6D, 0x7A, 0xC0]);
        // Too short
        link.feed_bytes(&[0xC0, 0x02, 0x00, 0x6D, 0xC0]);
        // Ack has no inbound handler by default
        link.feed_bytes(&[0xC0, 0x01, 0x00, 0x3E, 0x2E, 0xC0]);

        assert_eq!(
            *link.stats(),
            LinkStats {
                success: 1,
                command_errors: 1,
                size_errors: 1,
                checksum_errors: 1,
            }
        );
        assert_eq!(link.decoder_stats().rx_success, 4);
        assert_eq!(protocol.transmit_ring(Port::Aux1).occupied(), 6);
    }

    #[test]
    fn test_mux_routes_by_port() {
        let mut storage = [[0u8; 64]; PORT_COUNT];
        let rings = storage.each_mut().map(|buf| RingBuffer::new(buf).unwrap());
        let table = CommandTable::with_defaults();
        let protocol = Protocol::new(&table, rings, &(), Config::default());
        let mut mux: LinkMux<'_> = LinkMux::new(&protocol);

        mux.feed_bytes(Port::Aux4, &[0xC0, 0x02, 0x00, 0x6D, 0x7B, 0xC0]);

        for port in Port::ALL {
            let expected = u32::from(port == Port::Aux4);
            assert_eq!(mux.stats(port).success, expected);
            assert_eq!(mux.link(port).port(), port);
        }

        let links = mux.into_links();
        assert_eq!(links[Port::Aux4.index()].stats().success, 1);
    }
}
