use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::PORT_COUNT;

/// Represents all serial ports a flight controller talks on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Port {
    Usb = 0,
    Aux1 = 1,
    Aux2 = 2,
    Aux3 = 3,
    /// Routed over the CAN bus.
    Aux4 = 4,
}

impl Port {
    pub const ALL: [Port; PORT_COUNT] = [Port::Usb, Port::Aux1, Port::Aux2, Port::Aux3, Port::Aux4];

    /// Position of this port in per-port tables.
    pub const fn index(self) -> usize {
        self as usize
    }
}

bitflags::bitflags! {
    /// A set of ports, used to address a message to several links at once.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Ports: u8 {
        const USB = 1;
        const AUX1 = 1 << 1;
        const AUX2 = 1 << 2;
        const AUX3 = 1 << 3;
        const AUX4 = 1 << 4;
    }
}

impl Ports {
    pub fn from_port(port: Port) -> Self {
        use Port::*;

        match port {
            Usb => Ports::USB,
            Aux1 => Ports::AUX1,
            Aux2 => Ports::AUX2,
            Aux3 => Ports::AUX3,
            Aux4 => Ports::AUX4,
        }
    }

    pub fn contains_port(&self, port: Port) -> bool {
        self.contains(Self::from_port(port))
    }

    /// Iterates the ports in this set in index order.
    pub fn ports(self) -> impl Iterator<Item = Port> {
        Port::ALL.into_iter().filter(move |&port| self.contains_port(port))
    }
}

impl From<Port> for Ports {
    fn from(port: Port) -> Self {
        Self::from_port(port)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::{Port, Ports};

    #[test]
    fn test_port_indices() {
        for (i, port) in Port::ALL.into_iter().enumerate() {
            assert_eq!(port.index(), i);
            assert_eq!(Port::try_from(i as u8), Ok(port));
        }
        assert!(Port::try_from(5u8).is_err());
    }

    #[test]
    fn test_ports_iterate_in_order() {
        let set = Ports::AUX4 | Ports::USB | Ports::from(Port::Aux2);
        assert!(set.contains_port(Port::Aux2));
        assert!(!set.contains_port(Port::Aux1));
        assert_eq!(
            set.ports().collect::<Vec<_>>(),
            [Port::Usb, Port::Aux2, Port::Aux4]
        );
        assert_eq!(Ports::all().ports().count(), 5);
    }
}
