use std::{
    env,
    io::{self, Read, Write},
    time::{Duration, Instant},
};

use flightlink::{
    handler_fn, Command, CommandTable, Config, LinkMux, Port, Protocol, RingBuffer,
};

fn main() {
    let path = env::args().nth(1).expect("no serial port supplied");
    let mut port = serialport::new(path, 115_200)
        .timeout(Duration::from_millis(20))
        .open()
        .expect("failed to open serial port");

    let print_debug = handler_fn(|frame, reply| {
        println!(
            "{:?}: {}",
            reply.port(),
            String::from_utf8_lossy(frame.payload)
        );
    });

    let mut table = CommandTable::with_defaults();
    table
        .register_handler(Command::DebugMessage, &print_debug)
        .expect("debug message id is valid");

    let mut storage = [[0u8; 1024]; 5];
    let rings = storage
        .each_mut()
        .map(|buf| RingBuffer::new(buf).expect("ring size is a power of two"));
    let protocol = Protocol::new(&table, rings, &(), Config::default());
    let mut links: LinkMux = LinkMux::new(&protocol);

    let mut buf = [0; 1024];
    let mut last_ping = Instant::now();
    loop {
        match port.read(buf.as_mut_slice()) {
            Ok(n) => links.feed_bytes(Port::Usb, &buf[..n]),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => (),
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }

        if last_ping.elapsed() > Duration::from_secs(1) {
            if let Err(err) = protocol.generate(Command::Ping, Port::Usb) {
                eprintln!("{err}");
            }
            last_ping = Instant::now();
        }

        let n = protocol.drain_into(Port::Usb, &mut buf);
        if n > 0 {
            if let Err(e) = port.write_all(&buf[..n]) {
                eprintln!("{}", e);
                break;
            }
        }
    }

    println!("{:?}", links.stats(Port::Usb));
}
