use crate::{Command, Error, Frame, FrameEncoder, Reply, COMMAND_COUNT};

/// Handles one inbound command.
///
/// Handlers run on the receiving link's context, right after the frame passed
/// its checks. Payload length validation is up to the handler; a frame it does
/// not like is simply ignored.
pub trait CommandHandler: Sync {
    fn handle(&self, frame: &Frame<'_>, reply: &Reply<'_>);
}

/// Builds one outbound message into a claimed transmit ring.
///
/// The encoder already knows the command id. Implementations pick the payload
/// and call one of its `send_*` methods, returning what it returns.
pub trait MessageGenerator: Sync {
    fn generate(&self, out: FrameEncoder<'_, '_>) -> Result<usize, Error>;
}

/// A [`CommandHandler`] built from a closure, see [`handler_fn`].
#[derive(Clone, Copy)]
pub struct HandlerFn<F>(F);

/// Wraps a closure as a [`CommandHandler`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&Frame<'_>, &Reply<'_>) + Sync,
{
    HandlerFn(f)
}

impl<F> CommandHandler for HandlerFn<F>
where
    F: Fn(&Frame<'_>, &Reply<'_>) + Sync,
{
    fn handle(&self, frame: &Frame<'_>, reply: &Reply<'_>) {
        (self.0)(frame, reply)
    }
}

/// A [`MessageGenerator`] built from a closure, see [`generator_fn`].
#[derive(Clone, Copy)]
pub struct GeneratorFn<F>(F);

/// Wraps a closure as a [`MessageGenerator`].
pub fn generator_fn<F>(f: F) -> GeneratorFn<F>
where
    F: Fn(FrameEncoder<'_, '_>) -> Result<usize, Error> + Sync,
{
    GeneratorFn(f)
}

impl<F> MessageGenerator for GeneratorFn<F>
where
    F: Fn(FrameEncoder<'_, '_>) -> Result<usize, Error> + Sync,
{
    fn generate(&self, out: FrameEncoder<'_, '_>) -> Result<usize, Error> {
        (self.0)(out)
    }
}

/// Generator for messages without a payload, such as `Ack` and `Ping`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderOnly;

impl MessageGenerator for HeaderOnly {
    fn generate(&self, out: FrameEncoder<'_, '_>) -> Result<usize, Error> {
        out.send_header_only()
    }
}

/// Answers every inbound `Ping` with a `Ping` on the same port.
#[derive(Clone, Copy, Debug, Default)]
pub struct PingResponder;

impl CommandHandler for PingResponder {
    fn handle(&self, _frame: &Frame<'_>, reply: &Reply<'_>) {
        if let Err(e) = reply.send(Command::Ping) {
            debug!("ping reply on {:?} failed: {:?}", reply.port(), e);
        }
    }
}

static HEADER_ONLY: HeaderOnly = HeaderOnly;
static PING_RESPONDER: PingResponder = PingResponder;

/// Slot of a [`CommandTable`].
#[derive(Clone, Copy)]
pub enum Slot<T> {
    Unsupported,
    Supported(T),
}

impl<T: Copy> Slot<T> {
    fn get(&self) -> Option<T> {
        match self {
            Slot::Unsupported => None,
            Slot::Supported(entry) => Some(*entry),
        }
    }
}

/// Inbound handlers and outbound generators indexed by 7-bit command id.
///
/// Every id starts out unsupported. Id 0 is reserved and can never be
/// registered, so a zeroed command byte never reaches a handler.
pub struct CommandTable<'a> {
    handlers: [Slot<&'a dyn CommandHandler>; COMMAND_COUNT],
    generators: [Slot<&'a dyn MessageGenerator>; COMMAND_COUNT],
}

impl<'a> CommandTable<'a> {
    /// Creates a table with every command unsupported.
    pub const fn new() -> Self {
        Self {
            handlers: [Slot::Unsupported; COMMAND_COUNT],
            generators: [Slot::Unsupported; COMMAND_COUNT],
        }
    }

    /// Creates a table that can send `Ack` and `Ping` and answers `Ping`.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.generators[Command::Ack.id() as usize] = Slot::Supported(&HEADER_ONLY);
        table.generators[Command::Ping.id() as usize] = Slot::Supported(&HEADER_ONLY);
        table.handlers[Command::Ping.id() as usize] = Slot::Supported(&PING_RESPONDER);
        table
    }

    fn index(command: u8) -> Result<usize, Error> {
        match command as usize {
            0 => Err(Error::Unsupported { command }),
            id if id < COMMAND_COUNT => Ok(id),
            _ => Err(Error::Unsupported { command }),
        }
    }

    /// Registers `handler` for inbound frames carrying `command`, replacing any
    /// previous one.
    pub fn register_handler(
        &mut self,
        command: impl Into<u8>,
        handler: &'a dyn CommandHandler,
    ) -> Result<(), Error> {
        let id = Self::index(command.into())?;
        self.handlers[id] = Slot::Supported(handler);
        Ok(())
    }

    /// Registers `generator` for outbound messages carrying `command`,
    /// replacing any previous one.
    pub fn register_generator(
        &mut self,
        command: impl Into<u8>,
        generator: &'a dyn MessageGenerator,
    ) -> Result<(), Error> {
        let id = Self::index(command.into())?;
        self.generators[id] = Slot::Supported(generator);
        Ok(())
    }

    pub fn unregister_handler(&mut self, command: impl Into<u8>) {
        if let Ok(id) = Self::index(command.into()) {
            self.handlers[id] = Slot::Unsupported;
        }
    }

    pub fn unregister_generator(&mut self, command: impl Into<u8>) {
        if let Ok(id) = Self::index(command.into()) {
            self.generators[id] = Slot::Unsupported;
        }
    }

    /// Looks up the inbound handler for a 7-bit command id.
    pub fn handler(&self, command: u8) -> Option<&'a dyn CommandHandler> {
        self.handlers.get(Self::index(command).ok()?)?.get()
    }

    /// Looks up the outbound generator for a 7-bit command id.
    pub fn generator(&self, command: u8) -> Option<&'a dyn MessageGenerator> {
        self.generators.get(Self::index(command).ok()?)?.get()
    }
}

impl Default for CommandTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}
