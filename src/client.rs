//! Client data and outgoing message queues.

use crate::message::Buffer;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The write end of a client's outgoing message queue.
///
/// It is unbounded, so pushing messages onto it never blocks; backpressure on
/// the socket is the transport task's concern.
pub type MessageQueue = mpsc::UnboundedSender<MessageQueueItem>;

/// A batch of messages to be sent to a client.
///
/// Cheap to clone, so one batch can be pushed onto several queues.
#[derive(Clone)]
pub struct MessageQueueItem(Arc<str>);

impl From<Buffer> for MessageQueueItem {
    fn from(response: Buffer) -> Self {
        Self(Arc::from(response.build()))
    }
}

impl AsRef<str> for MessageQueueItem {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<[u8]> for MessageQueueItem {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Client data.
pub struct Client {
    /// The queue of messages to be sent to the client.
    queue: MessageQueue,

    /// The peer host, kept for logging.
    host: String,

    /// The nickname.  Empty until the client sends a first NICK.
    nick: String,

    /// The real name.  Empty until the client sends USER; set at most once.
    real: String,

    /// Whether the client has completed its registration.
    ///
    /// Flips to true exactly once, when both `nick` and `real` are first
    /// non-empty.
    registered: bool,
}

impl Client {
    /// Initializes the data for a new client, given its message queue.
    pub fn new(queue: MessageQueue, host: String) -> Self {
        Self {
            queue,
            host,
            nick: String::new(),
            real: String::new(),
            registered: false,
        }
    }

    /// Pushes a message batch onto the client's queue.
    ///
    /// The send fails when the transport task has already dropped the read
    /// end; the message is then lost, which is fine.
    pub fn send<M>(&self, msg: M)
        where M: Into<MessageQueueItem>
    {
        let _ = self.queue.send(msg.into());
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The nickname of the client, or "*" when it hasn't given one yet.
    ///
    /// "*" is what replies use as the client parameter before the nickname is
    /// known.
    pub fn nick(&self) -> &str {
        if self.nick.is_empty() { "*" } else { &self.nick }
    }

    /// Whether the client has sent a NICK command.
    pub fn has_nick(&self) -> bool {
        !self.nick.is_empty()
    }

    pub fn set_nick(&mut self, nick: &str) {
        self.nick.clear();
        self.nick.push_str(nick);
    }

    pub fn real(&self) -> &str {
        &self.real
    }

    /// Whether the client has sent a USER command.
    pub fn has_real(&self) -> bool {
        !self.real.is_empty()
    }

    pub fn set_real(&mut self, real: &str) {
        self.real.clear();
        self.real.push_str(real);
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Marks the registration as complete.  There is no way back.
    pub fn set_registered(&mut self) {
        self.registered = true;
    }
}
