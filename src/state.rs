//! Shared state and API to handle incoming commands.
//!
//! This is the only place where data is shared between connections: the
//! client registry lives here, behind one mutex, and every nickname claim,
//! routing lookup and removal goes through it.

use crate::client::{Client, MessageQueue};
use crate::lines;
use crate::message::{rpl, Buffer, ChatMessage, Command, Message};
use crate::util::time_str;
use slab::Slab;
use std::io;
use std::sync::Arc;
use tokio::sync::Mutex;

const SERVER_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

/// Identifies a client inside the registry.
pub type ClientId = usize;

type HandlerResult = Result<(), ()>;

/// State of the chat server.
///
/// Note that this is just an `Arc` to the real data, so it's cheap to clone
/// and clones share the same data.
///
/// # Example
///
/// ```rust
/// # use mirin::state::State;
/// # use mirin::message::Message;
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let state = State::new("mirin.localdomain".to_owned());
///
/// // The state pushes the messages meant to be sent to a client onto the
/// // client's queue.
/// let (msg_queue, mut outgoing_msgs) = tokio::sync::mpsc::unbounded_channel();
/// let id = state.peer_joined("127.0.0.1".to_owned(), msg_queue).await;
///
/// // `handle_message` is used to pass messages from the client to the state.
/// let nick = Message::parse("NICK ser\r\n").unwrap();
/// let user = Message::parse("USER ser 0 * :ser\r\n").unwrap();
/// state.handle_message(id, nick).await;
/// state.handle_message(id, user).await;
///
/// // The client has registered, so the state should have pushed the welcome
/// // messages onto the queue.  Note that one queue item can contain multiple
/// // IRC messages.
/// let msg = outgoing_msgs.recv().await.unwrap();
/// let msg: &str = msg.as_ref();
/// let mut lines = msg.split("\r\n");
///
/// // The first IRC message from the server is RPL_WELCOME.
/// assert_eq!(lines.next().unwrap(),
///            ":mirin.localdomain 001 ser :Welcome to the Internet Relay Network, ser (ser) @ mirin.localdomain");
/// # });
/// ```
#[derive(Clone)]
pub struct State(Arc<Mutex<StateInner>>);

impl State {
    /// Initializes the state, with the given domain in reply prefixes.
    pub fn new(domain: String) -> Self {
        Self(Arc::new(Mutex::new(StateInner::new(domain))))
    }

    /// Adds a new connection to the state.
    ///
    /// Returns the identifier of the new client.  The queue is used to push
    /// messages back to the peer.
    pub async fn peer_joined(&self, host: String, queue: MessageQueue) -> ClientId {
        self.0.lock().await.peer_joined(host, queue)
    }

    /// Removes the given connection from the state, with an optional error.
    ///
    /// Safe to call for a client that has already quit; it is then a no-op.
    pub async fn peer_quit(&self, id: ClientId, err: Option<io::Error>) {
        self.0.lock().await.peer_quit(id, err);
    }

    /// Updates the state according to the given message from the given client.
    pub async fn handle_message(&self, id: ClientId, msg: Message<'_>) {
        self.0.lock().await.handle_message(id, msg);
    }
}

/// The actual shared data (state) of the server.
struct StateInner {
    /// The domain of the server.  This string is used as a prefix for replies
    /// sent to clients, and appears in two reply texts.
    domain: String,

    /// The client registry.
    ///
    /// Among the live clients, at most one holds any given nickname.  All
    /// accesses go through the mutex in `State`, so uniqueness checks and
    /// routing lookups are atomic with respect to membership changes.
    clients: Slab<Client>,

    /// The formatted time when this instance was created.  It is sent to
    /// clients when they register (in a "003 RPL_CREATED" reply).
    created_at: String,
}

impl StateInner {
    fn new(domain: String) -> Self {
        Self {
            domain,
            clients: Slab::new(),
            created_at: time_str(),
        }
    }

    fn peer_joined(&mut self, host: String, queue: MessageQueue) -> ClientId {
        log::debug!("{}: Connected", host);
        self.clients.insert(Client::new(queue, host))
    }

    fn peer_quit(&mut self, id: ClientId, err: Option<io::Error>) {
        if !self.clients.contains(id) {
            return;
        }
        let client = self.clients.remove(id);
        log::debug!("{}: Disconnected", client.host());

        let mut response = Buffer::new();
        match err {
            Some(err) => {
                let reason = err.to_string();
                response.message(&self.domain, "ERROR").trailing_param(&reason);
            }
            None => {
                response.message(&self.domain, "ERROR").trailing_param(lines::CONNECTION_RESET);
            }
        }
        client.send(response);
    }

    fn handle_message(&mut self, id: ClientId, msg: Message<'_>) {
        if !self.clients.contains(id) {
            return;
        }

        let command = match msg.command {
            Ok(cmd) => cmd,
            Err(unknown) => {
                log::debug!("{}: Unknown command {:?}", id, unknown);
                self.send_reply(id, rpl::ERR_UNKNOWNCOMMAND, &[unknown, lines::UNKNOWN_COMMAND]);
                return;
            }
        };

        if !msg.has_enough_params() {
            match command {
                Command::Nick => {
                    self.send_reply(id, rpl::ERR_NONICKNAMEGIVEN, &[lines::NO_NICKNAME_GIVEN]);
                }
                _ => {
                    self.send_reply(id, rpl::ERR_NEEDMOREPARAMS,
                                    &[command.as_str(), lines::NEED_MORE_PARAMS]);
                }
            }
            return;
        }

        let ps = msg.params;
        let n = msg.num_params;
        log::debug!("{}: {} {:?}", id, command, &ps[..n]);
        let _ = match command {
            Command::Nick => self.cmd_nick(id, ps[0]),
            Command::User => self.cmd_user(id, if 4 <= n { ps[3] } else { ps[0] }),
            Command::PrivMsg => self.cmd_privmsg(id, ps[0], ps[1]),
            Command::Ping => self.cmd_ping(id, ps[0]),
            Command::Pong => Ok(()),
            Command::Quit => self.cmd_quit(id, ps[0]),
            Command::Reply(_) => Ok(()),
        };
    }
}

// Command handlers
impl StateInner {
    // NICK

    fn cmd_nick(&mut self, id: ClientId, nick: &str) -> HandlerResult {
        let in_use = self.clients.iter()
            .any(|(other, c)| other != id && c.has_nick() && c.nick() == nick);
        if in_use {
            log::debug!("{}: NICK {:?}: Already in use", id, nick);
            self.send_reply(id, rpl::ERR_NICKNAMEINUSE, &[nick, lines::NICKNAME_IN_USE]);
            return Err(());
        }

        let client = self.clients.get_mut(id).unwrap();

        // Registered clients are notified of the change, addressed with the
        // old nickname.  Re-claiming one's own nickname is a no-op.
        if client.is_registered() && client.nick() != nick {
            let mut response = Buffer::new();
            response.message(client.nick(), Command::Nick).param(nick);
            client.send(response);
        }

        client.set_nick(nick);
        self.try_register(id);

        Ok(())
    }

    // USER

    fn cmd_user(&mut self, id: ClientId, real: &str) -> HandlerResult {
        let client = self.clients.get_mut(id).unwrap();

        if client.has_real() {
            log::debug!("{}: USER {:?}: Already registered", id, real);
            self.send_reply(id, rpl::ERR_ALREADYREGISTRED, &[lines::ALREADY_REGISTERED]);
            return Err(());
        }

        client.set_real(real);
        self.try_register(id);

        Ok(())
    }

    /// Completes the registration of the given client, if it has sent both
    /// NICK and USER.
    ///
    /// Sends the welcome messages in their fixed order, then marks the client
    /// as registered; therefore this fires at most once per client.
    fn try_register(&mut self, id: ClientId) {
        let client = &self.clients[id];
        if client.is_registered() || !client.has_nick() || !client.has_real() {
            return;
        }

        log::debug!("{}: Registered as {:?}", id, client.nick());
        let mut response = Buffer::new();
        lines::welcome(response.message(&self.domain, rpl::WELCOME).param(client.nick()),
                       client.nick(), client.real(), &self.domain);
        lines::your_host(response.message(&self.domain, rpl::YOURHOST).param(client.nick()),
                         &self.domain, SERVER_VERSION);
        lines::created(response.message(&self.domain, rpl::CREATED).param(client.nick()),
                       &self.created_at);
        response.message(&self.domain, rpl::MYINFO)
            .param(client.nick())
            .param(&self.domain)
            .param(SERVER_VERSION);
        client.send(response);

        self.clients.get_mut(id).unwrap().set_registered();
    }

    // PRIVMSG

    fn cmd_privmsg(&mut self, id: ClientId, target: &str, content: &str) -> HandlerResult {
        let target_client = match self.find_nick(target) {
            Some((_, target_client)) => target_client,
            None => {
                log::debug!("{}: PRIVMSG {:?}: No such nickname", id, target);
                self.send_reply(id, rpl::ERR_NOSUCHNICK, &[target, lines::NO_SUCH_NICK]);
                return Err(());
            }
        };

        let msg = ChatMessage {
            sender: self.clients[id].nick(),
            recipient: target,
            body: content,
        };
        target_client.send(msg.buffer());

        Ok(())
    }

    // PING

    fn cmd_ping(&mut self, id: ClientId, payload: &str) -> HandlerResult {
        let client = &self.clients[id];
        let mut response = Buffer::new();

        if payload.is_empty() {
            response.message(&self.domain, Command::Pong);
        } else {
            response.message(&self.domain, Command::Pong).trailing_param(payload);
        }
        client.send(response);

        Ok(())
    }

    // QUIT

    fn cmd_quit(&mut self, id: ClientId, reason: &str) -> HandlerResult {
        let client = self.clients.remove(id);
        log::debug!("{}: QUIT {:?}", client.host(), reason);

        let mut response = Buffer::new();
        let reason = if reason.is_empty() { lines::CLOSING_LINK } else { reason };
        response.message(&self.domain, "ERROR").trailing_param(reason);
        client.send(response);

        // Dropping the client drops the last queue sender, which makes the
        // transport task flush and close the connection.
        Err(())
    }
}

// Send utilities
impl StateInner {
    /// Looks a client up by its current nickname.
    ///
    /// Clients that have not sent a NICK yet never match.
    fn find_nick(&self, nick: &str) -> Option<(ClientId, &Client)> {
        self.clients.iter().find(|(_, c)| c.has_nick() && c.nick() == nick)
    }

    /// Sends a reply to the given client.
    ///
    /// The client's nickname is inserted as first parameter, the last element
    /// of `params` becomes the trailing parameter.
    fn send_reply(&self, id: ClientId, r: &'static str, params: &[&str]) {
        let client = &self.clients[id];
        let mut response = Buffer::new();

        {
            let mut msg = response.message(&self.domain, r).param(client.nick());
            if let Some((last, rest)) = params.split_last() {
                for param in rest {
                    msg = msg.param(param);
                }
                msg.trailing_param(last);
            }
        }
        client.send(response);
    }
}
