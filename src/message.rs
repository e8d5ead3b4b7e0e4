//! IRC message parsing and formatting.
//!
//! Reading messages is done with `Message::parse`, writing them with `Buffer`.
//!
//! Relevant source of information:
//! <https://tools.ietf.org/html/rfc2812.html#section-2.3>

use std::fmt;

/// The maximum number of parameters a message can carry.
pub const PARAMS_LENGTH: usize = 4;

/// The list of IRC replies sent by mirin.
///
/// Each reply has the client's nick as first parameter.
pub mod rpl {
    pub const WELCOME: &str  = "001";  // :Welcome message
    pub const YOURHOST: &str = "002";  // :Your host is...
    pub const CREATED: &str  = "003";  // :This server was created...
    pub const MYINFO: &str   = "004";  // <servername> <version>

    pub const ERR_NOSUCHNICK: &str       = "401";  // <nick> :No such nick
    pub const ERR_UNKNOWNCOMMAND: &str   = "421";  // <command> :Unknown command
    pub const ERR_NONICKNAMEGIVEN: &str  = "431";  // :No nickname given
    pub const ERR_NICKNAMEINUSE: &str    = "433";  // <nick> :Nickname in use
    pub const ERR_NEEDMOREPARAMS: &str   = "461";  // <command> :Not enough parameters
    pub const ERR_ALREADYREGISTRED: &str = "462";  // :Already registered
}

macro_rules! commands {
    ( $( $cmd:ident $cmd_str:literal $n:literal )* ) => {
        /// The list of commands mirin supports.
        ///
        /// Unknown commands are carried by `Message` directly, as `Err(word)`.
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub enum Command {
            $( $cmd, )*
            Reply(&'static str),
        }

        impl Command {
            /// From a given command string, returns the corresponding command, or `None`
            /// otherwise.  It ignores the case of its argument.
            pub fn parse(s: &str) -> Option<Self> {
                $( if s.eq_ignore_ascii_case($cmd_str) {
                    Some(Command::$cmd)
                } else )* {
                    None
                }
            }

            /// Returns the number of required parameters for the command.
            ///
            /// The command may accept more parameters.
            pub fn required_params(&self) -> usize {
                match self {
                $(
                    Command::$cmd => $n,
                )*
                    Command::Reply(_) => 0,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                $(
                    Command::$cmd => $cmd_str,
                )*
                    Command::Reply(s) => s,
                }
            }
        }
    };
}

commands! {
    Nick "NICK" 1
    User "USER" 1
    PrivMsg "PRIVMSG" 2
    Ping "PING" 0
    Pong "PONG" 0
    Quit "QUIT" 0
}

impl From<&'static str> for Command {
    fn from(reply: &'static str) -> Self {
        Command::Reply(reply)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An IRC message.
///
/// See `Message::parse` for how to read one, and `Buffer` for how to build one.
#[derive(Clone, Debug)]
pub struct Message<'a> {
    /// The prefix of the message, without the leading `:`.
    pub prefix: Option<&'a str>,

    /// The command of the message, or the raw command word when it is not a
    /// variant of `Command`.
    pub command: Result<Command, &'a str>,

    /// The number of valid elements in `Message::params`.
    pub num_params: usize,

    /// The parameters of the message.
    ///
    /// Only the `num_params` first elements are valid.  The other elements are
    /// empty strings.
    pub params: [&'a str; PARAMS_LENGTH],
}

impl<'a> Message<'a> {
    /// Parses a string and returns information about the IRC message.
    ///
    /// Returns `None` when the message is empty or has no command.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mirin::message::{Command, Message};
    /// let msg = Message::parse(":ser PRIVMSG aki :hi there\r\n").unwrap();
    ///
    /// assert_eq!(msg.prefix, Some("ser"));
    /// assert_eq!(msg.command, Ok(Command::PrivMsg));
    /// assert_eq!(msg.num_params, 2);
    /// assert_eq!(msg.params[0], "aki");
    /// assert_eq!(msg.params[1], "hi there");
    /// ```
    pub fn parse(s: &'a str) -> Option<Message<'a>> {
        let mut buf = s.trim();
        if buf.is_empty() || buf.contains('\0') {
            return None;
        }

        let prefix = if buf.starts_with(':') {
            let end = buf[1..].find(' ')?;
            let (prefix, rest) = buf[1..].split_at(end);
            buf = rest.trim_start();
            Some(prefix)
        } else {
            None
        };

        let (word, rest) = buf.split_at(buf.find(' ').unwrap_or_else(|| buf.len()));
        if word.is_empty() {
            return None;
        }
        let command = Command::parse(word).ok_or(word);
        buf = rest.trim_start();

        let mut params = [""; PARAMS_LENGTH];
        let mut num_params = 0;
        while !buf.is_empty() && num_params < PARAMS_LENGTH {
            if let Some(trailing) = buf.strip_prefix(':') {
                params[num_params] = trailing;
                buf = "";
            } else {
                let (param, rest) = buf.split_at(buf.find(' ').unwrap_or_else(|| buf.len()));
                params[num_params] = param;
                buf = rest.trim_start();
            }
            num_params += 1;
        }

        Some(Message { prefix, command, num_params, params })
    }

    /// Whether the message has enough parameters for its command.
    pub fn has_enough_params(&self) -> bool {
        match self.command {
            Ok(cmd) => cmd.required_params() <= self.num_params,
            Err(_) => true,
        }
    }
}

/// Helper to build one IRC message inside a `Buffer`.
///
/// `"\r\n"` is appended automatically when this is dropped.
pub struct MessageBuffer<'a> {
    buf: &'a mut String,
}

impl<'a> MessageBuffer<'a> {
    fn with_prefix<C>(buf: &'a mut String, prefix: &str, command: C) -> Self
        where C: Into<Command>
    {
        if !prefix.is_empty() {
            buf.push(':');
            buf.push_str(prefix);
            buf.push(' ');
        }
        buf.push_str(command.into().as_str());
        MessageBuffer { buf }
    }

    /// Appends a parameter to the message.
    ///
    /// The parameter is trimmed before insertion; if it is whitespace, it is
    /// not appended.  It is up to the caller to make sure it contains no
    /// newline.
    pub fn param(self, param: &str) -> Self {
        let param = param.trim();
        if param.is_empty() {
            return self;
        }
        self.buf.push(' ');
        self.buf.push_str(param);
        self
    }

    /// Appends the trailing parameter and consumes the buffer.
    ///
    /// Contrary to `MessageBuffer::param`, the parameter is not trimmed before
    /// insertion, and is appended even when empty.
    pub fn trailing_param(self, param: &str) {
        self.buf.push(' ');
        self.buf.push(':');
        self.buf.push_str(param);
    }

    /// Returns the inner buffer, positioned at the trailing parameter.
    ///
    /// The caller can then use `write!` to format the parameter in place.
    pub fn raw_trailing_param(&mut self) -> &mut String {
        self.buf.push(' ');
        self.buf.push(':');
        self.buf
    }
}

impl Drop for MessageBuffer<'_> {
    fn drop(&mut self) {
        self.buf.push('\r');
        self.buf.push('\n');
    }
}

/// A batch of outgoing IRC messages.
///
/// # Example
///
/// ```rust
/// # use mirin::message::{Buffer, Command};
/// let mut response = Buffer::new();
///
/// response.message("ser", Command::Quit).trailing_param("catch you later");
///
/// assert_eq!(&response.build(), ":ser QUIT :catch you later\r\n");
/// ```
#[derive(Default)]
pub struct Buffer {
    buf: String,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Starts a new message with the given prefix and command.
    ///
    /// An empty prefix is not written.
    pub fn message<C>(&mut self, prefix: &str, command: C) -> MessageBuffer<'_>
        where C: Into<Command>
    {
        MessageBuffer::with_prefix(&mut self.buf, prefix, command)
    }

    /// Consumes the buffer and returns the formatted messages.
    pub fn build(self) -> String {
        self.buf
    }
}

/// A private message on its way from one client to another.
///
/// Immutable once constructed; `ChatMessage::buffer` renders the wire form
/// that is pushed onto the recipient's queue.
pub struct ChatMessage<'a> {
    pub sender: &'a str,
    pub recipient: &'a str,
    pub body: &'a str,
}

impl ChatMessage<'_> {
    pub fn buffer(&self) -> Buffer {
        let mut response = Buffer::new();
        response.message(self.sender, Command::PrivMsg)
            .param(self.recipient)
            .trailing_param(self.body);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("privmsg"), Some(Command::PrivMsg));
        assert_eq!(Command::parse("PRIVMSG"), Some(Command::PrivMsg));
        assert_eq!(Command::parse("pRiVmSg"), Some(Command::PrivMsg));
        assert_eq!(Command::parse("JOIN"), None);
    }

    #[test]
    fn test_message_parse() {
        let msg = Message::parse("NICK ser\r\n").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, Ok(Command::Nick));
        assert_eq!(msg.num_params, 1);
        assert_eq!(msg.params[0], "ser");

        let msg = Message::parse(":ser QUIT :out for lunch").unwrap();
        assert_eq!(msg.prefix, Some("ser"));
        assert_eq!(msg.command, Ok(Command::Quit));
        assert_eq!(msg.num_params, 1);
        assert_eq!(msg.params[0], "out for lunch");

        let msg = Message::parse("USER ser 0 * :Ser Iousli").unwrap();
        assert_eq!(msg.command, Ok(Command::User));
        assert_eq!(msg.num_params, 4);
        assert_eq!(msg.params[3], "Ser Iousli");

        let msg = Message::parse("Typo arg\r\n").unwrap();
        assert_eq!(msg.command, Err("Typo"));
        assert_eq!(msg.num_params, 1);

        assert!(Message::parse("  \r \n \t ").is_none());
        assert!(Message::parse("").is_none());
    }

    #[test]
    fn test_message_has_enough_params() {
        assert!(Message::parse("NICK ser").unwrap().has_enough_params());
        assert!(!Message::parse("NICK").unwrap().has_enough_params());
        assert!(!Message::parse("PRIVMSG ser").unwrap().has_enough_params());
        assert!(Message::parse("PING").unwrap().has_enough_params());
    }

    #[test]
    fn test_buffer() {
        let mut response = Buffer::new();
        assert!(response.is_empty());

        response.message("mirin.localdomain", rpl::ERR_NOSUCHNICK)
            .param("ser")
            .param("aki")
            .trailing_param("No such nickname");
        response.message("", Command::Pong);

        assert_eq!(&response.build(),
                   ":mirin.localdomain 401 ser aki :No such nickname\r\nPONG\r\n");
    }

    #[test]
    fn test_chat_message() {
        let msg = ChatMessage { sender: "ser", recipient: "aki", body: "hi!" };
        assert_eq!(&msg.buffer().build(), ":ser PRIVMSG aki :hi!\r\n");
    }
}
