//! The reply text catalog.
//!
//! Texts that go in the trailing parameter of replies, either as plain
//! constants or as helpers that format into a `MessageBuffer`.

use crate::message::MessageBuffer;
use std::fmt::Write as _;

//
// Network messages
//

pub const CONNECTION_RESET: &str = "Connection reset by peer";

pub const CLOSING_LINK: &str = "Closing link";

//
// IRC replies
//

pub const ALREADY_REGISTERED: &str = "Unauthorized command (already registered)";

pub const NEED_MORE_PARAMS: &str = "Not enough parameters";

pub const NICKNAME_IN_USE: &str = "Nickname is already in use";

pub const NO_NICKNAME_GIVEN: &str = "No nickname given";

pub const NO_SUCH_NICK: &str = "No such nickname";

pub const UNKNOWN_COMMAND: &str = "Unknown command";

//
// Welcome messages
//

pub fn welcome(mut msg: MessageBuffer<'_>, nick: &str, real: &str, domain: &str) {
    let _ = write!(msg.raw_trailing_param(),
                   "Welcome to the Internet Relay Network, {} ({}) @ {}", nick, real, domain);
}

pub fn your_host(mut msg: MessageBuffer<'_>, domain: &str, version: &str) {
    let _ = write!(msg.raw_trailing_param(),
                   "Your host is {}, running version {}", domain, version);
}

pub fn created(mut msg: MessageBuffer<'_>, since: &str) {
    let _ = write!(msg.raw_trailing_param(), "This server was created {}", since);
}
