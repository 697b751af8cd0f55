//! Chat input parsing and relay formatting.

use std::net::SocketAddr;

use relaybox_shared::protocol::{CHAT_LIST, CHAT_QUIT};

/// One line received from a chat client
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Quit,
    List,
    /// Blank line, nothing to relay
    Empty,
    Text(&'a str),
}

impl<'a> ChatInput<'a> {
    pub fn parse(line: &'a str) -> Self {
        match line.trim() {
            CHAT_QUIT => Self::Quit,
            CHAT_LIST => Self::List,
            "" => Self::Empty,
            text => Self::Text(text),
        }
    }
}

/// A relayed chat line: who sent it and what they wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage<'a> {
    pub sender: SocketAddr,
    pub text: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub fn new(sender: SocketAddr, text: &'a str) -> Self {
        Self { sender, text }
    }

    /// `[<ip>:<port>]: <text>`, without the line terminator
    pub fn to_line(&self) -> String {
        format!(
            "[{}:{}]: {}",
            self.sender.ip(),
            self.sender.port(),
            self.text
        )
    }
}

pub fn welcome_banner(connected: usize) -> String {
    format!(
        "Welcome to the chat server\n\
         Connected clients: {connected}\n\
         Available commands:\n\
         \x20 {CHAT_LIST} - Show how many clients are connected\n\
         \x20 {CHAT_QUIT} - Disconnect\n\
         \x20 Any other text is sent as a message\n\n"
    )
}

pub fn client_count_line(connected: usize) -> String {
    format!("Connected clients: {}\n", connected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatInput::parse("/quit\r\n"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/list"), ChatInput::List);
        assert_eq!(ChatInput::parse("   \n"), ChatInput::Empty);
        assert_eq!(ChatInput::parse(" hello \n"), ChatInput::Text("hello"));
    }

    #[test]
    fn test_commands_are_case_sensitive() {
        assert_eq!(ChatInput::parse("/QUIT"), ChatInput::Text("/QUIT"));
    }

    #[test]
    fn test_message_line_format() {
        let sender: SocketAddr = "192.168.1.20:51234".parse().unwrap();

        assert_eq!(
            ChatMessage::new(sender, "hello").to_line(),
            "[192.168.1.20:51234]: hello"
        );
    }

    #[test]
    fn test_message_line_format_ipv6() {
        let sender: SocketAddr = "[::1]:4000".parse().unwrap();

        assert_eq!(ChatMessage::new(sender, "hi").to_line(), "[::1:4000]: hi");
    }

    #[test]
    fn test_welcome_banner_mentions_count_and_commands() {
        let banner = welcome_banner(3);

        assert!(banner.contains("Connected clients: 3\n"));
        assert!(banner.contains("  /list - "));
        assert!(banner.contains("  /quit - "));
        assert!(banner.ends_with("\n\n"));
    }
}
