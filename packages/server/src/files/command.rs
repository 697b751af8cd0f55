//! File protocol command parsing.

use relaybox_shared::protocol::{FILE_GET, FILE_LIST, FILE_QUIT};

/// A command line received by the file server.
///
/// Keywords are case-insensitive; the file name keeps its case.
#[derive(Debug, PartialEq, Eq)]
pub enum FileCommand<'a> {
    List,
    Get(&'a str),
    Quit,
    Unknown(&'a str),
}

impl<'a> FileCommand<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();

        if line.eq_ignore_ascii_case(FILE_QUIT) {
            return Self::Quit;
        }
        if line.eq_ignore_ascii_case(FILE_LIST) {
            return Self::List;
        }

        let prefix_len = FILE_GET.len() + 1;
        let bytes = line.as_bytes();
        let is_get = bytes.len() > prefix_len
            && bytes[..FILE_GET.len()].eq_ignore_ascii_case(FILE_GET.as_bytes())
            && bytes[FILE_GET.len()] == b' ';

        // the prefix is ASCII, so `prefix_len` is a char boundary
        if is_get {
            Self::Get(line[prefix_len..].trim())
        } else {
            Self::Unknown(line)
        }
    }
}
