//! Record grammar for the dump stream.
//!
//! Each line of `btrfs receive --dump` output is one record:
//!
//! ```text
//! <command> <escaped-path>[ <name>=<escaped-value>]*
//! ```
//!
//! Argument names match `[a-z_]+`; escaped segments are runs of non-space,
//! non-backslash characters interleaved with two-character backslash escapes
//! (a literal space inside a path must be escaped). Lines that do not match
//! this shape fail with [`ParseError::Malformed`]; an unrecognised command
//! word fails with [`ParseError::UnknownCommand`]. Duplicate argument names
//! keep the last occurrence.

use std::collections::HashMap;

use crate::error::ParseError;
use crate::escape::unescape;

/// The closed set of record kinds the dump format emits.
///
/// The vocabulary is taken from btrfs-progs `receive-dump.c`. Commands the
/// engine deliberately does not replay still parse successfully; the replay
/// dispatcher decides whether a kind is acted on, ignored, or fatal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Command {
    /// Move an entry to a new name (`dest` argument).
    Rename,
    /// Remove a file entry.
    Unlink,
    /// Remove an empty directory.
    Rmdir,
    /// Create a hard link to an existing destination entry (`dest` argument).
    Link,
    /// Create a regular file.
    Mkfile,
    /// Create a socket; replayed as a placeholder regular file.
    Mksock,
    /// Create a symbolic link whose target text is the `dest` argument.
    Symlink,
    /// Create a directory.
    Mkdir,
    /// Start of stream; ignored.
    Snapshot,
    /// Timestamp metadata; ignored.
    Utimes,
    /// File content; ignored.
    Write,
    /// File length change; ignored.
    Truncate,
    /// Ownership metadata; ignored.
    Chown,
    /// Permission metadata; ignored.
    Chmod,
    /// Extended attribute; ignored.
    SetXattr,
    /// Reflink clone of existing content; ignored.
    Clone,
    /// Device node; observed in the format but never replayed.
    Mknod,
    /// Named pipe; observed in the format but never replayed.
    Mkfifo,
    /// Extended attribute removal; observed in the format but never replayed.
    RemoveXattr,
    /// Extent update; observed in the format but never replayed.
    UpdateExtent,
    /// Preallocation; observed in the format but never replayed.
    Fallocate,
    /// File attribute flags; observed in the format but never replayed.
    Fileattr,
    /// fs-verity enablement; observed in the format but never replayed.
    EnableVerity,
}

impl Command {
    /// Parses a command word from the stream vocabulary.
    pub fn parse(word: &str) -> Result<Self, ParseError> {
        Ok(match word {
            "rename" => Self::Rename,
            "unlink" => Self::Unlink,
            "rmdir" => Self::Rmdir,
            "link" => Self::Link,
            "mkfile" => Self::Mkfile,
            "mksock" => Self::Mksock,
            "symlink" => Self::Symlink,
            "mkdir" => Self::Mkdir,
            "snapshot" => Self::Snapshot,
            "utimes" => Self::Utimes,
            "write" => Self::Write,
            "truncate" => Self::Truncate,
            "chown" => Self::Chown,
            "chmod" => Self::Chmod,
            "set_xattr" => Self::SetXattr,
            "clone" => Self::Clone,
            "mknod" => Self::Mknod,
            "mkfifo" => Self::Mkfifo,
            "remove_xattr" => Self::RemoveXattr,
            "update_extent" => Self::UpdateExtent,
            "fallocate" => Self::Fallocate,
            "fileattr" => Self::Fileattr,
            "enable_verity" => Self::EnableVerity,
            _ => {
                return Err(ParseError::UnknownCommand {
                    command: word.to_owned(),
                });
            }
        })
    }

    /// Returns the command word as it appears in the stream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rename => "rename",
            Self::Unlink => "unlink",
            Self::Rmdir => "rmdir",
            Self::Link => "link",
            Self::Mkfile => "mkfile",
            Self::Mksock => "mksock",
            Self::Symlink => "symlink",
            Self::Mkdir => "mkdir",
            Self::Snapshot => "snapshot",
            Self::Utimes => "utimes",
            Self::Write => "write",
            Self::Truncate => "truncate",
            Self::Chown => "chown",
            Self::Chmod => "chmod",
            Self::SetXattr => "set_xattr",
            Self::Clone => "clone",
            Self::Mknod => "mknod",
            Self::Mkfifo => "mkfifo",
            Self::RemoveXattr => "remove_xattr",
            Self::UpdateExtent => "update_extent",
            Self::Fallocate => "fallocate",
            Self::Fileattr => "fileattr",
            Self::EnableVerity => "enable_verity",
        }
    }
}

/// One fully decoded record: command, primary path, and argument mapping.
///
/// Every field is unescaped before exposure. A record is built fresh per
/// input line and discarded after dispatch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The record kind.
    pub command: Command,
    /// The primary path, as raw bytes.
    pub path: Vec<u8>,
    args: HashMap<String, Vec<u8>>,
}

impl Record {
    /// Parses one stream line into a record.
    ///
    /// A trailing newline is tolerated; everything else must match the
    /// grammar exactly.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let malformed = || ParseError::Malformed {
            line: body.to_owned(),
        };

        let mut cursor = Cursor::new(body);
        let word = cursor.take_word().ok_or_else(malformed)?;
        let command = Command::parse(word)?;

        // One or more spaces separate the command from the path.
        if !cursor.skip_spaces() {
            return Err(malformed());
        }
        let path = cursor.take_escaped().ok_or_else(malformed)?;

        let mut args = HashMap::new();
        while !cursor.is_empty() {
            if !cursor.skip_spaces() {
                return Err(malformed());
            }
            // A trailing space with nothing after it is not an argument group.
            let name = cursor.take_arg_name().ok_or_else(malformed)?;
            if !cursor.take_byte(b'=') {
                return Err(malformed());
            }
            let value = cursor.take_escaped().ok_or_else(malformed)?;
            // Last occurrence wins.
            args.insert(name.to_owned(), unescape(value));
        }

        Ok(Self {
            command,
            path: unescape(path),
            args,
        })
    }

    /// Looks up an argument value by name.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&[u8]> {
        self.args.get(name).map(Vec::as_slice)
    }
}

/// Byte cursor over one record line.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Consumes a non-empty run of non-space characters.
    fn take_word(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(' ')
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(word)
    }

    /// Consumes one or more spaces; false if none were present.
    fn skip_spaces(&mut self) -> bool {
        let trimmed = self.rest.trim_start_matches(' ');
        let skipped = trimmed.len() != self.rest.len();
        self.rest = trimmed;
        skipped
    }

    /// Consumes a non-empty escaped segment: plain characters interleaved
    /// with two-character backslash escapes, terminated by a space or end of
    /// line. A backslash with nothing after it does not match.
    fn take_escaped(&mut self) -> Option<&'a str> {
        let bytes = self.rest.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b' ' => break,
                b'\\' => {
                    if i + 1 >= bytes.len() {
                        return None;
                    }
                    i += 2;
                }
                _ => i += 1,
            }
        }
        if i == 0 {
            return None;
        }
        // A two-character escape may step past a multi-byte boundary only if
        // the input was not valid UTF-8, which `&str` already rules out for
        // the first byte; re-align to a char boundary for the split.
        while !self.rest.is_char_boundary(i) {
            i += 1;
        }
        let (segment, rest) = self.rest.split_at(i);
        self.rest = rest;
        Some(segment)
    }

    /// Consumes a non-empty `[a-z_]+` argument name.
    fn take_arg_name(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .bytes()
            .position(|b| !(b.is_ascii_lowercase() || b == b'_'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (name, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(name)
    }

    fn take_byte(&mut self, expected: u8) -> bool {
        if self.rest.as_bytes().first() == Some(&expected) {
            self.rest = &self.rest[1..];
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_only_record() {
        let record = Record::parse("mkdir ./snap/a\n").unwrap();
        assert_eq!(record.command, Command::Mkdir);
        assert_eq!(record.path, b"./snap/a");
        assert_eq!(record.arg("dest"), None);
    }

    #[test]
    fn parses_arguments() {
        let record = Record::parse("rename ./snap/a/f dest=./snap/a/g\n").unwrap();
        assert_eq!(record.command, Command::Rename);
        assert_eq!(record.path, b"./snap/a/f");
        assert_eq!(record.arg("dest"), Some(&b"./snap/a/g"[..]));
    }

    #[test]
    fn parses_multiple_arguments() {
        let record =
            Record::parse("snapshot ./snap uuid=ab-cd transid=12345 parent_uuid=ef parent_transid=9\n")
                .unwrap();
        assert_eq!(record.command, Command::Snapshot);
        assert_eq!(record.arg("uuid"), Some(&b"ab-cd"[..]));
        assert_eq!(record.arg("parent_transid"), Some(&b"9"[..]));
    }

    #[test]
    fn unescapes_path_and_values() {
        let record = Record::parse(r"mkfile ./snap/with\ space").unwrap();
        assert_eq!(record.path, b"./snap/with space");

        let record = Record::parse(r"rename ./snap/a dest=./snap/\061").unwrap();
        assert_eq!(record.arg("dest"), Some(&b"./snap/1"[..]));
    }

    #[test]
    fn duplicate_argument_last_wins() {
        let record = Record::parse("rename ./snap/a dest=./snap/x dest=./snap/y\n").unwrap();
        assert_eq!(record.arg("dest"), Some(&b"./snap/y"[..]));
    }

    #[test]
    fn tolerates_multiple_spaces_before_path() {
        let record = Record::parse("mkdir   ./snap/a\n").unwrap();
        assert_eq!(record.path, b"./snap/a");
    }

    #[test]
    fn rejects_empty_and_command_only_lines() {
        assert!(matches!(
            Record::parse("\n"),
            Err(ParseError::Malformed { .. })
        ));
        assert!(matches!(
            Record::parse("mkdir\n"),
            Err(ParseError::Malformed { .. })
        ));
        assert!(matches!(
            Record::parse("mkdir \n"),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(matches!(
            Record::parse("frobnicate ./snap/a\n"),
            Err(ParseError::UnknownCommand { command }) if command == "frobnicate"
        ));
    }

    #[test]
    fn rejects_malformed_argument_group() {
        assert!(matches!(
            Record::parse("rename ./snap/a dest\n"),
            Err(ParseError::Malformed { .. })
        ));
        assert!(matches!(
            Record::parse("rename ./snap/a DEST=./x\n"),
            Err(ParseError::Malformed { .. })
        ));
        assert!(matches!(
            Record::parse("rename ./snap/a dest=\n"),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_trailing_backslash_in_path() {
        assert!(matches!(
            Record::parse("mkfile ./snap/a\\"),
            Err(ParseError::Malformed { .. })
        ));
    }
}
