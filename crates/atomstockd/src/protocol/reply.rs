//! Canonical reply lines.

use std::fmt;

pub(crate) const ADD_ACCEPTED: &str = "added to warehouse successfully";
pub(crate) const ADD_REJECTED: &str = "ERROR: Exceeds MAX_ATOMS";
pub(crate) const DELIVER_ACCEPTED: &str = "Molecule delivered successfully";
pub(crate) const DELIVER_REJECTED: &str = "ERROR: Not enough atoms or unknown molecule";
pub(crate) const INVALID_DELIVER: &str = "ERROR: Invalid UDP command";
pub(crate) const INVALID_AMOUNT: &str = "ERROR: Invalid amount";
pub(crate) const NON_POSITIVE_AMOUNT: &str = "ERROR: Amount must be positive";
pub(crate) const INVALID_CONSOLE: &str =
    "Error: Invalid console command. Use: GEN SOFT DRINK / GEN VODKA / GEN CHAMPAGNE";
pub(crate) const TOO_MANY_CLIENTS: &str = "ERROR: Too many clients";

/// One reply line, stored without its newline terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply(String);

impl Reply {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Reply text without the terminator.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Wire form: the text followed by `\n`.
    #[must_use]
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.0.len() + 1);
        line.extend_from_slice(self.0.as_bytes());
        line.push(b'\n');
        line
    }
}

impl From<&'static str> for Reply {
    fn from(text: &'static str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}
