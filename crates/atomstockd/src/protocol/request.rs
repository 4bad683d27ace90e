//! Grammar for the three request kinds.
//!
//! Parsing is purely syntactic: names are carried as received and resolved
//! against the recipe tables by the handler, so an unknown element or
//! molecule surfaces as a store failure rather than a grammar error.

use thiserror::Error;

use super::reply::{INVALID_AMOUNT, INVALID_CONSOLE, INVALID_DELIVER, NON_POSITIVE_AMOUNT};

/// Syntax errors raised while parsing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum RequestError {
    /// `ADD` line that does not match `ADD <ELEMENT> <AMOUNT>`.
    #[error("malformed ADD request")]
    MalformedAdd,
    /// Datagram with too few tokens or the wrong verb.
    #[error("invalid DELIVER command")]
    InvalidDeliver,
    /// Amount contains non-digits or does not fit in 32 bits.
    #[error("invalid amount")]
    InvalidAmount,
    /// Amount was zero.
    #[error("amount must be positive")]
    NonPositiveAmount,
    /// Console line with too few tokens or the wrong verb.
    #[error("invalid console command")]
    InvalidConsole,
}

impl RequestError {
    /// Reply owed to the sender, or `None` when the grammar stays silent.
    pub(crate) const fn reply(&self) -> Option<&'static str> {
        match self {
            Self::MalformedAdd => None,
            Self::InvalidDeliver => Some(INVALID_DELIVER),
            Self::InvalidAmount => Some(INVALID_AMOUNT),
            Self::NonPositiveAmount => Some(NON_POSITIVE_AMOUNT),
            Self::InvalidConsole => Some(INVALID_CONSOLE),
        }
    }
}

/// `ADD <ELEMENT> <AMOUNT>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AddRequest<'a> {
    pub(crate) element: &'a str,
    pub(crate) amount: u32,
}

impl<'a> AddRequest<'a> {
    pub(crate) fn parse(line: &'a str) -> Result<Self, RequestError> {
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        let ["ADD", element, count] = tokens.as_slice() else {
            return Err(RequestError::MalformedAdd);
        };
        let amount = parse_amount(count).map_err(|_| RequestError::MalformedAdd)?;
        Ok(Self {
            element: *element,
            amount,
        })
    }
}

/// `DELIVER <MOLECULE> <AMOUNT>`, where the molecule may span two words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeliverRequest {
    pub(crate) molecule: String,
    pub(crate) amount: u32,
}

impl DeliverRequest {
    pub(crate) fn parse(payload: &str) -> Result<Self, RequestError> {
        let tokens: Vec<&str> = payload.split_ascii_whitespace().take(4).collect();
        let (molecule, count) = match tokens.as_slice() {
            ["DELIVER", first, second, count] => (format!("{first} {second}"), *count),
            ["DELIVER", name, count] => ((*name).to_owned(), *count),
            _ => return Err(RequestError::InvalidDeliver),
        };
        let amount = parse_amount(count)?;
        Ok(Self { molecule, amount })
    }
}

/// `GEN <DRINK>`, where the drink may span two words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GenRequest {
    pub(crate) drink: String,
}

impl GenRequest {
    pub(crate) fn parse(line: &str) -> Result<Self, RequestError> {
        let tokens: Vec<&str> = line.split_ascii_whitespace().take(3).collect();
        let drink = match tokens.as_slice() {
            ["GEN", first, second] => format!("{first} {second}"),
            ["GEN", name] => (*name).to_owned(),
            _ => return Err(RequestError::InvalidConsole),
        };
        Ok(Self { drink })
    }
}

/// Parses a strictly decimal, non-zero, 32-bit amount.
fn parse_amount(token: &str) -> Result<u32, RequestError> {
    if !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(RequestError::InvalidAmount);
    }
    match token.parse::<u32>() {
        Ok(0) => Err(RequestError::NonPositiveAmount),
        Ok(amount) => Ok(amount),
        Err(_) => Err(RequestError::InvalidAmount),
    }
}
