//! Transaction input and validation for ChainLedger
//!
//! A transaction is the user-supplied part of a block: who pays whom, how
//! much, and an optional note. Everything here runs before the ledger is
//! touched, so a rejected transaction never mutates state.

use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a sender or receiver identifier in bytes.
pub const MAX_PARTY_LENGTH: usize = 256;
/// Maximum note length in bytes.
pub const MAX_NOTE_LENGTH: usize = 4096;

/// A validated, non-negative amount.
///
/// Holds the text the caller supplied, trimmed of surrounding whitespace.
/// That text is what goes into the block hash and what is stored, so
/// `"007"`, `"7"` and `"7.0"` are distinct amounts with equal value. The only
/// rewrite is negative zero, which loses its sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(String);

impl Amount {
    /// Checks `text` is a finite decimal literal and not negative.
    ///
    /// Accepted: an optional sign, digits with an optional fractional part
    /// (`5`, `5.`, `.5`, `0.25`) and an optional exponent (`1e3`, `2.5E-2`).
    /// There is no limit on digits or exponent.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::invalid_input("amount", "must not be empty"));
        }

        let literal = scan_literal(trimmed).ok_or_else(|| {
            LedgerError::invalid_input(
                "amount",
                format!("'{}' is not a finite decimal number", trimmed),
            )
        })?;

        if literal.negative && !literal.zero {
            return Err(LedgerError::invalid_input(
                "amount",
                format!("must not be negative, got {}", trimmed),
            ));
        }

        let text = match trimmed.strip_prefix('-') {
            Some(unsigned) => unsigned,
            None => trimmed,
        };
        Ok(Amount(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        scan_literal(&self.0).map_or(false, |l| l.zero)
    }

    /// Numeric value, or `None` when it does not fit a `Decimal`.
    ///
    /// More than 28 fractional digits are rounded.
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.0)
            .or_else(|_| Decimal::from_scientific(&self.0))
            .ok()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Amount::parse(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self> {
        Amount::parse(&s)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

struct Literal {
    negative: bool,
    zero: bool,
}

/// Matches `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
/// against the whole of `text`.
fn scan_literal(text: &str) -> Option<Literal> {
    let bytes = text.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let mut digits = 0;
    let mut zero = true;
    let mut seen_point = false;
    while let Some(&b) = bytes.get(pos) {
        match b {
            b'0'..=b'9' => {
                digits += 1;
                zero &= b == b'0';
            }
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        pos += 1;
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exponent_start = pos;
        while bytes.get(pos).map_or(false, |b| b.is_ascii_digit()) {
            pos += 1;
        }
        if pos == exponent_start {
            return None;
        }
    }

    (pos == bytes.len()).then_some(Literal { negative, zero })
}

/// An amount as submitted by a caller: either text typed into a form or a
/// JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn parse(&self) -> Result<Amount> {
        match self {
            AmountInput::Text(text) => Amount::parse(text),
            AmountInput::Number(n) => Amount::parse(&n.to_string()),
        }
    }
}

impl From<&str> for AmountInput {
    fn from(s: &str) -> Self {
        AmountInput::Text(s.to_string())
    }
}

impl From<Decimal> for AmountInput {
    fn from(d: Decimal) -> Self {
        AmountInput::Text(d.to_string())
    }
}

impl From<Amount> for AmountInput {
    fn from(amount: Amount) -> Self {
        AmountInput::Text(amount.0)
    }
}

/// Raw transaction fields, typically straight from a form or request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub sender: String,
    pub receiver: String,
    pub amount: AmountInput,
    #[serde(default)]
    pub note: Option<String>,
}

/// Fields that passed validation and can be sealed into a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
    pub note: String,
}

impl TransactionInput {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: impl Into<AmountInput>,
        note: Option<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount: amount.into(),
            note,
        }
    }

    pub fn validate(&self) -> Result<Transaction> {
        let amount = self.amount.parse()?;
        Transaction::new(
            &self.sender,
            &self.receiver,
            amount,
            self.note.as_deref().unwrap_or_default(),
        )
    }
}

impl Transaction {
    /// Validates already-typed fields.
    pub fn new(sender: &str, receiver: &str, amount: Amount, note: &str) -> Result<Self> {
        validate_party("sender", sender)?;
        validate_party("receiver", receiver)?;

        if note.len() > MAX_NOTE_LENGTH {
            return Err(LedgerError::invalid_input(
                "note",
                format!("exceeds maximum length of {} bytes", MAX_NOTE_LENGTH),
            ));
        }

        Ok(Transaction {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            note: note.to_string(),
        })
    }
}

fn validate_party(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::invalid_input(field, "must not be empty"));
    }
    if value.len() > MAX_PARTY_LENGTH {
        return Err(LedgerError::invalid_input(
            field,
            format!("exceeds maximum length of {} bytes", MAX_PARTY_LENGTH),
        ));
    }
    Ok(())
}
