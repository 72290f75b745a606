use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

pub type Amount = i64;

/// Largest magnitude an [`Asset`] may carry (2^62 - 1).
pub const MAX_AMOUNT: Amount = (1 << 62) - 1;
pub const MAX_PRECISION: u8 = 18;

const NAME_CHARSET: &str = ".12345abcdefghijklmnopqrstuvwxyz";
const MAX_NAME_LEN: usize = 12;
const MAX_SYMBOL_CODE_LEN: usize = 7;

/// Account identity as the host platform encodes it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        let reason = if value.is_empty() {
            Some("empty")
        } else if value.len() > MAX_NAME_LEN {
            Some("longer than 12 characters")
        } else if !value.chars().all(|c| NAME_CHARSET.contains(c)) {
            Some("characters outside .12345a-z")
        } else if value.ends_with('.') {
            Some("trailing dot")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(LedgerError::InvalidName {
                name: value,
                reason,
            }),
            None => Ok(Self(value)),
        }
    }

    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Name {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Name {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Name> for String {
    fn from(value: Name) -> Self {
        value.0
    }
}

/// Ticker part of a symbol: 1 to 7 uppercase letters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolCode(String);

impl SymbolCode {
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_SYMBOL_CODE_LEN {
            return Err(LedgerError::InvalidSymbol {
                reason: format!("symbol code {value:?} must have 1 to 7 characters"),
            });
        }
        if !value.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(LedgerError::InvalidSymbol {
                reason: format!("symbol code {value:?} must be uppercase A-Z"),
            });
        }
        Ok(Self(value))
    }

    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SymbolCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SymbolCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SymbolCode> for String {
    fn from(value: SymbolCode) -> Self {
        value.0
    }
}

/// Symbol code plus precision, written `"4,ZKSPLAY"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    precision: u8,
    code: SymbolCode,
}

impl Symbol {
    pub fn new(precision: u8, code: &str) -> Result<Self, LedgerError> {
        Self::from_code(precision, SymbolCode::new(code)?)
    }

    pub fn from_code(precision: u8, code: SymbolCode) -> Result<Self, LedgerError> {
        if precision > MAX_PRECISION {
            return Err(LedgerError::InvalidSymbol {
                reason: format!("precision {precision} exceeds {MAX_PRECISION}"),
            });
        }
        Ok(Self { precision, code })
    }

    pub(crate) fn from_static(precision: u8, code: &'static str) -> Self {
        Self {
            precision,
            code: SymbolCode::from_static(code),
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn code(&self) -> &SymbolCode {
        &self.code
    }

    /// Number of minimal units in one whole token.
    pub fn unit(&self) -> Amount {
        10_i64.pow(self.precision as u32)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl FromStr for Symbol {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidSymbol {
            reason: format!("{s:?} is not of the form <precision>,<CODE>"),
        };
        let (precision, code) = s.split_once(',').ok_or_else(invalid)?;
        let precision = precision.trim().parse::<u8>().map_err(|_| invalid())?;
        Self::new(precision, code.trim())
    }
}

impl TryFrom<String> for Symbol {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.to_string()
    }
}

/// An amount of minimal units tagged with its symbol, written `"1.0000 ZKSPLAY"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asset {
    pub amount: Amount,
    pub symbol: Symbol,
}

impl Asset {
    pub fn new(amount: Amount, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    pub fn zero(symbol: Symbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn is_valid(&self) -> bool {
        (-MAX_AMOUNT..=MAX_AMOUNT).contains(&self.amount)
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, LedgerError> {
        self.combine(other, Amount::checked_add)
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, LedgerError> {
        self.combine(other, Amount::checked_sub)
    }

    fn combine(
        &self,
        other: &Asset,
        op: fn(Amount, Amount) -> Option<Amount>,
    ) -> Result<Asset, LedgerError> {
        if self.symbol != other.symbol {
            return Err(LedgerError::InvalidSymbol {
                reason: format!("symbol mismatch: {} vs {}", self.symbol, other.symbol),
            });
        }
        let amount = op(self.amount, other.amount)
            .filter(|amount| amount.unsigned_abs() <= MAX_AMOUNT as u64)
            .ok_or_else(|| LedgerError::AmountOverflow {
                symbol: self.symbol.code().clone(),
            })?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let precision = self.symbol.precision() as usize;
        if precision == 0 {
            return write!(f, "{sign}{abs} {}", self.symbol.code());
        }
        let unit = self.symbol.unit() as u64;
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            abs / unit,
            abs % unit,
            self.symbol.code(),
            width = precision
        )
    }
}

impl FromStr for Asset {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| LedgerError::InvalidQuantity {
            reason: format!("{s:?}: {reason}"),
        };
        let (number, code) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| invalid("expected <amount> <CODE>"))?;
        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("malformed integer part"));
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit())
            || (digits.contains('.') && fraction.is_empty())
        {
            return Err(invalid("malformed fractional part"));
        }
        let precision = u8::try_from(fraction.len())
            .map_err(|_| invalid("too many decimals"))?;
        let symbol = Symbol::new(precision, code.trim())?;

        let whole: Amount = whole.parse().map_err(|_| invalid("amount out of range"))?;
        let fraction: Amount = match fraction {
            "" => 0,
            text => text.parse().map_err(|_| invalid("amount out of range"))?,
        };
        let magnitude = whole
            .checked_mul(symbol.unit())
            .and_then(|scaled| scaled.checked_add(fraction))
            .filter(|amount| *amount <= MAX_AMOUNT)
            .ok_or_else(|| invalid("amount out of range"))?;
        let amount = if negative { -magnitude } else { magnitude };
        Ok(Asset::new(amount, symbol))
    }
}

impl TryFrom<String> for Asset {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Asset> for String {
    fn from(value: Asset) -> Self {
        value.to_string()
    }
}
