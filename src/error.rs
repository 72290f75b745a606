use thiserror::Error;

use crate::{
    asset::{Asset, Name, SymbolCode},
    ledger::Tier,
};

/// Every way an action can be rejected. A rejected action leaves no trace
/// in the ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Malformed symbol, or a precision that does not match the registered one.
    #[error("invalid symbol: {reason}")]
    InvalidSymbol { reason: String },

    #[error("token with symbol {symbol} already exists")]
    DuplicateSymbol { symbol: SymbolCode },

    #[error("token with symbol {symbol} does not exist")]
    UnknownSymbol { symbol: SymbolCode },

    #[error("supply cap violation for {symbol}: {reason}")]
    SupplyCapViolation {
        symbol: SymbolCode,
        reason: &'static str,
    },

    #[error("{operation} requires a positive quantity")]
    NonPositiveAmount { operation: &'static str },

    #[error("overdrawn {tier} balance of {owner}: holds {available}, needs {requested}")]
    InsufficientBalance {
        owner: Name,
        tier: Tier,
        available: Asset,
        requested: Asset,
    },

    #[error("cannot transfer to self")]
    SelfTransfer,

    #[error("recipient account {recipient} does not exist")]
    UnknownRecipient { recipient: Name },

    #[error("memo has {len} bytes, limit is {limit}")]
    MemoTooLong { len: usize, limit: usize },

    #[error("no {tier} balance object found for {owner} in {symbol}")]
    MissingBalanceRow {
        owner: Name,
        tier: Tier,
        symbol: SymbolCode,
    },

    /// The authenticated signer is not the identity this action requires.
    #[error("missing authority of {required}")]
    MissingAuthority { required: Name },

    #[error("invalid account name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("amount overflow in {symbol}")]
    AmountOverflow { symbol: SymbolCode },

    #[error("invalid quantity: {reason}")]
    InvalidQuantity { reason: String },
}
