use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    asset::{Asset, Name, Symbol, SymbolCode},
    error::LedgerError,
    registry::{CurrencyStats, SymbolRegistry},
};

pub type AccountRows = BTreeMap<Name, BTreeMap<SymbolCode, Account>>;

/// Which balance tier a table holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Liquid,
    Locked,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Liquid => f.write_str("liquid"),
            Tier::Locked => f.write_str("locked"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub balance: Asset,
    /// Set when a liquid row is created by a credit. Nothing branches on it.
    pub claimed: bool,
    /// Identity billed for the row's storage.
    pub payer: Name,
}

/// Balances keyed by owner, then symbol code. A row exists only while it
/// holds a non-zero balance, or after an explicit open.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountTable {
    tier: Tier,
    rows: AccountRows,
}

impl AccountTable {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            rows: BTreeMap::new(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn row(&self, owner: &Name, code: &SymbolCode) -> Option<&Account> {
        self.rows
            .get(owner)
            .and_then(|by_symbol| by_symbol.get(code))
    }

    pub fn balance(&self, owner: &Name, code: &SymbolCode) -> Result<Asset, LedgerError> {
        self.row(owner, code)
            .map(|account| account.balance.clone())
            .ok_or_else(|| self.missing(owner, code))
    }

    /// Adds `value` to the owner's row, creating it if needed. Returns the
    /// new balance.
    pub fn credit(
        &mut self,
        owner: &Name,
        value: &Asset,
        payer: &Name,
    ) -> Result<Asset, LedgerError> {
        let code = value.symbol.code();
        let next = match self.row(owner, code) {
            Some(current) => Account {
                balance: current.balance.checked_add(value)?,
                claimed: current.claimed,
                payer: payer.clone(),
            },
            None => Account {
                balance: value.clone(),
                claimed: self.tier == Tier::Liquid,
                payer: payer.clone(),
            },
        };
        let balance = next.balance.clone();
        self.write(owner, code.clone(), next);
        Ok(balance)
    }

    /// Removes `value` from the owner's row. A row debited to exactly zero
    /// is erased. Returns the remaining balance.
    pub fn debit(&mut self, owner: &Name, value: &Asset) -> Result<Asset, LedgerError> {
        let code = value.symbol.code();
        let current = self
            .row(owner, code)
            .ok_or_else(|| self.missing(owner, code))?;
        if current.balance.amount < value.amount {
            return Err(LedgerError::InsufficientBalance {
                owner: owner.clone(),
                tier: self.tier,
                available: current.balance.clone(),
                requested: value.clone(),
            });
        }
        let remaining = current.balance.checked_sub(value)?;
        if remaining.amount == 0 {
            self.erase(owner, code);
        } else {
            let next = Account {
                balance: remaining.clone(),
                ..current.clone()
            };
            self.write(owner, code.clone(), next);
        }
        Ok(remaining)
    }

    /// Ensures a row exists for `(owner, symbol)`. Returns whether one was
    /// created; an existing row is left alone.
    pub fn open(&mut self, owner: &Name, symbol: &Symbol, payer: &Name) -> bool {
        if self.row(owner, symbol.code()).is_some() {
            return false;
        }
        let account = Account {
            balance: Asset::zero(symbol.clone()),
            claimed: false,
            payer: payer.clone(),
        };
        self.write(owner, symbol.code().clone(), account);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &SymbolCode, &Account)> {
        self.rows.iter().flat_map(|(owner, by_symbol)| {
            by_symbol
                .iter()
                .map(move |(code, account)| (owner, code, account))
        })
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &AccountRows {
        &self.rows
    }

    fn write(&mut self, owner: &Name, code: SymbolCode, account: Account) {
        self.rows
            .entry(owner.clone())
            .or_default()
            .insert(code, account);
    }

    fn erase(&mut self, owner: &Name, code: &SymbolCode) {
        if let Entry::Occupied(mut by_symbol) = self.rows.entry(owner.clone()) {
            by_symbol.get_mut().remove(code);
            if by_symbol.get().is_empty() {
                by_symbol.remove();
            }
        }
    }

    fn missing(&self, owner: &Name, code: &SymbolCode) -> LedgerError {
        LedgerError::MissingBalanceRow {
            owner: owner.clone(),
            tier: self.tier,
            symbol: code.clone(),
        }
    }
}

/// The three persisted tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerState {
    pub stats: SymbolRegistry,
    pub accounts: AccountTable,
    pub locked_accounts: AccountTable,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            stats: SymbolRegistry::new(),
            accounts: AccountTable::new(Tier::Liquid),
            locked_accounts: AccountTable::new(Tier::Locked),
        }
    }
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, tier: Tier) -> &AccountTable {
        match tier {
            Tier::Liquid => &self.accounts,
            Tier::Locked => &self.locked_accounts,
        }
    }

    pub fn table_mut(&mut self, tier: Tier) -> &mut AccountTable {
        match tier {
            Tier::Liquid => &mut self.accounts,
            Tier::Locked => &mut self.locked_accounts,
        }
    }

    pub fn snapshot(&self, meta: SnapshotMetadata) -> LedgerSnapshot {
        LedgerSnapshot {
            meta,
            stats: self
                .stats
                .iter()
                .map(|(code, st)| (code.clone(), st.clone()))
                .collect(),
            accounts: self.accounts.rows().clone(),
            locked_accounts: self.locked_accounts.rows().clone(),
            state_root: compute_state_root(self),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SnapshotMetadata {
    /// Number of committed actions.
    pub height: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: SnapshotMetadata,
    pub stats: BTreeMap<SymbolCode, CurrencyStats>,
    pub accounts: AccountRows,
    pub locked_accounts: AccountRows,
    #[serde(with = "hex_root")]
    pub state_root: [u8; 32],
}

fn compute_state_root(state: &LedgerState) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::new();
    for (code, stats) in state.stats.iter() {
        let mut hasher = Sha256::new();
        hasher.update(b"stat");
        hasher.update(code.as_str().as_bytes());
        hasher.update([stats.supply.symbol.precision()]);
        hasher.update(stats.supply.amount.to_le_bytes());
        hasher.update(stats.max_supply.amount.to_le_bytes());
        hasher.update(stats.issuer.as_str().as_bytes());
        leaves.push(hasher.finalize().into());
    }
    for table in [&state.accounts, &state.locked_accounts] {
        let tag: &[u8] = match table.tier() {
            Tier::Liquid => b"acct",
            Tier::Locked => b"cold",
        };
        for (owner, code, account) in table.iter() {
            let mut hasher = Sha256::new();
            hasher.update(tag);
            hasher.update(owner.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update(code.as_str().as_bytes());
            hasher.update(account.balance.amount.to_le_bytes());
            hasher.update([account.claimed as u8]);
            leaves.push(hasher.finalize().into());
        }
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"vgrab-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

mod hex_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("state root must be 32 bytes"))
    }
}
