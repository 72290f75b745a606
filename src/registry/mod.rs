use std::collections::{btree_map::Entry, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::{
    asset::{Amount, Asset, Name, Symbol, SymbolCode},
    error::LedgerError,
};

/// Per-symbol supply bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrencyStats {
    pub supply: Asset,
    pub max_supply: Asset,
    pub issuer: Name,
}

impl CurrencyStats {
    /// Amount that may still be issued before the cap is reached.
    pub fn headroom(&self) -> Amount {
        self.max_supply.amount - self.supply.amount
    }

    /// Fails unless `symbol` carries the registered precision.
    pub fn check_symbol(&self, symbol: &Symbol) -> Result<(), LedgerError> {
        if &self.supply.symbol != symbol {
            return Err(LedgerError::InvalidSymbol {
                reason: format!(
                    "symbol precision mismatch: registered {}, got {}",
                    self.supply.symbol, symbol
                ),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SymbolRegistry {
    stats: BTreeMap<SymbolCode, CurrencyStats>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        issuer: &Name,
        max_supply: &Asset,
    ) -> Result<&CurrencyStats, LedgerError> {
        validate_cap(max_supply)?;
        let code = max_supply.symbol.code().clone();
        if self.stats.contains_key(&code) {
            return Err(LedgerError::DuplicateSymbol { symbol: code });
        }
        let stats = CurrencyStats {
            supply: Asset::zero(max_supply.symbol.clone()),
            max_supply: max_supply.clone(),
            issuer: issuer.clone(),
        };
        Ok(self.stats.entry(code).or_insert(stats))
    }

    /// Replaces cap and issuer; circulating supply is untouched.
    pub fn update(
        &mut self,
        issuer: &Name,
        max_supply: &Asset,
    ) -> Result<&CurrencyStats, LedgerError> {
        validate_cap(max_supply)?;
        let code = max_supply.symbol.code();
        let current = self.get(code)?;
        current.check_symbol(&max_supply.symbol)?;
        if current.supply.amount > max_supply.amount {
            return Err(LedgerError::SupplyCapViolation {
                symbol: code.clone(),
                reason: "max-supply cannot be less than actual supply",
            });
        }
        let next = CurrencyStats {
            supply: current.supply.clone(),
            max_supply: max_supply.clone(),
            issuer: issuer.clone(),
        };
        Ok(self.put(next))
    }

    /// Adds `quantity` to circulating supply, bounded by the cap.
    pub fn record_issue(&mut self, quantity: &Asset) -> Result<&CurrencyStats, LedgerError> {
        let code = quantity.symbol.code();
        let current = self.get(code)?;
        current.check_symbol(&quantity.symbol)?;
        if quantity.amount > current.headroom() {
            return Err(LedgerError::SupplyCapViolation {
                symbol: code.clone(),
                reason: "quantity exceeds available supply",
            });
        }
        let next = CurrencyStats {
            supply: current.supply.checked_add(quantity)?,
            ..current.clone()
        };
        Ok(self.put(next))
    }

    pub fn find(&self, code: &SymbolCode) -> Option<&CurrencyStats> {
        self.stats.get(code)
    }

    pub fn get(&self, code: &SymbolCode) -> Result<&CurrencyStats, LedgerError> {
        self.find(code).ok_or_else(|| LedgerError::UnknownSymbol {
            symbol: code.clone(),
        })
    }

    pub fn get_supply(&self, code: &SymbolCode) -> Result<Asset, LedgerError> {
        Ok(self.get(code)?.supply.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymbolCode, &CurrencyStats)> {
        self.stats.iter()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    fn put(&mut self, stats: CurrencyStats) -> &CurrencyStats {
        match self.stats.entry(stats.supply.symbol.code().clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(stats);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(stats),
        }
    }
}

fn validate_cap(max_supply: &Asset) -> Result<(), LedgerError> {
    if !max_supply.is_valid() {
        return Err(LedgerError::InvalidQuantity {
            reason: format!("max-supply {max_supply} out of range"),
        });
    }
    if max_supply.amount <= 0 {
        return Err(LedgerError::NonPositiveAmount {
            operation: "max-supply",
        });
    }
    Ok(())
}
