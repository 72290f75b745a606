//! Fixed-ratio conversion between two denominations of one asset.
//!
//! A conversion is planned here and carried out by the action layer: the
//! plan says what the ledger authority consumes, what it issues back and
//! what is refunded untouched. Every source unit ends up in exactly one of
//! `consumed` or `surplus`.

use serde::{Deserialize, Serialize};

use crate::{
    asset::{Amount, Asset, Symbol, SymbolCode, MAX_AMOUNT},
    error::LedgerError,
};

/// The linked denominations. `fractional` must carry more decimals than
/// `coarse`; one coarse unit equals `ratio()` fractional units.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionPair {
    pub fractional: Symbol,
    pub coarse: Symbol,
}

impl Default for ConversionPair {
    fn default() -> Self {
        Self {
            fractional: Symbol::from_static(4, "ZKSPLAY"),
            coarse: Symbol::from_static(0, "ZKS"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToCoarse,
    ToFractional,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionPlan {
    pub direction: Direction,
    /// Source units absorbed by the authority.
    pub consumed: Asset,
    /// Destination units paid out to the depositor.
    pub issued: Asset,
    /// Source units returned verbatim, present only when non-zero.
    pub surplus: Option<Asset>,
}

impl ConversionPair {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.fractional.code() == self.coarse.code() {
            return Err(LedgerError::InvalidSymbol {
                reason: format!("conversion pair links {} to itself", self.coarse.code()),
            });
        }
        if self.fractional.precision() <= self.coarse.precision() {
            return Err(LedgerError::InvalidSymbol {
                reason: format!(
                    "fractional {} must have more decimals than coarse {}",
                    self.fractional, self.coarse
                ),
            });
        }
        Ok(())
    }

    /// Fractional units per coarse unit.
    pub fn ratio(&self) -> Amount {
        let (fine, coarse) = (self.fractional.precision(), self.coarse.precision());
        10_i64.pow(fine.saturating_sub(coarse) as u32)
    }

    /// Size in bytes of the longest memo the ledger writes on forwarded
    /// conversion transfers for this pair.
    pub fn longest_memo_len(&self) -> usize {
        let (fractional, coarse) = (self.fractional.code(), self.coarse.code());
        [
            converted_memo(fractional, coarse),
            converted_memo(coarse, fractional),
            surplus_memo(fractional, coarse),
        ]
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
    }

    /// Plans the conversion of a deposit. Fractional deposits are floored to
    /// whole coarse units and the remainder becomes surplus; coarse deposits
    /// convert in full.
    pub fn plan(&self, quantity: &Asset) -> Result<ConversionPlan, LedgerError> {
        let ratio = self.ratio();
        let plan = if quantity.symbol == self.fractional {
            let issued = quantity.amount.div_euclid(ratio);
            let consumed = issued * ratio;
            let surplus = quantity.amount - consumed;
            ConversionPlan {
                direction: Direction::ToCoarse,
                consumed: Asset::new(consumed, self.fractional.clone()),
                issued: Asset::new(issued, self.coarse.clone()),
                surplus: (surplus > 0).then(|| Asset::new(surplus, self.fractional.clone())),
            }
        } else if quantity.symbol == self.coarse {
            let issued = quantity
                .amount
                .checked_mul(ratio)
                .filter(|amount| *amount <= MAX_AMOUNT)
                .ok_or_else(|| LedgerError::AmountOverflow {
                    symbol: self.fractional.code().clone(),
                })?;
            ConversionPlan {
                direction: Direction::ToFractional,
                consumed: quantity.clone(),
                issued: Asset::new(issued, self.fractional.clone()),
                surplus: None,
            }
        } else {
            return Err(LedgerError::InvalidSymbol {
                reason: format!(
                    "{} cannot be converted, only {} and {} are linked",
                    quantity.symbol, self.fractional, self.coarse
                ),
            });
        };
        if plan.issued.amount <= 0 {
            return Err(LedgerError::NonPositiveAmount {
                operation: "conversion",
            });
        }
        Ok(plan)
    }
}

impl ConversionPlan {
    pub fn memo(&self) -> String {
        converted_memo(self.consumed.symbol.code(), self.issued.symbol.code())
    }

    pub fn surplus_memo(&self) -> String {
        surplus_memo(self.consumed.symbol.code(), self.issued.symbol.code())
    }
}

fn converted_memo(from: &SymbolCode, to: &SymbolCode) -> String {
    format!("Converted {from} to {to}")
}

fn surplus_memo(from: &SymbolCode, to: &SymbolCode) -> String {
    format!("Surplus {from} from swapping to {to}")
}
