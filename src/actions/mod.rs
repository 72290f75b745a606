//! Action surface of the ledger.
//!
//! [`Ledger::apply`] runs one [`Action`] against a staged copy of the state
//! and commits it only if every step succeeds, including forwarded
//! transfers (issue payouts, conversion payouts and surplus refunds), which
//! are plain internal calls into the same staged state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    asset::{Asset, Name, Symbol, SymbolCode},
    config::{ConfigError, LedgerConfig},
    conversion::Direction,
    error::LedgerError,
    ledger::{LedgerSnapshot, LedgerState, SnapshotMetadata, Tier},
    registry::CurrencyStats,
};


#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Create {
        issuer: Name,
        maximum_supply: Asset,
    },
    Update {
        issuer: Name,
        maximum_supply: Asset,
    },
    Issue {
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Open {
        owner: Name,
        symbol: Symbol,
        payer: Name,
    },
    Transfer {
        from: Name,
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Colddrop {
        from: Name,
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Claim {
        owner: Name,
        symbol: Symbol,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Update { .. } => "update",
            Action::Issue { .. } => "issue",
            Action::Open { .. } => "open",
            Action::Transfer { .. } => "transfer",
            Action::Colddrop { .. } => "colddrop",
            Action::Claim { .. } => "claim",
        }
    }
}

/// What the ledger needs to know about the host's accounts.
pub trait Platform {
    fn is_account(&self, name: &Name) -> bool;
}

/// Fixed set of known accounts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AccountDirectory {
    accounts: BTreeSet<Name>,
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: Name) -> bool {
        self.accounts.insert(name)
    }
}

impl FromIterator<Name> for AccountDirectory {
    fn from_iter<I: IntoIterator<Item = Name>>(iter: I) -> Self {
        Self {
            accounts: iter.into_iter().collect(),
        }
    }
}

impl Platform for AccountDirectory {
    fn is_account(&self, name: &Name) -> bool {
        self.accounts.contains(name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Created {
        issuer: Name,
        max_supply: Asset,
    },
    Updated {
        issuer: Name,
        max_supply: Asset,
    },
    Issued {
        issuer: Name,
        quantity: Asset,
        memo: String,
    },
    Opened {
        owner: Name,
        symbol: Symbol,
        payer: Name,
        created: bool,
    },
    Transferred {
        from: Name,
        to: Name,
        quantity: Asset,
        memo: String,
    },
    ColdDropped {
        from: Name,
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Claimed {
        owner: Name,
        quantity: Asset,
    },
    Converted {
        owner: Name,
        direction: Direction,
        consumed: Asset,
        issued: Asset,
        surplus: Option<Asset>,
    },
}

/// Fire-and-forget notice to a party touched by an action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub action: String,
    pub recipient: Name,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub action: String,
    pub height: u64,
    pub events: Vec<LedgerEvent>,
    pub notifications: Vec<Notification>,
}

pub struct Ledger {
    config: LedgerConfig,
    state: LedgerState,
    meta: SnapshotMetadata,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: LedgerState::new(),
            meta: SnapshotMetadata::default(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn height(&self) -> u64 {
        self.meta.height
    }

    /// Runs `action` as `signer`. On error the ledger is unchanged.
    pub fn apply(
        &mut self,
        platform: &dyn Platform,
        signer: &Name,
        action: Action,
    ) -> Result<Receipt, LedgerError> {
        let operation = action.name();
        let mut staged = self.state.clone();
        let mut exec = Execution {
            config: &self.config,
            platform,
            state: &mut staged,
            events: Vec::new(),
            notifications: Vec::new(),
        };
        match exec.dispatch(signer, action) {
            Ok(()) => {
                let Execution {
                    events,
                    notifications,
                    ..
                } = exec;
                self.state = staged;
                self.meta.height += 1;
                debug!(
                    operation,
                    signer = %signer,
                    height = self.meta.height,
                    events = events.len(),
                    "action committed"
                );
                Ok(Receipt {
                    action: operation.to_string(),
                    height: self.meta.height,
                    events,
                    notifications,
                })
            }
            Err(err) => {
                warn!(operation, signer = %signer, error = %err, "action rejected");
                Err(err)
            }
        }
    }

    pub fn get_supply(&self, code: &SymbolCode) -> Result<Asset, LedgerError> {
        self.state.stats.get_supply(code)
    }

    pub fn get_stats(&self, code: &SymbolCode) -> Result<&CurrencyStats, LedgerError> {
        self.state.stats.get(code)
    }

    pub fn get_balance(&self, owner: &Name, code: &SymbolCode) -> Result<Asset, LedgerError> {
        self.state.accounts.balance(owner, code)
    }

    pub fn get_locked_balance(
        &self,
        owner: &Name,
        code: &SymbolCode,
    ) -> Result<Asset, LedgerError> {
        self.state.locked_accounts.balance(owner, code)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.snapshot(self.meta.clone())
    }
}

/// One action in flight against staged state.
struct Execution<'a> {
    config: &'a LedgerConfig,
    platform: &'a dyn Platform,
    state: &'a mut LedgerState,
    events: Vec<LedgerEvent>,
    notifications: Vec<Notification>,
}

impl Execution<'_> {
    fn dispatch(&mut self, signer: &Name, action: Action) -> Result<(), LedgerError> {
        match action {
            Action::Create {
                issuer,
                maximum_supply,
            } => {
                require_auth(signer, &self.config.authority)?;
                self.state.stats.create(&issuer, &maximum_supply)?;
                self.events.push(LedgerEvent::Created {
                    issuer,
                    max_supply: maximum_supply,
                });
                Ok(())
            }
            Action::Update {
                issuer,
                maximum_supply,
            } => {
                require_auth(signer, &self.config.authority)?;
                self.state.stats.update(&issuer, &maximum_supply)?;
                self.events.push(LedgerEvent::Updated {
                    issuer,
                    max_supply: maximum_supply,
                });
                Ok(())
            }
            Action::Issue { to, quantity, memo } => self.issue(signer, &to, &quantity, &memo),
            Action::Open {
                owner,
                symbol,
                payer,
            } => self.open(signer, &owner, &symbol, &payer),
            Action::Transfer {
                from,
                to,
                quantity,
                memo,
            } => {
                if from == to {
                    return Err(LedgerError::SelfTransfer);
                }
                require_auth(signer, &from)?;
                self.transfer(&from, &to, &quantity, &memo)
            }
            Action::Colddrop {
                from,
                to,
                quantity,
                memo,
            } => self.colddrop(signer, &from, &to, &quantity, &memo),
            Action::Claim { owner, symbol } => self.claim(signer, &owner, &symbol),
        }
    }

    fn issue(
        &mut self,
        signer: &Name,
        to: &Name,
        quantity: &Asset,
        memo: &str,
    ) -> Result<(), LedgerError> {
        self.check_memo(memo)?;
        let stats = self.state.stats.get(quantity.symbol.code())?;
        let issuer = stats.issuer.clone();
        require_auth(signer, &issuer)?;
        check_quantity(quantity, "issue")?;

        self.state.stats.record_issue(quantity)?;
        self.state.accounts.credit(&issuer, quantity, &issuer)?;
        self.events.push(LedgerEvent::Issued {
            issuer: issuer.clone(),
            quantity: quantity.clone(),
            memo: memo.to_string(),
        });

        if to != &issuer {
            debug!(
                operation = "issue",
                owner = %to,
                quantity = %quantity,
                "forwarding issued supply"
            );
            self.transfer(&issuer, to, quantity, memo)?;
        }
        Ok(())
    }

    fn open(
        &mut self,
        signer: &Name,
        owner: &Name,
        symbol: &Symbol,
        payer: &Name,
    ) -> Result<(), LedgerError> {
        require_auth(signer, payer)?;
        self.state.stats.get(symbol.code())?.check_symbol(symbol)?;
        let created = self.state.accounts.open(owner, symbol, payer);
        self.events.push(LedgerEvent::Opened {
            owner: owner.clone(),
            symbol: symbol.clone(),
            payer: payer.clone(),
            created,
        });
        Ok(())
    }

    /// Moves liquid value between two accounts without a signer check; used
    /// both for the `transfer` action and for forwarded transfers.
    fn transfer(
        &mut self,
        from: &Name,
        to: &Name,
        quantity: &Asset,
        memo: &str,
    ) -> Result<(), LedgerError> {
        if from == to {
            return Err(LedgerError::SelfTransfer);
        }
        if !self.platform.is_account(to) {
            return Err(LedgerError::UnknownRecipient {
                recipient: to.clone(),
            });
        }
        let stats = self.state.stats.get(quantity.symbol.code())?;
        check_quantity(quantity, "transfer")?;
        stats.check_symbol(&quantity.symbol)?;
        self.check_memo(memo)?;

        self.notify("transfer", from);
        self.notify("transfer", to);

        self.state.accounts.debit(from, quantity)?;
        self.state.accounts.credit(to, quantity, from)?;
        self.events.push(LedgerEvent::Transferred {
            from: from.clone(),
            to: to.clone(),
            quantity: quantity.clone(),
            memo: memo.to_string(),
        });

        if to == &self.config.authority {
            self.convert(from, quantity)?;
        }
        Ok(())
    }

    /// Converts a deposit the authority just received from `owner` and pays
    /// the result back, refunding any surplus first.
    fn convert(&mut self, owner: &Name, quantity: &Asset) -> Result<(), LedgerError> {
        let plan = self.config.conversion.plan(quantity)?;
        let authority = self.config.authority.clone();

        if let Some(surplus) = &plan.surplus {
            self.transfer(&authority, owner, surplus, &plan.surplus_memo())?;
        }
        self.state.accounts.debit(&authority, &plan.consumed)?;
        self.state.accounts.credit(&authority, &plan.issued, &authority)?;

        info!(
            operation = "convert",
            owner = %owner,
            symbol = %plan.issued.symbol.code(),
            amount = plan.issued.amount,
            quantity = %quantity,
            surplus = plan.surplus.as_ref().map_or(0, |s| s.amount),
            "converting deposit"
        );
        self.events.push(LedgerEvent::Converted {
            owner: owner.clone(),
            direction: plan.direction,
            consumed: plan.consumed.clone(),
            issued: plan.issued.clone(),
            surplus: plan.surplus.clone(),
        });
        self.transfer(&authority, owner, &plan.issued, &plan.memo())
    }

    /// Issuer-gated move of `from`'s liquid balance into `to`'s locked
    /// balance. `from` does not sign.
    fn colddrop(
        &mut self,
        signer: &Name,
        from: &Name,
        to: &Name,
        quantity: &Asset,
        memo: &str,
    ) -> Result<(), LedgerError> {
        let stats = self.state.stats.get(quantity.symbol.code())?;
        require_auth(signer, &stats.issuer)?;
        check_quantity(quantity, "colddrop")?;
        stats.check_symbol(&quantity.symbol)?;

        self.notify("colddrop", from);
        self.notify("colddrop", to);

        self.state.accounts.debit(from, quantity)?;
        self.state.locked_accounts.credit(to, quantity, from)?;
        self.events.push(LedgerEvent::ColdDropped {
            from: from.clone(),
            to: to.clone(),
            quantity: quantity.clone(),
            memo: memo.to_string(),
        });
        Ok(())
    }

    /// Moves the owner's whole locked balance into the liquid tier.
    fn claim(&mut self, signer: &Name, owner: &Name, symbol: &Symbol) -> Result<(), LedgerError> {
        require_auth(signer, owner)?;
        self.notify("claim", owner);
        self.state.stats.get(symbol.code())?.check_symbol(symbol)?;

        let (from, to) = (Tier::Locked, Tier::Liquid);
        let locked = self.state.table(from).balance(owner, symbol.code())?;
        self.state.table_mut(from).debit(owner, &locked)?;
        self.state.table_mut(to).credit(owner, &locked, owner)?;
        self.events.push(LedgerEvent::Claimed {
            owner: owner.clone(),
            quantity: locked,
        });
        Ok(())
    }

    fn check_memo(&self, memo: &str) -> Result<(), LedgerError> {
        if memo.len() > self.config.memo_limit {
            return Err(LedgerError::MemoTooLong {
                len: memo.len(),
                limit: self.config.memo_limit,
            });
        }
        Ok(())
    }

    fn notify(&mut self, action: &str, recipient: &Name) {
        self.notifications.push(Notification {
            action: action.to_string(),
            recipient: recipient.clone(),
        });
    }
}

fn require_auth(signer: &Name, required: &Name) -> Result<(), LedgerError> {
    if signer != required {
        return Err(LedgerError::MissingAuthority {
            required: required.clone(),
        });
    }
    Ok(())
}

fn check_quantity(quantity: &Asset, operation: &'static str) -> Result<(), LedgerError> {
    if !quantity.is_valid() {
        return Err(LedgerError::InvalidQuantity {
            reason: format!("{quantity} out of range"),
        });
    }
    if quantity.amount <= 0 {
        return Err(LedgerError::NonPositiveAmount { operation });
    }
    Ok(())
}
