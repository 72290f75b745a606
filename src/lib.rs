//! Two-tier token ledger with a fixed-ratio conversion engine.
//!
//! The crate is a library of state-transition rules; the host provides
//! authentication and durable storage. Building blocks, leaf first:
//!
//! * [`asset`] — identities, symbols and amounts in the host's text forms.
//! * [`registry`] — per-symbol supply, cap and issuer.
//! * [`ledger`] — liquid and locked balance tables plus snapshots with a
//!   deterministic state root.
//! * [`conversion`] — planning of conversions between the two linked
//!   denominations.
//! * [`actions`] — the action surface (`create`, `update`, `issue`, `open`,
//!   `transfer`, `colddrop`, `claim`) and atomic execution.
//!
//! ```
//! use vgrab_ledger::{AccountDirectory, Action, Ledger, LedgerConfig, Name};
//!
//! let platform: AccountDirectory = ["vgrab", "issuer", "alice"]
//!     .into_iter()
//!     .map(|n| n.parse::<Name>().unwrap())
//!     .collect();
//! let mut ledger = Ledger::new(LedgerConfig::default()).unwrap();
//! let authority = ledger.config().authority.clone();
//! let issuer: Name = "issuer".parse().unwrap();
//!
//! ledger
//!     .apply(&platform, &authority, Action::Create {
//!         issuer: issuer.clone(),
//!         maximum_supply: "1000 TOK".parse().unwrap(),
//!     })
//!     .unwrap();
//! ledger
//!     .apply(&platform, &issuer, Action::Issue {
//!         to: "alice".parse().unwrap(),
//!         quantity: "500 TOK".parse().unwrap(),
//!         memo: String::new(),
//!     })
//!     .unwrap();
//! assert_eq!(ledger.get_supply(&"TOK".parse().unwrap()).unwrap().amount, 500);
//! ```

pub mod actions;
pub mod asset;
pub mod config;
pub mod conversion;
pub mod ledger;
pub mod logging;
pub mod registry;

mod error;

pub use actions::{AccountDirectory, Action, Ledger, LedgerEvent, Notification, Platform, Receipt};
pub use asset::{Amount, Asset, Name, Symbol, SymbolCode};
pub use config::{ConfigError, LedgerConfig};
pub use error::LedgerError;
pub use ledger::{LedgerSnapshot, Tier};
