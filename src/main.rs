use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;
use vgrab_ledger::{logging, AccountDirectory, Action, Ledger, LedgerConfig, Name, Receipt};

/// Replay token ledger actions against an in-memory host
#[derive(Parser)]
#[command(name = "vgrab")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Ledger config (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every step of a script, printing one JSON outcome per line
    Replay {
        /// Script file: { "accounts": [...], "steps": [{ "signer", "action" }] }
        script: PathBuf,

        /// Write the final snapshot here instead of stdout
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Deserialize)]
struct Script {
    #[serde(default)]
    accounts: Vec<Name>,
    steps: Vec<Step>,
}

#[derive(Deserialize)]
struct Step {
    signer: Name,
    action: Action,
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum Outcome {
    Committed { step: usize, receipt: Receipt },
    Rejected { step: usize, action: String, error: String },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(2)
}

fn load_config(path: Option<&Path>) -> LedgerConfig {
    match path {
        Some(path) => LedgerConfig::load(path).unwrap_or_else(|err| fail(err)),
        None => LedgerConfig::default(),
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    encoded.unwrap_or_else(|err| fail(err))
}

impl Script {
    /// Known accounts: the listed ones plus the ledger authority.
    fn platform(&self, authority: &Name) -> AccountDirectory {
        let mut platform: AccountDirectory = self.accounts.iter().cloned().collect();
        platform.insert(authority.clone());
        platform
    }
}

/// Applies every step in order; a rejected step does not stop the run.
fn run_steps(ledger: &mut Ledger, platform: &AccountDirectory, steps: Vec<Step>) -> Vec<Outcome> {
    steps
        .into_iter()
        .enumerate()
        .map(|(idx, step)| {
            let action = step.action.name().to_string();
            match ledger.apply(platform, &step.signer, step.action) {
                Ok(receipt) => Outcome::Committed { step: idx, receipt },
                Err(err) => Outcome::Rejected {
                    step: idx,
                    action,
                    error: err.to_string(),
                },
            }
        })
        .collect()
}

fn replay_cmd(config: LedgerConfig, script: &Path, snapshot_out: Option<&Path>) {
    let raw = fs::read_to_string(script)
        .unwrap_or_else(|err| fail(format!("failed to read {}: {err}", script.display())));
    let script: Script =
        serde_json::from_str(&raw).unwrap_or_else(|err| fail(format!("malformed script: {err}")));

    let platform = script.platform(&config.authority);
    let mut ledger = Ledger::new(config).unwrap_or_else(|err| fail(err));

    let total = script.steps.len();
    let outcomes = run_steps(&mut ledger, &platform, script.steps);
    let mut committed = 0usize;
    for outcome in &outcomes {
        if matches!(outcome, Outcome::Committed { .. }) {
            committed += 1;
        }
        println!("{}", to_json(outcome, false));
    }

    let snapshot = ledger.snapshot();
    info!(
        steps = total,
        committed,
        state_root = %hex::encode(snapshot.state_root),
        "replay finished"
    );
    let rendered = to_json(&snapshot, true);
    match snapshot_out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).ok();
            }
            fs::write(path, rendered)
                .unwrap_or_else(|err| fail(format!("failed to write {}: {err}", path.display())));
            println!("snapshot → {}", path.display());
        }
        None => println!("{rendered}"),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(cli.config.as_deref());
    match cli.command {
        Commands::Replay {
            script,
            snapshot_out,
        } => replay_cmd(config, &script, snapshot_out.as_deref()),
        Commands::Config => println!("{}", to_json(&config, true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgrab_ledger::SymbolCode;

    const DEMO: &str = include_str!("../demos/conversion.json");

    #[test]
    fn demo_script_replays() {
        let script: Script = serde_json::from_str(DEMO).unwrap();
        assert_eq!(script.steps.len(), 11);

        let config = LedgerConfig::default();
        let platform = script.platform(&config.authority);
        let mut ledger = Ledger::new(config).unwrap();
        let outcomes = run_steps(&mut ledger, &platform, script.steps);

        // only the 0.5000 ZKSPLAY swap is too small to convert
        let rejected: Vec<_> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                Outcome::Rejected { step, action, .. } => Some((*step, action.as_str())),
                Outcome::Committed { .. } => None,
            })
            .collect();
        assert_eq!(rejected, vec![(5, "transfer")]);
        assert_eq!(ledger.height(), 10);

        let balance = |owner: &str, code: &str| {
            let owner = Name::new(owner).unwrap();
            let code = SymbolCode::new(code).unwrap();
            ledger.get_balance(&owner, &code).map(|a| a.amount).ok()
        };
        assert_eq!(balance("alice", "ZKS"), Some(1));
        assert_eq!(balance("alice", "ZKSPLAY"), Some(40_000));
        assert_eq!(balance("alice", "TOK"), Some(50));
        assert_eq!(balance("bob", "TOK"), Some(150));
        assert_eq!(balance("issuer", "TOK"), Some(300));
        assert_eq!(balance("vgrab", "ZKSPLAY"), None);
    }

    #[test]
    fn script_accounts_are_optional() {
        let script: Script = serde_json::from_str(r#"{ "steps": [] }"#).unwrap();
        let platform = script.platform(&Name::new("vgrab").unwrap());
        let expected: AccountDirectory = [Name::new("vgrab").unwrap()].into_iter().collect();
        assert_eq!(platform, expected);
    }
}
