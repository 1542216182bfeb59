//! CLI surface: two subcommands, `vote` and `update-key`, exactly as listed
//! in spec.md §6.
//!
//! Grounded on `astria-sequencer-relayer`'s `config/cli.rs` (clap derive,
//! one flag per field), simplified to a single `clap::Parser` with
//! subcommands since this CLI carries no environment-variable layer.

use std::collections::HashSet;

use clap::{Parser, Subcommand};

use crate::voting_loop::DenomFilter;

#[derive(Debug, Parser)]
#[command(name = "oracle-feeder", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the voting loop against a chain LCD endpoint.
    Vote(VoteArgs),
    /// Interactively create or replace the encrypted keystore.
    UpdateKey(UpdateKeyArgs),
}

#[derive(Debug, Parser)]
pub struct VoteArgs {
    /// Chain LCD REST endpoint.
    #[arg(long)]
    pub lcd: String,

    /// Chain id embedded in the sign doc.
    #[arg(long)]
    pub chain_id: String,

    /// Price source URL. May be repeated; order is the tie-break among
    /// simultaneous fresh responses.
    #[arg(long = "source", required = true)]
    pub sources: Vec<String>,

    /// Validator operator address to vote on behalf of. May be repeated.
    #[arg(long = "validator", required = true)]
    pub validators: Vec<String>,

    /// "all" or a comma-separated list of currency codes.
    #[arg(long, default_value = "all")]
    pub denoms: String,

    /// Path to the encrypted keystore file.
    #[arg(long, default_value = "priv_validator_key.json")]
    pub keystore: String,

    /// Keystore password. Prompted interactively when omitted — password
    /// prompting UX itself is out of scope per spec.md §1.
    #[arg(long)]
    pub password: Option<String>,

    /// Use a connected hardware signer instead of the software keystore.
    #[arg(long)]
    pub ledger: bool,

    /// Fee denom used when assembling the transaction fee.
    #[arg(long, default_value = "uluna")]
    pub fee_denom: String,
}

impl VoteArgs {
    pub fn denom_filter(&self) -> DenomFilter {
        if self.denoms.eq_ignore_ascii_case("all") {
            DenomFilter::All
        } else {
            DenomFilter::Only(
                self.denoms
                    .split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect::<HashSet<_>>(),
            )
        }
    }
}

#[derive(Debug, Parser)]
pub struct UpdateKeyArgs {
    /// Path to the encrypted keystore file to create or replace.
    #[arg(long, default_value = "priv_validator_key.json")]
    pub keystore: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denom_filter_all_is_case_insensitive() {
        let args = VoteArgs {
            lcd: String::new(),
            chain_id: String::new(),
            sources: vec![],
            validators: vec![],
            denoms: "ALL".into(),
            keystore: String::new(),
            password: None,
            ledger: false,
            fee_denom: "uluna".into(),
        };
        assert!(matches!(args.denom_filter(), DenomFilter::All));
    }

    #[test]
    fn denom_filter_csv_normalizes_case_and_whitespace() {
        let args = VoteArgs {
            lcd: String::new(),
            chain_id: String::new(),
            sources: vec![],
            validators: vec![],
            denoms: "KRW, usd ,jpy".into(),
            keystore: String::new(),
            password: None,
            ledger: false,
            fee_denom: "uluna".into(),
        };
        match args.denom_filter() {
            DenomFilter::Only(set) => {
                assert_eq!(
                    set,
                    ["krw", "usd", "jpy"].into_iter().map(String::from).collect()
                );
            }
            DenomFilter::All => panic!("expected a filtered set"),
        }
    }

    #[test]
    fn parses_repeated_source_and_validator_flags() {
        let cli = Cli::parse_from([
            "oracle-feeder",
            "vote",
            "--lcd",
            "http://lcd.example.com",
            "--chain-id",
            "columbus-5",
            "--source",
            "http://a.example.com",
            "--source",
            "http://b.example.com",
            "--validator",
            "terravaloper1a",
        ]);
        let Command::Vote(args) = cli.command else {
            panic!("expected vote subcommand");
        };
        assert_eq!(args.sources.len(), 2);
        assert_eq!(args.validators, vec!["terravaloper1a".to_string()]);
    }
}
