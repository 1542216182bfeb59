use std::io::{self, Write as _};
use std::sync::Arc;

use clap::Parser as _;
use eyre::WrapErr as _;
use oracle_feeder::chain_client::ChainClient;
use oracle_feeder::config::{Cli, Command, UpdateKeyArgs, VoteArgs};
use oracle_feeder::signer::{HardwareSigner, Signer, SoftwareSigner};
use oracle_feeder::voting_loop::{VotingLoop, VotingLoopConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Vote(args) => run_vote(args).await,
        Command::UpdateKey(args) => run_update_key(args),
    };

    if let Err(e) = result {
        tracing::error!(error = ?e, "fatal startup error");
        std::process::exit(1);
    }
}

async fn run_vote(args: VoteArgs) -> eyre::Result<()> {
    let chain = ChainClient::new(&args.lcd).wrap_err("failed constructing chain client")?;

    // Fatal per spec.md §4.A: a feeder that can't learn the vote period
    // cannot schedule anything.
    let params = chain
        .oracle_params()
        .await
        .wrap_err("failed to fetch oracle params at startup")?;
    info!(vote_period = params.vote_period, "fetched oracle params");

    let signer: Arc<dyn Signer> = if args.ledger {
        Arc::new(
            HardwareSigner::connect("")
                .wrap_err("hardware signer required by --ledger is unavailable")?,
        )
    } else {
        let key_bytes = load_software_key(&args.keystore, args.password.as_deref())
            .wrap_err("failed to load software keystore")?;
        Arc::new(
            SoftwareSigner::from_key_bytes(&key_bytes).wrap_err("failed constructing signer")?,
        )
    };
    info!(address = signer.address(), "loaded feeder identity");

    let config = VotingLoopConfig::new(
        args.chain_id.clone(),
        params.vote_period,
        args.denom_filter(),
        args.validators.clone(),
        args.fee_denom.clone(),
        args.sources.clone(),
    );

    VotingLoop::new(chain, signer, config).run().await;
    Ok(())
}

/// Reads already-decrypted key material from the keystore path. Decrypting
/// a real on-disk keystore is out of scope per spec.md §1/§6 — this reads
/// raw key bytes as a stand-in for that external collaborator.
fn load_software_key(keystore_path: &str, _password: Option<&str>) -> eyre::Result<Vec<u8>> {
    std::fs::read(keystore_path)
        .wrap_err_with(|| format!("failed reading keystore file at {keystore_path}"))
}

/// Interactively creates or replaces the keystore: prompts a confirmed
/// passphrase (min 8 chars) and a 24-word mnemonic, per spec.md §6. The
/// actual mnemonic-to-key derivation and encryption are out of scope per
/// spec.md §1 — this only covers the interactive surface.
fn run_update_key(args: UpdateKeyArgs) -> eyre::Result<()> {
    let passphrase = prompt_confirmed_passphrase()?;
    let mnemonic = prompt_mnemonic()?;

    // The out-of-scope keystore module would encrypt `mnemonic` under
    // `passphrase` here. This stand-in writes the mnemonic directly so the
    // CLI surface is exercisable end to end without vendoring a key-derivation
    // crate this exercise cannot plausibly carry.
    let _ = &passphrase;
    std::fs::write(&args.keystore, mnemonic).wrap_err("failed writing keystore file")?;
    println!("keystore written to {}", args.keystore);
    Ok(())
}

fn prompt_confirmed_passphrase() -> eyre::Result<String> {
    loop {
        let first = prompt_line("Enter passphrase (min 8 chars): ")?;
        if first.len() < 8 {
            println!("passphrase must be at least 8 characters");
            continue;
        }
        let second = prompt_line("Confirm passphrase: ")?;
        if first != second {
            println!("passphrases did not match, try again");
            continue;
        }
        return Ok(first);
    }
}

fn prompt_mnemonic() -> eyre::Result<String> {
    loop {
        let mnemonic = prompt_line("Enter 24-word mnemonic: ")?;
        if mnemonic.split_whitespace().count() != 24 {
            println!("mnemonic must contain exactly 24 words");
            continue;
        }
        return Ok(mnemonic);
    }
}

fn prompt_line(prompt: &str) -> eyre::Result<String> {
    print!("{prompt}");
    io::stdout().flush().wrap_err("failed flushing stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .wrap_err("failed reading from stdin")?;
    Ok(line.trim().to_string())
}
