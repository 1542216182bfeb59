//! The block-height-driven scheduler and state machine described in
//! spec.md §4.E — the heart of the feeder.
//!
//! Grounded on `astria-sequencer-relayer`'s `sequencer_poller.rs` (fixed
//! interval polling, tagged log-and-continue on error) and `relayer.rs`
//! (`tokio::select!` over a running task plus a shutdown signal). Control
//! flow is an ordinary `TickOutcome` return per the Design Notes — no
//! sentinel-string control flow.

pub mod messages;
pub mod state;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::aggregator;
use crate::chain_client::{ChainClient, ChainError, TxStatus};
use crate::commitment::{self, denom_for};
use crate::error::{SkipReason, TickOutcome};
use crate::signer::{SignDoc, Signer};
use crate::voting_loop::state::{PrevoteRecord, VoteLoopState};

const TICK_MIN_INTERVAL: Duration = Duration::from_secs(5);
const TICK_TARGET_INTERVAL: Duration = Duration::from_secs(6);
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(1);
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(45);
/// The last few blocks of a period: `idx >= vote_period - PHASE_MARGIN`.
const PHASE_MARGIN: u64 = 3;

#[derive(Debug, Clone)]
pub enum DenomFilter {
    All,
    Only(HashSet<String>),
}

impl DenomFilter {
    fn allows(&self, currency: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(currency),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VotingLoopConfig {
    pub chain_id: String,
    pub vote_period: u64,
    pub denom_filter: DenomFilter,
    pub validators: Vec<String>,
    pub fee_denom: String,
    pub price_sources: Vec<String>,
    pub confirm_poll_interval: Duration,
    pub confirm_timeout: Duration,
    pub tick_min_interval: Duration,
    pub tick_target_interval: Duration,
}

impl VotingLoopConfig {
    pub fn new(
        chain_id: impl Into<String>,
        vote_period: u64,
        denom_filter: DenomFilter,
        validators: Vec<String>,
        fee_denom: impl Into<String>,
        price_sources: Vec<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            vote_period,
            denom_filter,
            validators,
            fee_denom: fee_denom.into(),
            price_sources,
            confirm_poll_interval: CONFIRM_POLL_INTERVAL,
            confirm_timeout: CONFIRM_TIMEOUT,
            tick_min_interval: TICK_MIN_INTERVAL,
            tick_target_interval: TICK_TARGET_INTERVAL,
        }
    }
}

pub struct VotingLoop {
    chain: ChainClient,
    price_http: reqwest::Client,
    signer: Arc<dyn Signer>,
    config: VotingLoopConfig,
    state: VoteLoopState,
}

impl VotingLoop {
    pub fn new(chain: ChainClient, signer: Arc<dyn Signer>, config: VotingLoopConfig) -> Self {
        Self {
            chain,
            price_http: reqwest::Client::new(),
            signer,
            config,
            state: VoteLoopState::new(),
        }
    }

    pub fn state(&self) -> &VoteLoopState {
        &self.state
    }

    pub fn set_state(&mut self, state: VoteLoopState) {
        self.state = state;
    }

    /// Runs ticks forever, pacing per spec §4.E step 11, until a shutdown
    /// signal interrupts the next pacing sleep (spec §5).
    pub async fn run(mut self) {
        loop {
            let start = Instant::now();
            let outcome = self.tick().await;
            log_outcome(&outcome);

            let elapsed = start.elapsed();
            let sleep_for = self
                .config
                .tick_target_interval
                .saturating_sub(elapsed)
                .max(self.config.tick_min_interval);

            tokio::select! {
                () = tokio::time::sleep(sleep_for) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, exiting after current tick");
                    return;
                }
            }
        }
    }

    /// A single iteration of the state machine, spec.md §4.E steps 1-10.
    #[instrument(skip_all)]
    pub async fn tick(&mut self) -> TickOutcome {
        let height = match self.chain.latest_block().await {
            Ok(b) => b.height,
            Err(e) => return TickOutcome::Skip(SkipReason::HeightFetchFailed(e.to_string())),
        };
        let period = height / self.config.vote_period;
        let idx = height % self.config.vote_period;

        if idx < self.config.vote_period.saturating_sub(PHASE_MARGIN) {
            return TickOutcome::Skip(SkipReason::PhaseGate);
        }
        if self.state.last_prevote_period == Some(period) {
            return TickOutcome::Skip(SkipReason::AlreadyVotedThisPeriod);
        }

        let prices = match aggregator::fetch_prices(&self.price_http, &self.config.price_sources).await {
            Ok(p) => p,
            Err(e) => return TickOutcome::Skip(SkipReason::PriceFetchFailed(e)),
        };

        let account = match self.chain.account(self.signer.address()).await {
            Ok(a) => a,
            Err(e) => return TickOutcome::Skip(SkipReason::AccountFetchFailed(e.to_string())),
        };

        let mut msgs = Vec::new();

        // Step 5: reveal set, built only from remembered price/salt.
        for obs in &prices {
            if !self.config.denom_filter.allows(&obs.currency) {
                continue;
            }
            let Some(record) = self.state.reveal_eligible(&obs.currency, period) else {
                continue;
            };
            let denom = denom_for(&obs.currency);
            for validator in &self.config.validators {
                msgs.push(messages::vote_message(
                    &record.committed_price,
                    &record.salt,
                    &denom,
                    self.signer.address(),
                    validator,
                ));
            }
        }

        // Step 6: fresh prevote set for the current sample.
        let mut new_prevotes: Vec<(String, PrevoteRecord)> = Vec::new();
        for obs in &prices {
            if !self.config.denom_filter.allows(&obs.currency) {
                continue;
            }
            let denom = denom_for(&obs.currency);
            let salt = commitment::fresh_salt();
            for validator in &self.config.validators {
                let hash = commitment::commit(&salt, &obs.price, &denom, validator);
                msgs.push(messages::prevote_message(
                    &hash,
                    &denom,
                    self.signer.address(),
                    validator,
                ));
            }
            new_prevotes.push((
                obs.currency.clone(),
                PrevoteRecord {
                    committed_price: obs.price.clone(),
                    salt,
                    // Placeholder; overwritten with the included period once
                    // confirmed (step 10) — never the sampled period.
                    prevote_period: period,
                },
            ));
        }

        if msgs.is_empty() {
            return TickOutcome::Skip(SkipReason::NoMessages);
        }

        // Step 7: assemble.
        let gas = messages::gas_for(msgs.len());
        let fee = messages::assemble_fee(gas, &self.config.fee_denom);
        let sign_doc = SignDoc {
            chain_id: self.config.chain_id.clone(),
            account_number: account.account_number,
            sequence: account.sequence,
            fee: fee.clone(),
            msgs: msgs.clone(),
            memo: String::new(),
        };

        // Step 8: sign.
        let signature = match self.signer.sign(&sign_doc).await {
            Ok(sig) => sig,
            Err(e) => return TickOutcome::Skip(SkipReason::SigningFailed(e.to_string())),
        };
        let tx = messages::assemble_tx(
            msgs,
            fee,
            vec![serde_json::json!({
                "pub_key": self.signer.address(),
                "signature": hex::encode(&signature),
            })],
            "",
        );

        // Step 9: broadcast.
        let broadcast = match self.chain.broadcast(&tx).await {
            Ok(b) => b,
            Err(ChainError::Transient(e)) | Err(ChainError::Fatal(e)) => {
                return TickOutcome::Skip(SkipReason::BroadcastTransportError(e));
            }
        };
        if broadcast.code != 0 {
            return TickOutcome::Skip(SkipReason::BroadcastApplicationError {
                code: broadcast.code,
                raw_log: broadcast.raw_log,
            });
        }

        // Step 10: confirm, then atomically update memory.
        match self.confirm(&broadcast.txhash).await {
            Ok(period_of_inclusion) => {
                self.state
                    .record_confirmed_prevotes(new_prevotes.into_iter().map(|(c, mut r)| {
                        r.prevote_period = period_of_inclusion;
                        (c, r)
                    }), period_of_inclusion);
                TickOutcome::Broadcast { period_of_inclusion }
            }
            Err(reason) => TickOutcome::Skip(reason),
        }
    }

    /// Polls `tx(hash)` at 1 Hz for up to the configured timeout. Returns
    /// the vote-period index derived from the *included* block height.
    async fn confirm(&self, hash: &str) -> Result<u64, SkipReason> {
        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            match self.chain.tx(hash).await {
                Ok(TxStatus::Included { code, height, .. }) if code == 0 => {
                    return Ok(height / self.config.vote_period);
                }
                Ok(TxStatus::Included { code, .. }) => {
                    return Err(SkipReason::ConfirmApplicationError { code });
                }
                Ok(TxStatus::NotFound) => {}
                Err(e) => warn!(error = %e, "transient error polling for tx inclusion"),
            }
            if Instant::now() >= deadline {
                return Err(SkipReason::ConfirmTimeout);
            }
            tokio::time::sleep(self.config.confirm_poll_interval).await;
        }
    }
}

fn log_outcome(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Broadcast { period_of_inclusion } => {
            info!(period_of_inclusion, "vote transaction confirmed included");
        }
        TickOutcome::Skip(reason) => {
            info!(%reason, "tick skipped");
        }
    }
}
