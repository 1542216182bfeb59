//! Tagged outcomes for the voting loop. Replaces exception-as-control-flow
//! with ordinary returns: every tick resolves to exactly one [`TickOutcome`].

use std::fmt;

/// Reason a tick produced no broadcast. Never fatal — the loop always
/// advances to the next tick after logging one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `idx < vote_period - 3`; too early in the period to act.
    PhaseGate,
    /// `last_prevote_period == period`; already acted this period.
    AlreadyVotedThisPeriod,
    /// Chain client failed to fetch the latest block height.
    HeightFetchFailed(String),
    /// Price aggregator produced no fresh quorum.
    PriceFetchFailed(String),
    /// Chain client failed to fetch account metadata.
    AccountFetchFailed(String),
    /// Nothing to sign or broadcast (no messages for this tick).
    NoMessages,
    /// Signer refused or failed to produce a signature.
    SigningFailed(String),
    /// Transport-level failure broadcasting the transaction.
    BroadcastTransportError(String),
    /// Chain accepted the transaction into a block but rejected it.
    BroadcastApplicationError { code: i64, raw_log: String },
    /// Confirmation polling exceeded the bounded window.
    ConfirmTimeout,
    /// The confirmed transaction carried a nonzero application code.
    ConfirmApplicationError { code: i64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhaseGate => write!(f, "not yet in the acting window of this vote period"),
            Self::AlreadyVotedThisPeriod => write!(f, "already acted in this vote period"),
            Self::HeightFetchFailed(e) => write!(f, "failed fetching latest block height: {e}"),
            Self::PriceFetchFailed(e) => write!(f, "price aggregation failed: {e}"),
            Self::AccountFetchFailed(e) => write!(f, "account fetch failed: {e}"),
            Self::NoMessages => write!(f, "no prevote or reveal messages to send"),
            Self::SigningFailed(e) => write!(f, "signing failed: {e}"),
            Self::BroadcastTransportError(e) => write!(f, "broadcast transport error: {e}"),
            Self::BroadcastApplicationError { code, raw_log } => {
                write!(f, "broadcast rejected, code={code}: {raw_log}")
            }
            Self::ConfirmTimeout => write!(f, "confirmation polling timed out"),
            Self::ConfirmApplicationError { code } => {
                write!(f, "confirmed transaction carried nonzero code={code}")
            }
        }
    }
}

/// The result of a single tick of the voting loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A transaction was broadcast and confirmed included.
    Broadcast { period_of_inclusion: u64 },
    /// Nothing was broadcast this tick.
    Skip(SkipReason),
}
