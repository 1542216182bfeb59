//! Read-only and write HTTP access to the chain's REST endpoint.
//!
//! Grounded on `astria-sequencer-relayer`'s `sequencer_poller.rs` and
//! `data_availability.rs`: a thin wrapper around one process-wide
//! [`reqwest::Client`], eyre-wrapped errors at the call boundary, structured
//! logging at `debug`/`warn`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors surfaced by the chain client. Callers match on the variant to
/// decide fatal-vs-skip-tick handling per spec §4.A / §7.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("transient error contacting chain: {0}")]
    Transient(String),
    #[error("fatal error contacting chain: {0}")]
    Fatal(String),
}

/// A stateless wrapper over the chain's LCD REST endpoint.
///
/// Cloning is cheap: the inner [`reqwest::Client`] is itself reference
/// counted, so this value is passed by clone through the voting loop exactly
/// as the teacher passes its sequencer client by value (§9's "global HTTP
/// client... model as a chain-client value").
#[derive(Clone)]
pub struct ChainClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestBlock {
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_number: u64,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleParams {
    pub vote_period: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Included { code: i64, raw_log: String, height: u64 },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResponse {
    pub txhash: String,
    pub code: i64,
    pub raw_log: String,
}

#[derive(Deserialize)]
struct LatestBlockResponse {
    block: BlockEnvelope,
}
#[derive(Deserialize)]
struct BlockEnvelope {
    header: BlockHeader,
}
#[derive(Deserialize)]
struct BlockHeader {
    height: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    value: AccountValue,
}
#[derive(Deserialize)]
struct AccountValue {
    account_number: String,
    sequence: String,
}

#[derive(Deserialize)]
struct OracleParamsResponse {
    vote_period: String,
}

#[derive(Deserialize)]
struct TxResponse {
    height: String,
    code: Option<i64>,
    raw_log: Option<String>,
}

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    tx: &'a serde_json::Value,
    mode: &'static str,
}

#[derive(Deserialize)]
struct BroadcastResponseWire {
    txhash: String,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    raw_log: Option<String>,
}

impl ChainClient {
    pub fn new(base_url: impl Into<String>) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| eyre::eyre!("failed to construct http client: {e}"))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn latest_block(&self) -> Result<LatestBlock, ChainError> {
        let url = self.url("/blocks/latest");
        debug!(url, "fetching latest block");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ChainError::Transient(format!(
                "unexpected status {}",
                resp.status()
            )));
        }
        let body: LatestBlockResponse = resp
            .json()
            .await
            .map_err(|e| ChainError::Transient(format!("failed decoding response: {e}")))?;
        let height = body
            .block
            .header
            .height
            .parse::<u64>()
            .map_err(|e| ChainError::Transient(format!("non-numeric height: {e}")))?;
        Ok(LatestBlock { height })
    }

    pub async fn account(&self, address: &str) -> Result<Account, ChainError> {
        let url = self.url(&format!("/auth/accounts/{address}"));
        debug!(url, "fetching account");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ChainError::Transient(format!(
                "unexpected status {}",
                resp.status()
            )));
        }
        let body: AccountResponse = resp
            .json()
            .await
            .map_err(|e| ChainError::Fatal(format!("account response missing fields: {e}")))?;
        let account_number = body
            .value
            .account_number
            .parse::<u64>()
            .map_err(|e| ChainError::Fatal(format!("account_number not an integer: {e}")))?;
        let sequence = body
            .value
            .sequence
            .parse::<u64>()
            .map_err(|e| ChainError::Fatal(format!("sequence not an integer: {e}")))?;
        Ok(Account {
            account_number,
            sequence,
        })
    }

    /// Fetches `vote_period` once at startup. Failure here is fatal per
    /// spec §4.A.
    pub async fn oracle_params(&self) -> eyre::Result<OracleParams> {
        let url = self.url("/oracle/params");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| eyre::eyre!("failed contacting chain for oracle params: {e}"))?;
        if !resp.status().is_success() {
            eyre::bail!("oracle params endpoint returned status {}", resp.status());
        }
        let body: OracleParamsResponse = resp
            .json()
            .await
            .map_err(|e| eyre::eyre!("failed decoding oracle params: {e}"))?;
        let vote_period = body
            .vote_period
            .parse::<u64>()
            .map_err(|e| eyre::eyre!("vote_period not an integer: {e}"))?;
        if vote_period == 0 {
            eyre::bail!("chain reported vote_period of zero");
        }
        Ok(OracleParams { vote_period })
    }

    pub async fn tx(&self, hash: &str) -> Result<TxStatus, ChainError> {
        let url = self.url(&format!("/txs/{hash}"));
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(TxStatus::NotFound);
        }
        if !resp.status().is_success() {
            return Err(ChainError::Transient(format!(
                "unexpected status {}",
                resp.status()
            )));
        }
        let body: TxResponse = resp
            .json()
            .await
            .map_err(|e| ChainError::Transient(format!("failed decoding tx response: {e}")))?;
        let height = body
            .height
            .parse::<u64>()
            .map_err(|e| ChainError::Transient(format!("non-numeric inclusion height: {e}")))?;
        Ok(TxStatus::Included {
            code: body.code.unwrap_or(0),
            raw_log: body.raw_log.unwrap_or_default(),
            height,
        })
    }

    /// Broadcasts in sync mode. A nonzero `code` in the response is an
    /// application-level rejection, surfaced to the caller rather than
    /// retried here (§4.A).
    pub async fn broadcast(&self, tx: &serde_json::Value) -> Result<BroadcastResponse, ChainError> {
        let url = self.url("/txs");
        let body = BroadcastRequest { tx, mode: "sync" };
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ChainError::Transient(format!(
                "broadcast endpoint returned status {}",
                resp.status()
            )));
        }
        let wire: BroadcastResponseWire = resp
            .json()
            .await
            .map_err(|e| ChainError::Transient(format!("failed decoding broadcast response: {e}")))?;
        let code = wire.code.unwrap_or(0);
        let raw_log = wire.raw_log.unwrap_or_default();
        if code != 0 {
            warn!(code, raw_log, "broadcast rejected at the application layer");
        }
        Ok(BroadcastResponse {
            txhash: wire.txhash,
            code,
            raw_log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_trailing_slash() {
        let client = ChainClient::new("http://lcd.example.com/").unwrap();
        assert_eq!(client.url("/blocks/latest"), "http://lcd.example.com/blocks/latest");
    }
}
