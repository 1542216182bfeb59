//! Message and transaction-body construction: the wire shapes dictated by
//! spec.md §6, built here rather than by an external encoder since that seam
//! is this core's own responsibility (only the commitment hash defers to
//! "chain spec" per §6).

use serde_json::{json, Value};

const BASE_GAS: u64 = 50_000;
const GAS_PER_MESSAGE: u64 = 7_500;
/// Fee rate expressed as a fraction with denominator 1000 to keep the ceil
/// computation in integer arithmetic (0.015 == 15/1000).
const FEE_RATE_NUMERATOR: u64 = 15;
const FEE_RATE_DENOMINATOR: u64 = 1_000;

pub fn prevote_message(hash: &str, denom: &str, feeder: &str, validator: &str) -> Value {
    json!({
        "type": "oracle/MsgExchangeRatePrevote",
        "value": {
            "hash": hash,
            "denom": denom,
            "feeder": feeder,
            "validator": validator,
        }
    })
}

pub fn vote_message(
    exchange_rate: &str,
    salt: &str,
    denom: &str,
    feeder: &str,
    validator: &str,
) -> Value {
    json!({
        "type": "oracle/MsgExchangeRateVote",
        "value": {
            "exchange_rate": exchange_rate,
            "salt": salt,
            "denom": denom,
            "feeder": feeder,
            "validator": validator,
        }
    })
}

/// `gas = 50_000 + 7_500 * message_count`; `fee = ceil(gas * 0.015)` in the
/// chain's native fee denom, per spec.md §4.E step 7.
pub fn gas_for(message_count: usize) -> u64 {
    BASE_GAS + GAS_PER_MESSAGE * message_count as u64
}

pub fn fee_amount_for(gas: u64) -> u64 {
    (gas * FEE_RATE_NUMERATOR + FEE_RATE_DENOMINATOR - 1) / FEE_RATE_DENOMINATOR
}

pub fn assemble_fee(gas: u64, fee_denom: &str) -> Value {
    json!({
        "amount": [{ "amount": fee_amount_for(gas).to_string(), "denom": fee_denom }],
        "gas": gas.to_string(),
    })
}

pub fn assemble_tx(msgs: Vec<Value>, fee: Value, signatures: Vec<Value>, memo: &str) -> Value {
    json!({
        "msg": msgs,
        "fee": fee,
        "signatures": signatures,
        "memo": memo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_formula_matches_spec() {
        assert_eq!(gas_for(0), 50_000);
        assert_eq!(gas_for(1), 57_500);
        assert_eq!(gas_for(4), 80_000);
    }

    #[test]
    fn fee_is_ceiling_of_gas_times_rate() {
        // 50_000 * 0.015 = 750 exactly.
        assert_eq!(fee_amount_for(50_000), 750);
        // 57_500 * 0.015 = 862.5 -> ceil to 863.
        assert_eq!(fee_amount_for(57_500), 863);
    }

    #[test]
    fn prevote_message_has_no_price_fields() {
        let msg = prevote_message("deadbeef", "ukrw", "terra1feeder", "terravaloper1v");
        assert_eq!(msg["type"], "oracle/MsgExchangeRatePrevote");
        assert!(msg["value"].get("exchange_rate").is_none());
    }

    #[test]
    fn vote_message_carries_price_and_salt() {
        let msg = vote_message("123.45", "abcd", "ukrw", "terra1feeder", "terravaloper1v");
        assert_eq!(msg["type"], "oracle/MsgExchangeRateVote");
        assert_eq!(msg["value"]["exchange_rate"], "123.45");
        assert_eq!(msg["value"]["salt"], "abcd");
    }
}
