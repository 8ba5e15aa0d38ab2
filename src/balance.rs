// src/balance.rs
//! Pre/post balance lookup for one account within a single transaction,
//! keyed by the account's position in `accountKeys`.

use crate::models::BalanceDelta;
use crate::rpc::TransactionDetail;

/// `None` when the account is not part of the transaction or the balance
/// metadata is missing or shorter than the account list.
pub fn read_delta(detail: &TransactionDetail, address: &str) -> Option<BalanceDelta> {
    let meta = detail.meta.as_ref()?;
    let position = detail
        .transaction
        .message
        .account_keys
        .iter()
        .position(|key| key.pubkey() == address)?;

    let pre = *meta.pre_balances.get(position)?;
    let post = *meta.post_balances.get(position)?;
    Some(BalanceDelta { pre, post })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(pre: Vec<u64>, post: Vec<u64>) -> TransactionDetail {
        serde_json::from_value(json!({
            "slot": 1,
            "meta": {
                "err": null,
                "preBalances": pre,
                "postBalances": post
            },
            "transaction": {
                "message": {
                    "accountKeys": [
                        {"pubkey": "Payer"},
                        {"pubkey": "Fresh"}
                    ],
                    "instructions": []
                }
            }
        }))
        .expect("valid fixture")
    }

    #[test]
    fn reads_delta_by_account_position() {
        let d = detail(vec![5_000_000_000, 0], vec![3_999_995_000, 1_000_000_000]);

        let delta = read_delta(&d, "Fresh").expect("present");
        assert_eq!(delta.pre, 0);
        assert_eq!(delta.post, 1_000_000_000);
    }

    #[test]
    fn absent_account_yields_none() {
        let d = detail(vec![1, 2], vec![1, 2]);
        assert!(read_delta(&d, "Stranger").is_none());
    }

    #[test]
    fn short_balance_arrays_yield_none() {
        let d = detail(vec![5_000_000_000], vec![3_999_995_000]);
        assert!(read_delta(&d, "Fresh").is_none());
    }
}
