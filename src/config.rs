// src/config.rs
use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use eyre::{bail, eyre, Result, WrapErr};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use crate::classifier::{Classifier, ScalePolicy, LAMPORTS_PER_SOL};

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_http_url: String,
    /// The single watched account, required.
    pub watch_address: String,
    /// Alert webhook endpoint, required.
    pub webhook_url: String,
    pub db_path: String,
    /// Classification range in SOL, inclusive on both ends.
    pub min_sol: Decimal,
    pub max_sol: Decimal,
    pub min_lamports: u64,
    pub max_lamports: u64,
    pub window_capacity: usize,
    pub match_threshold: usize,
    pub fetch_limit: usize,
    pub preview_limit: usize,
    pub poll_interval: Duration,
    pub scale_policy: ScalePolicy,
    pub fresh_destination_gate: bool,
}

impl Config {
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.min_lamports, self.max_lamports, self.scale_policy)
    }
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // load from .env when present

    let rpc_http_url = env::var("RPC_HTTP_URL")
        .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string());

    // Required: there is nothing sensible to monitor or notify without these.
    let watch_address =
        env::var("WATCH_ADDRESS").map_err(|_| eyre!("WATCH_ADDRESS must be set"))?;
    let webhook_url =
        env::var("ALERT_WEBHOOK_URL").map_err(|_| eyre!("ALERT_WEBHOOK_URL must be set"))?;

    let db_path = env::var("DATABASE_URL").unwrap_or_else(|_| "outflow_monitor.db".to_string());

    let min_sol: Decimal = env::var("MIN_AMOUNT_SOL")
        .unwrap_or_else(|_| "0.1".to_string())
        .parse()
        .wrap_err("MIN_AMOUNT_SOL is not a valid decimal")?;
    let max_sol: Decimal = env::var("MAX_AMOUNT_SOL")
        .unwrap_or_else(|_| "20".to_string())
        .parse()
        .wrap_err("MAX_AMOUNT_SOL is not a valid decimal")?;
    if min_sol > max_sol {
        bail!("MIN_AMOUNT_SOL ({min_sol}) exceeds MAX_AMOUNT_SOL ({max_sol})");
    }

    let window_capacity: usize = env::var("WINDOW_CAPACITY")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);
    let match_threshold: usize = env::var("MATCH_THRESHOLD")
        .unwrap_or_else(|_| "7".to_string())
        .parse()
        .unwrap_or(7);
    if window_capacity == 0 {
        bail!("WINDOW_CAPACITY must be at least 1");
    }
    if match_threshold > window_capacity {
        bail!(
            "MATCH_THRESHOLD ({match_threshold}) can never be reached with \
             WINDOW_CAPACITY ({window_capacity})"
        );
    }

    let fetch_limit: usize = env::var("SIGNATURE_FETCH_LIMIT")
        .unwrap_or_else(|_| "25".to_string())
        .parse()
        .unwrap_or(25);
    let preview_limit: usize = env::var("PREVIEW_LIMIT")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);
    let poll_interval_secs: u64 = env::var("POLL_INTERVAL_SECS")
        .unwrap_or_else(|_| "30".to_string())
        .parse()
        .unwrap_or(30);

    let scale_policy = parse_scale_policy(
        &env::var("DIGIT_SCALE_POLICY").unwrap_or_else(|_| "truncate".to_string()),
    )?;
    let fresh_destination_gate = env::var("FRESH_DESTINATION_GATE")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let cfg = Config {
        rpc_http_url,
        watch_address,
        webhook_url,
        db_path,
        min_sol,
        max_sol,
        min_lamports: sol_to_lamports(min_sol)?,
        max_lamports: sol_to_lamports(max_sol)?,
        window_capacity,
        match_threshold,
        fetch_limit,
        preview_limit,
        poll_interval: Duration::from_secs(poll_interval_secs.max(1)),
        scale_policy,
        fresh_destination_gate,
    };

    info!(
        watch_address = %cfg.watch_address,
        range = %format!("[{}, {}] SOL", cfg.min_sol, cfg.max_sol),
        capacity = cfg.window_capacity,
        threshold = cfg.match_threshold,
        "loaded config"
    );

    Ok(cfg)
}

fn parse_scale_policy(value: &str) -> Result<ScalePolicy> {
    match value.to_lowercase().as_str() {
        "truncate" => Ok(ScalePolicy::Truncate),
        "exact" => Ok(ScalePolicy::Exact),
        other => bail!("DIGIT_SCALE_POLICY must be 'truncate' or 'exact', got '{other}'"),
    }
}

fn sol_to_lamports(sol: Decimal) -> Result<u64> {
    (sol * Decimal::from(LAMPORTS_PER_SOL))
        .trunc()
        .to_u64()
        .ok_or_else(|| eyre!("amount {sol} SOL does not fit in lamports"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_sol_to_lamports() {
        assert_eq!(sol_to_lamports("0.1".parse().unwrap()).unwrap(), 100_000_000);
        assert_eq!(
            sol_to_lamports("20".parse().unwrap()).unwrap(),
            20_000_000_000
        );
        assert_eq!(
            sol_to_lamports("1.2345".parse().unwrap()).unwrap(),
            1_234_500_000
        );
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(sol_to_lamports("-1".parse().unwrap()).is_err());
    }

    #[test]
    fn parses_scale_policies() {
        assert_eq!(parse_scale_policy("truncate").unwrap(), ScalePolicy::Truncate);
        assert_eq!(parse_scale_policy("EXACT").unwrap(), ScalePolicy::Exact);
        assert!(parse_scale_policy("round").is_err());
    }
}
