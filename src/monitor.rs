// src/monitor.rs
//! The sequential polling core: warm-up, cursor tracking, batch processing,
//! window evaluation, alert dispatch, reset. One cycle performs all of its
//! reads before any state mutation, so each cycle mutates against a
//! self-consistent view; the loop in [`run`] is the only caller.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::alert::{render_alert, AlertContext, AlertSink};
use crate::balance::read_delta;
use crate::config::Config;
use crate::db;
use crate::error::MonitorError;
use crate::extractor::extract_outgoing_transfers;
use crate::models::{OutflowRecord, PersistentState, TransferEvent};
use crate::rpc::{LedgerRpc, SignatureInfo, TransactionDetail};
use crate::window::{evaluate, push_outflow};

/// What one cycle did, for logging and assertions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub warmed_up: bool,
    pub signatures_seen: usize,
    pub outflows_recorded: usize,
    pub triggered: bool,
}

/// One poll/extract/classify/evaluate pass over `state`.
///
/// Transient fetch errors abort the pass before any mutation; the caller
/// retries on the next interval with the cursor unmoved, so nothing is lost.
pub async fn run_cycle<R, A>(
    rpc: &R,
    sink: &A,
    cfg: &Config,
    state: &mut PersistentState,
    now: DateTime<Utc>,
) -> Result<CycleReport, MonitorError>
where
    R: LedgerRpc + ?Sized,
    A: AlertSink + ?Sized,
{
    let mut report = CycleReport::default();
    let classifier = cfg.classifier();

    // Warm-up: anchor to the newest existing signature so pre-existing
    // history is never evaluated. An account with no history stays
    // unanchored and retries next cycle.
    let Some(anchor) = state.anchor.clone() else {
        let newest = rpc
            .signatures_for_address(&cfg.watch_address, None, 1)
            .await?;
        if let Some(head) = newest.first() {
            info!(anchor = %head.signature, "warm-up: anchored to newest signature");
            state.anchor = Some(head.signature.clone());
            state.window.clear();
        } else {
            debug!("warm-up: account has no history yet");
        }
        report.warmed_up = true;
        return Ok(report);
    };

    // Read phase: list strictly-newer signatures, then fetch every detail
    // before touching the window or the cursor.
    let batch = rpc
        .signatures_for_address(&cfg.watch_address, Some(&anchor), cfg.fetch_limit)
        .await?;
    report.signatures_seen = batch.len();

    let mut fetched: Vec<(SignatureInfo, TransactionDetail)> = Vec::new();
    for info in &batch {
        if info.err.is_some() {
            debug!(signature = %info.signature, "skipping failed transaction");
            continue;
        }
        match rpc.transaction_detail(&info.signature).await? {
            Some(detail) => {
                let meta_err = detail
                    .meta
                    .as_ref()
                    .map(|m| m.err.is_some())
                    .unwrap_or(false);
                if meta_err {
                    debug!(signature = %info.signature, "skipping transaction with meta error");
                    continue;
                }
                fetched.push((info.clone(), detail));
            }
            None => debug!(signature = %info.signature, "detail not available, skipping"),
        }
    }

    // Mutation phase, oldest to newest so window order is chronological.
    for (info, detail) in fetched.iter().rev() {
        let events = extract_outgoing_transfers(detail, &info.signature, &cfg.watch_address);
        if events.is_empty() {
            continue;
        }
        let Some(record) = select_record(&events, detail, cfg, info, now) else {
            continue;
        };
        debug!(
            signature = %record.signature,
            lamports = record.lamports,
            destination = %record.destination,
            "recorded outflow"
        );
        push_outflow(state, record, cfg.window_capacity);
        report.outflows_recorded += 1;
    }

    // Advance regardless of what classified; the next poll starts here.
    if let Some(newest) = batch.first() {
        state.anchor = Some(newest.signature.clone());
    }

    // Evaluation phase: only a full window produces a verdict.
    if let Some(verdict) = evaluate(&state.window, &classifier, cfg.window_capacity) {
        if verdict.match_count >= cfg.match_threshold {
            if state.last_alert_key.as_deref() == Some(verdict.key.as_str()) {
                debug!(key = %verdict.key, "alert already dispatched for this window");
            } else {
                let text = render_alert(&AlertContext {
                    watched: &cfg.watch_address,
                    window: &state.window,
                    verdict: &verdict,
                    min_sol: cfg.min_sol,
                    max_sol: cfg.max_sol,
                    threshold: cfg.match_threshold,
                    preview_limit: cfg.preview_limit,
                });
                info!(
                    matches = verdict.match_count,
                    threshold = cfg.match_threshold,
                    "window crossed threshold, dispatching alert"
                );
                if let Err(e) = sink.deliver(&text).await {
                    // The key is marked sent anyway so a flaky webhook
                    // cannot cause a repeated-failure storm.
                    warn!("alert delivery failed (not retried): {e}");
                }
                state.last_alert_key = Some(verdict.key);
                state.window.clear();
                report.triggered = true;
            }
        }
    }

    Ok(report)
}

/// Apply the fresh-destination gate and the one-record-per-transaction cap:
/// the first eligible event becomes the transaction's single record.
fn select_record(
    events: &[TransferEvent],
    detail: &TransactionDetail,
    cfg: &Config,
    info: &SignatureInfo,
    now: DateTime<Utc>,
) -> Option<OutflowRecord> {
    let observed_at = info
        .block_time
        .or(detail.block_time)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .unwrap_or(now);

    if !cfg.fresh_destination_gate {
        let first = events.first()?;
        return Some(OutflowRecord {
            signature: first.signature.clone(),
            destination: first.destination.clone(),
            lamports: first.lamports,
            observed_at,
        });
    }

    // Gate on: the destination must have held nothing before this
    // transaction, and its post-balance (what the wallet actually holds)
    // is the classified amount.
    events.iter().find_map(|event| {
        let delta = read_delta(detail, &event.destination)?;
        if delta.pre != 0 || delta.post == 0 {
            return None;
        }
        Some(OutflowRecord {
            signature: event.signature.clone(),
            destination: event.destination.clone(),
            lamports: delta.post,
            observed_at,
        })
    })
}

/// Continuous sequential polling loop. Errors are logged here, at the single
/// boundary, and the loop proceeds on the next interval; state is written
/// back best-effort after every cycle.
pub async fn run<R, A>(
    cfg: Config,
    mut conn: Connection,
    rpc: R,
    sink: A,
) -> eyre::Result<()>
where
    R: LedgerRpc,
    A: AlertSink,
{
    let mut state = db::load_state_or_default(&conn);
    info!(
        anchor = ?state.anchor,
        window_len = state.window.len(),
        "monitor started"
    );

    loop {
        let now = Utc::now();
        match run_cycle(&rpc, &sink, &cfg, &mut state, now).await {
            Ok(report) => {
                debug!(
                    signatures = report.signatures_seen,
                    outflows = report.outflows_recorded,
                    triggered = report.triggered,
                    "cycle complete"
                );
            }
            Err(e) => warn!("cycle failed, retrying next interval: {e}"),
        }

        if let Err(e) = db::save_state(&mut conn, &state) {
            warn!("state save failed, in-memory state runs ahead: {e}");
        }

        sleep(cfg.poll_interval).await;
    }
}
