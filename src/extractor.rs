// src/extractor.rs
//! Dual-path extraction of outgoing native transfers from one transaction.
//!
//! The primary strategy walks the `jsonParsed` instructions (top-level and
//! inner) for system-program `transfer` / `transferWithSeed` operations. When
//! the node returned no structured data, the fallback strategy decodes the
//! raw base58 instruction bytes against the two known transfer layouts and
//! resolves source/destination from the instruction's account list.

use serde_json::Value;
use tracing::debug;

use crate::error::MonitorError;
use crate::models::TransferEvent;
use crate::rpc::{Instruction, RawInstruction, TransactionDetail};

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";

/// System-program instruction tags, little-endian u32 at the front of the
/// instruction data.
const TRANSFER_TAG: u32 = 2;
const TRANSFER_WITH_SEED_TAG: u32 = 11;

/// Return every outgoing native transfer in `detail` whose source is
/// `watched`. A transaction may yield zero, one, or many events; capping to
/// one record per transaction is the caller's job. Never panics on malformed
/// input: if both strategies fail the result is empty.
pub fn extract_outgoing_transfers(
    detail: &TransactionDetail,
    signature: &str,
    watched: &str,
) -> Vec<TransferEvent> {
    match parsed_transfers(detail, watched) {
        Ok(events) => to_events(events, signature),
        Err(parse_err) => match raw_transfers(detail, watched) {
            Ok(events) => to_events(events, signature),
            Err(raw_err) => {
                debug!(
                    signature,
                    %parse_err,
                    %raw_err,
                    "both extraction paths failed, treating as non-outflow"
                );
                Vec::new()
            }
        },
    }
}

fn to_events(pairs: Vec<(String, u64)>, signature: &str) -> Vec<TransferEvent> {
    pairs
        .into_iter()
        .map(|(destination, lamports)| TransferEvent {
            destination,
            lamports,
            signature: signature.to_string(),
        })
        .collect()
}

/// Primary path over structured instructions. Fails when the message carries
/// no parsed payloads at all, which sends the caller down the raw path.
fn parsed_transfers(
    detail: &TransactionDetail,
    watched: &str,
) -> Result<Vec<(String, u64)>, MonitorError> {
    let mut parsed_seen = 0usize;
    let mut events = Vec::new();

    for instruction in all_instructions(detail) {
        let Instruction::Parsed(parsed) = instruction else {
            continue;
        };
        parsed_seen += 1;

        if parsed.program.as_deref() != Some("system") {
            continue;
        }
        let kind = parsed.parsed.get("type").and_then(Value::as_str);
        if !matches!(kind, Some("transfer") | Some("transferWithSeed")) {
            continue;
        }
        let Some(info) = parsed.parsed.get("info") else {
            continue;
        };
        let (Some(source), Some(destination)) = (
            info.get("source").and_then(Value::as_str),
            info.get("destination").and_then(Value::as_str),
        ) else {
            continue;
        };
        let lamports = info.get("lamports").and_then(Value::as_u64).unwrap_or(0);

        if source == watched && lamports > 0 {
            events.push((destination.to_string(), lamports));
        }
    }

    if parsed_seen == 0 {
        return Err(MonitorError::Decode(
            "no parsed instructions in transaction".to_string(),
        ));
    }
    Ok(events)
}

/// Fallback path over partially-decoded system instructions.
fn raw_transfers(
    detail: &TransactionDetail,
    watched: &str,
) -> Result<Vec<(String, u64)>, MonitorError> {
    let mut events = Vec::new();

    for instruction in all_instructions(detail) {
        let Instruction::Raw(raw) = instruction else {
            continue;
        };
        if raw.program_id != SYSTEM_PROGRAM_ID {
            continue;
        }
        if let Some((source, destination, lamports)) = decode_system_transfer(raw)? {
            if source == watched && lamports > 0 {
                events.push((destination.to_string(), lamports));
            }
        }
    }

    Ok(events)
}

/// Decode one raw system instruction into `(source, destination, lamports)`.
/// Non-transfer tags yield `None`; undecodable data is a hard decode error.
fn decode_system_transfer(
    raw: &RawInstruction,
) -> Result<Option<(&str, &str, u64)>, MonitorError> {
    let data = bs58::decode(&raw.data)
        .into_vec()
        .map_err(|e| MonitorError::Decode(format!("bad base58 instruction data: {e}")))?;

    // u32 tag + u64 lamports is the common prefix of both layouts.
    if data.len() < 12 {
        return Ok(None);
    }
    let tag = u32::from_le_bytes(data[0..4].try_into().unwrap_or([0; 4]));
    let lamports = u64::from_le_bytes(data[4..12].try_into().unwrap_or([0; 8]));

    // Account positions: Transfer is [source, destination];
    // TransferWithSeed is [derived source, base, destination].
    let (source_idx, dest_idx) = match tag {
        TRANSFER_TAG => (0, 1),
        TRANSFER_WITH_SEED_TAG => (0, 2),
        _ => return Ok(None),
    };

    match (raw.accounts.get(source_idx), raw.accounts.get(dest_idx)) {
        (Some(source), Some(destination)) => {
            Ok(Some((source.as_str(), destination.as_str(), lamports)))
        }
        _ => Ok(None),
    }
}

/// Top-level instructions chained with every inner-instruction group.
fn all_instructions(detail: &TransactionDetail) -> impl Iterator<Item = &Instruction> {
    let inner = detail
        .meta
        .iter()
        .flat_map(|meta| meta.inner_instructions.iter().flatten())
        .flat_map(|group| group.instructions.iter());
    detail.transaction.message.instructions.iter().chain(inner)
}
