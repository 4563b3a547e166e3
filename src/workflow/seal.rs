//! Sealing: publishing an approved report as the authoritative form.
//!
//! Split in two so that everything that can refuse a seal runs before the
//! terminal transition writes anything:
//!
//! 1. [`prepare`] resolves the contract and normalizes the payload (reads only).
//! 2. [`publish`] upserts the snapshot, inside the transition's transaction.

use jiff::Timestamp;

use crate::{
    model::{Identity, Report, SealedKey},
    storage::Storage,
};

use super::WorkflowError;

/// Everything needed to publish a seal, resolved up front.
#[derive(Debug, Clone)]
pub(super) struct SealPlan {
    pub key: SealedKey,

    /// Set when the contract had to be looked up and must be written back
    /// onto the report.
    pub backfill_contract: Option<i64>,

    /// The payload to publish. Always a valid document.
    pub form_data: serde_json::Value,
}

/// Resolves the contract to seal under and the payload to publish.
///
/// Uses the report's own contract when set, otherwise the project's most
/// recent contract. With neither, the seal is refused.
pub(super) fn prepare(storage: &Storage, report: &Report) -> Result<SealPlan, WorkflowError> {
    let (contract_id, backfill_contract) = match report.contract_id {
        Some(id) => (id, None),
        None => {
            let contract = storage.latest_contract(report.project_id)?.ok_or_else(|| {
                WorkflowError::Conflict(
                    "cannot seal: no contract on the report and none found for its project"
                        .to_string(),
                )
            })?;
            (contract.id, Some(contract.id))
        }
    };

    Ok(SealPlan {
        key: SealedKey {
            contract_id,
            form_date: report.report_date,
        },
        backfill_contract,
        form_data: sealable_payload(report),
    })
}

/// Upserts the approved snapshot for the plan's key.
pub(super) fn publish(
    storage: &Storage,
    plan: &SealPlan,
    approver: &Identity,
    at: Timestamp,
) -> Result<SealedKey, WorkflowError> {
    storage.upsert_snapshot(plan.key, &plan.form_data, &approver.display_name(), at)?;
    Ok(plan.key)
}

/// The report's payload as a document, or `{}` if it doesn't parse.
fn sealable_payload(report: &Report) -> serde_json::Value {
    report.form_json_parsed().unwrap_or_else(|| {
        tracing::warn!(
            report_id = report.id,
            "payload is not valid JSON; sealing an empty document"
        );
        serde_json::Value::Object(serde_json::Map::new())
    })
}
