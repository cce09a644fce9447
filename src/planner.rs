use crate::compiler::{compile_step, CompileContext, GasFeeSource};
use crate::error::CompileError;
use crate::registry::zrc20_by_symbol;
use crate::types::{Chain, StepAction, StepKind, StrategyStep, UnsignedTransaction};
use alloy_primitives::Address;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Which withdraw steps get folded into which batched swap.
///
/// Built once from the whole step list before any transaction is emitted, so
/// compiling a step never depends on what an earlier step did at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FusionPlan {
    fused: BTreeMap<String, String>,
    consumed: BTreeSet<String>,
}

impl FusionPlan {
    pub fn build(
        steps: &[StrategyStep],
        batch_executor: Option<Address>,
    ) -> Result<Self, CompileError> {
        let mut plan = Self::default();
        if batch_executor.is_none() {
            return Ok(plan);
        }

        for (index, step) in steps.iter().enumerate() {
            if step.kind != StepKind::Swap || step.from_chain != Chain::ZetaChain {
                continue;
            }
            let StepAction::Swap { to_asset, .. } = step.action()? else {
                continue;
            };
            // Unknown output tokens fail later, during emission.
            let Some(output) = zrc20_by_symbol(&to_asset) else {
                continue;
            };
            let partner = steps[index + 1..].iter().find(|candidate| {
                candidate.kind == StepKind::Withdraw
                    && candidate.from_chain == Chain::ZetaChain
                    && candidate.to_chain == output.origin
                    && !plan.consumed.contains(&candidate.id)
            });
            if let Some(withdraw) = partner {
                plan.fused.insert(step.id.clone(), withdraw.id.clone());
                plan.consumed.insert(withdraw.id.clone());
            }
        }
        Ok(plan)
    }

    pub fn fused_withdraw(&self, swap_id: &str) -> Option<&str> {
        self.fused.get(swap_id).map(String::as_str)
    }

    pub fn is_consumed(&self, step_id: &str) -> bool {
        self.consumed.contains(step_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub batch_executor: Option<Address>,
    pub now: u64,
    /// Record unsupported steps as skipped instead of failing the plan.
    pub allow_unsupported: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedStep {
    pub step_id: String,
    pub kind: StepKind,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPlan {
    pub transactions: Vec<UnsignedTransaction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedStep>,
}

/// Compile the full step list into an ordered transaction list.
///
/// Emission follows input step order; fused withdraw steps emit nothing.
/// Any error aborts the whole pass.
pub async fn build_plan(
    steps: &[StrategyStep],
    sender: Address,
    options: PlanOptions,
    gas: &dyn GasFeeSource,
) -> Result<CompiledPlan, CompileError> {
    check_unique_ids(steps)?;
    let fusion = FusionPlan::build(steps, options.batch_executor)?;
    let ctx = CompileContext {
        sender,
        batch_executor: options.batch_executor,
        now: options.now,
    };

    let mut transactions = Vec::new();
    let mut skipped = Vec::new();
    for step in steps {
        match compile_step(step, &fusion, &ctx, gas).await {
            Ok(txs) => {
                tracing::debug!(step = %step.id, kind = %step.kind, count = txs.len(), "compiled step");
                transactions.extend(txs);
            }
            Err(CompileError::UnsupportedStep { reason, .. }) if options.allow_unsupported => {
                tracing::warn!(step = %step.id, kind = %step.kind, %reason, "skipping unsupported step");
                skipped.push(SkippedStep {
                    step_id: step.id.clone(),
                    kind: step.kind,
                    reason,
                });
            }
            Err(err) => return Err(err),
        }
    }

    tracing::info!(
        steps = steps.len(),
        transactions = transactions.len(),
        skipped = skipped.len(),
        "plan compiled"
    );
    Ok(CompiledPlan {
        transactions,
        skipped,
    })
}

fn check_unique_ids(steps: &[StrategyStep]) -> Result<(), CompileError> {
    let mut seen = BTreeSet::new();
    for step in steps {
        if !seen.insert(step.id.as_str()) {
            return Err(CompileError::MalformedStep {
                step_id: step.id.clone(),
                reason: "duplicate step id".to_string(),
            });
        }
    }
    Ok(())
}
