//! Sequential execution of a compiled plan through a wallet, with a persisted
//! log so that an interrupted run can be resumed without resubmitting.

use crate::error::{ExecutionError, SignerError};
use crate::history::{now_millis, ExecutionLog, ExecutionRecord, TxStatus};
use crate::registry::chain_by_id;
use crate::tracker::{BridgeTracker, CctxStatus};
use crate::types::{parse_address, UnsignedTransaction};
use crate::wallet::{TxParams, WalletProvider};
use alloy_primitives::{Address, B256};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_RECEIPT_POLL: Duration = Duration::from_secs(1);
pub const DEFAULT_RECEIPT_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub bridge_timeout: Duration,
    pub receipt_poll: Duration,
    pub receipt_attempts: u32,
    /// RPC URLs advertised when a chain has to be added to the wallet.
    pub chain_rpcs: BTreeMap<u64, String>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            bridge_timeout: DEFAULT_BRIDGE_TIMEOUT,
            receipt_poll: DEFAULT_RECEIPT_POLL,
            receipt_attempts: DEFAULT_RECEIPT_ATTEMPTS,
            chain_rpcs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    /// Stopped on a transaction that is still being confirmed; run again to resume.
    Incomplete,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    /// Records created or updated by this run.
    pub records: Vec<ExecutionRecord>,
    /// Transactions settled by an earlier run.
    pub resumed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Advanced,
    Stalled,
}

pub async fn execute_plan(
    plan: &[UnsignedTransaction],
    wallet: &dyn WalletProvider,
    tracker: &dyn BridgeTracker,
    log: &mut dyn ExecutionLog,
    options: &ExecutorOptions,
) -> Result<ExecutionReport, ExecutionError> {
    if plan.is_empty() {
        return Err(ExecutionError::EmptyPlan);
    }
    let mut executor = Executor::new(wallet, tracker, log, options);
    tracing::info!(run_id = %executor.run_id, transactions = plan.len(), "starting execution");

    for (index, tx) in plan.iter().enumerate() {
        let progress = match executor.claim_previous(tx) {
            Some(record) => executor.resume(index, tx, record).await?,
            None => executor.submit(index, tx).await?,
        };
        if progress == Progress::Stalled {
            tracing::warn!(index, description = %tx.description, "execution paused; resume later");
            return Ok(executor.report(RunOutcome::Incomplete));
        }
    }

    tracing::info!(run_id = %executor.run_id, "execution completed");
    Ok(executor.report(RunOutcome::Completed))
}

struct Executor<'a> {
    wallet: &'a dyn WalletProvider,
    tracker: &'a dyn BridgeTracker,
    log: &'a mut dyn ExecutionLog,
    options: &'a ExecutorOptions,
    run_id: String,
    /// Log records already matched to a transaction of this plan.
    claimed: HashSet<String>,
    touched: Vec<ExecutionRecord>,
    resumed: usize,
}

impl<'a> Executor<'a> {
    fn new(
        wallet: &'a dyn WalletProvider,
        tracker: &'a dyn BridgeTracker,
        log: &'a mut dyn ExecutionLog,
        options: &'a ExecutorOptions,
    ) -> Self {
        let existing: HashSet<String> = log.records().into_iter().map(|r| r.run_id).collect();
        let mut millis = now_millis();
        while existing.contains(&millis.to_string()) {
            millis += 1;
        }
        Self {
            wallet,
            tracker,
            log,
            options,
            run_id: millis.to_string(),
            claimed: HashSet::new(),
            touched: Vec::new(),
            resumed: 0,
        }
    }

    /// Best unclaimed earlier record for the same description, chain and target.
    /// Completed records win over pending ones; failed records never match.
    fn claim_previous(&mut self, tx: &UnsignedTransaction) -> Option<ExecutionRecord> {
        let record = self
            .log
            .records()
            .into_iter()
            .filter(|r| {
                r.description == tx.description
                    && r.chain_id == tx.chain_id
                    && r.to == tx.to
                    && r.status != TxStatus::Failed
                    && !self.claimed.contains(&r.id)
            })
            .min_by_key(|r| (r.status != TxStatus::Completed, r.timestamp))?;
        self.claimed.insert(record.id.clone());
        Some(record)
    }

    async fn resume(
        &mut self,
        index: usize,
        tx: &UnsignedTransaction,
        record: ExecutionRecord,
    ) -> Result<Progress, ExecutionError> {
        match record.status {
            TxStatus::Completed => {
                tracing::info!(index, description = %tx.description, "already completed, skipping");
                self.resumed += 1;
                Ok(Progress::Advanced)
            }
            TxStatus::Failed => self.submit(index, tx).await,
            TxStatus::Pending => {
                tracing::info!(index, hash = %record.hash, "re-checking pending transaction");
                self.ensure_chain(tx.chain_id).await?;
                let in_flight = || ExecutionError::InFlight {
                    description: tx.description.clone(),
                    chain_id: tx.chain_id,
                };
                match self.wallet.transaction_receipt(record.hash).await? {
                    None => Err(in_flight()),
                    Some(false) => {
                        let hash = record.hash;
                        self.mark(record, TxStatus::Failed)?;
                        Err(ExecutionError::TransactionReverted {
                            hash,
                            description: tx.description.clone(),
                        })
                    }
                    Some(true) if !tx.is_bridge_leg() => {
                        self.mark(record, TxStatus::Completed)?;
                        self.resumed += 1;
                        Ok(Progress::Advanced)
                    }
                    Some(true) => match self.settle_bridge(record).await? {
                        Progress::Advanced => {
                            self.resumed += 1;
                            Ok(Progress::Advanced)
                        }
                        Progress::Stalled => Err(in_flight()),
                    },
                }
            }
        }
    }

    async fn submit(
        &mut self,
        index: usize,
        tx: &UnsignedTransaction,
    ) -> Result<Progress, ExecutionError> {
        self.ensure_chain(tx.chain_id).await?;
        let from = self.active_account().await?;

        tracing::info!(index, chain_id = tx.chain_id, description = %tx.description, "submitting transaction");
        let hash = self
            .wallet
            .send_transaction(TxParams {
                from,
                to: tx.to,
                data: tx.data.clone(),
                value: tx.value,
            })
            .await?;
        tracing::info!(index, %hash, "transaction broadcast");

        let record = ExecutionRecord {
            id: format!("{}-{index}", self.run_id),
            run_id: self.run_id.clone(),
            hash,
            description: tx.description.clone(),
            chain_id: tx.chain_id,
            from,
            to: tx.to,
            status: TxStatus::Pending,
            timestamp: now_millis(),
        };
        self.claimed.insert(record.id.clone());
        self.save(record.clone())?;

        match self.wait_for_receipt(hash).await? {
            None => {
                tracing::warn!(%hash, attempts = self.options.receipt_attempts, "no receipt yet, leaving pending");
                Ok(Progress::Stalled)
            }
            Some(false) => {
                self.mark(record, TxStatus::Failed)?;
                Err(ExecutionError::TransactionReverted {
                    hash,
                    description: tx.description.clone(),
                })
            }
            Some(true) if !tx.is_bridge_leg() => {
                self.mark(record, TxStatus::Completed)?;
                Ok(Progress::Advanced)
            }
            Some(true) => self.settle_bridge(record).await,
        }
    }

    /// Follow a mined bridge leg on ZetaChain. A still-pending CCTX leaves the
    /// record pending.
    async fn settle_bridge(&mut self, record: ExecutionRecord) -> Result<Progress, ExecutionError> {
        let hash = record.hash;
        let result = self
            .tracker
            .track_bridge(hash, self.options.bridge_timeout)
            .await
            .map_err(|err| ExecutionError::Tracking {
                hash,
                message: format!("{err:#}"),
            })?;
        match result.status {
            CctxStatus::Completed => {
                self.mark(record, TxStatus::Completed)?;
                Ok(Progress::Advanced)
            }
            CctxStatus::Failed => {
                self.mark(record, TxStatus::Failed)?;
                Err(ExecutionError::BridgeFailed { hash })
            }
            CctxStatus::Pending => {
                tracing::warn!(%hash, "bridge still pending on ZetaChain");
                Ok(Progress::Stalled)
            }
        }
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<Option<bool>, ExecutionError> {
        for attempt in 1..=self.options.receipt_attempts {
            match self.wallet.transaction_receipt(hash).await {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) => tracing::debug!(%hash, attempt, "receipt not available yet"),
                Err(SignerError::Rpc(message)) => {
                    tracing::warn!(%hash, attempt, %message, "receipt lookup failed, retrying")
                }
                Err(err) => return Err(err.into()),
            }
            tokio::time::sleep(self.options.receipt_poll).await;
        }
        Ok(None)
    }

    async fn ensure_chain(&self, chain_id: u64) -> Result<(), ExecutionError> {
        let current = self.wallet.chain_id().await?;
        if current == chain_id {
            return Ok(());
        }
        tracing::info!(from = current, to = chain_id, "switching wallet chain");
        match self.wallet.switch_chain(chain_id).await {
            Ok(()) => Ok(()),
            Err(SignerError::UnrecognizedChain(_)) => {
                let info = chain_by_id(chain_id).ok_or_else(|| {
                    ExecutionError::SignerRejected(format!(
                        "wallet does not know chain {chain_id} and no parameters are registered for it"
                    ))
                })?;
                let rpc = self.options.chain_rpcs.get(&chain_id).map(String::as_str);
                tracing::info!(chain_id, name = info.name, "adding chain to wallet");
                self.wallet.add_chain(&info.add_chain_params(rpc)).await?;
                self.wallet.switch_chain(chain_id).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Ask the wallet every time; the authorized account may have changed.
    async fn active_account(&self) -> Result<Address, ExecutionError> {
        let account = self
            .wallet
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ExecutionError::SignerUnavailable("no authorized account".to_string()))?;
        match parse_address(&account) {
            Ok(address) if address != Address::ZERO => Ok(address),
            _ => Err(ExecutionError::InvalidAddress(account)),
        }
    }

    fn mark(&mut self, mut record: ExecutionRecord, status: TxStatus) -> Result<(), ExecutionError> {
        tracing::info!(hash = %record.hash, %status, description = %record.description, "transaction settled");
        record.status = status;
        record.timestamp = now_millis();
        self.save(record)
    }

    fn save(&mut self, record: ExecutionRecord) -> Result<(), ExecutionError> {
        self.log
            .upsert(record.clone())
            .map_err(|err| ExecutionError::History(format!("{err:#}")))?;
        match self.touched.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.touched.push(record),
        }
        Ok(())
    }

    fn report(self, outcome: RunOutcome) -> ExecutionReport {
        ExecutionReport {
            run_id: self.run_id,
            outcome,
            records: self.touched,
            resumed: self.resumed,
        }
    }
}
