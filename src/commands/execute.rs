use crate::cli::ExecuteArgs;
use crate::commands::plan::{compile, load_steps, resolve_batch_executor, unix_now};
use crate::config::Config;
use crate::executor::{execute_plan, ExecutionReport, RunOutcome};
use crate::history::{ExecutionLog, JsonFileLog, MemoryLog};
use crate::planner::PlanOptions;
use crate::registry::ZETA_TESTNET_CHAIN_ID;
use crate::tracker::Tracker;
use crate::types::parse_address;
use crate::wallet::{load_signer, LocalWallet, SignerOptions};
use anyhow::{anyhow, Result};
use std::time::Duration;

pub async fn run(args: ExecuteArgs, config: Config) -> Result<()> {
    let signer = load_signer(
        SignerOptions {
            private_key: args.private_key.as_deref(),
            private_key_env: args.private_key_env.as_deref(),
        },
        &config,
    )?
    .ok_or_else(|| {
        anyhow!(
            "no signer configured (set --private-key or {})",
            args.private_key_env
                .clone()
                .unwrap_or_else(|| config.signer_env())
        )
    })?;
    let wallet = LocalWallet::new(signer, config.chain_rpcs(), ZETA_TESTNET_CHAIN_ID);
    let sender = wallet.address();
    if let Some(expected) = args.address.as_deref() {
        if parse_address(expected)? != sender {
            anyhow::bail!("--address {expected} does not match the signer {sender:#x}");
        }
    }

    let steps = load_steps(&args.steps)?;
    let plan_options = PlanOptions {
        batch_executor: resolve_batch_executor(args.batch_executor.as_deref(), &config)?,
        now: unix_now(),
        allow_unsupported: args.allow_unsupported || config.allow_unsupported(),
    };
    let plan = compile(&steps, sender, plan_options, &config).await?;
    tracing::info!(
        transactions = plan.transactions.len(),
        skipped = plan.skipped.len(),
        "plan ready"
    );

    let tracker = Tracker::from_settings(&config.tracker_settings())?;
    let mut options = config.executor_options();
    if let Some(secs) = args.bridge_timeout_secs {
        options.bridge_timeout = Duration::from_secs(secs);
    }

    let mut log: Box<dyn ExecutionLog> = if args.no_history {
        Box::new(MemoryLog::default())
    } else {
        Box::new(JsonFileLog::open(&config.history_path())?)
    };
    let report = execute_plan(
        &plan.transactions,
        &wallet,
        &tracker,
        log.as_mut(),
        &options,
    )
    .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &ExecutionReport) {
    let outcome = match report.outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Incomplete => "incomplete",
    };
    println!("run {}: {outcome}", report.run_id);
    if report.resumed > 0 {
        println!("  {} transaction(s) settled by earlier runs", report.resumed);
    }
    for record in &report.records {
        println!(
            "  {:<9} {:#x} {}",
            record.status, record.hash, record.description
        );
    }
    if report.outcome == RunOutcome::Incomplete {
        println!("run incomplete; re-run the same command to resume");
    }
}
