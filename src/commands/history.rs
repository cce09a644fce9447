use crate::cli::HistoryArgs;
use crate::config::Config;
use crate::history::{ExecutionLog, JsonFileLog};
use anyhow::Result;

pub async fn run(args: HistoryArgs, config: Config) -> Result<()> {
    let log = JsonFileLog::open(&config.history_path())?;
    let records: Vec<_> = log
        .records()
        .into_iter()
        .filter(|record| args.run.as_deref().map_or(true, |run| record.run_id == run))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("no executions recorded in {}", log.path().display());
        return Ok(());
    }

    println!(
        "{:<15} {:<10} {:<9} {:<66} {}",
        "run", "chainId", "status", "hash", "description"
    );
    for record in records {
        println!(
            "{:<15} {:<10} {:<9} {:<66} {}",
            record.run_id,
            record.chain_id,
            record.status.to_string(),
            format!("{:#x}", record.hash),
            record.description
        );
    }
    Ok(())
}
