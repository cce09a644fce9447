use crate::cli::TrackArgs;
use crate::config::Config;
use crate::tracker::Tracker;
use crate::types::parse_b256;
use anyhow::Result;
use std::time::Duration;

pub async fn run(args: TrackArgs, config: Config) -> Result<()> {
    let hash = parse_b256(&args.hash)?;
    let tracker = Tracker::from_settings(&config.tracker_settings())?;
    let result = tracker
        .track(&format!("{hash:#x}"), Duration::from_secs(args.timeout_secs))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("status: {}", result.status);
    if let Some(details) = &result.details {
        for cctx in &details.cctxs {
            println!(
                "  cctx {} {}",
                cctx.index().unwrap_or("<unknown>"),
                cctx.status().unwrap_or("<no status>")
            );
        }
    }
    Ok(())
}
