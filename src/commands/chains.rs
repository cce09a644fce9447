use crate::cli::ChainsArgs;
use crate::config::Config;
use crate::registry::{CHAINS, ZRC20_TOKENS};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainListItem {
    tag: String,
    chain_id: u64,
    name: String,
    rpc: String,
    gateway: String,
    router: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenListItem {
    symbol: String,
    label: String,
    address: String,
    decimals: u8,
    origin: String,
}

#[derive(Debug, Serialize)]
struct ChainsOutput {
    chains: Vec<ChainListItem>,
    tokens: Vec<TokenListItem>,
}

/// List registered chains with their effective RPC URLs, plus ZRC20 tokens.
pub async fn run(args: ChainsArgs, config: Config) -> Result<()> {
    let chains = CHAINS
        .iter()
        .map(|info| ChainListItem {
            tag: info.chain.tag().to_string(),
            chain_id: info.chain_id,
            name: info.name.to_string(),
            rpc: redact_url(&config.rpc_for(info)),
            gateway: format!("{:#x}", info.gateway),
            router: info.router.map(|router| format!("{router:#x}")),
        })
        .collect();
    let tokens = ZRC20_TOKENS
        .iter()
        .map(|token| TokenListItem {
            symbol: token.symbol.to_string(),
            label: token.label.to_string(),
            address: format!("{:#x}", token.address),
            decimals: token.decimals,
            origin: token.origin.tag().to_string(),
        })
        .collect();
    let output = ChainsOutput { chains, tokens };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{:<10} {:<9} {:<44} {}", "chain", "chainId", "gateway", "rpc");
    for item in &output.chains {
        println!(
            "{:<10} {:<9} {:<44} {}",
            item.tag, item.chain_id, item.gateway, item.rpc
        );
        if let Some(router) = &item.router {
            println!("{:<10} {:<9} router {router}", "", "");
        }
    }
    println!();
    println!("{:<11} {:<10} {:<44} {}", "zrc20", "origin", "address", "decimals");
    for token in &output.tokens {
        println!(
            "{:<11} {:<10} {:<44} {}",
            token.label, token.origin, token.address, token.decimals
        );
    }
    Ok(())
}

/// Redact credentials from a URL string for display.
fn redact_url(value: &str) -> String {
    match url::Url::parse(value) {
        Ok(mut parsed) => {
            if !parsed.username().is_empty() {
                let _ = parsed.set_username("REDACTED");
            }
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => value.to_string(),
    }
}
