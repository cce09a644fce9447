//! Static contract address tables for ZetaChain Athens testnet and the
//! connected chains it bridges to.

use crate::error::CompileError;
use crate::types::Chain;
use alloy_primitives::{address, Address};
use serde::Serialize;

pub const ZETA_TESTNET_CHAIN_ID: u64 = 7001;
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
pub const BSC_TESTNET_CHAIN_ID: u64 = 97;

pub const ZETA_GATEWAY: Address = address!("6c533f7fe93fae114d0954697069df33c9b74fd7");
pub const ZETA_UNISWAP_V2_ROUTER: Address = address!("2ca7d64a7efe2d62a725e2b35cf7230d6677ffee");
pub const SEPOLIA_GATEWAY: Address = address!("0c487a766110c85d301d96e33579c5b317fa4995");
pub const BSC_TESTNET_GATEWAY: Address = address!("0c487a766110c85d301d96e33579c5b317fa4995");

/// Fixed gas budget forwarded to the revert callback of gateway calls.
pub const REVERT_GAS_LIMIT: u64 = 200_000;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct ChainInfo {
    pub chain: Chain,
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub native: NativeCurrency,
    /// Gateway contract: the deposit entry on connected chains, withdraw exit on ZetaChain.
    pub gateway: Address,
    pub router: Option<Address>,
}

#[derive(Debug, Clone, Copy)]
pub struct Zrc20Token {
    pub symbol: &'static str,
    pub label: &'static str,
    pub aliases: &'static [&'static str],
    pub address: Address,
    pub decimals: u8,
    /// Chain whose native asset this token represents on ZetaChain.
    pub origin: Chain,
}

pub const CHAINS: [ChainInfo; 3] = [
    ChainInfo {
        chain: Chain::Eth,
        chain_id: SEPOLIA_CHAIN_ID,
        name: "Sepolia Testnet",
        rpc_url: "https://rpc.sepolia.org",
        explorer_url: "https://sepolia.etherscan.io",
        native: NativeCurrency {
            name: "Sepolia ETH",
            symbol: "ETH",
            decimals: 18,
        },
        gateway: SEPOLIA_GATEWAY,
        router: None,
    },
    ChainInfo {
        chain: Chain::Bsc,
        chain_id: BSC_TESTNET_CHAIN_ID,
        name: "BSC Testnet",
        rpc_url: "https://data-seed-prebsc-1-s1.binance.org:8545",
        explorer_url: "https://testnet.bscscan.com",
        native: NativeCurrency {
            name: "tBNB",
            symbol: "BNB",
            decimals: 18,
        },
        gateway: BSC_TESTNET_GATEWAY,
        router: None,
    },
    ChainInfo {
        chain: Chain::ZetaChain,
        chain_id: ZETA_TESTNET_CHAIN_ID,
        name: "ZetaChain Athens Testnet",
        rpc_url: "https://zetachain-athens-evm.blockpi.network/v1/rpc/public",
        explorer_url: "https://athens.explorer.zetachain.com",
        native: NativeCurrency {
            name: "ZETA",
            symbol: "ZETA",
            decimals: 18,
        },
        gateway: ZETA_GATEWAY,
        router: Some(ZETA_UNISWAP_V2_ROUTER),
    },
];

pub const ZRC20_TOKENS: [Zrc20Token; 2] = [
    Zrc20Token {
        symbol: "ETH.ETHSEP",
        label: "ZRC20-ETH",
        aliases: &["ETH", "sETH"],
        address: address!("05ba149a7bd6dc1f937fa9046a9e05c05f3b18b0"),
        decimals: 18,
        origin: Chain::Eth,
    },
    Zrc20Token {
        symbol: "BNB.BSC",
        label: "ZRC20-BNB",
        aliases: &["BNB", "tBNB"],
        address: address!("d97b1de3619ed2c6beb3860147e30ca8a7dc9891"),
        decimals: 18,
        origin: Chain::Bsc,
    },
];

pub fn chain_info(chain: Chain) -> Result<&'static ChainInfo, CompileError> {
    CHAINS
        .iter()
        .find(|info| info.chain == chain)
        .ok_or(CompileError::UnsupportedChain { chain })
}

pub fn chain_id_for(chain: Chain) -> Result<u64, CompileError> {
    chain_info(chain).map(|info| info.chain_id)
}

pub fn chain_by_id(chain_id: u64) -> Option<&'static ChainInfo> {
    CHAINS.iter().find(|info| info.chain_id == chain_id)
}

pub fn zrc20_by_symbol(symbol: &str) -> Option<&'static Zrc20Token> {
    let symbol = symbol.trim();
    ZRC20_TOKENS.iter().find(|token| {
        token.symbol.eq_ignore_ascii_case(symbol)
            || token.label.eq_ignore_ascii_case(symbol)
            || token
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(symbol))
    })
}

pub fn zrc20_by_address(address: Address) -> Option<&'static Zrc20Token> {
    ZRC20_TOKENS.iter().find(|token| token.address == address)
}

/// Parameters for `wallet_addEthereumChain`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

impl ChainInfo {
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn add_chain_params(&self, rpc_url: Option<&str>) -> AddChainParams {
        AddChainParams {
            chain_id: self.hex_chain_id(),
            chain_name: self.name.to_string(),
            rpc_urls: vec![rpc_url.unwrap_or(self.rpc_url).to_string()],
            block_explorer_urls: vec![self.explorer_url.to_string()],
            native_currency: self.native,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_resolve() {
        assert_eq!(chain_id_for(Chain::Eth).unwrap(), SEPOLIA_CHAIN_ID);
        assert_eq!(chain_id_for(Chain::Bsc).unwrap(), BSC_TESTNET_CHAIN_ID);
        assert_eq!(chain_id_for(Chain::ZetaChain).unwrap(), ZETA_TESTNET_CHAIN_ID);
    }

    #[test]
    fn solana_has_no_mapping() {
        let err = chain_id_for(Chain::Solana).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnsupportedChain {
                chain: Chain::Solana
            }
        ));
    }

    #[test]
    fn zrc20_lookup_accepts_aliases() {
        let eth = zrc20_by_symbol("zrc20-eth").unwrap();
        assert_eq!(eth.symbol, "ETH.ETHSEP");
        assert_eq!(eth.origin, Chain::Eth);
        assert_eq!(zrc20_by_symbol("BNB.BSC").unwrap().origin, Chain::Bsc);
        assert!(zrc20_by_symbol("USDC").is_none());
        assert_eq!(zrc20_by_address(eth.address).unwrap().symbol, "ETH.ETHSEP");
    }

    #[test]
    fn add_chain_params_use_hex_ids() {
        let info = chain_info(Chain::Eth).unwrap();
        let params = info.add_chain_params(None);
        assert_eq!(params.chain_id, "0xaa36a7");
        assert_eq!(chain_info(Chain::Bsc).unwrap().hex_chain_id(), "0x61");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["nativeCurrency"]["symbol"], "ETH");
        assert_eq!(json["rpcUrls"][0], "https://rpc.sepolia.org");
    }
}
