use crate::abi::{decode_withdraw_gas_fee, encode_withdraw_gas_fee_call};
use crate::compiler::GasFeeSource;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{TransactionInput, TransactionReceipt, TransactionRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Read-only JSON-RPC access to one chain.
#[derive(Clone)]
pub struct RpcClient {
    pub url: String,
    pub provider: RootProvider,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid rpc url {url}"))?;
        Ok(Self {
            url: url.to_string(),
            provider: RootProvider::new_http(parsed),
        })
    }
}

pub async fn eth_call(client: &RpcClient, to: Address, data: Bytes) -> Result<Bytes> {
    let request = TransactionRequest {
        to: Some(to.into()),
        input: TransactionInput::new(data),
        ..Default::default()
    };
    let result = client
        .provider
        .call(request)
        .await
        .with_context(|| format!("eth_call to {to:#x} failed"))?;
    Ok(result)
}

pub async fn get_transaction_receipt(
    client: &RpcClient,
    tx_hash: B256,
) -> Result<Option<TransactionReceipt>> {
    Ok(client.provider.get_transaction_receipt(tx_hash).await?)
}

#[async_trait]
impl GasFeeSource for RpcClient {
    async fn withdraw_gas_fee(&self, zrc20: Address) -> Result<(Address, U256)> {
        tracing::debug!(%zrc20, rpc = %self.url, "reading withdrawGasFee");
        let output = eth_call(self, zrc20, encode_withdraw_gas_fee_call()).await?;
        decode_withdraw_gas_fee(output).context("unexpected withdrawGasFee return data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_sol_types::SolValue;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Answers every JSON-RPC request with a fixed result, echoing the request id.
    struct JsonRpcResult(Value);

    impl Respond for JsonRpcResult {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
            let id = body.get("id").cloned().unwrap_or(json!(0));
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": self.0,
            }))
        }
    }

    #[tokio::test]
    async fn reads_withdraw_gas_fee_through_eth_call() {
        let server = MockServer::start().await;
        let gas_token = address!("00000000000000000000000000000000000000ee");
        let encoded = (gas_token, U256::from(21_000u64)).abi_encode_params();
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_call"})))
            .respond_with(JsonRpcResult(json!(format!("0x{}", hex::encode(encoded)))))
            .expect(1)
            .mount(&server)
            .await;

        let client = RpcClient::new(&server.uri()).unwrap();
        let zrc20 = address!("d97b1de3619ed2c6beb3860147e30ca8a7dc9891");
        let (token, fee) = client.withdraw_gas_fee(zrc20).await.unwrap();
        assert_eq!(token, gas_token);
        assert_eq!(fee, U256::from(21_000u64));
    }

    #[tokio::test]
    async fn surfaces_short_return_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(JsonRpcResult(json!("0x")))
            .mount(&server)
            .await;

        let client = RpcClient::new(&server.uri()).unwrap();
        let zrc20 = address!("d97b1de3619ed2c6beb3860147e30ca8a7dc9891");
        assert!(client.withdraw_gas_fee(zrc20).await.is_err());
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(RpcClient::new("not a url").is_err());
    }
}
