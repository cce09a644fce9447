use crate::registry::REVERT_GAS_LIMIT;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use anyhow::Result;

alloy_sol_types::sol! {
    struct RevertOptions {
        address revertAddress;
        bool callOnRevert;
        address abortAddress;
        bytes revertMessage;
        uint256 onRevertGasLimit;
    }

    // ERC20 / ZRC20
    function approve(address spender, uint256 amount) returns (bool);
    function withdrawGasFee() view returns (address, uint256);

    // GatewayEVM (connected chains)
    function deposit(address receiver, RevertOptions revertOptions) payable;

    // GatewayZEVM
    function withdraw(bytes receiver, uint256 amount, address zrc20, RevertOptions revertOptions);

    // UniswapV2Router02 on ZetaChain
    function swapExactTokensForTokens(
        uint256 amountIn,
        uint256 amountOutMin,
        address[] path,
        address to,
        uint256 deadline
    ) returns (uint256[] amounts);

    // Batch executor
    function swapAndWithdraw(
        address zrc20In,
        address zrc20Out,
        uint256 amountIn,
        uint256 amountOutMin,
        bytes receiver,
        uint256 deadline
    ) returns (uint256, uint256);
}

/// Revert options used by every gateway call: refunds go back to the sender,
/// no revert callback, no abort address.
pub fn revert_options(sender: Address) -> RevertOptions {
    RevertOptions {
        revertAddress: sender,
        callOnRevert: false,
        abortAddress: Address::ZERO,
        revertMessage: Bytes::new(),
        onRevertGasLimit: U256::from(REVERT_GAS_LIMIT),
    }
}

/// Raw 20-byte receiver encoding expected by the gateway `bytes receiver` params.
pub fn receiver_bytes(address: Address) -> Bytes {
    Bytes::copy_from_slice(address.as_slice())
}

pub fn encode_approve_call(spender: Address, amount: U256) -> Bytes {
    let call = approveCall { spender, amount };
    Bytes::from(call.abi_encode())
}

pub fn encode_deposit_call(receiver: Address, options: RevertOptions) -> Bytes {
    let call = depositCall {
        receiver,
        revertOptions: options,
    };
    Bytes::from(call.abi_encode())
}

pub fn encode_withdraw_call(
    receiver: Bytes,
    amount: U256,
    zrc20: Address,
    options: RevertOptions,
) -> Bytes {
    let call = withdrawCall {
        receiver,
        amount,
        zrc20,
        revertOptions: options,
    };
    Bytes::from(call.abi_encode())
}

pub fn encode_swap_exact_tokens_call(
    amount_in: U256,
    amount_out_min: U256,
    path: Vec<Address>,
    to: Address,
    deadline: U256,
) -> Bytes {
    let call = swapExactTokensForTokensCall {
        amountIn: amount_in,
        amountOutMin: amount_out_min,
        path,
        to,
        deadline,
    };
    Bytes::from(call.abi_encode())
}

pub fn encode_swap_and_withdraw_call(
    zrc20_in: Address,
    zrc20_out: Address,
    amount_in: U256,
    amount_out_min: U256,
    receiver: Bytes,
    deadline: U256,
) -> Bytes {
    let call = swapAndWithdrawCall {
        zrc20In: zrc20_in,
        zrc20Out: zrc20_out,
        amountIn: amount_in,
        amountOutMin: amount_out_min,
        receiver,
        deadline,
    };
    Bytes::from(call.abi_encode())
}

pub fn encode_withdraw_gas_fee_call() -> Bytes {
    Bytes::from(withdrawGasFeeCall {}.abi_encode())
}

pub fn decode_withdraw_gas_fee(data: Bytes) -> Result<(Address, U256)> {
    let value: (Address, U256) = <(Address, U256)>::abi_decode(&data)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const SENDER: Address = address!("1111111111111111111111111111111111111111");

    #[test]
    fn well_known_selectors() {
        assert_eq!(hex::encode(approveCall::SELECTOR), "095ea7b3");
        assert_eq!(hex::encode(swapExactTokensForTokensCall::SELECTOR), "38ed1739");
        assert_eq!(
            withdrawCall::SIGNATURE,
            "withdraw(bytes,uint256,address,(address,bool,address,bytes,uint256))"
        );
        assert_eq!(
            depositCall::SIGNATURE,
            "deposit(address,(address,bool,address,bytes,uint256))"
        );
    }

    #[test]
    fn approve_round_trips() {
        let data = encode_approve_call(SENDER, U256::from(7u64));
        let call = approveCall::abi_decode(&data).unwrap();
        assert_eq!(call.spender, SENDER);
        assert_eq!(call.amount, U256::from(7u64));
    }

    #[test]
    fn revert_options_refund_sender() {
        let options = revert_options(SENDER);
        let data = encode_deposit_call(SENDER, options);
        let call = depositCall::abi_decode(&data).unwrap();
        assert_eq!(call.revertOptions.revertAddress, SENDER);
        assert!(!call.revertOptions.callOnRevert);
        assert_eq!(call.revertOptions.abortAddress, Address::ZERO);
        assert!(call.revertOptions.revertMessage.is_empty());
        assert_eq!(call.revertOptions.onRevertGasLimit, U256::from(200_000u64));
    }

    #[test]
    fn receiver_is_raw_twenty_bytes() {
        let bytes = receiver_bytes(SENDER);
        assert_eq!(bytes.len(), 20);
        assert_eq!(bytes.as_ref(), SENDER.as_slice());
    }

    #[test]
    fn decodes_gas_fee_tuple() {
        let gas_token = address!("2222222222222222222222222222222222222222");
        let encoded = Bytes::from((gas_token, U256::from(123u64)).abi_encode_params());
        let (token, fee) = decode_withdraw_gas_fee(encoded).unwrap();
        assert_eq!(token, gas_token);
        assert_eq!(fee, U256::from(123u64));
    }
}
