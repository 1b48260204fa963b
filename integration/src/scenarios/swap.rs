//! Scenarios for buying and selling the protocol token through the swap

use alloy_primitives::U256;
use eyre::Result;
use furio_scripts::{
    solidity::{
        IERC20Mock::{approveCall, balanceOfCall, mintCall},
        ISwap::{buyCall, sellCall},
    },
    types::Component,
};

use crate::{assert_eq_result, integration_test, test_args::TestArgs, util::expect_revert};

/// The amount of payment token swapped
const SWAP_AMOUNT: U256 = U256::from_limbs([1000, 0, 0, 0]);

/// Buying with the payment token and selling back returns the user's balances
async fn test_swap_buy_sell(args: TestArgs) -> Result<()> {
    let (_, records) = args
        .deploy(&[Component::Token, Component::Payment, Component::Swap])
        .await?;
    let token = args.as_user("TokenV1", records[0].address);
    let payment = args.as_user("FakeToken", records[1].address);
    let swap = args.as_user("Swap", records[2].address);
    let user = args.user.sender();

    payment.send(mintCall { amount: SWAP_AMOUNT }).await?;
    payment
        .send(approveCall {
            spender: swap.address(),
            amount: SWAP_AMOUNT,
        })
        .await?;
    swap.send(buyCall {
        payment: payment.address(),
        amount: SWAP_AMOUNT,
    })
    .await?;

    assert_eq_result!(
        token.call(balanceOfCall { account: user }).await?,
        SWAP_AMOUNT
    )?;
    assert_eq_result!(
        payment.call(balanceOfCall { account: user }).await?,
        U256::ZERO
    )?;

    token
        .send(approveCall {
            spender: swap.address(),
            amount: SWAP_AMOUNT,
        })
        .await?;
    swap.send(sellCall {
        amount: SWAP_AMOUNT,
    })
    .await?;

    assert_eq_result!(
        token.call(balanceOfCall { account: user }).await?,
        U256::ZERO
    )?;
    assert_eq_result!(
        payment.call(balanceOfCall { account: user }).await?,
        SWAP_AMOUNT
    )
}
integration_test!(test_swap_buy_sell);

/// The swap only accepts the registered payment token
async fn test_swap_rejects_unknown_payment(args: TestArgs) -> Result<()> {
    let (_, records) = args
        .deploy(&[
            Component::Token,
            Component::Payment,
            Component::Usdt,
            Component::Swap,
        ])
        .await?;
    let usdt = args.as_user("USDT", records[2].address);
    let swap = args.as_user("Swap", records[3].address);

    usdt.send(mintCall { amount: SWAP_AMOUNT }).await?;
    usdt.send(approveCall {
        spender: swap.address(),
        amount: SWAP_AMOUNT,
    })
    .await?;

    let res = swap
        .send(buyCall {
            payment: usdt.address(),
            amount: SWAP_AMOUNT,
        })
        .await;
    expect_revert(res, "unsupported payment token")
}
integration_test!(test_swap_rejects_unknown_payment);
