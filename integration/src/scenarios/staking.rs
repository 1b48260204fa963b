//! Scenarios for the time-gated staking component

use alloy_primitives::U256;
use eyre::Result;
use furio_scripts::{
    constants::{ONE_DAY_SECS, ONE_MONTH_SECS},
    handle::ContractHandle,
    solidity::{
        IERC20Mock::{approveCall, balanceOfCall, mintCall},
        ILPStaking::{
            claimRewardsCall, compoundCall, pendingRewardCall, registerAddressCall,
            registeredCall, stakeCall, stakersCall, totalStakingAmountCall, unstakeCall,
        },
    },
    types::Component,
};

use crate::{
    assert_eq_result, assert_true_result,
    constants::{ONE_MONTH_LOCK, STAKE_AMOUNT},
    integration_test,
    test_args::TestArgs,
    util::expect_revert,
};

/// Deploy the payment token and staking, and stake `STAKE_AMOUNT` as the user
/// with the given lock period.
///
/// Returns the staking and payment token contracts, reached as the user.
async fn stake(args: &TestArgs, duration_index: u64) -> Result<(ContractHandle, ContractHandle)> {
    let (_, records) = args
        .deploy(&[Component::Payment, Component::LpStaking])
        .await?;
    let payment = args.as_user("FakeToken", records[0].address);
    let staking = args.as_user("LPStaking", records[1].address);

    payment.send(mintCall { amount: STAKE_AMOUNT }).await?;
    payment
        .send(approveCall {
            spender: staking.address(),
            amount: STAKE_AMOUNT,
        })
        .await?;
    staking
        .send(stakeCall {
            amount: STAKE_AMOUNT,
            durationIndex: U256::from(duration_index),
        })
        .await?;

    Ok((staking, payment))
}

/// Unstaking a one-month lock reverts until thirty days have passed
async fn test_staking_lockup(args: TestArgs) -> Result<()> {
    let (staking, payment) = stake(&args, ONE_MONTH_LOCK).await?;
    let user = args.user.sender();
    assert_eq_result!(
        staking.call(totalStakingAmountCall {}).await?,
        STAKE_AMOUNT
    )?;

    expect_revert(staking.send(unstakeCall {}).await, "Tokens are locked")?;

    args.control.advance(ONE_MONTH_SECS - ONE_DAY_SECS).await?;
    expect_revert(staking.send(unstakeCall {}).await, "Tokens are locked")?;

    args.control.advance(ONE_DAY_SECS).await?;
    staking.send(unstakeCall {}).await?;

    let position = staking.call(stakersCall { account: user }).await?;
    assert_eq_result!(position.stakingAmount, U256::ZERO)?;
    assert_eq_result!(staking.call(totalStakingAmountCall {}).await?, U256::ZERO)?;

    // The principal comes back along with the rewards accrued over the lock
    let balance = payment.call(balanceOfCall { account: user }).await?;
    assert_true_result!(
        balance > STAKE_AMOUNT,
        "balance {} does not exceed the stake",
        balance
    )
}
integration_test!(test_staking_lockup);

/// Rewards accrue linearly with time and are paid out on claim
async fn test_staking_rewards(args: TestArgs) -> Result<()> {
    let (staking, payment) = stake(&args, 0).await?;
    let user = args.user.sender();

    args.control.advance(10 * ONE_DAY_SECS).await?;
    let pending = staking.call(pendingRewardCall { account: user }).await?;

    // 10 basis points per day
    let ten_days = STAKE_AMOUNT / U256::from(100);
    let eleven_days = STAKE_AMOUNT * U256::from(11) / U256::from(1000);
    assert_true_result!(
        pending >= ten_days && pending < eleven_days,
        "unexpected pending reward {}",
        pending
    )?;

    staking.send(claimRewardsCall {}).await?;
    let balance = payment.call(balanceOfCall { account: user }).await?;
    assert_true_result!(
        balance >= pending,
        "claimed {} of {} pending",
        balance,
        pending
    )?;

    let remaining = staking.call(pendingRewardCall { account: user }).await?;
    assert_true_result!(
        remaining < pending,
        "{} still pending after claiming",
        remaining
    )
}
integration_test!(test_staking_rewards);

/// Compounding moves the pending rewards into the stake
async fn test_staking_compound(args: TestArgs) -> Result<()> {
    let (staking, _) = stake(&args, 0).await?;
    let user = args.user.sender();

    staking.send(registerAddressCall {}).await?;
    assert_true_result!(staking.call(registeredCall { account: user }).await?)?;
    let owner = args.owner.sender();
    assert_true_result!(!staking.call(registeredCall { account: owner }).await?)?;

    args.control.advance(10 * ONE_DAY_SECS).await?;
    let pending = staking.call(pendingRewardCall { account: user }).await?;
    staking.send(compoundCall {}).await?;

    let position = staking.call(stakersCall { account: user }).await?;
    assert_true_result!(
        position.stakingAmount >= STAKE_AMOUNT + pending,
        "stake {} does not include the {} pending",
        position.stakingAmount,
        pending
    )?;
    assert_eq_result!(position.rewards, U256::ZERO)?;
    assert_eq_result!(
        staking.call(totalStakingAmountCall {}).await?,
        position.stakingAmount
    )
}
integration_test!(test_staking_compound);
