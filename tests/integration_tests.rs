//! Integration tests for the pegvault engine.
//!
//! These tests drive complete operation sequences through the protocol state
//! machine, the way a host would: one block per batch, atomic operations,
//! events and persisted state checked at the end.

use pegvault::prelude::*;
use pegvault::storage::{FileStore, InMemoryStore};
use pegvault::utils::constants::DEFAULT_SCALE;
use pegvault::utils::crypto::KeyPair;
use proptest::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const HOLDING_PERIOD: u64 = 10;

fn generate_test_users(count: usize) -> Vec<PublicKey> {
    (0..count).map(|_| *KeyPair::generate().public_key()).collect()
}

fn scale() -> Amount {
    Amount::from_u64(DEFAULT_SCALE)
}

fn units(n: u64) -> Amount {
    Amount::from_units(n, &scale())
}

fn bps(n: u64) -> Amount {
    Amount::from_bps(n, &scale())
}

fn test_params() -> EngineParams {
    EngineParams::default().with_holding_period(HOLDING_PERIOD)
}

/// Init with ratio 1.5, fee 0.5% and price 1.0 at height 0
fn setup_machine(params: EngineParams, dao: PublicKey) -> ProtocolStateMachine<InMemoryStore> {
    let mut machine = ProtocolStateMachine::with_params(InMemoryStore::new(), params).unwrap();
    machine
        .execute(ProtocolOperation::Init(InitOp {
            caller: dao,
            governance: dao,
            collateral_ratio: bps(15_000),
            fee_rate: bps(50),
            decimals: scale(),
        }))
        .unwrap();
    set_price(&mut machine, dao, units(1)).unwrap();
    machine
}

fn set_price(
    machine: &mut ProtocolStateMachine<InMemoryStore>,
    caller: PublicKey,
    price: Amount,
) -> Result<OperationResult> {
    machine.execute(ProtocolOperation::UpdateCollateralPrice(UpdateCollateralPriceOp {
        caller,
        price,
    }))
}

fn mint(
    machine: &mut ProtocolStateMachine<InMemoryStore>,
    caller: PublicKey,
    stable_amount: Amount,
    provided_collateral: Amount,
) -> Result<OperationResult> {
    machine.execute(ProtocolOperation::Mint(MintOp {
        caller,
        stable_amount,
        provided_collateral,
    }))
}

fn burn(
    machine: &mut ProtocolStateMachine<InMemoryStore>,
    caller: PublicKey,
    stable_amount: Amount,
) -> Result<OperationResult> {
    machine.execute(ProtocolOperation::Burn(BurnOp {
        caller,
        stable_amount,
    }))
}

fn transfer(
    machine: &mut ProtocolStateMachine<InMemoryStore>,
    caller: PublicKey,
    to: PublicKey,
    amount: Amount,
) -> Result<OperationResult> {
    machine.execute(ProtocolOperation::Transfer(TransferOp { caller, to, amount }))
}

/// Scenario A: a fresh ledger with one mint of 1000 at height 1
fn setup_minted() -> (ProtocolStateMachine<InMemoryStore>, PublicKey, PublicKey) {
    let users = generate_test_users(2);
    let (dao, alice) = (users[0], users[1]);
    let mut machine = setup_machine(test_params(), dao);
    machine.begin_block(1).unwrap();
    mint(&mut machine, alice, units(1000), units(1600)).unwrap();
    (machine, dao, alice)
}

// ═══════════════════════════════════════════════════════════════════════════════
// MINT / BURN LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_mint_takes_fee_and_required_collateral() {
    let (mut machine, _, alice) = setup_minted();
    let ledger = machine.ledger();

    assert_eq!(ledger.stable_balance(&alice), units(995));
    assert_eq!(ledger.stable_supply(), &units(995));
    assert_eq!(ledger.stable_fee_collected(), &units(5));
    // Only the required 1500 of the 1600 offered is recorded
    assert_eq!(ledger.collateral_balance(&alice), units(1500));
    assert_eq!(ledger.collateral_supply(), &units(1500));
    assert_eq!(ledger.last_minted_at(&alice), Some(1));
    assert_eq!(ledger.lock_state(), LockState::Unlocked);
    ledger.check_invariants().unwrap();

    let events = machine.end_block().unwrap();
    assert_eq!(events.filter_by_type("Minted").len(), 1);
    assert_eq!(events.events()[0].block_height(), 1);
}

#[test]
fn test_mint_collateral_boundary() {
    let users = generate_test_users(2);
    let (dao, alice) = (users[0], users[1]);
    let mut machine = setup_machine(test_params(), dao);
    machine.begin_block(1).unwrap();

    let required = units(1500);
    let short = required.checked_sub(&Amount::from_u64(1), "test").unwrap();
    let err = mint(&mut machine, alice, units(1000), short).unwrap_err();
    assert!(matches!(err, Error::InsufficientCollateral { .. }));
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert!(machine.ledger().stable_supply().is_zero());

    let result = mint(&mut machine, alice, units(1000), required.clone()).unwrap();
    match result {
        OperationResult::Minted(outcome) => {
            assert_eq!(outcome.minted, units(995));
            assert_eq!(outcome.fee, units(5));
            assert_eq!(outcome.collateral_locked, required);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_mint_requires_price() {
    let users = generate_test_users(1);
    let dao = users[0];
    let mut machine = ProtocolStateMachine::with_params(InMemoryStore::new(), test_params()).unwrap();
    machine
        .execute(ProtocolOperation::Init(InitOp {
            caller: dao,
            governance: dao,
            collateral_ratio: bps(15_000),
            fee_rate: bps(50),
            decimals: scale(),
        }))
        .unwrap();

    let err = mint(&mut machine, dao, units(10), units(100)).unwrap_err();
    assert_eq!(err, Error::PriceNotSet);
}

#[test]
fn test_burn_respects_holding_period() {
    let (mut machine, _, alice) = setup_minted();

    // Same block as the mint
    let err = burn(&mut machine, alice, units(500)).unwrap_err();
    assert!(matches!(err, Error::TimelockNotElapsed { minted_at: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::TimelockNotElapsed);

    // Exactly the holding period later is still too early
    machine.begin_block(1 + HOLDING_PERIOD).unwrap();
    assert!(matches!(
        burn(&mut machine, alice, units(500)),
        Err(Error::TimelockNotElapsed { .. })
    ));
    assert_eq!(machine.ledger().stable_balance(&alice), units(995));

    machine.begin_block(2 + HOLDING_PERIOD).unwrap();
    assert!(burn(&mut machine, alice, units(500)).is_ok());
}

#[test]
fn test_burn_releases_and_holds_back_collateral() {
    let (mut machine, _, alice) = setup_minted();
    machine.begin_block(2 + HOLDING_PERIOD).unwrap();

    let result = burn(&mut machine, alice, units(500)).unwrap();
    let outcome = match result {
        OperationResult::Burned(outcome) => outcome,
        other => panic!("unexpected result {:?}", other),
    };
    assert_eq!(outcome.fee, bps(25_000));
    assert_eq!(outcome.collateral.to_release, bps(4_975_000));
    assert_eq!(outcome.collateral.to_hold_back, bps(2_525_000));

    let ledger = machine.ledger();
    assert_eq!(ledger.stable_balance(&alice), units(495));
    assert_eq!(ledger.stable_supply(), &bps(4_975_000));
    assert_eq!(ledger.collateral_supply(), &units(750));
    assert_eq!(ledger.collateral_balance(&alice), units(750));
    assert_eq!(ledger.stable_fee_collected(), &bps(75_000));
    assert_eq!(ledger.collateral_fee_collected(), &bps(2_525_000));
    ledger.check_invariants().unwrap();

    let events = machine.end_block().unwrap();
    assert_eq!(events.filter_by_type("Burned").len(), 1);
}

#[test]
fn test_transfer_between_users() {
    let (mut machine, _, alice) = setup_minted();
    let bob = generate_test_users(1)[0];

    let result = transfer(&mut machine, alice, bob, units(100)).unwrap();
    assert_eq!(
        result,
        OperationResult::Transferred(TransferOutcome {
            received: bps(995_000),
            fee: bps(5_000),
        })
    );

    let ledger = machine.ledger();
    assert_eq!(ledger.stable_balance(&alice), units(895));
    assert_eq!(ledger.stable_balance(&bob), bps(995_000));
    // Transfer fee leaves circulation; supply is untouched
    assert_eq!(ledger.stable_supply(), &units(995));
    assert_eq!(ledger.stable_fee_collected(), &bps(55_000));
    ledger.check_invariants().unwrap();

    assert!(matches!(
        transfer(&mut machine, bob, alice, units(1000)),
        Err(Error::InsufficientBalance { .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATOMICITY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_failed_burn_rolls_back_partial_writes() {
    let (mut machine, _, alice) = setup_minted();
    let bob = generate_test_users(1)[0];
    transfer(&mut machine, alice, bob, units(100)).unwrap();
    machine.end_block().unwrap();

    // Bob holds stable but no collateral: the stable debit happens, then the
    // collateral debit fails
    machine.begin_block(2).unwrap();
    let before = machine.summary();
    let bob_before = machine.ledger().stable_balance(&bob);

    let err = burn(&mut machine, bob, units(50)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(machine.summary(), before);
    assert_eq!(machine.ledger().stable_balance(&bob), bob_before);
    assert!(machine.end_block().unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// GOVERNANCE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_governance_only_updates() {
    let (mut machine, dao, alice) = setup_minted();

    let err = set_price(&mut machine, alice, units(2)).unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    assert_eq!(machine.ledger().collateral_price(), &units(1));

    let err = machine
        .execute(ProtocolOperation::UpdateCollateralRatio(UpdateCollateralRatioOp {
            caller: alice,
            ratio: units(2),
        }))
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    let result = machine
        .execute(ProtocolOperation::UpdateCollateralRatio(UpdateCollateralRatioOp {
            caller: dao,
            ratio: units(2),
        }))
        .unwrap();
    assert_eq!(
        result,
        OperationResult::CollateralRatioUpdated {
            previous: bps(15_000)
        }
    );
    assert_eq!(machine.ledger().collateral_ratio().unwrap(), &units(2));
}

#[test]
fn test_init_is_set_once() {
    let (mut machine, dao, _) = setup_minted();
    let err = machine
        .execute(ProtocolOperation::Init(InitOp {
            caller: dao,
            governance: dao,
            collateral_ratio: units(2),
            fee_rate: bps(10),
            decimals: scale(),
        }))
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized { .. }));
    assert_eq!(machine.ledger().collateral_ratio().unwrap(), &bps(15_000));
}

#[test]
fn test_set_dao_binds_governance_once() {
    let users = generate_test_users(2);
    let (dao, alice) = (users[0], users[1]);
    let mut machine = ProtocolStateMachine::with_params(InMemoryStore::new(), test_params()).unwrap();

    assert!(matches!(
        set_price(&mut machine, dao, units(1)),
        Err(Error::NotInitialized { .. })
    ));

    machine
        .execute(ProtocolOperation::SetDao(SetDaoOp {
            caller: alice,
            governance: dao,
        }))
        .unwrap();
    assert_eq!(machine.ledger().governance().unwrap(), &dao);
    assert!(set_price(&mut machine, dao, units(1)).is_ok());

    let err = machine
        .execute(ProtocolOperation::SetDao(SetDaoOp {
            caller: dao,
            governance: alice,
        }))
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized { .. }));
    assert_eq!(machine.ledger().governance().unwrap(), &dao);
}

#[test]
fn test_aggregated_price_update() {
    let (mut machine, dao, alice) = setup_minted();

    let aggregated = |caller, prices| {
        ProtocolOperation::UpdateCollateralPriceAggregated(UpdateCollateralPriceAggregatedOp {
            caller,
            prices,
        })
    };

    assert!(matches!(
        machine.execute(aggregated(alice, vec![units(1)])),
        Err(Error::Unauthorized(_))
    ));
    assert!(machine.execute(aggregated(dao, Vec::new())).is_err());

    let result = machine
        .execute(aggregated(dao, vec![bps(9_900), bps(10_100), units(1)]))
        .unwrap();
    assert_eq!(
        result,
        OperationResult::PriceUpdated {
            previous: units(1),
            price: units(1),
            source_count: 3,
        }
    );

    let result = machine.execute(aggregated(dao, vec![bps(9_000), bps(9_100)])).unwrap();
    assert!(matches!(result, OperationResult::PriceUpdated { source_count: 2, .. }));
    assert_eq!(machine.ledger().collateral_price(), &bps(9_050));
}

// ═══════════════════════════════════════════════════════════════════════════════
// FEE DISTRIBUTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_fee_distribution_is_idempotent() {
    let (mut machine, _, alice) = setup_minted();
    machine.begin_block(2 + HOLDING_PERIOD).unwrap();
    burn(&mut machine, alice, units(500)).unwrap();

    let result = machine
        .execute(ProtocolOperation::DistributeFee(DistributeFeeOp { caller: alice }))
        .unwrap();
    let distribution = match result {
        OperationResult::FeesDistributed(distribution) => distribution,
        other => panic!("unexpected result {:?}", other),
    };

    // 7.5 stable and 252.5 collateral, 5% to treasury
    assert_eq!(distribution.treasury_stable, bps(3_750));
    assert_eq!(distribution.emergency_stable, bps(71_250));
    assert_eq!(distribution.treasury_collateral, bps(126_250));
    assert_eq!(distribution.emergency_collateral, bps(2_398_750));

    let summary = machine.summary();
    assert!(summary.stable_fee_collected.is_zero());
    assert!(summary.collateral_fee_collected.is_zero());

    let result = machine
        .execute(ProtocolOperation::DistributeFee(DistributeFeeOp { caller: alice }))
        .unwrap();
    assert_eq!(result, OperationResult::FeesDistributed(FeeDistribution::default()));
    assert_eq!(machine.summary(), summary);

    let events = machine.end_block().unwrap();
    assert_eq!(events.filter_by_type("FeesDistributed").len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PEG LOCK AND STABILIZATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_price_drop_locks_and_stabilizes() {
    let (mut machine, dao, alice) = setup_minted();
    let bob = generate_test_users(1)[0];

    let result = machine
        .execute(ProtocolOperation::ProvideLiquidity(ProvideLiquidityOp {
            caller: alice,
            collateral_amount: Amount::zero(),
            stable_amount: units(50),
        }))
        .unwrap();
    // Peg price 1.005 sits inside the stabilization band
    match result {
        OperationResult::LiquidityProvided(report) => assert!(report.is_noop()),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(machine.ledger().pool_stable(), &units(50));
    machine.end_block().unwrap();

    // 1500 × 0.8955 / 995 / 1.5 = 0.9
    machine.begin_block(2).unwrap();
    set_price(&mut machine, dao, bps(8_955)).unwrap();
    assert_eq!(machine.ledger().peg_price().unwrap(), bps(9_000));

    let before = machine.summary();
    for result in [
        mint(&mut machine, alice, units(10), units(100)),
        burn(&mut machine, alice, units(10)),
        transfer(&mut machine, alice, bob, units(10)),
    ] {
        let err = result.unwrap_err();
        assert!(matches!(err, Error::SystemLocked { .. }));
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }
    // Aborted operations do not commit the lock either
    assert_eq!(machine.ledger().lock_state(), LockState::Unlocked);
    assert_eq!(machine.summary(), before);

    let result = machine
        .execute(ProtocolOperation::CheckPeg(CheckPegOp { caller: bob }))
        .unwrap();
    assert_eq!(
        result,
        OperationResult::PegChecked {
            price: bps(9_000),
            state: LockState::Locked,
        }
    );
    assert!(machine.ledger().is_locked());

    let result = machine
        .execute(ProtocolOperation::Stabilize(StabilizeOp { caller: bob }))
        .unwrap();
    let report = match result {
        OperationResult::Stabilized(report) => report,
        other => panic!("unexpected result {:?}", other),
    };
    assert_eq!(report.price_before, bps(9_000));
    assert_eq!(
        report.action,
        StabilizationAction::BurnedLow {
            amount: units(50),
            reward: bps(5_500),
        }
    );
    // No fees were distributed, so the emergency reserve is empty
    assert!(report.emergency.is_some());
    assert!(report.forced_lock);
    assert!(report.price_after > report.price_before);

    let ledger = machine.ledger();
    assert_eq!(ledger.stable_supply(), &units(945));
    assert!(ledger.pool_stable().is_zero());
    assert_eq!(ledger.reward_pool(), &bps(5_500));
    assert!(ledger.is_locked());
    ledger.check_invariants().unwrap();

    let events = machine.end_block().unwrap();
    assert_eq!(events.filter_by_type("LockStateChanged").len(), 1);
    assert_eq!(events.filter_by_type("Stabilized").len(), 1);
    assert_eq!(events.filter_by_type("PriceUpdated").len(), 1);
}

#[test]
fn test_recovery_unlocks_system() {
    let (mut machine, dao, alice) = setup_minted();
    let bob = generate_test_users(1)[0];
    machine
        .execute(ProtocolOperation::ProvideLiquidity(ProvideLiquidityOp {
            caller: alice,
            collateral_amount: Amount::zero(),
            stable_amount: units(50),
        }))
        .unwrap();
    set_price(&mut machine, dao, bps(8_955)).unwrap();
    machine
        .execute(ProtocolOperation::Stabilize(StabilizeOp { caller: bob }))
        .unwrap();
    assert!(machine.ledger().is_locked());

    // 1500 × 0.945 / 945 / 1.5 = 1.0
    set_price(&mut machine, dao, bps(9_450)).unwrap();
    assert!(machine.ledger().is_locked());
    let result = machine
        .execute(ProtocolOperation::CheckPeg(CheckPegOp { caller: bob }))
        .unwrap();
    assert_eq!(
        result,
        OperationResult::PegChecked {
            price: units(1),
            state: LockState::Unlocked,
        }
    );

    assert!(transfer(&mut machine, alice, bob, units(10)).is_ok());
}

#[test]
fn test_emergency_reserve_cannot_burn_account_stable() {
    let (mut machine, dao, alice) = setup_minted();
    machine.begin_block(2 + HOLDING_PERIOD).unwrap();
    burn(&mut machine, alice, units(500)).unwrap();
    machine
        .execute(ProtocolOperation::DistributeFee(DistributeFeeOp { caller: dao }))
        .unwrap();
    assert_eq!(machine.ledger().emergency_collateral(), &bps(2_398_750));

    set_price(&mut machine, dao, bps(9_000)).unwrap();
    let result = machine
        .execute(ProtocolOperation::Stabilize(StabilizeOp { caller: dao }))
        .unwrap();
    let report = match result {
        OperationResult::Stabilized(report) => report,
        other => panic!("unexpected result {:?}", other),
    };

    // Supply 497.5 against 495 held by alice: only the 2.5 burn fee may go
    match report.emergency {
        Some(EmergencyAction::Low {
            burned,
            collateral_used,
        }) => {
            assert_eq!(burned, bps(25_000));
            assert_eq!(collateral_used, bps(2_398_750));
        }
        other => panic!("unexpected emergency action {:?}", other),
    }
    let ledger = machine.ledger();
    assert_eq!(ledger.stable_supply(), &units(495));
    assert_eq!(ledger.stable_balance(&alice), units(495));
    assert!(ledger.emergency_collateral().is_zero());
    assert!(ledger.unallocated_stable().is_zero());
    ledger.check_invariants().unwrap();
}

#[test]
fn test_gated_operation_unlocks_inside_band() {
    let (mut machine, dao, alice) = setup_minted();
    let bob = generate_test_users(1)[0];

    set_price(&mut machine, dao, bps(8_955)).unwrap();
    machine
        .execute(ProtocolOperation::CheckPeg(CheckPegOp { caller: bob }))
        .unwrap();
    assert!(machine.ledger().is_locked());

    // 1500 × 0.995 / 995 / 1.5 = 1.0
    set_price(&mut machine, dao, bps(9_950)).unwrap();
    assert!(transfer(&mut machine, alice, bob, units(10)).is_ok());
    assert_eq!(machine.ledger().lock_state(), LockState::Unlocked);

    let events = machine.end_block().unwrap();
    let changes = events.filter_by_type("LockStateChanged");
    assert_eq!(changes.len(), 2);
}

#[test]
fn test_withdraw_liquidity() {
    let (mut machine, _, alice) = setup_minted();
    machine
        .execute(ProtocolOperation::ProvideLiquidity(ProvideLiquidityOp {
            caller: alice,
            collateral_amount: units(20),
            stable_amount: units(50),
        }))
        .unwrap();
    assert_eq!(machine.ledger().pool_collateral_balance(&alice), units(20));

    let err = machine
        .execute(ProtocolOperation::WithdrawLiquidity(WithdrawLiquidityOp {
            caller: alice,
            collateral_amount: Amount::zero(),
            stable_amount: units(60),
        }))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientBalance { .. }));

    let result = machine
        .execute(ProtocolOperation::WithdrawLiquidity(WithdrawLiquidityOp {
            caller: alice,
            collateral_amount: units(20),
            stable_amount: units(50),
        }))
        .unwrap();
    assert!(matches!(result, OperationResult::LiquidityWithdrawn(_)));

    let ledger = machine.ledger();
    assert_eq!(ledger.stable_balance(&alice), units(995));
    assert!(ledger.pool_stable().is_zero());
    assert!(ledger.pool_collateral().is_zero());
}

#[test]
fn test_absolute_basis_locks_overcollateralized_ledger() {
    let users = generate_test_users(2);
    let (dao, alice) = (users[0], users[1]);
    let params = test_params().with_peg_basis(PegBasis::Absolute);
    let mut machine = setup_machine(params, dao);
    machine.begin_block(1).unwrap();

    // Nothing circulates yet: the first mint is on peg
    mint(&mut machine, alice, units(1000), units(1500)).unwrap();

    // Raw price is 1500 / 995, well above the lock threshold
    let err = mint(&mut machine, alice, units(10), units(15)).unwrap_err();
    assert!(matches!(err, Error::SystemLocked { .. }));
    assert_eq!(machine.ledger().lock_state(), LockState::Unlocked);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let users = generate_test_users(2);
    let (dao, alice) = (users[0], users[1]);

    let summary = {
        let store = FileStore::new(dir.path()).unwrap();
        let mut machine = ProtocolStateMachine::with_params(store, test_params()).unwrap();
        machine.begin_block(1).unwrap();
        machine
            .execute(ProtocolOperation::Init(InitOp {
                caller: dao,
                governance: dao,
                collateral_ratio: bps(15_000),
                fee_rate: bps(50),
                decimals: scale(),
            }))
            .unwrap();
        machine
            .execute(ProtocolOperation::UpdateCollateralPrice(UpdateCollateralPriceOp {
                caller: dao,
                price: units(1),
            }))
            .unwrap();
        machine
            .execute(ProtocolOperation::Mint(MintOp {
                caller: alice,
                stable_amount: units(1000),
                provided_collateral: units(1500),
            }))
            .unwrap();
        machine.end_block().unwrap();
        machine.summary()
    };

    let store = FileStore::new(dir.path()).unwrap();
    let mut machine = ProtocolStateMachine::new(store).unwrap();
    assert_eq!(machine.block_height(), 1);
    assert_eq!(machine.summary(), summary);
    assert_eq!(machine.ledger().stable_balance(&alice), units(995));
    assert_eq!(machine.ledger().last_minted_at(&alice), Some(1));
    // The holding period travelled with the ledger
    assert_eq!(machine.ledger().params().holding_period_blocks, HOLDING_PERIOD);

    machine.begin_block(2 + HOLDING_PERIOD).unwrap();
    assert!(machine
        .execute(ProtocolOperation::Burn(BurnOp {
            caller: alice,
            stable_amount: units(100),
        }))
        .is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Action {
    Mint { user: usize, amount: u64 },
    Burn { user: usize, amount: u64 },
    Transfer { from: usize, to: usize, amount: u64 },
    Provide { user: usize, amount: u64 },
    Withdraw { user: usize, amount: u64 },
    Distribute,
    Stabilize,
    SetPrice { bps: u64 },
    NextBlock,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..3usize, 1..500u64).prop_map(|(user, amount)| Action::Mint { user, amount }),
        (0..3usize, 1..500u64).prop_map(|(user, amount)| Action::Burn { user, amount }),
        (0..3usize, 0..3usize, 1..500u64)
            .prop_map(|(from, to, amount)| Action::Transfer { from, to, amount }),
        (0..3usize, 1..100u64).prop_map(|(user, amount)| Action::Provide { user, amount }),
        (0..3usize, 1..100u64).prop_map(|(user, amount)| Action::Withdraw { user, amount }),
        Just(Action::Distribute),
        Just(Action::Stabilize),
        (8_000..12_000u64).prop_map(|bps| Action::SetPrice { bps }),
        Just(Action::NextBlock),
    ]
}

proptest! {
    #[test]
    fn test_invariants_hold_for_any_sequence(
        actions in proptest::collection::vec(action_strategy(), 1..40)
    ) {
        let users = generate_test_users(4);
        let dao = users[3];
        let mut machine = setup_machine(EngineParams::default().with_holding_period(2), dao);
        let mut height = 1;
        machine.begin_block(height).unwrap();

        for action in actions {
            let op = match action {
                Action::Mint { user, amount } => ProtocolOperation::Mint(MintOp {
                    caller: users[user],
                    stable_amount: units(amount),
                    provided_collateral: units(amount * 2),
                }),
                Action::Burn { user, amount } => ProtocolOperation::Burn(BurnOp {
                    caller: users[user],
                    stable_amount: units(amount),
                }),
                Action::Transfer { from, to, amount } => ProtocolOperation::Transfer(TransferOp {
                    caller: users[from],
                    to: users[to],
                    amount: units(amount),
                }),
                Action::Provide { user, amount } => {
                    ProtocolOperation::ProvideLiquidity(ProvideLiquidityOp {
                        caller: users[user],
                        collateral_amount: units(amount / 2),
                        stable_amount: units(amount),
                    })
                }
                Action::Withdraw { user, amount } => {
                    ProtocolOperation::WithdrawLiquidity(WithdrawLiquidityOp {
                        caller: users[user],
                        collateral_amount: Amount::zero(),
                        stable_amount: units(amount),
                    })
                }
                Action::Distribute => {
                    ProtocolOperation::DistributeFee(DistributeFeeOp { caller: dao })
                }
                Action::Stabilize => ProtocolOperation::Stabilize(StabilizeOp { caller: dao }),
                Action::SetPrice { bps: price_bps } => {
                    ProtocolOperation::UpdateCollateralPrice(UpdateCollateralPriceOp {
                        caller: dao,
                        price: bps(price_bps),
                    })
                }
                Action::NextBlock => {
                    machine.end_block().unwrap();
                    height += 1;
                    machine.begin_block(height).unwrap();
                    continue;
                }
            };

            let before = machine.summary();
            if machine.execute(op).is_err() {
                prop_assert_eq!(machine.summary(), before);
            }
            prop_assert!(machine.ledger().check_invariants().is_ok());
        }
    }
}
