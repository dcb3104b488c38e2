//! Protocol state machine.
//!
//! Owns the ledger, the current block height and the block's event log.
//! Every operation is staged on a copy of the ledger and swapped in only if
//! it succeeds, so an aborted operation leaves no trace, including any lock
//! transition it evaluated on the way.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::config::EngineParams;
use crate::core::engine::{BurnOutcome, MintBurnEngine, MintOutcome, TransferOutcome};
use crate::core::fees::{FeeDistribution, FeeDistributor};
use crate::core::ledger::{Ledger, LedgerSummary};
use crate::core::peg::{LockState, PegController};
use crate::error::{Error, Result};
use crate::governance::{Governance, InitParams};
use crate::oracle::aggregator::PriceAggregator;
use crate::protocol::events::*;
use crate::protocol::operations::*;
use crate::stability::pool::{StabilityPool, WithdrawOutcome};
use crate::stability::stabilizer::{StabilizationEngine, StabilizationReport};
use crate::storage::backend::StorageBackend;
use crate::storage::state::StateManager;
use crate::utils::math::Amount;
use crate::utils::validation::validate_governance;

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Orchestrates operations against a persisted ledger
pub struct ProtocolStateMachine<B: StorageBackend> {
    /// State manager for persistence
    state_manager: StateManager<B>,
    /// Committed ledger
    ledger: Ledger,
    /// Current block height
    block_height: u64,
    /// Events of the current block
    event_log: EventLog,
}

impl<B: StorageBackend> ProtocolStateMachine<B> {
    /// Open with default engine parameters
    pub fn new(backend: B) -> Result<Self> {
        Self::with_params(backend, EngineParams::default())
    }

    /// Open, restoring the stored ledger if there is one; `params` only apply
    /// to a fresh ledger
    pub fn with_params(backend: B, params: EngineParams) -> Result<Self> {
        params.validate()?;
        let state_manager = StateManager::new(backend);
        let (ledger, block_height) = match state_manager.load()? {
            Some((ledger, height)) => {
                info!(height, "Restored ledger");
                (ledger, height)
            }
            None => (Ledger::new(params), 0),
        };

        Ok(Self {
            state_manager,
            ledger,
            block_height,
            event_log: EventLog::new(),
        })
    }

    /// Reload the committed ledger from storage, dropping uncommitted events
    pub fn load_state(&mut self) -> Result<()> {
        if let Some((ledger, height)) = self.state_manager.load()? {
            self.ledger = ledger;
            self.block_height = height;
        }
        self.event_log.clear();
        Ok(())
    }

    /// Write the ledger and block height and flush
    pub fn save_state(&self) -> Result<()> {
        let meta = self.state_manager.save(&self.ledger, self.block_height)?;
        self.state_manager.flush()?;
        debug!(height = meta.block_height, hash = %meta.state_hash, "State saved");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BLOCK PROCESSING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Begin a new block; heights never go backwards
    pub fn begin_block(&mut self, height: u64) -> Result<()> {
        if height < self.block_height {
            return Err(Error::InvalidParameter {
                name: "block_height".into(),
                reason: format!("{} is below the current height {}", height, self.block_height),
            });
        }
        self.block_height = height;
        self.event_log.clear();
        Ok(())
    }

    /// Persist the ledger and hand back the block's events
    pub fn end_block(&mut self) -> Result<EventLog> {
        self.save_state()?;
        let events = std::mem::take(&mut self.event_log);
        info!(height = self.block_height, events = events.len(), "Block committed");
        Ok(events)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATION EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Execute one operation atomically
    pub fn execute(&mut self, op: ProtocolOperation) -> Result<OperationResult> {
        let operation = op.operation_type();
        let caller = *op.caller();
        let mut staged = self.ledger.clone();
        let mut events = Vec::new();

        match Self::apply(&mut staged, self.block_height, op, &mut events) {
            Ok(result) => {
                let before = self.ledger.lock_state();
                let after = staged.lock_state();
                if before != after {
                    events.push(ProtocolEvent::LockStateChanged(LockStateChangedEvent {
                        from: before,
                        to: after,
                        price: PegController::measure(&staged)?,
                        block_height: self.block_height,
                    }));
                }

                self.ledger = staged;
                for event in events {
                    self.event_log.push(event);
                }
                debug!(operation, caller = %caller.short(), "Operation committed");
                Ok(result)
            }
            Err(e) => {
                warn!(
                    operation,
                    caller = %caller.short(),
                    code = e.code(),
                    error = %e,
                    "Operation aborted"
                );
                Err(e)
            }
        }
    }

    fn apply(
        ledger: &mut Ledger,
        height: u64,
        op: ProtocolOperation,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<OperationResult> {
        match op {
            ProtocolOperation::Init(op) => {
                Governance::init(
                    ledger,
                    &InitParams {
                        governance: op.governance,
                        collateral_ratio: op.collateral_ratio.clone(),
                        fee_rate: op.fee_rate.clone(),
                        decimals: op.decimals.clone(),
                    },
                )?;
                events.push(ProtocolEvent::Initialized(InitializedEvent {
                    governance: op.governance,
                    collateral_ratio: op.collateral_ratio,
                    fee_rate: op.fee_rate,
                    decimals: op.decimals,
                    block_height: height,
                }));
                Ok(OperationResult::Initialized)
            }

            ProtocolOperation::SetDao(op) => {
                Governance::set_dao(ledger, op.governance)?;
                events.push(ProtocolEvent::DaoSet(DaoSetEvent {
                    governance: op.governance,
                    block_height: height,
                }));
                Ok(OperationResult::DaoSet)
            }

            ProtocolOperation::UpdateCollateralRatio(op) => {
                let previous =
                    Governance::update_collateral_ratio(ledger, &op.caller, op.ratio.clone())?;
                events.push(ProtocolEvent::CollateralRatioUpdated(
                    CollateralRatioUpdatedEvent {
                        previous: previous.clone(),
                        ratio: op.ratio,
                        block_height: height,
                    },
                ));
                Ok(OperationResult::CollateralRatioUpdated { previous })
            }

            ProtocolOperation::UpdateCollateralPrice(op) => {
                let previous =
                    Governance::update_collateral_price(ledger, &op.caller, op.price.clone())?;
                Ok(Self::price_updated(previous, op.price, 1, height, events))
            }

            ProtocolOperation::UpdateCollateralPriceAggregated(op) => {
                validate_governance(
                    &op.caller,
                    ledger.governance()?,
                    "update_collateral_price_aggregated",
                )?;
                let aggregated = PriceAggregator::from_prices(&op.prices)?.aggregate()?;
                let previous =
                    Governance::update_collateral_price(ledger, &op.caller, aggregated.price.clone())?;
                Ok(Self::price_updated(
                    previous,
                    aggregated.price,
                    aggregated.source_count,
                    height,
                    events,
                ))
            }

            ProtocolOperation::Mint(op) => {
                let outcome = MintBurnEngine::mint(
                    ledger,
                    &op.caller,
                    height,
                    &op.stable_amount,
                    &op.provided_collateral,
                )?;
                events.push(ProtocolEvent::Minted(MintedEvent {
                    caller: op.caller,
                    minted: outcome.minted.clone(),
                    fee: outcome.fee.clone(),
                    collateral_locked: outcome.collateral_locked.clone(),
                    block_height: height,
                }));
                Ok(OperationResult::Minted(outcome))
            }

            ProtocolOperation::Burn(op) => {
                let outcome = MintBurnEngine::burn(ledger, &op.caller, height, &op.stable_amount)?;
                events.push(ProtocolEvent::Burned(BurnedEvent {
                    caller: op.caller,
                    burned: outcome.burned.clone(),
                    fee: outcome.fee.clone(),
                    collateral_released: outcome.collateral.to_release.clone(),
                    collateral_held_back: outcome.collateral.to_hold_back.clone(),
                    block_height: height,
                }));
                Ok(OperationResult::Burned(outcome))
            }

            ProtocolOperation::Transfer(op) => {
                let outcome = MintBurnEngine::transfer(ledger, &op.caller, &op.to, &op.amount)?;
                events.push(ProtocolEvent::Transferred(TransferredEvent {
                    from: op.caller,
                    to: op.to,
                    amount: op.amount,
                    fee: outcome.fee.clone(),
                    block_height: height,
                }));
                Ok(OperationResult::Transferred(outcome))
            }

            ProtocolOperation::DistributeFee(_) => {
                let distribution = FeeDistributor::distribute(ledger)?;
                if !distribution.is_empty() {
                    events.push(ProtocolEvent::FeesDistributed(FeesDistributedEvent {
                        distribution: distribution.clone(),
                        block_height: height,
                    }));
                }
                Ok(OperationResult::FeesDistributed(distribution))
            }

            ProtocolOperation::ProvideLiquidity(op) => {
                let report = StabilityPool::provide_liquidity(
                    ledger,
                    &op.caller,
                    &op.collateral_amount,
                    &op.stable_amount,
                )?;
                events.push(ProtocolEvent::LiquidityProvided(LiquidityEvent {
                    provider: op.caller,
                    collateral: op.collateral_amount,
                    stable: op.stable_amount,
                    block_height: height,
                }));
                Self::push_stabilized(&report, height, events);
                Ok(OperationResult::LiquidityProvided(report))
            }

            ProtocolOperation::WithdrawLiquidity(op) => {
                let outcome = StabilityPool::withdraw_liquidity(
                    ledger,
                    &op.caller,
                    &op.collateral_amount,
                    &op.stable_amount,
                )?;
                events.push(ProtocolEvent::LiquidityWithdrawn(LiquidityEvent {
                    provider: op.caller,
                    collateral: outcome.collateral.clone(),
                    stable: outcome.stable.clone(),
                    block_height: height,
                }));
                Ok(OperationResult::LiquidityWithdrawn(outcome))
            }

            ProtocolOperation::Stabilize(_) => {
                let report = StabilizationEngine::stabilize(ledger)?;
                Self::push_stabilized(&report, height, events);
                Ok(OperationResult::Stabilized(report))
            }

            ProtocolOperation::CheckPeg(_) => {
                let reading = PegController::evaluate(ledger)?;
                Ok(OperationResult::PegChecked {
                    price: reading.price,
                    state: reading.state,
                })
            }
        }
    }

    fn price_updated(
        previous: Amount,
        price: Amount,
        source_count: usize,
        height: u64,
        events: &mut Vec<ProtocolEvent>,
    ) -> OperationResult {
        events.push(ProtocolEvent::PriceUpdated(PriceUpdatedEvent {
            previous: previous.clone(),
            price: price.clone(),
            source_count,
            block_height: height,
        }));
        OperationResult::PriceUpdated {
            previous,
            price,
            source_count,
        }
    }

    fn push_stabilized(report: &StabilizationReport, height: u64, events: &mut Vec<ProtocolEvent>) {
        if !report.is_noop() {
            events.push(ProtocolEvent::Stabilized(StabilizedEvent {
                report: report.clone(),
                block_height: height,
            }));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Committed ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Current block height
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Events committed so far in the current block
    pub fn pending_events(&self) -> &EventLog {
        &self.event_log
    }

    /// Aggregate view of the committed ledger
    pub fn summary(&self) -> LedgerSummary {
        self.ledger.summary()
    }

    /// Storage backend
    pub fn backend(&self) -> &B {
        self.state_manager.backend()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a committed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    /// `init` committed
    Initialized,
    /// `setDAO` committed
    DaoSet,
    /// Collateral ratio replaced
    CollateralRatioUpdated {
        /// Ratio before the update
        previous: Amount,
    },
    /// Collateral price published
    PriceUpdated {
        /// Price before the update
        previous: Amount,
        /// Published price
        price: Amount,
        /// Number of submissions averaged
        source_count: usize,
    },
    /// Mint result
    Minted(MintOutcome),
    /// Burn result
    Burned(BurnOutcome),
    /// Transfer result
    Transferred(TransferOutcome),
    /// Fee distribution result
    FeesDistributed(FeeDistribution),
    /// Provision result, including the triggered stabilization pass
    LiquidityProvided(StabilizationReport),
    /// Withdrawal result
    LiquidityWithdrawn(WithdrawOutcome),
    /// Stabilization result
    Stabilized(StabilizationReport),
    /// Peg check result
    PegChecked {
        /// Measured peg price
        price: Amount,
        /// Committed lock state
        state: LockState,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
