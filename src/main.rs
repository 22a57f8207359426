//! Margin engine simulation.
//!
//! Walks the position lifecycle end to end: opening with fees, settling at a
//! profit and a loss, liquidation, stale oracle handling, the emergency stop and
//! the fee sweep.

use margin_core::*;
use alloy_primitives::U256;
use rust_decimal_macros::dec;
use std::error::Error;
use tracing_subscriber::EnvFilter;

type SimResult = Result<(), Box<dyn Error>>;

const OWNER: Address = Address::new([0xaa; 20]);
const VAULT: Address = Address::new([0xee; 20]);
const ALICE: Address = Address::new([0x01; 20]);
const BOB: Address = Address::new([0x02; 20]);
const KEEPER: Address = Address::new([0x0c; 20]);

fn main() -> SimResult {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Margin Engine Simulation");
    println!("Isolated Positions, Oracle Priced, 1e18 Fixed Point\n");

    scenario_1_profitable_close()?;
    scenario_2_losing_close()?;
    scenario_3_liquidation()?;
    scenario_4_stale_oracle()?;
    scenario_5_emergency_stop()?;
    scenario_6_fee_sweep()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn eth() -> FeedId {
    FeedId::from("ETH/USD")
}

/// Fresh engine with ETH/USD active at $2000, traders funded and the vault
/// seeded so profitable closes can be paid.
fn setup() -> Result<Engine<CustodyLedger, PriceFeedStore>, Box<dyn Error>> {
    let mut token = CustodyLedger::new(VAULT);
    for account in [ALICE, BOB] {
        token.mint(account, U256::from(1_000_000u64))?;
    }
    token.mint(VAULT, U256::from(1_000_000u64))?;

    let mut engine = Engine::new(EngineConfig::default(), OWNER, token, PriceFeedStore::new(OWNER))?;
    engine.set_time(Timestamp::from_secs(1_700_000_000));
    engine.set_feed_status(OWNER, &eth(), true)?;
    set_price(&mut engine, dec!(2000))?;
    if let Some(clock) = engine.time().to_datetime() {
        println!("  Engine clock: {}", clock.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    Ok(engine)
}

fn set_price(engine: &mut Engine<CustodyLedger, PriceFeedStore>, price: rust_decimal::Decimal) -> SimResult {
    let price = Price::from_decimal(price).ok_or("price must be positive")?;
    engine.push_price(OWNER, &eth(), price.value())?;
    Ok(())
}

/// 5x long, price up 10%.
fn scenario_1_profitable_close() -> SimResult {
    println!("Scenario 1: Profitable Close\n");
    let mut engine = setup()?;

    let id = engine.open_position(ALICE, U256::from(100u64), Leverage::from_multiplier(5), Direction::Long, &eth())?;
    let position = engine.position(id).ok_or("position missing")?;
    println!("  Alice opens {} {} {} with {} collateral @ ${}", id, position.leverage, position.direction, position.collateral, position.entry_price);

    engine.advance_time(60);
    set_price(&mut engine, dec!(2200))?;
    let result = engine.close_position(ALICE, id)?;

    println!("  Price moves to ${}", result.exit_price);
    println!("  PnL: {}, payout: {}\n", result.pnl, result.payout);
    Ok(())
}

/// Same position, price down 10%. half the collateral is lost, not liquidatable.
fn scenario_2_losing_close() -> SimResult {
    println!("Scenario 2: Losing Close\n");
    let mut engine = setup()?;

    let id = engine.open_position(ALICE, U256::from(100u64), Leverage::from_multiplier(5), Direction::Long, &eth())?;
    set_price(&mut engine, dec!(1800))?;

    let status = engine.liquidation_status(id)?;
    println!("  Price moves to $1800, loss {}%, liquidatable: {}", status.loss_pct(), status.is_liquidatable());

    let result = engine.close_position(ALICE, id)?;
    println!("  PnL: {}, payout: {}\n", result.pnl, result.payout);
    Ok(())
}

/// Price down 20% at 5x wipes the collateral. a keeper takes the reward.
fn scenario_3_liquidation() -> SimResult {
    println!("Scenario 3: Liquidation\n");
    let mut engine = setup()?;

    let id = engine.open_position(BOB, U256::from(100_503u64), Leverage::from_multiplier(5), Direction::Long, &eth())?;
    println!("  Bob opens 5x long with 100,503 gross, fee {}", engine.accumulated_fees());

    set_price(&mut engine, dec!(1600))?;
    let result = engine.liquidate_position(KEEPER, id)?;

    println!("  Price moves to ${}, PnL: {}", result.exit_price, result.pnl);
    println!("  Keeper reward: {}, Bob receives nothing", result.reward);
    println!("  Open positions: {}\n", engine.position_count());
    Ok(())
}

/// Six minute old price: trading halts, liquidation still allowed.
fn scenario_4_stale_oracle() -> SimResult {
    println!("Scenario 4: Stale Oracle\n");
    let mut engine = setup()?;

    let id = engine.open_position(ALICE, U256::from(10_050u64), Leverage::from_multiplier(5), Direction::Long, &eth())?;
    set_price(&mut engine, dec!(1600))?;
    engine.advance_time(6 * 60);

    match engine.close_position(ALICE, id) {
        Ok(_) => println!("  Close unexpectedly succeeded"),
        Err(e) => println!("  Close rejected ({:?}): {}", e.kind(), e),
    }
    match engine.open_position(BOB, U256::from(10_050u64), Leverage::ONE_X, Direction::Short, &eth()) {
        Ok(_) => println!("  Open unexpectedly succeeded"),
        Err(e) => println!("  Open rejected ({:?}): {}", e.kind(), e),
    }

    let result = engine.liquidate_position(KEEPER, id)?;
    println!("  Liquidation within the 10 minute window succeeds, reward {}\n", result.reward);
    Ok(())
}

/// Owner halts the engine, then resumes.
fn scenario_5_emergency_stop() -> SimResult {
    println!("Scenario 5: Emergency Stop\n");
    let mut engine = setup()?;

    let id = engine.open_position(ALICE, U256::from(1_000u64), Leverage::from_multiplier(2), Direction::Short, &eth())?;
    engine.set_emergency_stop(OWNER, true)?;

    if let Err(e) = engine.close_position(ALICE, id) {
        println!("  Close while stopped: {}", e);
    }
    if let Err(e) = engine.set_emergency_stop(BOB, false) {
        println!("  Bob tries to resume: {}", e);
    }

    engine.set_emergency_stop(OWNER, false)?;
    let result = engine.close_position(ALICE, id)?;
    println!("  Resumed, Alice closes with payout {}\n", result.payout);
    Ok(())
}

/// Fees from several opens swept to the owner.
fn scenario_6_fee_sweep() -> SimResult {
    println!("Scenario 6: Fee Sweep\n");
    let mut engine = setup()?;

    for (trader, direction) in [(ALICE, Direction::Long), (BOB, Direction::Short)] {
        engine.open_position(trader, U256::from(20_000u64), Leverage::from_multiplier(3), direction, &eth())?;
    }
    println!("  Two opens of 20,000 accrue {} in fees", engine.accumulated_fees());

    let swept = engine.withdraw_fees(OWNER, OWNER)?;
    println!("  Owner withdraws {}, balance now {}", swept, engine.token().balance_of(OWNER));
    println!("  Events generated: {}", engine.events().len());
    Ok(())
}
