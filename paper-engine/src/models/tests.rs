use super::*;
use paper_api::{Execution, Instrument, Order, OrderId, Side, SideFilter, Symbol};

fn aapl() -> Instrument {
    Instrument::new("AAPL", "NASDAQ", "USD")
}

fn trade(side: Side, price: f64, quantity: f64) -> Execution {
    Execution::new(None, &aapl(), side, price, quantity, 0.0, 0)
}

fn basis(trades: &[(Side, f64, f64)]) -> CostBasis {
    let executions: Vec<Execution> = trades.iter().map(|&(s, p, q)| trade(s, p, q)).collect();
    portfolio::replay(&executions)
}

// --- Positions ---

#[test]
fn test_extend_long_averages_cost() {
    let b = basis(&[(Side::Buy, 10.0, 10.0), (Side::Buy, 13.0, 5.0)]);
    assert_eq!(b.size, 15.0);
    // (100 + 65) / 15
    assert!((b.average_price().unwrap() - 11.0).abs() < 1e-9);
}

#[test]
fn test_sell_through_long_reprices_at_trade() {
    let b = basis(&[(Side::Buy, 10.0, 10.0), (Side::Sell, 12.0, 15.0)]);
    assert_eq!(b.size, -5.0);
    assert_eq!(b.average_price(), Some(12.0));
}

#[test]
fn test_partial_reduce_leaves_basis() {
    let b = basis(&[(Side::Buy, 10.0, 10.0), (Side::Sell, 11.0, 4.0)]);
    assert_eq!(b.size, 6.0);
    assert_eq!(b.average_price(), Some(10.0));
    assert_eq!(b.total, 10.0);
    assert_eq!(b.current_sum, 100.0);
}

#[test]
fn test_exact_flatten_resets_everything() {
    let b = basis(&[(Side::Buy, 10.0, 10.0), (Side::Sell, 11.0, 10.0)]);
    assert_eq!(b, CostBasis::default());
    assert_eq!(b.average_price(), None);
}

#[test]
fn test_short_then_buy_back_through_zero() {
    let b = basis(&[(Side::Sell, 20.0, 4.0), (Side::Buy, 18.0, 6.0)]);
    assert_eq!(b.size, 2.0);
    assert_eq!(b.average_price(), Some(18.0));
}

#[test]
fn test_reversal_rule_reads_total_left_by_partial_reduce() {
    // The reversal rule compares against `total`, which the partial reduce
    // left at 10. Selling 8 more is therefore another partial reduce even
    // though the size goes short.
    let b = basis(&[
        (Side::Buy, 10.0, 10.0),
        (Side::Sell, 11.0, 4.0),
        (Side::Sell, 12.0, 8.0),
    ]);
    assert_eq!(b.size, -2.0);
    assert_eq!(b.total, 10.0);
    assert_eq!(b.average_price(), Some(10.0));
}

#[test]
fn test_positions_cache_drops_flat() {
    let mut positions = Positions::default();
    let inst = aapl();

    positions.update(recompute(&inst, [trade(Side::Buy, 10.0, 3.0)].iter()));
    assert_eq!(positions.len(), 1);
    assert_eq!(positions.get(inst.symbol()).unwrap().size(), 3.0);

    let flat = recompute(
        &inst,
        [trade(Side::Buy, 10.0, 3.0), trade(Side::Sell, 9.0, 3.0)].iter(),
    );
    assert!(flat.is_flat());
    positions.update(flat);
    assert!(positions.is_empty());
}

// --- Ledger ---

#[test]
fn test_balances_apply_settlement_formula() {
    let inst = aapl();
    let mut balances = Balances::default();
    balances.deposit("USD", 1_000.0);

    balances.apply(&Execution::new(None, &inst, Side::Buy, 10.0, 5.0, 1.0, 0));
    assert_eq!(balances.get_balance("USD"), 949.0);

    balances.apply(&Execution::new(None, &inst, Side::Sell, 12.0, 5.0, 1.0, 0));
    assert_eq!(balances.get_balance("USD"), 1_008.0);
    assert_eq!(balances.get_balance("EUR"), 0.0);
}

#[test]
fn test_timeline_replay_matches_running_balances() {
    let inst = aapl();
    let initial = Balances::from_deposits(&PaperConfig::default().with_deposit("USD", 500.0).deposits());
    let mut running = initial.clone();
    let mut timeline = Timeline::default();

    for (side, price, qty, fee) in [
        (Side::Buy, 10.1, 3.3, 0.7),
        (Side::Sell, 10.4, 1.1, 0.35),
        (Side::Buy, 9.87, 0.25, 0.35),
    ] {
        let execution = Execution::new(None, &inst, side, price, qty, fee, 0);
        running.apply(&execution);
        timeline.append(execution);
    }

    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline.replay_balances(&initial), running);
    assert_eq!(timeline.for_symbol(&Symbol::new("MSFT")).count(), 0);
}

// --- Orders ---

#[test]
fn test_order_store_ids_and_views() {
    let mut store = OrderStore::default();
    let aapl = Symbol::new("AAPL");
    let msft = Symbol::new("MSFT");

    let a = store.next_id();
    let b = store.next_id();
    let c = store.next_id();
    assert_eq!(a, OrderId::new(1));
    assert!(a < b && b < c);

    store.insert(Order::limit(a, aapl.clone(), Side::Buy, 1.0, 10.0, 0));
    store.insert(Order::limit(b, aapl.clone(), Side::Sell, 1.0, 11.0, 0));
    store.insert(Order::limit(c, msft.clone(), Side::Buy, 1.0, 20.0, 0));

    assert_eq!(store.working_ids(&aapl, SideFilter::All), vec![a, b]);
    assert_eq!(store.working_ids(&aapl, SideFilter::Sell), vec![b]);

    store.get_mut(a).unwrap().cancel();
    assert_eq!(store.working_ids(&aapl, SideFilter::All), vec![b]);
    assert_eq!(store.for_symbol(&aapl).count(), 2);

    store.get_mut(b).unwrap().record_fill(1.0);
    assert!(!store.has_working(&aapl));
    assert!(store.has_working(&msft));
    assert_eq!(store.working().count(), 1);
    assert_eq!(store.len(), 3);
}

// --- Instruments ---

#[test]
fn test_instrument_table_normalizes_and_keeps_first_copy() {
    let mut table = InstrumentTable::new([aapl().with_tick_size(0.05)]);

    // A later registration does not replace the stored instrument.
    table.register(aapl().with_tick_size(0.01));
    assert_eq!(table.get(&Symbol::new("AAPL")).unwrap().tick_size(), Some(0.05));

    assert_eq!(table.normalize_price(&Symbol::new("AAPL"), 10.07), 10.05);
    assert_eq!(table.normalize_price(&Symbol::new("NOPE"), 10.07), 10.07);

    table.register(Instrument::new("PENNY", "OTC", "USD"));
    assert_eq!(table.normalize_price(&Symbol::new("PENNY"), 0.12346), 0.1235);
    assert_eq!(table.tick_size(&Symbol::new("PENNY"), 50.0), Some(0.0001));
}

// --- Config ---

#[test]
fn test_config_sums_repeated_deposits() {
    let config = PaperConfig::default()
        .with_deposit("USD", 100.0)
        .with_deposit("USD", 50.0)
        .with_deposit("EUR", 10.0);
    let deposits = config.deposits();
    assert_eq!(deposits["USD"], 150.0);
    assert_eq!(deposits["EUR"], 10.0);
    assert_eq!(config.snapshot_timeout(), None);
    assert_eq!(config.instrument_dictionary(), "default");
}

#[test]
fn test_config_missing_file_falls_back_to_defaults() {
    let config = PaperConfig::load(std::path::Path::new("does-not-exist.toml")).unwrap();
    assert!(config.deposits().is_empty());
    assert_eq!(config.refresh_interval(), std::time::Duration::from_secs(5));
}
