//! Property-based invariants for the matching book.

use crate::common::{RecordingSink, assert_book_invariants};
use exchange_rs::prelude::*;
use proptest::prelude::*;
use proptest::strategy::Strategy;

#[derive(Debug, Clone)]
enum Action {
    Add { client_id: ClientId, client_order_id: OrderId, side: Side, price: Price, qty: Qty },
    Cancel { client_id: ClientId, client_order_id: OrderId },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0u32..4, 0u64..32, prop::bool::ANY, 95i64..105, 1u32..20).prop_map(
            |(client_id, client_order_id, buy, price, qty)| Action::Add {
                client_id,
                client_order_id,
                side: if buy { Side::Buy } else { Side::Sell },
                price,
                qty,
            }
        ),
        1 => (0u32..4, 0u64..32).prop_map(|(client_id, client_order_id)| Action::Cancel {
            client_id,
            client_order_id,
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any action sequence the ladder is sorted, priorities are
    /// FIFO, the book is uncrossed, and the reverse index agrees with
    /// the ladder.
    #[test]
    fn random_flow_preserves_invariants(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let mut book = OrderBook::new(0);
        let mut sink = RecordingSink::default();
        // Every (client, client-order-id) pair ever submitted.
        let mut submitted: std::collections::HashSet<(ClientId, OrderId)> =
            std::collections::HashSet::new();

        for action in &actions {
            match *action {
                Action::Add { client_id, client_order_id, side, price, qty } => {
                    // The reverse index slot must be free before reuse.
                    if book.find_order(client_id, client_order_id).is_none() {
                        book.add(&mut sink, client_id, client_order_id, side, price, qty);
                        submitted.insert((client_id, client_order_id));
                    }
                }
                Action::Cancel { client_id, client_order_id } => {
                    book.cancel(&mut sink, client_id, client_order_id);
                }
            }
            assert_book_invariants(&book);
        }

        // P2: every resting order is reachable through the reverse index,
        // and the ladder holds exactly the orders the index knows.
        let ladder_orders: usize = book
            .side_levels(Side::Buy)
            .iter()
            .chain(book.side_levels(Side::Sell).iter())
            .map(|(_, orders)| orders.len())
            .sum();
        prop_assert_eq!(ladder_orders, book.live_orders());
        let indexed = submitted
            .iter()
            .filter(|(c, o)| book.find_order(*c, *o).is_some())
            .count();
        prop_assert_eq!(indexed, book.live_orders());
    }

    /// P5: the sum of fills for any market order never exceeds its
    /// original quantity, and full execution implies it is not resting.
    #[test]
    fn fills_never_exceed_order_quantity(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let mut book = OrderBook::new(0);
        let mut sink = RecordingSink::default();

        for action in &actions {
            match *action {
                Action::Add { client_id, client_order_id, side, price, qty } => {
                    if book.find_order(client_id, client_order_id).is_none() {
                        book.add(&mut sink, client_id, client_order_id, side, price, qty);
                    }
                }
                Action::Cancel { client_id, client_order_id } => {
                    book.cancel(&mut sink, client_id, client_order_id);
                }
            }
        }

        use std::collections::HashMap;
        let mut original: HashMap<OrderId, Qty> = HashMap::new();
        let mut executed: HashMap<OrderId, u64> = HashMap::new();
        for response in &sink.responses {
            match response.kind {
                ResponseKind::Accepted => {
                    original.insert(response.market_order_id, response.qty);
                }
                ResponseKind::Filled => {
                    *executed.entry(response.market_order_id).or_default() +=
                        u64::from(response.exec_qty);
                }
                _ => {}
            }
        }
        // Each Filled response is addressed to one owner and one market
        // order id, so summing exec_qty per id is exact.
        for (moid, filled) in &executed {
            let qty = u64::from(original.get(moid).copied().unwrap_or(0));
            prop_assert!(
                *filled <= qty,
                "market order {} filled {} of {}", moid, filled, qty
            );
        }
    }
}
