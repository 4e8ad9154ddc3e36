//! Cart invariants under random sequences of cart operations.
//!
//! Each case replays the same operations against the cart store and a
//! plain list model, then checks the store agrees with the model.

use proptest::prelude::*;
use rust_decimal::Decimal;

use techhub_core::{Product, ProductId};
use techhub_integration_tests::product;
use techhub_storefront::services::CartStore;

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    Increment(usize),
    Decrement(usize),
    Clear,
}

const PRICES: [i64; 5] = [100, 50, 12, 300, 0];

fn products() -> Vec<Product> {
    PRICES
        .iter()
        .zip(1u64..)
        .map(|(&price, id)| product(id, &format!("Product {id}"), price))
        .collect()
}

fn op() -> impl Strategy<Value = Op> {
    let index = 0..PRICES.len();
    prop_oneof![
        4 => index.clone().prop_map(Op::Add),
        1 => index.clone().prop_map(Op::Remove),
        2 => index.clone().prop_map(Op::Increment),
        2 => index.prop_map(Op::Decrement),
        1 => Just(Op::Clear),
    ]
}

/// Product index and quantity per line, in insertion order.
fn model(ops: &[Op]) -> Vec<(usize, u32)> {
    let mut lines: Vec<(usize, u32)> = Vec::new();
    for op in ops {
        match *op {
            Op::Add(i) => match lines.iter_mut().find(|(p, _)| *p == i) {
                Some((_, qty)) => *qty += 1,
                None => lines.push((i, 1)),
            },
            Op::Remove(i) => lines.retain(|(p, _)| *p != i),
            Op::Increment(i) => {
                if let Some((_, qty)) = lines.iter_mut().find(|(p, _)| *p == i) {
                    *qty += 1;
                }
            }
            Op::Decrement(i) => {
                if let Some((_, qty)) = lines.iter_mut().find(|(p, _)| *p == i) {
                    *qty = (*qty - 1).max(1);
                }
            }
            Op::Clear => lines.clear(),
        }
    }
    lines
}

fn apply(cart: &CartStore, op: &Op, products: &[Product]) {
    match *op {
        Op::Add(i) => cart.add_to_cart(&products[i]),
        Op::Remove(i) => cart.remove_from_cart(&products[i].id),
        Op::Increment(i) => cart.increment_quantity(&products[i].id),
        Op::Decrement(i) => cart.decrement_quantity(&products[i].id),
        Op::Clear => cart.clear_cart(),
    }
    .expect("Cart rejected an operation outside checkout");
}

fn replay(ops: &[Op], products: &[Product]) -> CartStore {
    let cart = CartStore::new();
    for op in ops {
        apply(&cart, op, products);
    }
    cart
}

proptest! {
    #[test]
    fn cart_matches_model(ops in prop::collection::vec(op(), 0..64)) {
        let products = products();
        let cart = replay(&ops, &products);
        let expected = model(&ops);
        let snapshot = cart.snapshot();

        let actual: Vec<(ProductId, u32)> = snapshot
            .items
            .iter()
            .map(|line| (line.id().clone(), line.quantity.get()))
            .collect();
        let wanted: Vec<(ProductId, u32)> = expected
            .iter()
            .map(|&(i, qty)| (products[i].id.clone(), qty))
            .collect();
        prop_assert_eq!(actual, wanted);
    }

    #[test]
    fn lines_unique_and_totals_consistent(ops in prop::collection::vec(op(), 0..64)) {
        let products = products();
        let cart = replay(&ops, &products);
        let snapshot = cart.snapshot();

        let mut ids: Vec<&ProductId> = snapshot.items.iter().map(|line| line.id()).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), snapshot.items.len());

        let mut total = Decimal::ZERO;
        let mut count = 0u64;
        for line in &snapshot.items {
            prop_assert!(line.quantity.get() >= 1);
            prop_assert_eq!(CartStore::item_total(line), line.unit_price() * Decimal::from(line.quantity.get()));
            total += CartStore::item_total(line);
            count += u64::from(line.quantity.get());
        }
        prop_assert_eq!(cart.total_price(), total);
        prop_assert_eq!(cart.item_count(), count);
        prop_assert_eq!(cart.is_empty(), snapshot.items.is_empty());
    }

    #[test]
    fn repeated_add_counts_every_tap(index in 0..PRICES.len(), taps in 1u32..40) {
        let products = products();
        let cart = CartStore::new();
        for _ in 0..taps {
            cart.add_to_cart(&products[index]).expect("Add failed");
        }

        let line = cart.get(&products[index].id).expect("Line missing");
        prop_assert_eq!(line.quantity.get(), taps);
        prop_assert_eq!(cart.snapshot().items.len(), 1);
        prop_assert_eq!(
            cart.total_price(),
            Decimal::new(PRICES[index], 0) * Decimal::from(taps)
        );
    }

    #[test]
    fn revision_moves_only_on_change(ops in prop::collection::vec(op(), 0..32)) {
        let products = products();
        let cart = CartStore::new();
        let mut revision = cart.snapshot().revision;
        for op in &ops {
            let before = cart.snapshot();
            apply(&cart, op, &products);
            let after = cart.snapshot();
            if after.items == before.items {
                prop_assert_eq!(after.revision, revision);
            } else {
                prop_assert_eq!(after.revision, revision + 1);
            }
            revision = after.revision;
        }
    }
}
