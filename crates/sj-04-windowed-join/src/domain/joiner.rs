//! Joiner contract and the purchase joiner.

use shared_types::{CorrelatedPurchase, Event, Purchase};

/// Combines one left and one right event into an output value.
///
/// Always called as `combine(left, right)`, whichever side arrived second.
pub trait Joiner<L, R>: Send + Sync {
    type Output;

    fn combine(&self, left: &Event<L>, right: &Event<R>) -> Self::Output;
}

impl<L, R, O, F> Joiner<L, R> for F
where
    F: Fn(&Event<L>, &Event<R>) -> O + Send + Sync,
{
    type Output = O;

    fn combine(&self, left: &Event<L>, right: &Event<R>) -> O {
        self(left, right)
    }
}

/// Pairs two purchases by the same customer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseJoiner;

impl Joiner<Purchase, Purchase> for PurchaseJoiner {
    type Output = CorrelatedPurchase;

    fn combine(&self, left: &Event<Purchase>, right: &Event<Purchase>) -> CorrelatedPurchase {
        let customer_id = if left.payload.customer_id.is_empty() {
            right.payload.customer_id.clone()
        } else {
            left.payload.customer_id.clone()
        };

        CorrelatedPurchase {
            customer_id,
            items_purchased: vec![
                left.payload.item_purchased.clone(),
                right.payload.item_purchased.clone(),
            ],
            total_amount: left.payload.total() + right.payload.total(),
            first_purchase_time: left.event_time,
            second_purchase_time: right.event_time,
        }
    }
}
