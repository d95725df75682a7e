//! Guarded in-place document mutations shared by every backend.
//!
//! Each function inspects the current document, applies the change only when
//! the guard holds, and reports what happened. Backends load the document
//! under a lock (or `FOR UPDATE`), call one of these, and persist the result
//! when it returns `Applied`.

use chrono::Utc;
use common::ProductId;
use domain::{
    ItemStatus, Order, Payment, PaymentConfirmation, PaymentStatus, SellerOrder,
    SellerPaymentStatus,
};

use crate::WriteOutcome;

fn compare(current: ItemStatus, expected: &[ItemStatus], target: ItemStatus) -> WriteOutcome {
    if current == target {
        WriteOutcome::AlreadyApplied
    } else if expected.contains(&current) {
        WriteOutcome::Applied
    } else {
        WriteOutcome::Conflict { actual: current }
    }
}

pub(crate) fn order_item_status(
    order: &mut Order,
    product_id: &ProductId,
    expected: &[ItemStatus],
    target: ItemStatus,
) -> WriteOutcome {
    let Some(item) = order.item_mut(product_id) else {
        return WriteOutcome::Missing;
    };
    let outcome = compare(item.order_status, expected, target);
    if outcome == WriteOutcome::Applied {
        item.order_status = target;
        order.updated_at = Utc::now();
    }
    outcome
}

pub(crate) fn order_promote(order: &mut Order, from: ItemStatus, to: ItemStatus) -> WriteOutcome {
    let mut changed = false;
    for item in order.items.iter_mut().filter(|i| i.order_status == from) {
        item.order_status = to;
        changed = true;
    }
    if changed {
        order.updated_at = Utc::now();
        WriteOutcome::Applied
    } else {
        WriteOutcome::AlreadyApplied
    }
}

pub(crate) fn order_remove_item(
    order: &mut Order,
    product_id: &ProductId,
    expected: ItemStatus,
) -> WriteOutcome {
    let Some(item) = order.item(product_id) else {
        return WriteOutcome::Missing;
    };
    if item.order_status != expected {
        return WriteOutcome::Conflict {
            actual: item.order_status,
        };
    }
    order.remove_item(product_id);
    order.updated_at = Utc::now();
    WriteOutcome::Applied
}

pub(crate) fn order_confirm_payment(
    order: &mut Order,
    confirmation: &PaymentConfirmation,
) -> WriteOutcome {
    if order.payment.status == PaymentStatus::Success {
        return WriteOutcome::AlreadyApplied;
    }
    order.payment.status = PaymentStatus::Success;
    order.payment.payment_method = Some(confirmation.payment_method.clone());
    order.payment.transaction_id = Some(confirmation.transaction_id.clone());
    order.updated_at = Utc::now();
    WriteOutcome::Applied
}

pub(crate) fn seller_item_status(
    order: &mut SellerOrder,
    product_id: &ProductId,
    expected: &[ItemStatus],
    target: ItemStatus,
) -> WriteOutcome {
    let Some(item) = order.item_mut(product_id) else {
        return WriteOutcome::Missing;
    };
    let outcome = compare(item.order_status, expected, target);
    if outcome == WriteOutcome::Applied {
        item.order_status = target;
        order.updated_at = Utc::now();
    }
    outcome
}

pub(crate) fn seller_remove_item(
    order: &mut SellerOrder,
    product_id: &ProductId,
    expected: ItemStatus,
) -> WriteOutcome {
    let Some(item) = order.item(product_id) else {
        return WriteOutcome::Missing;
    };
    if item.order_status != expected {
        return WriteOutcome::Conflict {
            actual: item.order_status,
        };
    }
    order.remove_item(product_id);
    order.updated_at = Utc::now();
    WriteOutcome::Applied
}

pub(crate) fn seller_confirm_payment(order: &mut SellerOrder) -> WriteOutcome {
    let pending = order
        .items
        .iter()
        .any(|i| i.order_status == ItemStatus::Pending);
    if order.payment_status == SellerPaymentStatus::Success && !pending {
        return WriteOutcome::AlreadyApplied;
    }
    order.payment_status = SellerPaymentStatus::Success;
    for item in order
        .items
        .iter_mut()
        .filter(|i| i.order_status == ItemStatus::Pending)
    {
        item.order_status = ItemStatus::Processed;
    }
    order.updated_at = Utc::now();
    WriteOutcome::Applied
}

pub(crate) fn payment_confirm(
    payment: &mut Payment,
    confirmation: &PaymentConfirmation,
) -> WriteOutcome {
    if payment.status == PaymentStatus::Success {
        return WriteOutcome::AlreadyApplied;
    }
    payment.status = PaymentStatus::Success;
    payment.payment_method = Some(confirmation.payment_method.clone());
    payment.transaction_id = Some(confirmation.transaction_id.clone());
    payment.updated_at = Utc::now();
    WriteOutcome::Applied
}

pub(crate) fn payment_mark_notified(payment: &mut Payment) -> WriteOutcome {
    if payment.buyer_notified {
        return WriteOutcome::AlreadyApplied;
    }
    payment.buyer_notified = true;
    payment.updated_at = Utc::now();
    WriteOutcome::Applied
}
