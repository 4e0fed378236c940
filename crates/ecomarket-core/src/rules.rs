//! Test-sale classification and stock arithmetic.
//!
//! Two invariants live here:
//! - Test events (branch id prefixed `TEST`, or the designated test
//!   product) never mutate shared stock or contribute to revenue.
//! - Stock never goes negative: decrements floor at zero.

use crate::types::SaleEvent;

/// Branch-id prefix marking a sale as a test event.
pub const TEST_BRANCH_PREFIX: &str = "TEST";

/// Classifies an event as a test sale.
///
/// Test sales flow through the full pipeline (dedup, history, broadcast)
/// but are excluded from stock and revenue mutation.
pub fn is_test_sale(event: &SaleEvent, test_product_id: u32) -> bool {
    event.branch_id.starts_with(TEST_BRANCH_PREFIX) || event.product_id == test_product_id
}

/// Applies a sale to a stock level, flooring at zero.
pub fn decrement_stock(stock: u32, quantity_sold: u32) -> u32 {
    stock.saturating_sub(quantity_sold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TEST_PRODUCT_ID;
    use chrono::Utc;

    fn event(branch_id: &str, product_id: u32) -> SaleEvent {
        SaleEvent {
            sale_id: Some("s-1".into()),
            branch_id: branch_id.into(),
            product_id,
            quantity_sold: 1,
            timestamp: Utc::now(),
            money_received: None,
            total_amount: 1.0,
            change: None,
        }
    }

    #[test]
    fn test_branch_prefix_classification() {
        assert!(is_test_sale(&event("TEST-SUCURSAL", 1), TEST_PRODUCT_ID));
        assert!(is_test_sale(&event("TESTER", 1), TEST_PRODUCT_ID));
        assert!(!is_test_sale(&event("sucursal-demo", 1), TEST_PRODUCT_ID));
    }

    #[test]
    fn test_product_id_classification() {
        assert!(is_test_sale(
            &event("sucursal-demo", TEST_PRODUCT_ID),
            TEST_PRODUCT_ID
        ));
    }

    #[test]
    fn test_stock_floor() {
        assert_eq!(decrement_stock(10, 3), 7);
        assert_eq!(decrement_stock(2, 5), 0);
        assert_eq!(decrement_stock(0, 1), 0);
    }
}
