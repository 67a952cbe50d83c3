//! Discount pricing
//!
//! Prices are `Decimal` throughout; every public function rounds to cents.

use rust_decimal::Decimal;

/// Unit price after applying a percentage discount.
///
/// `discount` is a whole percentage in `0..=100`.
pub fn effective_unit_price(price: Decimal, discount: i32) -> Decimal {
    let factor = Decimal::ONE - Decimal::from(discount) / Decimal::from(100);
    (price * factor).round_dp(2)
}

/// Total across `(unit_price, quantity)` lines.
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .fold(Decimal::ZERO, |acc, (price, qty)| {
            acc + price * Decimal::from(qty)
        })
        .round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_percent_off_one_hundred_is_eighty() {
        let unit = effective_unit_price(Decimal::new(100, 0), 20);
        assert_eq!(unit, Decimal::new(8000, 2));
    }

    #[test]
    fn zero_discount_keeps_price() {
        assert_eq!(
            effective_unit_price(Decimal::new(5000, 2), 0),
            Decimal::new(5000, 2)
        );
    }

    #[test]
    fn full_discount_is_free() {
        assert_eq!(effective_unit_price(Decimal::new(100, 0), 100), Decimal::ZERO);
    }

    #[test]
    fn fractional_result_rounds_to_cents() {
        // 19.99 at 15% off = 16.9915
        let unit = effective_unit_price(Decimal::new(1999, 2), 15);
        assert_eq!(unit, Decimal::new(1699, 2));
    }

    #[test]
    fn three_units_at_eighty_total_two_forty() {
        let total = order_total([(Decimal::new(8000, 2), 3)]);
        assert_eq!(total, Decimal::new(24000, 2));
    }

    #[test]
    fn total_sums_across_lines() {
        let total = order_total([
            (Decimal::new(8000, 2), 3),
            (Decimal::new(1250, 2), 2),
        ]);
        assert_eq!(total, Decimal::new(26500, 2));
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(order_total([]), Decimal::ZERO);
    }
}
