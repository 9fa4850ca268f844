//! Pricing policy for cart and order lines.
//!
//! A line's unit price is captured once, when the line is first created, and
//! never refreshed from the catalog afterwards. Totals are never stored on a
//! cart: they are recomputed from the lines every time they are needed. Only
//! an order keeps a total, frozen at conversion time.
//!
//! Every store backend and service computes money through these functions so
//! the rules live in exactly one place.

use crate::types::{Price, Quantity};

/// Price of a single line.
#[must_use]
pub fn line_total(unit_price: Price, quantity: Quantity) -> Price {
    unit_price.times(quantity)
}

/// Sum of `unit_price × quantity` over a set of lines.
#[must_use]
pub fn total<I>(lines: I) -> Price
where
    I: IntoIterator<Item = (Price, Quantity)>,
{
    lines
        .into_iter()
        .map(|(unit_price, quantity)| line_total(unit_price, quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(cents: i64) -> Price {
        Price::from_cents(cents).expect("non-negative")
    }

    fn qty(n: i32) -> Quantity {
        Quantity::exact(n).expect("in range")
    }

    #[test]
    fn test_total_laptop_and_phones() {
        let lines = [(price(99_999), qty(1)), (price(49_999), qty(2))];
        assert_eq!(total(lines), price(199_997));
    }

    #[test]
    fn test_total_of_nothing_is_zero() {
        assert_eq!(total(Vec::new()), Price::ZERO);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(price(19_999), qty(3)), price(59_997));
    }
}
