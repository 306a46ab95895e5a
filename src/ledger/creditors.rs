//! Creditor balance arithmetic

use bigdecimal::BigDecimal;

use crate::config::BalanceFloor;

/// Balance rules for creditor adjustments
///
/// Payments settling a balance and purchases released from a creditor are
/// always floored at zero. Charges, purchase deltas and refunds are only
/// floored under [`BalanceFloor::Always`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreditorBook {
    floor: BalanceFloor,
}

impl CreditorBook {
    pub fn new(floor: BalanceFloor) -> Self {
        Self { floor }
    }

    pub fn floor(&self) -> BalanceFloor {
        self.floor
    }

    fn clamp(value: BigDecimal) -> BigDecimal {
        if value < BigDecimal::from(0) {
            BigDecimal::from(0)
        } else {
            value
        }
    }

    fn apply_floor(&self, value: BigDecimal) -> BigDecimal {
        match self.floor {
            BalanceFloor::Compatible => value,
            BalanceFloor::Always => Self::clamp(value),
        }
    }

    /// A purchase raises the balance by its total
    pub fn charge(&self, balance: &BigDecimal, total: &BigDecimal) -> BigDecimal {
        self.apply_floor(balance + total)
    }

    /// An amended purchase moves the balance by the change in its total
    pub fn adjust(&self, balance: &BigDecimal, delta: &BigDecimal) -> BigDecimal {
        self.apply_floor(balance + delta)
    }

    /// A purchase leaves the creditor; never below zero
    pub fn release(&self, balance: &BigDecimal, total: &BigDecimal) -> BigDecimal {
        Self::clamp(balance - total)
    }

    /// A payment (or an increase in one) settles the balance; never below zero
    pub fn settle(&self, balance: &BigDecimal, amount: &BigDecimal) -> BigDecimal {
        Self::clamp(balance - amount)
    }

    /// A payment leaves the creditor and its amount is owed again
    pub fn refund(&self, balance: &BigDecimal, amount: &BigDecimal) -> BigDecimal {
        self.apply_floor(balance + amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64) -> BigDecimal {
        BigDecimal::from(value)
    }

    #[test]
    fn test_settle_never_goes_negative() {
        let book = CreditorBook::default();
        assert_eq!(book.settle(&dec(500), &dec(200)), dec(300));
        assert_eq!(book.settle(&dec(100), &dec(250)), dec(0));
        // A reduced payment settles a negative delta
        assert_eq!(book.settle(&dec(100), &dec(-50)), dec(150));
    }

    #[test]
    fn test_release_is_floored() {
        let book = CreditorBook::default();
        assert_eq!(book.release(&dec(300), &dec(500)), dec(0));
        assert_eq!(book.release(&dec(800), &dec(500)), dec(300));
    }

    #[test]
    fn test_compatible_floor_keeps_unfloored_paths() {
        let book = CreditorBook::new(BalanceFloor::Compatible);
        assert_eq!(book.floor(), BalanceFloor::Compatible);
        assert_eq!(book.adjust(&dec(100), &dec(-150)), dec(-50));
        assert_eq!(book.refund(&dec(-20), &dec(10)), dec(-10));
        assert_eq!(book.charge(&dec(0), &dec(500)), dec(500));
    }

    #[test]
    fn test_always_floor_clamps_everything() {
        let book = CreditorBook::new(BalanceFloor::Always);
        assert_eq!(book.floor(), BalanceFloor::Always);
        assert_eq!(book.adjust(&dec(100), &dec(-150)), dec(0));
        assert_eq!(book.refund(&dec(-20), &dec(10)), dec(0));
        assert_eq!(book.charge(&dec(40), &dec(60)), dec(100));
    }
}
