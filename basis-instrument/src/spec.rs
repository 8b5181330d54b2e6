use crate::symbol::Symbol;
use derive_more::Constructor;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Venue trading rules for one [`Symbol`] - loaded once at start from the venue symbol
/// catalog, refreshable on demand.
///
/// All order amounts are rounded against these rules before dispatch, see [`SymbolSpec::round_base`]
/// and friends.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct SymbolSpec {
    pub symbol: Symbol,
    /// Base asset quantity precision in decimal places.
    pub base_precision: u32,
    /// Quote asset amount precision in decimal places.
    pub quote_precision: u32,
    /// Smallest base quantity the venue accepts.
    pub min_base_quantity: Decimal,
    /// Smallest quote notional (price * quantity) the venue accepts.
    pub min_quote_notional: Decimal,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    /// False when the venue has suspended trading for this symbol.
    pub active: bool,
    /// Futures only: base quantity represented by one contract.
    pub contract_size: Option<Decimal>,
}

impl SymbolSpec {
    /// Round a base quantity down to the venue's declared precision.
    ///
    /// Truncating (never rounds up past an available amount) and idempotent.
    pub fn round_base(&self, quantity: Decimal) -> Decimal {
        quantity
            .round_dp_with_strategy(self.base_precision, RoundingStrategy::ToZero)
            .normalize()
    }

    /// Round a quote amount down to the venue's declared precision.
    pub fn round_quote(&self, amount: Decimal) -> Decimal {
        amount
            .round_dp_with_strategy(self.quote_precision, RoundingStrategy::ToZero)
            .normalize()
    }

    /// Snap a base quantity down to a whole multiple of the venue contract size.
    ///
    /// Returns the quantity unchanged for symbols without a contract size (spot).
    pub fn round_base_to_contracts(&self, quantity: Decimal) -> Decimal {
        match self.contract_size {
            Some(contract_size) if !contract_size.is_zero() => {
                ((quantity / contract_size).floor() * contract_size).normalize()
            }
            _ => self.round_base(quantity),
        }
    }

    /// Check a (price, quantity) pair satisfies the venue minimums.
    ///
    /// The lower bounds are inclusive: an amount exactly equal to the minimum is accepted.
    pub fn meets_minimums(&self, price: Decimal, quantity: Decimal) -> bool {
        quantity >= self.min_base_quantity && price * quantity >= self.min_quote_notional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;
    use rust_decimal_macros::dec;

    fn spec(base_precision: u32, contract_size: Option<Decimal>) -> SymbolSpec {
        SymbolSpec {
            symbol: Symbol::spot("btc", "usdt"),
            base_precision,
            quote_precision: 2,
            min_base_quantity: dec!(0.0001),
            min_quote_notional: dec!(5),
            maker_fee: dec!(0.0002),
            taker_fee: dec!(0.0005),
            active: true,
            contract_size,
        }
    }

    #[test]
    fn test_round_base_truncates() {
        struct TestCase {
            input: Decimal,
            precision: u32,
            expected: Decimal,
        }

        let tests = vec![
            TestCase {
                // TC0: truncated, not rounded up
                input: dec!(0.123456789),
                precision: 4,
                expected: dec!(0.1234),
            },
            TestCase {
                // TC1: already at precision
                input: dec!(0.1234),
                precision: 4,
                expected: dec!(0.1234),
            },
            TestCase {
                // TC2: zero precision truncates to integer
                input: dec!(7.999),
                precision: 0,
                expected: dec!(7),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = spec(test.precision, None).round_base(test.input);
            assert_eq!(actual, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_round_base_idempotent() {
        let spec = spec(6, None);
        let once = spec.round_base(dec!(1.23456789));
        assert_eq!(spec.round_base(once), once);
    }

    #[test]
    fn test_round_base_to_contracts() {
        let spec = spec(8, Some(dec!(0.01)));
        assert_eq!(spec.round_base_to_contracts(dec!(0.2599)), dec!(0.25));
        assert_eq!(spec.round_base_to_contracts(dec!(0.25)), dec!(0.25));
        assert_eq!(spec.round_base_to_contracts(dec!(0.0099)), dec!(0));
    }

    #[test]
    fn test_meets_minimums_inclusive_bound() {
        let spec = spec(8, None);
        // Exactly min notional / price is accepted
        assert!(spec.meets_minimums(dec!(100), dec!(0.05)));
        assert!(!spec.meets_minimums(dec!(100), dec!(0.0499)));
        assert!(!spec.meets_minimums(dec!(100), dec!(0.00009)));
    }
}
