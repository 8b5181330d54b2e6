use super::context::{ArbitrageOpportunity, Direction, EngineContext, PositionState};
use crate::manager::VenueRole;
use basis_data::subscription::book::BookTicker;
use chrono::Utc;
use rust_decimal::Decimal;

/// Entry cost of crossing the pair at the provided executable prices.
///
/// `(buy_ask - sell_bid) / buy_ask * 100` - negative when the sell side pays more than the
/// buy side costs, ie/ the mispricing favours us.
pub fn entry_cost_pct(buy_ask: Decimal, sell_bid: Decimal) -> Decimal {
    if buy_ask.is_zero() {
        return Decimal::ZERO;
    }
    (buy_ask - sell_bid) / buy_ask * Decimal::ONE_HUNDRED
}

/// Identify an entry opportunity from fresh top-of-book views of both legs.
///
/// Both directions are evaluated; the cheaper one is taken if its cost is strictly below
/// `max_entry_cost_pct`. The executable quantity is bounded by the visible depth on both
/// legs and the configured position limit, and must clear both venue minimum notionals
/// (inclusive bound).
pub fn identify(
    context: &EngineContext,
    spot: &BookTicker,
    futures: &BookTicker,
) -> Option<ArbitrageOpportunity> {
    let spot_to_futures = entry_cost_pct(spot.ask.price, futures.bid.price);
    let futures_to_spot = entry_cost_pct(futures.ask.price, spot.bid.price);

    let (direction, spread_pct) = if spot_to_futures <= futures_to_spot {
        (Direction::SpotToFutures, spot_to_futures)
    } else {
        (Direction::FuturesToSpot, futures_to_spot)
    };

    // Strict bound: a spread exactly at the threshold is not taken
    if spread_pct >= context.params.max_entry_cost_pct {
        return None;
    }

    let (buy_price, sell_price, buy_depth, sell_depth) = match direction {
        Direction::SpotToFutures => (
            spot.ask.price,
            futures.bid.price,
            spot.ask.amount,
            futures.bid.amount,
        ),
        Direction::FuturesToSpot => (
            futures.ask.price,
            spot.bid.price,
            futures.ask.amount,
            spot.bid.amount,
        ),
    };

    let max_quantity = buy_depth
        .min(sell_depth)
        .min(context.max_position_quantity(buy_price));

    if max_quantity <= Decimal::ZERO {
        return None;
    }

    // Enforce per-venue minimum notionals - inclusive lower bound
    let min_required = minimum_quantity(context, buy_price, sell_price);
    if max_quantity < min_required {
        return None;
    }

    // Recognised-but-optional volume and profit floors
    if let Some(min_volume_quote) = context.params.min_volume_quote {
        if max_quantity * buy_price < min_volume_quote {
            return None;
        }
    }
    if let Some(min_profit_quote) = context.params.min_profit_quote {
        let quantity = (context.base_position_size_quote / buy_price).min(max_quantity);
        if (sell_price - buy_price) * quantity < min_profit_quote {
            return None;
        }
    }

    Some(ArbitrageOpportunity {
        direction,
        spread_pct,
        buy_price,
        sell_price,
        max_quantity,
        time: Utc::now(),
    })
}

/// Smallest quantity satisfying both venue minimum notionals at the executable prices.
fn minimum_quantity(context: &EngineContext, buy_price: Decimal, sell_price: Decimal) -> Decimal {
    let reference_price = buy_price.max(sell_price);
    if reference_price.is_zero() {
        return Decimal::ZERO;
    }

    let spot_min = context.min_quote_quantity.get(VenueRole::Spot) / reference_price;
    let futures_min = context.min_quote_quantity.get(VenueRole::Futures) / reference_price;
    spot_min.max(futures_min)
}

/// Cost of unwinding the currently held pair - selling what was bought and buying what was
/// sold at the current top of book.
///
/// Returns `None` while flat or when the position direction is unreadable.
pub fn exit_cost_pct(
    positions: &PositionState,
    spot: &BookTicker,
    futures: &BookTicker,
) -> Option<Decimal> {
    let long_spot = positions.spot.signed_quantity > Decimal::ZERO;
    let short_futures = positions.futures.signed_quantity < Decimal::ZERO;
    let short_spot = positions.spot.signed_quantity < Decimal::ZERO;
    let long_futures = positions.futures.signed_quantity > Decimal::ZERO;

    if long_spot && short_futures {
        // Unwind: sell spot at the bid, buy futures at the ask
        Some(entry_cost_pct(futures.ask.price, spot.bid.price))
    } else if short_spot && long_futures {
        // Unwind: buy spot at the ask, sell futures at the bid
        Some(entry_cost_pct(spot.ask.price, futures.bid.price))
    } else if positions.has_positions() {
        // Unclear direction - take the more conservative of both unwinds
        Some(
            entry_cost_pct(futures.ask.price, spot.bid.price)
                .max(entry_cost_pct(spot.ask.price, futures.bid.price)),
        )
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TradingParams;
    use basis_data::books::Level;
    use basis_instrument::{Side, symbol::Symbol};
    use rust_decimal_macros::dec;

    fn ticker(bid: Decimal, bid_qty: Decimal, ask: Decimal, ask_qty: Decimal) -> BookTicker {
        BookTicker {
            time_exchange: Utc::now(),
            update_id: 1,
            bid: Level::new(bid, bid_qty),
            ask: Level::new(ask, ask_qty),
        }
    }

    fn context() -> EngineContext {
        let mut context = EngineContext::new(
            "test".to_string(),
            Symbol::spot("btc", "usdt"),
            dec!(20),
            dec!(2),
            dec!(1),
            TradingParams::default(),
        );
        context.min_quote_quantity.spot = dec!(5);
        context.min_quote_quantity.futures = dec!(5);
        context
    }

    #[test]
    fn test_entry_cost_sign_convention() {
        // Futures bid above spot ask: negative cost, favourable
        assert!(entry_cost_pct(dec!(100.01), dec!(100.15)) < Decimal::ZERO);
        // Futures bid below spot ask: positive cost, unfavourable
        assert!(entry_cost_pct(dec!(100.15), dec!(100.01)) > Decimal::ZERO);
    }

    #[test]
    fn test_identify_spot_to_futures() {
        // Spec scenario: A 100.00/100.01, B 100.15/100.16 with -0.10 threshold
        let context = context();
        let spot = ticker(dec!(100.00), dec!(1), dec!(100.01), dec!(1));
        let futures = ticker(dec!(100.15), dec!(1), dec!(100.16), dec!(1));

        let opportunity = identify(&context, &spot, &futures).unwrap();
        assert_eq!(opportunity.direction, Direction::SpotToFutures);
        assert_eq!(opportunity.buy_price, dec!(100.01));
        assert_eq!(opportunity.sell_price, dec!(100.15));
        // (100.01 - 100.15) / 100.01 * 100 ~ -0.1399..%
        assert!(opportunity.spread_pct < dec!(-0.139));
        assert!(opportunity.spread_pct > dec!(-0.141));
    }

    #[test]
    fn test_identify_exact_threshold_not_taken() {
        // Boundary: spread exactly at max_entry_cost_pct must not be taken
        let mut context = context();
        // Construct prices so entry cost is exactly -0.10%: buy 100, sell 100.10
        context.params.max_entry_cost_pct = dec!(-0.10);
        let spot = ticker(dec!(99.90), dec!(1), dec!(100.00), dec!(1));
        let futures = ticker(dec!(100.10), dec!(1), dec!(100.20), dec!(1));

        assert!(identify(&context, &spot, &futures).is_none());
    }

    #[test]
    fn test_identify_min_notional_boundary() {
        let context = context();
        // Favourable spread but depth exactly at the minimum quantity: taken (inclusive)
        let min_qty = dec!(5) / dec!(100.15);
        let spot = ticker(dec!(100.00), min_qty, dec!(100.01), min_qty);
        let futures = ticker(dec!(100.15), min_qty, dec!(100.16), min_qty);

        let opportunity = identify(&context, &spot, &futures).unwrap();
        assert_eq!(opportunity.max_quantity, min_qty);

        // One tick below the minimum: rejected
        let below = min_qty - dec!(0.0001);
        let spot = ticker(dec!(100.00), below, dec!(100.01), below);
        let futures = ticker(dec!(100.15), below, dec!(100.16), below);
        assert!(identify(&context, &spot, &futures).is_none());
    }

    #[test]
    fn test_identify_position_limit_caps_quantity() {
        let context = context();
        // Deep books: quantity capped by base_position_size * multiplier / price
        let spot = ticker(dec!(100.00), dec!(100), dec!(100.01), dec!(100));
        let futures = ticker(dec!(100.15), dec!(100), dec!(100.16), dec!(100));

        let opportunity = identify(&context, &spot, &futures).unwrap();
        assert_eq!(
            opportunity.max_quantity,
            dec!(40) / dec!(100.01),
        );
    }

    #[test]
    fn test_identify_futures_to_spot_direction() {
        let context = context();
        // Spot bid well above futures ask
        let spot = ticker(dec!(100.30), dec!(1), dec!(100.31), dec!(1));
        let futures = ticker(dec!(100.14), dec!(1), dec!(100.15), dec!(1));

        let opportunity = identify(&context, &spot, &futures).unwrap();
        assert_eq!(opportunity.direction, Direction::FuturesToSpot);
        assert_eq!(opportunity.buy_price, dec!(100.15));
        assert_eq!(opportunity.sell_price, dec!(100.30));
    }

    #[test]
    fn test_exit_cost_for_long_spot_short_futures() {
        // Spec scenario: holding long spot / short futures,
        // A 100.10/100.11, B 100.12/100.13 - exit cost below 0.03%
        let mut positions = PositionState::default();
        positions.spot.apply_fill(Side::Buy, dec!(0.2), dec!(100.01));
        positions
            .futures
            .apply_fill(Side::Sell, dec!(0.2), dec!(100.15));

        let spot = ticker(dec!(100.10), dec!(1), dec!(100.11), dec!(1));
        let futures = ticker(dec!(100.12), dec!(1), dec!(100.13), dec!(1));

        let exit_cost = exit_cost_pct(&positions, &spot, &futures).unwrap();
        // (100.13 - 100.10) / 100.13 * 100 ~ 0.02996% < 0.03%
        assert!(exit_cost < dec!(0.03));
        assert!(exit_cost > dec!(0.029));
    }

    #[test]
    fn test_exit_cost_none_while_flat() {
        let positions = PositionState::default();
        let spot = ticker(dec!(100.00), dec!(1), dec!(100.01), dec!(1));
        let futures = ticker(dec!(100.15), dec!(1), dec!(100.16), dec!(1));

        assert!(exit_cost_pct(&positions, &spot, &futures).is_none());
    }
}
