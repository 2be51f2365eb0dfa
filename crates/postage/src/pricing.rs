//! Batch pricing.
//!
//! The amount is the per-chunk balance a batch must hold to live for a given
//! time at the current chain price. The total cost scales with the number of
//! chunks the batch can stamp, `2^depth`.

use bzzup_primitives::{BzzBalance, MAX_BATCH_DEPTH, MIN_BATCH_DEPTH};
use std::time::Duration;

use crate::{PostageError, Result};

/// Per-chunk amount, in PLUR, needed to keep a batch alive for `ttl` at
/// `chain_price` PLUR per chunk per block.
pub fn calculate_amount(chain_price: u64, ttl: Duration, block_time: Duration) -> Result<u64> {
    if block_time.is_zero() {
        return Err(PostageError::InvalidArgument("block time must be positive".to_string()));
    }
    if ttl.is_zero() {
        return Err(PostageError::InvalidArgument("time to live must be positive".to_string()));
    }

    let amount = (ttl.as_secs() as u128)
        .checked_mul(chain_price as u128)
        .map(|v| v / block_time.as_secs().max(1) as u128)
        .ok_or(PostageError::PriceOverflow)?;
    u64::try_from(amount).map_err(|_| PostageError::PriceOverflow)
}

/// Total cost of a batch with `amount` per chunk and `depth`.
pub fn calculate_bzz_price(amount: u64, depth: u8) -> Result<BzzBalance> {
    validate_depth(depth)?;
    let chunks = 1u128
        .checked_shl(depth as u32)
        .ok_or(PostageError::PriceOverflow)?;
    BzzBalance::from_plur(amount as u128)
        .checked_mul(chunks)
        .ok_or(PostageError::PriceOverflow)
}

/// Checks that `depth` lies within the purchasable range.
pub fn validate_depth(depth: u8) -> Result<()> {
    if !(MIN_BATCH_DEPTH..=MAX_BATCH_DEPTH).contains(&depth) {
        return Err(PostageError::InvalidDepth {
            depth,
            min: MIN_BATCH_DEPTH,
            max: MAX_BATCH_DEPTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bzzup_primitives::PLUR_PER_BZZ;

    #[test]
    fn test_amount_scales_with_ttl() {
        let block = Duration::from_secs(5);
        let day = Duration::from_secs(86_400);
        assert_eq!(calculate_amount(24_000, day, block).unwrap(), 414_720_000);
        assert_eq!(
            calculate_amount(24_000, day * 2, block).unwrap(),
            2 * calculate_amount(24_000, day, block).unwrap()
        );
    }

    #[test]
    fn test_amount_rejects_zero_inputs() {
        assert_matches!(
            calculate_amount(1, Duration::ZERO, Duration::from_secs(5)),
            Err(PostageError::InvalidArgument(_))
        );
        assert_matches!(
            calculate_amount(1, Duration::from_secs(5), Duration::ZERO),
            Err(PostageError::InvalidArgument(_))
        );
    }

    #[test]
    fn test_amount_overflow() {
        let ttl = Duration::from_secs(u64::MAX);
        assert_matches!(
            calculate_amount(u64::MAX, ttl, Duration::from_secs(1)),
            Err(PostageError::PriceOverflow)
        );
    }

    #[test]
    fn test_bzz_price() {
        let price = calculate_bzz_price(PLUR_PER_BZZ as u64, 17).unwrap();
        assert_eq!(price.plur(), PLUR_PER_BZZ * (1 << 17));
        assert_eq!(price.to_string(), "131072.0000000000000000");

        let small = calculate_bzz_price(1, 20).unwrap();
        assert_eq!(small.to_string(), "0.0000000001048576");
    }

    #[test]
    fn test_bzz_price_validates_depth() {
        assert_matches!(
            calculate_bzz_price(1, 16),
            Err(PostageError::InvalidDepth { depth: 16, .. })
        );
        assert_matches!(
            calculate_bzz_price(1, 65),
            Err(PostageError::InvalidDepth { depth: 65, .. })
        );
    }

    #[test]
    fn test_bzz_price_at_limits() {
        let price = calculate_bzz_price(u64::MAX, MAX_BATCH_DEPTH).unwrap();
        assert_eq!(price.plur(), (u64::MAX as u128) << 64);
    }
}
