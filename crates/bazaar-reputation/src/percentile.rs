// crates/bazaar-reputation/src/percentile.rs
//
// Percentile rank of one score within a score distribution, for display.
// Never used for trust-set membership.

/// Percentile rank of `value` within `scores`, as an integer in [0, 100].
///
/// Entries strictly below `value` count fully. Entries equal to `value`
/// also count as below, except the value's own entry, which gets half
/// credit. The rank is scaled to 0..=100 and floored.
///
/// Returns 0 for an empty distribution.
pub fn percentile(scores: &[f64], value: f64) -> u8 {
    if scores.is_empty() {
        return 0;
    }

    let below = scores.iter().filter(|s| **s < value).count() as f64;
    let ties = scores.iter().filter(|s| **s == value).count() as f64;

    let rank = if ties > 0.0 { below + ties - 0.5 } else { below };
    let pct = (rank / scores.len() as f64 * 100.0).floor();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_gets_half_credit() {
        assert_eq!(percentile(&[10.0, 20.0, 20.0, 30.0], 20.0), 62);
    }

    #[test]
    fn empty_distribution_is_zero() {
        assert_eq!(percentile(&[], 5.0), 0);
    }

    #[test]
    fn single_entry_is_fiftieth() {
        assert_eq!(percentile(&[7.0], 7.0), 50);
    }

    #[test]
    fn lowest_and_highest_members() {
        let scores = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&scores, 1.0), 12);
        assert_eq!(percentile(&scores, 4.0), 87);
    }

    #[test]
    fn value_outside_distribution() {
        let scores = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&scores, 0.0), 0);
        assert_eq!(percentile(&scores, 10.0), 100);
        assert_eq!(percentile(&scores, 2.5), 50);
    }

    #[test]
    fn negative_scores_rank_below_positive() {
        let scores = [-1.0, 0.5, 2.0];
        assert_eq!(percentile(&scores, -1.0), 16);
    }
}
