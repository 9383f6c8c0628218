//! Impulse rule validator

use crate::Direction;

use super::Leg;

/// Soft flags raised by a passing rule check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFlags {
    /// Wave 4 ended beyond the end of wave 1
    pub w4_overlap: bool,
}

/// Check five legs against the impulse rules.
///
/// Rules, in order:
/// 1. no flat leg
/// 2. directions alternate starting with the direction of leg 0
/// 3. wave 2 does not retrace past the start of wave 1
/// 4. wave 3 is longer than the shorter of waves 1 and 5
///
/// Returns `None` on the first failing rule. With `strict_wave4`, a wave 4
/// overlap is a failure as well; otherwise it is only flagged.
pub fn check_impulse(legs: &[Leg], strict_wave4: bool) -> Option<RuleFlags> {
    let [l1, l2, l3, l4, l5] = legs else {
        return None;
    };

    let s = l1.direction();
    if s == Direction::Neutral {
        return None;
    }
    let expected = [s, s.opposite(), s, s.opposite(), s];
    if legs.iter().zip(expected).any(|(leg, want)| leg.direction() != want) {
        return None;
    }

    let bullish = s.is_bullish();
    let p0 = l1.start_px;
    let p1 = l1.end_px;
    let p2 = l2.end_px;
    let p4 = l4.end_px;

    let w2_ok = if bullish { p2 > p0 } else { p2 < p0 };
    if !w2_ok {
        return None;
    }

    if l3.magnitude() <= l1.magnitude().min(l5.magnitude()) {
        return None;
    }

    let w4_overlap = if bullish { p4 < p1 } else { p4 > p1 };
    if strict_wave4 && w4_overlap {
        return None;
    }
    Some(RuleFlags { w4_overlap })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chain legs through consecutive prices, 10 bars apart
    fn chain(prices: &[f64]) -> Vec<Leg> {
        prices
            .windows(2)
            .enumerate()
            .map(|(i, w)| Leg::new(i * 10, (i + 1) * 10, w[0], w[1]))
            .collect()
    }

    #[test]
    fn test_valid_bullish() {
        let legs = chain(&[100.0, 120.0, 110.0, 145.0, 133.0, 160.0]);
        assert_eq!(check_impulse(&legs, false), Some(RuleFlags { w4_overlap: false }));
    }

    #[test]
    fn test_valid_bearish() {
        let legs = chain(&[160.0, 140.0, 150.0, 115.0, 127.0, 100.0]);
        assert!(check_impulse(&legs, false).is_some());
    }

    #[test]
    fn test_rejects_wrong_length() {
        let legs = chain(&[100.0, 120.0, 110.0, 145.0, 133.0]);
        assert!(check_impulse(&legs, false).is_none());
    }

    #[test]
    fn test_rejects_flat_leg() {
        let legs = chain(&[100.0, 120.0, 120.0, 145.0, 133.0, 160.0]);
        assert!(check_impulse(&legs, false).is_none());
    }

    #[test]
    fn test_rejects_non_alternating() {
        let legs = vec![
            Leg::new(0, 10, 100.0, 120.0),
            Leg::new(10, 20, 120.0, 130.0),
            Leg::new(20, 30, 130.0, 110.0),
            Leg::new(30, 40, 110.0, 140.0),
            Leg::new(40, 50, 140.0, 130.0),
        ];
        assert!(check_impulse(&legs, false).is_none());
    }

    #[test]
    fn test_rejects_deep_wave2() {
        let legs = chain(&[100.0, 120.0, 99.0, 145.0, 133.0, 160.0]);
        assert!(check_impulse(&legs, false).is_none());
    }

    #[test]
    fn test_rejects_short_wave3() {
        // w1 = 20, w3 = 15, w5 = 25
        let legs = chain(&[100.0, 120.0, 110.0, 125.0, 118.0, 143.0]);
        assert!(check_impulse(&legs, false).is_none());
    }

    #[test]
    fn test_w4_overlap_flag_and_strict() {
        let legs = chain(&[100.0, 120.0, 110.0, 145.0, 115.0, 160.0]);
        assert_eq!(check_impulse(&legs, false), Some(RuleFlags { w4_overlap: true }));
        assert_eq!(check_impulse(&legs, true), None);
    }
}
