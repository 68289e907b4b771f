//! Bounded bisection over a monotone balance function

use log::debug;

/// Search limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub max_iterations: u32,
    /// Absolute tolerance on the balance, currency units
    pub abs_tolerance: f64,
    /// Relative tolerance on the balance
    pub rel_tolerance: f64,
    /// Bracket width below which the upper end is accepted (one cent)
    pub min_step: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 60,
            abs_tolerance: 1.0,
            rel_tolerance: 1e-4,
            min_step: 0.005,
        }
    }
}

impl SearchConfig {
    pub fn tolerance(&self, target: f64) -> f64 {
        self.abs_tolerance.max(self.rel_tolerance * target.abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    /// Best contribution found
    pub value: f64,
    /// Balance produced by `value`
    pub achieved: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// Smallest `x` in `[lo, hi]` with `f(x)` reaching `target`, for
/// non-decreasing `f`.
///
/// Stops when a probe lands within tolerance of the target or the bracket
/// narrows below `min_step`. In the latter case the upper end is returned as
/// the closest estimate, converged only if it is within tolerance: a jump in
/// `f` across the target leaves it outside. When `f(hi)` is still short of
/// the target, returns `hi` unconverged.
pub fn bisect<F>(mut f: F, target: f64, lo: f64, hi: f64, config: &SearchConfig) -> SearchOutcome
where
    F: FnMut(f64) -> f64,
{
    let tolerance = config.tolerance(target);
    let (mut lo, mut hi) = (lo.min(hi), hi.max(lo));
    let mut f_hi = f(hi);

    if f_hi < target - tolerance {
        return SearchOutcome {
            value: hi,
            achieved: f_hi,
            iterations: 0,
            converged: false,
        };
    }

    for iteration in 1..=config.max_iterations {
        let mid = (lo + hi) / 2.0;
        let f_mid = f(mid);
        debug!(
            "bisect #{}: [{:.4}, {:.4}] mid {:.4} -> {:.2} (target {:.2})",
            iteration, lo, hi, mid, f_mid, target
        );

        if (f_mid - target).abs() < tolerance {
            return SearchOutcome {
                value: mid,
                achieved: f_mid,
                iterations: iteration,
                converged: true,
            };
        }

        if f_mid >= target {
            hi = mid;
            f_hi = f_mid;
        } else {
            lo = mid;
        }

        if hi - lo < config.min_step {
            return SearchOutcome {
                value: hi,
                achieved: f_hi,
                iterations: iteration,
                converged: (f_hi - target).abs() < tolerance,
            };
        }
    }

    SearchOutcome {
        value: hi,
        achieved: f_hi,
        iterations: config.max_iterations,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear() {
        let outcome = bisect(|x| 100.0 * x, 12_345.0, 0.0, 12_345.0, &SearchConfig::default());
        assert!(outcome.converged);
        assert_abs_diff_eq!(outcome.achieved, 12_345.0, epsilon = 1.235);
        assert!(outcome.iterations <= 60);
    }

    #[test]
    fn test_infeasible_upper_bound() {
        let outcome = bisect(|_| 10.0, 1_000.0, 0.0, 1_000.0, &SearchConfig::default());
        assert!(!outcome.converged);
        assert_eq!(outcome.value, 1_000.0);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn test_step_function_settles_on_upper_end() {
        // jumps from 400 to 900 at x = 40, so the target 700 is never hit
        let f = |x: f64| if x < 40.0 { 10.0 * x } else { 10.0 * x + 500.0 };
        let outcome = bisect(f, 700.0, 0.0, 100.0, &SearchConfig::default());
        assert!(!outcome.converged);
        assert!(outcome.achieved >= 700.0);
        assert_abs_diff_eq!(outcome.value, 40.0, epsilon = 0.01);
    }

    #[test]
    fn test_narrow_bracket_within_tolerance_converges() {
        // slope 1e6 keeps every probe outside a 1.0 tolerance until the bracket is tiny
        let config = SearchConfig {
            min_step: 1e-5,
            ..SearchConfig::default()
        };
        let outcome = bisect(|x| 1e6 * x, 123_456.7, 0.0, 1.0, &config);
        assert!(outcome.converged);
        assert_abs_diff_eq!(outcome.achieved, 123_456.7, epsilon = 12.35);
    }

    #[test]
    fn test_iteration_cap() {
        let config = SearchConfig {
            max_iterations: 3,
            abs_tolerance: 1e-9,
            rel_tolerance: 0.0,
            min_step: 0.0,
        };
        let outcome = bisect(|x| x, 0.123456, 0.0, 1.0, &config);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.achieved >= 0.123456);
    }
}
