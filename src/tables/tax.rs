//! Progressive income tax brackets

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Boundary slack when checking that brackets are contiguous (one cent)
const CONTIGUITY_TOLERANCE: f64 = 0.01;

/// One row of the tax scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub order_index: u32,
    pub income_from: f64,
    pub income_to: f64,
    /// Marginal rate as a decimal (0.13 = 13%)
    pub rate: f64,
}

/// Portion of income taxed inside one bracket
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BracketPortion {
    pub order_index: u32,
    pub taxed_amount: f64,
    pub tax: f64,
}

/// Validated, ordered tax scale
#[derive(Debug, Clone, PartialEq)]
pub struct TaxSchedule {
    brackets: Vec<TaxBracket>,
}

impl TaxSchedule {
    /// Sort by `order_index` and check the rows partition `[0, inf)`.
    pub fn new(mut brackets: Vec<TaxBracket>) -> EngineResult<Self> {
        if brackets.is_empty() {
            return Err(EngineError::Configuration("tax bracket table is empty".into()));
        }
        brackets.sort_by_key(|b| b.order_index);

        for b in &brackets {
            if !b.income_from.is_finite() || !b.income_to.is_finite() || !b.rate.is_finite() {
                return Err(EngineError::Configuration(format!(
                    "tax bracket {} has a non-finite bound or rate",
                    b.order_index
                )));
            }
            if b.income_to < b.income_from {
                return Err(EngineError::Configuration(format!(
                    "tax bracket {} is inverted: {:.2} > {:.2}",
                    b.order_index, b.income_from, b.income_to
                )));
            }
        }

        let first = &brackets[0];
        if first.income_from > CONTIGUITY_TOLERANCE {
            return Err(EngineError::Configuration(format!(
                "tax brackets leave income below {:.2} untaxed",
                first.income_from
            )));
        }

        for pair in brackets.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.income_from > prev.income_to + CONTIGUITY_TOLERANCE {
                return Err(EngineError::Configuration(format!(
                    "gap in tax brackets between {:.2} and {:.2}",
                    prev.income_to, next.income_from
                )));
            }
            if next.income_from < prev.income_to - CONTIGUITY_TOLERANCE {
                return Err(EngineError::Configuration(format!(
                    "tax brackets {} and {} overlap",
                    prev.order_index, next.order_index
                )));
            }
        }

        Ok(Self { brackets })
    }

    /// Russian personal income tax scale (2025)
    pub fn default_scale() -> Self {
        let row = |order_index, income_from, income_to, rate| TaxBracket {
            order_index,
            income_from,
            income_to,
            rate,
        };
        Self {
            brackets: vec![
                row(1, 0.0, 2_400_000.0, 0.13),
                row(2, 2_400_000.0, 5_000_000.0, 0.15),
                row(3, 5_000_000.0, 20_000_000.0, 0.18),
                row(4, 20_000_000.0, 50_000_000.0, 0.20),
                row(5, 50_000_000.0, 1_000_000_000_000.0, 0.22),
            ],
        }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Per-bracket taxed amounts. Income above the top bracket ceiling is
    /// taxed at the top rate.
    pub fn breakdown(&self, gross_annual_income: f64) -> Vec<BracketPortion> {
        let income = gross_annual_income.max(0.0);
        let last = self.brackets.len() - 1;

        self.brackets
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let upper = if i == last { f64::INFINITY } else { b.income_to };
                let taxed_amount = (income.min(upper) - b.income_from).max(0.0);
                BracketPortion {
                    order_index: b.order_index,
                    taxed_amount,
                    tax: taxed_amount * b.rate,
                }
            })
            .collect()
    }

    pub fn total_tax(&self, gross_annual_income: f64) -> f64 {
        self.breakdown(gross_annual_income).iter().map(|p| p.tax).sum()
    }

    pub fn net_income(&self, gross_annual_income: f64) -> f64 {
        gross_annual_income - self.total_tax(gross_annual_income)
    }
}

/// Net-of-tax annual income for an unvalidated bracket list
pub fn net_income(gross_annual_income: f64, brackets: &[TaxBracket]) -> EngineResult<f64> {
    let schedule = TaxSchedule::new(brackets.to_vec())?;
    Ok(schedule.net_income(gross_annual_income))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_flat_part_of_scale() {
        let scale = TaxSchedule::default_scale();
        assert_abs_diff_eq!(scale.net_income(1_200_000.0), 1_044_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_progressive_marginal() {
        let scale = TaxSchedule::default_scale();
        // 2.4M at 13% + 600k at 15%
        let tax = scale.total_tax(3_000_000.0);
        assert_abs_diff_eq!(tax, 312_000.0 + 90_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_portions_cover_income() {
        let scale = TaxSchedule::default_scale();
        for income in [0.0, 1.0, 2_400_000.0, 4_999_999.99, 17_000_000.0, 3.0e12] {
            let covered: f64 = scale.breakdown(income).iter().map(|p| p.taxed_amount).sum();
            assert_abs_diff_eq!(covered, income, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_top_bracket_unbounded() {
        let brackets = vec![
            TaxBracket { order_index: 1, income_from: 0.0, income_to: 100.0, rate: 0.1 },
            TaxBracket { order_index: 2, income_from: 100.0, income_to: 200.0, rate: 0.2 },
        ];
        let net = net_income(300.0, &brackets).unwrap();
        assert_abs_diff_eq!(net, 300.0 - 10.0 - 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_order_index_not_row_order() {
        let brackets = vec![
            TaxBracket { order_index: 2, income_from: 100.0, income_to: 200.0, rate: 0.2 },
            TaxBracket { order_index: 1, income_from: 0.0, income_to: 100.0, rate: 0.1 },
        ];
        assert_abs_diff_eq!(net_income(150.0, &brackets).unwrap(), 130.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_gap_and_empty() {
        assert!(matches!(net_income(1.0, &[]), Err(EngineError::Configuration(_))));

        let gapped = vec![
            TaxBracket { order_index: 1, income_from: 0.0, income_to: 100.0, rate: 0.1 },
            TaxBracket { order_index: 2, income_from: 150.0, income_to: 200.0, rate: 0.2 },
        ];
        assert!(matches!(TaxSchedule::new(gapped), Err(EngineError::Configuration(_))));

        let overlapping = vec![
            TaxBracket { order_index: 1, income_from: 0.0, income_to: 100.0, rate: 0.1 },
            TaxBracket { order_index: 2, income_from: 50.0, income_to: 200.0, rate: 0.2 },
        ];
        assert!(TaxSchedule::new(overlapping).is_err());
    }

    #[test]
    fn test_rejects_inverted_bracket() {
        // neighbours line up (100 -> 100, 50 -> 50) but the middle row runs backwards
        let inverted = vec![
            TaxBracket { order_index: 1, income_from: 0.0, income_to: 100.0, rate: 0.1 },
            TaxBracket { order_index: 2, income_from: 100.0, income_to: 50.0, rate: 0.2 },
            TaxBracket { order_index: 3, income_from: 50.0, income_to: 200.0, rate: 0.3 },
        ];
        assert!(matches!(TaxSchedule::new(inverted), Err(EngineError::Configuration(_))));

        let unbounded = vec![TaxBracket { order_index: 1, income_from: 0.0, income_to: f64::INFINITY, rate: 0.13 }];
        assert!(matches!(net_income(10.0, &unbounded), Err(EngineError::Configuration(_))));
    }
}
