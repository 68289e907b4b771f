//! Investment products and their yield curves

use serde::{Deserialize, Serialize};

/// One cell of a product yield curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldBracket {
    /// Inclusive term range in months
    pub term_from: u32,
    pub term_to: u32,

    /// Inclusive amount range in currency units
    pub amount_from: f64,
    pub amount_to: f64,

    /// Expected annual yield, percent
    pub yield_percent: f64,
}

impl YieldBracket {
    pub fn covers_term(&self, term_months: u32) -> bool {
        term_months >= self.term_from && term_months <= self.term_to
    }

    pub fn covers_amount(&self, amount: f64) -> bool {
        amount >= self.amount_from && amount <= self.amount_to
    }

    /// Distance in months from the term range (0 when inside)
    fn term_distance(&self, term_months: u32) -> u32 {
        if term_months < self.term_from {
            self.term_from - term_months
        } else if term_months > self.term_to {
            term_months - self.term_to
        } else {
            0
        }
    }
}

/// Result of a yield curve lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldLookup {
    pub yield_percent: f64,
    /// False when no bracket contained (term, amount) and the closest one was used
    pub exact: bool,
}

/// A product available for allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub currency: String,

    /// Yield curve in lookup order
    pub yields: Vec<YieldBracket>,
}

impl Product {
    pub fn new(id: &str, name: &str, currency: &str, yields: Vec<YieldBracket>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            currency: currency.to_string(),
            yields,
        }
    }

    /// Product with a single bracket covering every term and amount
    pub fn flat(id: &str, yield_percent: f64) -> Self {
        Self::new(
            id,
            id,
            "RUB",
            vec![YieldBracket {
                term_from: 0,
                term_to: u32::MAX,
                amount_from: 0.0,
                amount_to: f64::MAX,
                yield_percent,
            }],
        )
    }

    /// First bracket containing the term and then the amount.
    ///
    /// When nothing contains both, falls back to the bracket closest by term
    /// (preferring one that still covers the amount) and marks the lookup as
    /// inexact. Returns `None` only for an empty curve.
    pub fn lookup_yield(&self, term_months: u32, amount: f64) -> Option<YieldLookup> {
        if let Some(bracket) = self
            .yields
            .iter()
            .find(|b| b.covers_term(term_months) && b.covers_amount(amount))
        {
            return Some(YieldLookup {
                yield_percent: bracket.yield_percent,
                exact: true,
            });
        }

        self.yields
            .iter()
            .min_by_key(|b| (b.term_distance(term_months), !b.covers_amount(amount)))
            .map(|b| YieldLookup {
                yield_percent: b.yield_percent,
                exact: false,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit() -> Product {
        let bracket = |term_from, term_to, amount_from, amount_to, yield_percent| YieldBracket {
            term_from,
            term_to,
            amount_from,
            amount_to,
            yield_percent,
        };
        Product::new(
            "deposit",
            "Term deposit",
            "RUB",
            vec![
                bracket(0, 12, 0.0, 999_999.99, 10.0),
                bracket(0, 12, 1_000_000.0, f64::MAX, 11.0),
                bracket(13, 60, 0.0, f64::MAX, 9.0),
                // overlaps the previous bracket; never reached for 13..=60
                bracket(24, 120, 0.0, f64::MAX, 8.0),
            ],
        )
    }

    #[test]
    fn test_term_then_amount_lookup() {
        let p = deposit();
        assert_eq!(p.lookup_yield(6, 50_000.0).unwrap().yield_percent, 10.0);
        assert_eq!(p.lookup_yield(6, 2_000_000.0).unwrap().yield_percent, 11.0);
        assert_eq!(p.lookup_yield(36, 10.0).unwrap().yield_percent, 9.0);
        assert_eq!(p.lookup_yield(100, 10.0).unwrap().yield_percent, 8.0);
        assert!(p.lookup_yield(36, 10.0).unwrap().exact);
    }

    #[test]
    fn test_closest_term_fallback() {
        let p = deposit();
        let lookup = p.lookup_yield(240, 10.0).unwrap();
        assert!(!lookup.exact);
        assert_eq!(lookup.yield_percent, 8.0);
    }

    #[test]
    fn test_empty_curve() {
        let p = Product::new("x", "x", "RUB", vec![]);
        assert!(p.lookup_yield(12, 1.0).is_none());
    }
}
