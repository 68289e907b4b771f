//! Risk profiles and blended yield resolution

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::tables::Product;

/// Allowed deviation of a bucket's share total from 100%
pub const SHARE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Conservative => "conservative",
            RiskLevel::Balanced => "balanced",
            RiskLevel::Aggressive => "aggressive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "conservative" => Some(RiskLevel::Conservative),
            "balanced" => Some(RiskLevel::Balanced),
            "aggressive" => Some(RiskLevel::Aggressive),
            _ => None,
        }
    }
}

/// Which allocation list of a profile to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    InitialCapital,
    TopUp,
}

impl Bucket {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial_capital" => Some(Bucket::InitialCapital),
            "top_up" => Some(Bucket::TopUp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub product_id: String,
    pub share_percent: f64,
    pub order_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub level: RiskLevel,
    pub initial_capital: Vec<Allocation>,
    pub top_up: Vec<Allocation>,
}

impl RiskProfile {
    pub fn bucket(&self, bucket: Bucket) -> &[Allocation] {
        match bucket {
            Bucket::InitialCapital => &self.initial_capital,
            Bucket::TopUp => &self.top_up,
        }
    }

    pub fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<Allocation> {
        match bucket {
            Bucket::InitialCapital => &mut self.initial_capital,
            Bucket::TopUp => &mut self.top_up,
        }
    }
}

/// A portfolio class grouping its risk profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub profiles: Vec<RiskProfile>,
}

impl Portfolio {
    pub fn profile(&self, level: RiskLevel) -> Option<&RiskProfile> {
        self.profiles.iter().find(|p| p.level == level)
    }
}

/// Weighted yield of one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendedYield {
    pub yield_percent: f64,
    /// Set when any input had to be approximated
    pub degraded: bool,
    pub warnings: Vec<String>,
}

/// Yields of both buckets for one goal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioYield {
    pub initial_capital_percent: f64,
    pub top_up_percent: f64,
    pub degraded: bool,
    pub warnings: Vec<String>,
}

impl PortfolioYield {
    /// Same yield for both buckets
    pub fn uniform(yield_percent: f64) -> Self {
        Self {
            initial_capital_percent: yield_percent,
            top_up_percent: yield_percent,
            degraded: false,
            warnings: Vec::new(),
        }
    }

    pub fn from_buckets(initial: BlendedYield, top_up: BlendedYield) -> Self {
        let mut warnings = initial.warnings;
        warnings.extend(top_up.warnings);
        Self {
            initial_capital_percent: initial.yield_percent,
            top_up_percent: top_up.yield_percent,
            degraded: initial.degraded || top_up.degraded,
            warnings,
        }
    }
}

/// Resolves blended yields against a product catalogue
pub struct PortfolioAllocator<'a> {
    products: &'a HashMap<String, Product>,
}

impl<'a> PortfolioAllocator<'a> {
    pub fn new(products: &'a HashMap<String, Product>) -> Self {
        Self { products }
    }

    /// Share-weighted yield of a bucket at (term, amount).
    ///
    /// Fails when shares do not sum to 100% or a product is unknown or has an
    /// empty curve. A curve with no covering bracket falls back to the
    /// closest bracket by term and marks the result degraded.
    pub fn resolve_yield(
        &self,
        profile: &RiskProfile,
        bucket: Bucket,
        amount: f64,
        term_months: u32,
    ) -> EngineResult<BlendedYield> {
        let allocations = profile.bucket(bucket);
        if allocations.is_empty() {
            return Err(EngineError::Allocation(format!(
                "{} profile has no {:?} allocations",
                profile.level.as_str(),
                bucket
            )));
        }

        let total_share: f64 = allocations.iter().map(|a| a.share_percent).sum();
        if (total_share - 100.0).abs() > SHARE_TOLERANCE {
            return Err(EngineError::Allocation(format!(
                "{} {:?} shares sum to {:.4}%",
                profile.level.as_str(),
                bucket,
                total_share
            )));
        }

        let mut result = BlendedYield {
            yield_percent: 0.0,
            degraded: false,
            warnings: Vec::new(),
        };

        for allocation in ordered(allocations) {
            let product = self.products.get(&allocation.product_id).ok_or_else(|| {
                EngineError::Allocation(format!("unknown product '{}'", allocation.product_id))
            })?;
            let lookup = product.lookup_yield(term_months, amount).ok_or_else(|| {
                EngineError::Allocation(format!("product '{}' has no yield curve", product.id))
            })?;

            if !lookup.exact {
                let note = format!(
                    "product '{}' has no bracket for term {} / amount {:.2}; using closest term",
                    product.id, term_months, amount
                );
                warn!("{}", note);
                result.degraded = true;
                result.warnings.push(note);
            }
            result.yield_percent += lookup.yield_percent * allocation.share_percent / 100.0;
        }

        Ok(result)
    }

    /// Like `resolve_yield`, but never fails: invalid shares are normalised
    /// and unresolvable products are dropped. Nothing usable yields 0%.
    pub fn resolve_yield_best_effort(
        &self,
        profile: &RiskProfile,
        bucket: Bucket,
        amount: f64,
        term_months: u32,
    ) -> BlendedYield {
        match self.resolve_yield(profile, bucket, amount, term_months) {
            Ok(blended) => blended,
            Err(err) => {
                warn!("degrading yield resolution: {}", err);
                let mut warnings = vec![err.to_string()];
                let mut weighted = 0.0;
                let mut share_used = 0.0;

                for allocation in ordered(profile.bucket(bucket)) {
                    let lookup = self
                        .products
                        .get(&allocation.product_id)
                        .and_then(|p| p.lookup_yield(term_months, amount));
                    match lookup {
                        Some(l) if allocation.share_percent > 0.0 => {
                            weighted += l.yield_percent * allocation.share_percent;
                            share_used += allocation.share_percent;
                        }
                        Some(_) => {}
                        None => warnings.push(format!(
                            "product '{}' skipped: unresolvable",
                            allocation.product_id
                        )),
                    }
                }

                BlendedYield {
                    yield_percent: if share_used > 0.0 { weighted / share_used } else { 0.0 },
                    degraded: true,
                    warnings,
                }
            }
        }
    }
}

fn ordered(allocations: &[Allocation]) -> Vec<&Allocation> {
    let mut sorted: Vec<&Allocation> = allocations.iter().collect();
    sorted.sort_by_key(|a| a.order_index);
    sorted
}
