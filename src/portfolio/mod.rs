//! Portfolio classes, risk profiles and yield blending

mod allocation;

pub use allocation::{
    Allocation, BlendedYield, Bucket, Portfolio, PortfolioAllocator, PortfolioYield, RiskLevel,
    RiskProfile, SHARE_TOLERANCE,
};
