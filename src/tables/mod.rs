//! Rate tables: products, tax scale, co-financing tiers and system settings

mod pds;
mod product;
mod settings;
mod tax;
pub mod loader;

pub use pds::{default_income_brackets, find_bracket, IncomeBasis, PdsIncomeBracket, PdsSettings, PDS_MATCH_MONTH};
pub use product::{Product, YieldBracket, YieldLookup};
pub use settings::{
    annual_to_monthly_percent, keys, EconomicSettings, PensionSettings, RetirementAges,
    SettingValue, SystemSettings,
};
pub use tax::{net_income, BracketPortion, TaxBracket, TaxSchedule};

use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineResult, LoadError};
use crate::portfolio::{Allocation, Portfolio, RiskLevel, RiskProfile};

/// Immutable configuration snapshot for one computation
#[derive(Debug, Clone, Default)]
pub struct RateTables {
    pub products: HashMap<String, Product>,
    pub portfolios: HashMap<String, Portfolio>,
    /// Kept unvalidated so a bad scale fails the goals that need it, not the load
    pub tax_brackets: Vec<TaxBracket>,
    pub pds_brackets: Vec<PdsIncomeBracket>,
    pub settings: SystemSettings,
}

impl RateTables {
    /// In-memory tables with representative market values
    pub fn default_market() -> Self {
        let products: HashMap<String, Product> = [
            Product::new(
                "deposit",
                "Bank deposit",
                "RUB",
                vec![
                    YieldBracket { term_from: 0, term_to: 36, amount_from: 0.0, amount_to: f64::MAX, yield_percent: 12.0 },
                    YieldBracket { term_from: 37, term_to: u32::MAX, amount_from: 0.0, amount_to: f64::MAX, yield_percent: 9.0 },
                ],
            ),
            Product::flat("bonds", 11.0),
            Product::flat("equity", 16.0),
            Product::flat("pds_fund", 13.0),
        ]
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

        let alloc = |product_id: &str, share_percent: f64, order_index: u32| Allocation {
            product_id: product_id.to_string(),
            share_percent,
            order_index,
        };

        let standard = Portfolio {
            id: "standard".to_string(),
            profiles: vec![
                RiskProfile {
                    level: RiskLevel::Conservative,
                    initial_capital: vec![alloc("deposit", 60.0, 1), alloc("bonds", 40.0, 2)],
                    top_up: vec![alloc("pds_fund", 50.0, 1), alloc("bonds", 50.0, 2)],
                },
                RiskProfile {
                    level: RiskLevel::Balanced,
                    initial_capital: vec![alloc("bonds", 60.0, 1), alloc("equity", 40.0, 2)],
                    top_up: vec![alloc("pds_fund", 100.0, 1)],
                },
                RiskProfile {
                    level: RiskLevel::Aggressive,
                    initial_capital: vec![alloc("bonds", 20.0, 1), alloc("equity", 80.0, 2)],
                    top_up: vec![alloc("pds_fund", 40.0, 1), alloc("equity", 60.0, 2)],
                },
            ],
        };

        Self {
            products,
            portfolios: HashMap::from([(standard.id.clone(), standard)]),
            tax_brackets: TaxSchedule::default_scale().brackets().to_vec(),
            pds_brackets: default_income_brackets(),
            settings: SystemSettings::default_market(),
        }
    }

    /// Load tables from the default location (data/tables/)
    pub fn from_csv() -> Result<Self, LoadError> {
        Self::from_csv_path(Path::new(loader::DEFAULT_TABLES_PATH))
    }

    /// Load tables from CSV files in a specific directory
    pub fn from_csv_path(path: &Path) -> Result<Self, LoadError> {
        let loaded = loader::LoadedTables::load_from(path)?;
        Ok(Self {
            products: loaded.products,
            portfolios: loaded.portfolios,
            tax_brackets: loaded.tax_brackets,
            pds_brackets: loaded.pds_brackets,
            settings: loaded.settings,
        })
    }

    pub fn tax_schedule(&self) -> EngineResult<TaxSchedule> {
        TaxSchedule::new(self.tax_brackets.clone())
    }
}
