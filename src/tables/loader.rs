//! CSV-based rate table loader
//!
//! Loads the configuration snapshot from CSV files in data/tables/

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use super::{PdsIncomeBracket, Product, SettingValue, SystemSettings, TaxBracket, YieldBracket};
use crate::error::LoadError;
use crate::portfolio::{Allocation, Bucket, Portfolio, RiskLevel, RiskProfile};

/// Default path to the tables directory
pub const DEFAULT_TABLES_PATH: &str = "data/tables";

fn reader(path: &Path, file: &str) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path.join(file))?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn malformed(file: &str, reason: String) -> LoadError {
    LoadError::Malformed {
        file: file.to_string(),
        reason,
    }
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: String,
    name: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct YieldRow {
    product_id: String,
    term_from: u32,
    term_to: u32,
    amount_from: f64,
    amount_to: f64,
    yield_percent: f64,
}

/// Load products and attach their yield curves (file order is lookup order)
pub fn load_products(path: &Path) -> Result<HashMap<String, Product>, LoadError> {
    let mut products = HashMap::new();
    for row in reader(path, "products.csv")?.deserialize() {
        let row: ProductRow = row?;
        products.insert(row.id.clone(), Product::new(&row.id, &row.name, &row.currency, Vec::new()));
    }

    for row in reader(path, "product_yields.csv")?.deserialize() {
        let row: YieldRow = row?;
        let product = products.get_mut(&row.product_id).ok_or_else(|| {
            malformed("product_yields.csv", format!("unknown product '{}'", row.product_id))
        })?;
        product.yields.push(YieldBracket {
            term_from: row.term_from,
            term_to: row.term_to,
            amount_from: row.amount_from,
            amount_to: row.amount_to,
            yield_percent: row.yield_percent,
        });
    }

    Ok(products)
}

#[derive(Debug, Deserialize)]
struct AllocationRow {
    portfolio: String,
    risk_profile: String,
    bucket: String,
    product_id: String,
    share_percent: f64,
    order_index: u32,
}

/// Load portfolio allocations, grouped by portfolio and risk profile
pub fn load_portfolios(path: &Path) -> Result<HashMap<String, Portfolio>, LoadError> {
    const FILE: &str = "portfolio_allocations.csv";
    let mut portfolios: HashMap<String, Portfolio> = HashMap::new();

    for row in reader(path, FILE)?.deserialize() {
        let row: AllocationRow = row?;
        let level = RiskLevel::parse(&row.risk_profile)
            .ok_or_else(|| malformed(FILE, format!("unknown risk profile '{}'", row.risk_profile)))?;
        let bucket = Bucket::parse(&row.bucket)
            .ok_or_else(|| malformed(FILE, format!("unknown bucket '{}'", row.bucket)))?;

        let portfolio = portfolios.entry(row.portfolio.clone()).or_insert_with(|| Portfolio {
            id: row.portfolio.clone(),
            profiles: Vec::new(),
        });

        let index = match portfolio.profiles.iter().position(|p| p.level == level) {
            Some(i) => i,
            None => {
                portfolio.profiles.push(RiskProfile {
                    level,
                    initial_capital: Vec::new(),
                    top_up: Vec::new(),
                });
                portfolio.profiles.len() - 1
            }
        };

        portfolio.profiles[index].bucket_mut(bucket).push(Allocation {
            product_id: row.product_id,
            share_percent: row.share_percent,
            order_index: row.order_index,
        });
    }

    Ok(portfolios)
}

/// Load tax brackets
pub fn load_tax_brackets(path: &Path) -> Result<Vec<TaxBracket>, LoadError> {
    let mut brackets = Vec::new();
    for row in reader(path, "tax_brackets.csv")?.deserialize() {
        brackets.push(row?);
    }
    Ok(brackets)
}

#[derive(Debug, Deserialize)]
struct PdsBracketRow {
    income_from: f64,
    income_to: Option<f64>,
    ratio_numerator: f64,
    ratio_denominator: f64,
}

/// Load co-financing income brackets; an empty `income_to` is unbounded
pub fn load_pds_brackets(path: &Path) -> Result<Vec<PdsIncomeBracket>, LoadError> {
    let mut brackets = Vec::new();
    for row in reader(path, "pds_brackets.csv")?.deserialize() {
        let row: PdsBracketRow = row?;
        brackets.push(PdsIncomeBracket {
            income_from: row.income_from,
            income_to: row.income_to,
            ratio_numerator: row.ratio_numerator,
            ratio_denominator: row.ratio_denominator,
        });
    }
    Ok(brackets)
}

#[derive(Debug, Deserialize)]
struct SettingRow {
    key: String,
    value_type: String,
    value: String,
}

/// Load the key/typed-value settings store
pub fn load_system_settings(path: &Path) -> Result<SystemSettings, LoadError> {
    const FILE: &str = "system_settings.csv";
    let mut settings = SystemSettings::new();

    for row in reader(path, FILE)?.deserialize() {
        let row: SettingRow = row?;
        let value = match row.value_type.as_str() {
            "string" => SettingValue::String(row.value),
            "number" => SettingValue::Number(row.value.parse().map_err(|_| {
                malformed(FILE, format!("'{}' is not a number: {}", row.key, row.value))
            })?),
            "json" => SettingValue::Json(serde_json::from_str(&row.value)?),
            other => return Err(malformed(FILE, format!("unknown value type '{}'", other))),
        };
        settings.insert(&row.key, value);
    }

    Ok(settings)
}

/// All tables loaded from one directory
pub struct LoadedTables {
    pub products: HashMap<String, Product>,
    pub portfolios: HashMap<String, Portfolio>,
    pub tax_brackets: Vec<TaxBracket>,
    pub pds_brackets: Vec<PdsIncomeBracket>,
    pub settings: SystemSettings,
}

impl LoadedTables {
    /// Load all tables from a specific path
    pub fn load_from(path: &Path) -> Result<Self, LoadError> {
        Ok(Self {
            products: load_products(path)?,
            portfolios: load_portfolios(path)?,
            tax_brackets: load_tax_brackets(path)?,
            pds_brackets: load_pds_brackets(path)?,
            settings: load_system_settings(path)?,
        })
    }
}
