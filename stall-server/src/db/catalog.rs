//! In-memory catalog
//!
//! Kitchens, categories, products, printers, templates and routing rules,
//! loaded from a JSON seed. Reads are lock-shared; only rule toggling writes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Category, Kitchen, Printer, Product, ReceiptRule, ReceiptTemplate};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i64 },

    #[error("Duplicate kitchen prefix: {0}")]
    DuplicatePrefix(String),

    #[error("Receipt rule not found: {0}")]
    RuleNotFound(i64),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::RuleNotFound(id) => {
                AppError::new(ErrorCode::RuleNotFound).with_detail("rule_id", id)
            }
            other => AppError::with_message(ErrorCode::ConfigError, other.to_string()),
        }
    }
}

/// Catalog seed file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub kitchens: Vec<Kitchen>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub printers: Vec<Printer>,
    #[serde(default)]
    pub templates: Vec<ReceiptTemplate>,
    #[serde(default)]
    pub rules: Vec<ReceiptRule>,
}

#[derive(Debug, Default)]
struct CatalogData {
    kitchens: BTreeMap<i64, Kitchen>,
    /// Uppercased prefix -> kitchen id
    prefixes: HashMap<String, i64>,
    categories: HashMap<i64, Category>,
    products: HashMap<i64, Product>,
    printers: HashMap<i64, Printer>,
    templates: HashMap<i64, ReceiptTemplate>,
    rules: BTreeMap<i64, ReceiptRule>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    data: RwLock<CatalogData>,
}

fn index<T>(
    items: Vec<T>,
    kind: &'static str,
    id: impl Fn(&T) -> i64,
) -> CatalogResult<HashMap<i64, T>> {
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        let key = id(&item);
        if map.insert(key, item).is_some() {
            return Err(CatalogError::DuplicateId { kind, id: key });
        }
    }
    Ok(map)
}

impl Catalog {
    /// Load a catalog seed file
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let seed: CatalogSeed = serde_json::from_str(&raw)?;
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: CatalogSeed) -> CatalogResult<Self> {
        let kitchens = index(seed.kitchens, "kitchen", |k| k.id)?;
        let mut prefixes = HashMap::new();
        for k in kitchens.values() {
            let key = k.prefix.to_uppercase();
            if prefixes.insert(key, k.id).is_some() {
                return Err(CatalogError::DuplicatePrefix(k.prefix.clone()));
            }
        }

        let data = CatalogData {
            kitchens: kitchens.into_iter().collect(),
            prefixes,
            categories: index(seed.categories, "category", |c| c.id)?,
            products: index(seed.products, "product", |p| p.id)?,
            printers: index(seed.printers, "printer", |p| p.id)?,
            templates: index(seed.templates, "template", |t| t.id)?,
            rules: index(seed.rules, "rule", |r| r.id)?.into_iter().collect(),
        };

        tracing::info!(
            kitchens = data.kitchens.len(),
            products = data.products.len(),
            printers = data.printers.len(),
            rules = data.rules.len(),
            "Catalog loaded"
        );

        Ok(Self {
            data: RwLock::new(data),
        })
    }

    // ========== Kitchens ==========

    pub fn kitchen(&self, id: i64) -> Option<Kitchen> {
        self.data.read().kitchens.get(&id).cloned()
    }

    /// Case-insensitive prefix lookup
    pub fn kitchen_by_prefix(&self, prefix: &str) -> Option<Kitchen> {
        let data = self.data.read();
        let id = data.prefixes.get(&prefix.trim().to_uppercase())?;
        data.kitchens.get(id).cloned()
    }

    pub fn kitchens(&self) -> Vec<Kitchen> {
        self.data.read().kitchens.values().cloned().collect()
    }

    // ========== Products ==========

    pub fn product(&self, id: i64) -> Option<Product> {
        self.data.read().products.get(&id).cloned()
    }

    pub fn category(&self, id: i64) -> Option<Category> {
        self.data.read().categories.get(&id).cloned()
    }

    /// Product kitchen, falling back to the product's category kitchen
    pub fn resolve_kitchen(&self, product: &Product) -> Option<i64> {
        product.kitchen_id.or_else(|| {
            let data = self.data.read();
            product
                .category_id
                .and_then(|cid| data.categories.get(&cid))
                .and_then(|c| c.kitchen_id)
        })
    }

    // ========== Printing ==========

    pub fn printer(&self, id: i64) -> Option<Printer> {
        self.data.read().printers.get(&id).cloned()
    }

    pub fn template(&self, id: i64) -> Option<ReceiptTemplate> {
        self.data.read().templates.get(&id).cloned()
    }

    pub fn rule(&self, id: i64) -> Option<ReceiptRule> {
        self.data.read().rules.get(&id).cloned()
    }

    /// Enabled rules by ascending priority, ties by ascending id
    pub fn enabled_rules(&self) -> Vec<ReceiptRule> {
        let mut rules: Vec<ReceiptRule> = self
            .data
            .read()
            .rules
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (r.priority, r.id));
        rules
    }

    pub fn set_rule_enabled(&self, id: i64, enabled: bool) -> CatalogResult<ReceiptRule> {
        let mut data = self.data.write();
        let rule = data.rules.get_mut(&id).ok_or(CatalogError::RuleNotFound(id))?;
        rule.enabled = enabled;
        tracing::info!(rule_id = id, enabled, "Receipt rule toggled");
        Ok(rule.clone())
    }
}
