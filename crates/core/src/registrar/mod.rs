//! Per-category table registration.
//!
//! The registrar is the only writer of the engine namespace. For each category
//! it builds the generator, then either binds it directly under the canonical
//! name (live) or binds it under the `raw_` name and copies it once into a
//! stored canonical table (materialized).
//!
//! Per category:
//! `Unregistered -> RawRegistered -> (CanonicalLive | CanonicalMaterializing ->
//! CanonicalMaterialized | CanonicalMaterializationFailed)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{EngineError, TableCatalog};
use crate::policy::{CachePolicySet, MetadataCategory};
use crate::projection::generator_for;
use crate::provider::ObjectProvider;

/// Error type for registration.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The category (or its table name) is already registered this session.
    #[error("Table '{table}' is already registered")]
    DuplicateTable { table: String },

    /// The category has no projector.
    #[error("Category {category} has no table implementation")]
    UnsupportedCategory { category: MetadataCategory },

    /// Copying the raw table into the canonical table failed; the canonical
    /// table was dropped.
    #[error("Failed to materialize {category} into '{table}': {source}")]
    Materialization {
        category: MetadataCategory,
        table: String,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RegistrationError {
    /// Whether this error only affects its own category.
    pub fn is_isolated(&self) -> bool {
        matches!(self, RegistrationError::Materialization { .. })
    }
}

/// Convenience result type for registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Registration state of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CategoryState {
    Unregistered,
    RawRegistered,
    CanonicalLive,
    CanonicalMaterializing,
    CanonicalMaterialized { rows: u64 },
    CanonicalMaterializationFailed { reason: String },
}

impl CategoryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CategoryState::CanonicalLive
                | CategoryState::CanonicalMaterialized { .. }
                | CategoryState::CanonicalMaterializationFailed { .. }
        )
    }

    /// Whether the canonical table can be queried.
    pub fn is_queryable(&self) -> bool {
        matches!(self, CategoryState::CanonicalLive | CategoryState::CanonicalMaterialized { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryState::Unregistered => "unregistered",
            CategoryState::RawRegistered => "raw-registered",
            CategoryState::CanonicalLive => "live",
            CategoryState::CanonicalMaterializing => "materializing",
            CategoryState::CanonicalMaterialized { .. } => "materialized",
            CategoryState::CanonicalMaterializationFailed { .. } => "failed",
        }
    }
}

/// Canonical and raw table names for a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    pub canonical: String,
    pub raw: String,
}

impl TableNames {
    pub fn new(format: &str, category: MetadataCategory) -> Self {
        let canonical = format!("{format}_{}", category.table_suffix());
        let raw = format!("raw_{canonical}");
        Self { canonical, raw }
    }
}

/// Outcome of registering one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub category: MetadataCategory,
    pub canonical: String,
    /// Raw virtual table name, present only when the category was materialized.
    pub raw: Option<String>,
    #[serde(flatten)]
    pub state: CategoryState,
}

/// Outcomes of a `register_all` pass, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub entries: Vec<TableEntry>,
}

impl RegistrationReport {
    pub fn entry(&self, category: MetadataCategory) -> Option<&TableEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter().filter(|e| !e.state.is_queryable())
    }
}

/// Owns the engine catalog for the session and registers categories into it.
#[derive(Debug)]
pub struct Registrar<C: TableCatalog> {
    catalog: C,
    policy: CachePolicySet,
    entries: BTreeMap<MetadataCategory, TableEntry>,
}

impl<C: TableCatalog> Registrar<C> {
    pub fn new(catalog: C, policy: CachePolicySet) -> Self {
        Self { catalog, policy, entries: BTreeMap::new() }
    }

    pub fn policy(&self) -> CachePolicySet {
        self.policy
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn state(&self, category: MetadataCategory) -> CategoryState {
        self.entries
            .get(&category)
            .map(|e| e.state.clone())
            .unwrap_or(CategoryState::Unregistered)
    }

    pub fn entry(&self, category: MetadataCategory) -> Option<&TableEntry> {
        self.entries.get(&category)
    }

    /// Registered categories, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.values()
    }

    /// Register one category of `provider`.
    ///
    /// On success returns the terminal state. A materialization failure is
    /// recorded as `CanonicalMaterializationFailed` before the error is returned.
    pub fn register(
        &mut self,
        provider: &Arc<dyn ObjectProvider>,
        category: MetadataCategory,
    ) -> RegistrationResult<CategoryState> {
        let names = TableNames::new(provider.format(), category);
        if self.entries.contains_key(&category) {
            return Err(RegistrationError::DuplicateTable { table: names.canonical });
        }
        let generator = generator_for(category, Arc::clone(provider))
            .ok_or(RegistrationError::UnsupportedCategory { category })?;
        let generator = Arc::new(generator);

        // A live category binds its generator straight to the canonical name.
        let cached = self.policy.caches(category);
        let bound = if cached { &names.raw } else { &names.canonical };
        self.catalog
            .register_virtual_table(bound, generator)
            .map_err(|e| duplicate_or_engine(e, bound))?;
        let raw = cached.then(|| names.raw.clone());
        self.transition(category, &names, raw.clone(), CategoryState::RawRegistered);

        if !cached {
            self.transition(category, &names, raw, CategoryState::CanonicalLive);
            return Ok(CategoryState::CanonicalLive);
        }

        self.transition(category, &names, raw.clone(), CategoryState::CanonicalMaterializing);

        match self.catalog.materialize(&names.raw, &names.canonical) {
            Ok(rows) => {
                let state = CategoryState::CanonicalMaterialized { rows };
                self.transition(category, &names, raw, state.clone());
                info!(%category, table = %names.canonical, rows, "Materialized category");
                Ok(state)
            }
            Err(source) => {
                // Never leave a partial snapshot queryable.
                if let Err(drop_err) = self.catalog.drop_table(&names.canonical) {
                    warn!(
                        table = %names.canonical,
                        error = %drop_err,
                        "Failed to drop partial table"
                    );
                }
                let reason = source.to_string();
                self.transition(
                    category,
                    &names,
                    raw,
                    CategoryState::CanonicalMaterializationFailed { reason },
                );
                Err(RegistrationError::Materialization {
                    category,
                    table: names.canonical,
                    source,
                })
            }
        }
    }

    /// Register every category in `categories`, in order.
    ///
    /// Materialization failures are logged and recorded in the report, and the
    /// remaining categories still register. Any other error aborts.
    pub fn register_all(
        &mut self,
        provider: &Arc<dyn ObjectProvider>,
        categories: &[MetadataCategory],
    ) -> RegistrationResult<RegistrationReport> {
        let mut report = RegistrationReport::default();
        for &category in categories {
            match self.register(provider, category) {
                Ok(_) => {}
                Err(err) if err.is_isolated() => {
                    warn!(%category, error = %err, "Category unavailable; continuing without it");
                }
                Err(err) => return Err(err),
            }
            if let Some(entry) = self.entries.get(&category) {
                report.entries.push(entry.clone());
            }
        }
        Ok(report)
    }

    fn transition(
        &mut self,
        category: MetadataCategory,
        names: &TableNames,
        raw: Option<String>,
        state: CategoryState,
    ) {
        debug!(%category, table = %names.canonical, state = state.label(), "Category transition");
        self.entries.insert(
            category,
            TableEntry { category, canonical: names.canonical.clone(), raw, state },
        );
    }
}

fn duplicate_or_engine(err: EngineError, table: &str) -> RegistrationError {
    match err {
        EngineError::DuplicateTable(_) => {
            RegistrationError::DuplicateTable { table: table.to_string() }
        }
        other => RegistrationError::Engine(other),
    }
}
