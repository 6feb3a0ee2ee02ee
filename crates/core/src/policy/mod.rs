//! Metadata categories and the materialization policy.
//!
//! A [`CachePolicySet`] selects which categories are eagerly copied into stored
//! tables; every other category stays a live virtual table that re-reads the
//! provider on each scan.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised while parsing a materialization selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Invalid configuration: '{token}' is not a metadata category (expected one of {expected} or ALL)")]
    InvalidConfiguration { token: String, expected: String },
}

impl PolicyError {
    fn invalid(token: &str) -> Self {
        let expected =
            MetadataCategory::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ");
        PolicyError::InvalidConfiguration { token: token.to_string(), expected }
    }

    /// The offending token.
    pub fn token(&self) -> &str {
        match self {
            PolicyError::InvalidConfiguration { token, .. } => token,
        }
    }
}

/// Declares [`MetadataCategory`], its `ALL` list and policy tokens, and one
/// [`CachePolicySet`] flag per member, all from the same list of variants.
macro_rules! metadata_categories {
    ($($(#[$meta:meta])* $variant:ident => $token:ident,)+) => {
        /// One kind of metadata that can be exposed as a table.
        ///
        /// The trailing members are reserved for extraction types that have no
        /// projector yet; they are still valid policy tokens.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum MetadataCategory {
            $($(#[$meta])* $variant,)+
        }

        const CATEGORY_COUNT: usize = [$(stringify!($variant)),+].len();

        impl MetadataCategory {
            /// Every member, in declaration order.
            pub const ALL: [MetadataCategory; CATEGORY_COUNT] = [$(MetadataCategory::$variant,)+];

            /// Policy token, e.g. `LOAD_COMMANDS`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(MetadataCategory::$variant => stringify!($token),)+
                }
            }

            /// The single-member policy set for this category.
            pub const fn flag(self) -> CachePolicySet {
                match self {
                    $(MetadataCategory::$variant => CachePolicySet::$token,)+
                }
            }
        }

        bitflags! {
            /// Set of categories that must be eagerly materialized.
            ///
            /// Flag names are the policy tokens.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct CachePolicySet: u32 {
                $(const $token = 1 << (MetadataCategory::$variant as u32);)+
            }
        }
    };
}

metadata_categories! {
    Symbols => SYMBOLS,
    Sections => SECTIONS,
    Exports => EXPORTS,
    Imports => IMPORTS,
    Segments => SEGMENTS,
    LoadCommands => LOAD_COMMANDS,
    Headers => HEADERS,
    Instructions => INSTRUCTIONS,
    Strings => STRINGS,
    VersionRequirements => VERSION_REQUIREMENTS,
    VersionDefinitions => VERSION_DEFINITIONS,
    DieInfo => DIE_INFO,
    DieCallGraph => DIE_CALL_GRAPH,
}

// One bit per category.
const _: () = assert!(CATEGORY_COUNT <= u32::BITS as usize);

impl MetadataCategory {
    /// Categories registered by a default session.
    pub const DEFAULT: [MetadataCategory; 4] = [
        MetadataCategory::Symbols,
        MetadataCategory::Sections,
        MetadataCategory::Exports,
        MetadataCategory::Imports,
    ];

    /// Default categories plus the remaining ones that have projectors.
    pub const EXTENDED: [MetadataCategory; 7] = [
        MetadataCategory::Symbols,
        MetadataCategory::Sections,
        MetadataCategory::Exports,
        MetadataCategory::Imports,
        MetadataCategory::Segments,
        MetadataCategory::LoadCommands,
        MetadataCategory::Headers,
    ];

    /// Table name suffix, e.g. `load_commands` in `macho_load_commands`.
    pub fn table_suffix(self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for MetadataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataCategory {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MetadataCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PolicyError::invalid(wanted))
    }
}

impl Default for CachePolicySet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<MetadataCategory> for CachePolicySet {
    fn from(category: MetadataCategory) -> Self {
        category.flag()
    }
}

impl CachePolicySet {
    pub const fn with(self, category: MetadataCategory) -> Self {
        self.union(category.flag())
    }

    /// Whether `category` is materialized under this policy.
    pub const fn caches(self, category: MetadataCategory) -> bool {
        self.contains(category.flag())
    }

    /// Members in declaration order.
    pub fn categories(self) -> impl Iterator<Item = MetadataCategory> {
        MetadataCategory::ALL.into_iter().filter(move |c| self.caches(*c))
    }

    /// Parse one selection token.
    ///
    /// `ALL` and `NONE` are recognized specially; otherwise the token is a
    /// category name or a comma-separated list of them.
    pub fn from_string(token: &str) -> Result<Self, PolicyError> {
        let trimmed = token.trim();
        if trimmed.eq_ignore_ascii_case("ALL") {
            return Ok(Self::all());
        }
        if trimmed.eq_ignore_ascii_case("NONE") {
            return Ok(Self::empty());
        }
        let mut set = Self::empty();
        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(PolicyError::invalid(trimmed));
            }
            let flag = Self::from_name(&part.to_ascii_uppercase())
                .ok_or_else(|| PolicyError::invalid(part))?;
            set = set.union(flag);
        }
        Ok(set)
    }

    /// Parse a whole selection (e.g. repeated `--cache` flags).
    pub fn from_selection<S: AsRef<str>>(tokens: &[S]) -> Result<Self, PolicyError> {
        tokens
            .iter()
            .try_fold(Self::empty(), |acc, t| Ok(acc.union(Self::from_string(t.as_ref())?)))
    }
}

impl FromIterator<MetadataCategory> for CachePolicySet {
    fn from_iter<I: IntoIterator<Item = MetadataCategory>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Display for CachePolicySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        if *self == Self::all() {
            return f.write_str("ALL");
        }
        let names: Vec<_> = self.categories().map(MetadataCategory::as_str).collect();
        f.write_str(&names.join(","))
    }
}
