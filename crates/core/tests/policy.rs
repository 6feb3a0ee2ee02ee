use olf_core::policy::{CachePolicySet, MetadataCategory, PolicyError};

#[test]
fn all_token_sets_every_declared_flag() {
    let all = CachePolicySet::from_string("ALL").expect("ALL");
    assert_eq!(all, CachePolicySet::all());
    assert!(all.is_all());

    // Every flag the set declares is a category, and every category has one.
    let declared: Vec<MetadataCategory> = CachePolicySet::all()
        .iter_names()
        .map(|(name, flag)| {
            let category: MetadataCategory = name.parse().expect("flag names a category");
            assert_eq!(category.flag(), flag, "{name} maps to another bit");
            category
        })
        .collect();
    assert_eq!(declared, MetadataCategory::ALL.to_vec());

    for category in MetadataCategory::ALL {
        assert!(all.caches(category), "ALL missing {category}");
    }
    assert_eq!(all.bits().count_ones() as usize, MetadataCategory::ALL.len());
}

#[test]
fn every_variant_is_listed_in_all() {
    // Exhaustive on purpose: a new variant must be added here and shows up in ALL.
    fn position(category: MetadataCategory) -> usize {
        match category {
            MetadataCategory::Symbols => 0,
            MetadataCategory::Sections => 1,
            MetadataCategory::Exports => 2,
            MetadataCategory::Imports => 3,
            MetadataCategory::Segments => 4,
            MetadataCategory::LoadCommands => 5,
            MetadataCategory::Headers => 6,
            MetadataCategory::Instructions => 7,
            MetadataCategory::Strings => 8,
            MetadataCategory::VersionRequirements => 9,
            MetadataCategory::VersionDefinitions => 10,
            MetadataCategory::DieInfo => 11,
            MetadataCategory::DieCallGraph => 12,
        }
    }
    for (idx, category) in MetadataCategory::ALL.into_iter().enumerate() {
        assert_eq!(position(category), idx);
    }
}

#[test]
fn collecting_categories_matches_the_token_list() {
    let folded: CachePolicySet = MetadataCategory::ALL.into_iter().collect();
    assert_eq!(folded, CachePolicySet::all());
    let pair: CachePolicySet =
        [MetadataCategory::Exports, MetadataCategory::Imports].into_iter().collect();
    assert_eq!(pair, CachePolicySet::EXPORTS | CachePolicySet::IMPORTS);
    assert_eq!(CachePolicySet::from(MetadataCategory::Headers), CachePolicySet::HEADERS);
}

#[test]
fn none_and_empty_selection_cache_nothing() {
    assert!(CachePolicySet::from_string("NONE").expect("NONE").is_empty());
    let empty: [&str; 0] = [];
    assert!(CachePolicySet::from_selection(&empty).expect("empty").is_empty());
}

#[test]
fn names_parse_case_insensitively_and_combine() {
    let set = CachePolicySet::from_string(" symbols , Exports").expect("list");
    assert!(set.caches(MetadataCategory::Symbols));
    assert!(set.caches(MetadataCategory::Exports));
    assert!(!set.caches(MetadataCategory::Imports));

    let joined = CachePolicySet::from_selection(&["IMPORTS", "load_commands"]).expect("flags");
    assert_eq!(
        joined.categories().collect::<Vec<_>>(),
        vec![MetadataCategory::Imports, MetadataCategory::LoadCommands]
    );
}

#[test]
fn reserved_categories_are_valid_tokens() {
    let set = CachePolicySet::from_string("DIE_CALL_GRAPH").expect("reserved token");
    assert!(set.caches(MetadataCategory::DieCallGraph));
}

#[test]
fn unknown_token_is_rejected_by_name() {
    let err = CachePolicySet::from_string("BOGUS").expect_err("BOGUS must fail");
    assert_eq!(err.token(), "BOGUS");
    let PolicyError::InvalidConfiguration { expected, .. } = &err;
    assert!(expected.contains("SYMBOLS"));
    assert!(err.to_string().contains("'BOGUS'"), "unexpected message: {err}");

    let err = CachePolicySet::from_selection(&["SYMBOLS", "BOGUS"]).expect_err("mixed");
    assert_eq!(err.token(), "BOGUS");
}

#[test]
fn empty_list_member_is_rejected() {
    assert!(CachePolicySet::from_string("SYMBOLS,,EXPORTS").is_err());
    assert!(CachePolicySet::from_string("").is_err());
}

#[test]
fn display_uses_policy_tokens() {
    assert_eq!(CachePolicySet::empty().to_string(), "NONE");
    assert_eq!(CachePolicySet::all().to_string(), "ALL");
    let set = CachePolicySet::empty()
        .with(MetadataCategory::Exports)
        .with(MetadataCategory::Symbols);
    assert_eq!(set.to_string(), "SYMBOLS,EXPORTS");
}

#[test]
fn categories_round_trip_through_tokens() {
    for category in MetadataCategory::ALL {
        let parsed: MetadataCategory = category.as_str().parse().expect("parse token");
        assert_eq!(parsed, category);
    }
    assert_eq!(MetadataCategory::LoadCommands.table_suffix(), "load_commands");
}
