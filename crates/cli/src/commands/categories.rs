use anyhow::Result;
use serde::Serialize;

use olf_core::policy::MetadataCategory;
use olf_core::projection::schema_for;

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub token: &'static str,
    pub table: String,
    pub implemented: bool,
    pub default: bool,
    pub extended: bool,
    pub columns: Vec<&'static str>,
}

pub fn category_infos() -> Vec<CategoryInfo> {
    MetadataCategory::ALL
        .iter()
        .map(|&category| {
            let schema = schema_for(category);
            CategoryInfo {
                token: category.as_str(),
                table: format!("macho_{}", category.table_suffix()),
                implemented: schema.is_some(),
                default: MetadataCategory::DEFAULT.contains(&category),
                extended: MetadataCategory::EXTENDED.contains(&category),
                columns: schema.map(|s| s.columns().to_vec()).unwrap_or_default(),
            }
        })
        .collect()
}

/// List every metadata category and whether it has a table.
pub fn categories_command(json: bool) -> Result<()> {
    let infos = category_infos();

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("Categories:");
    for info in infos {
        let set = if info.default {
            "default"
        } else if info.extended {
            "extended"
        } else if info.implemented {
            "available"
        } else {
            "reserved"
        };
        println!("- {} -> {} ({})", info.token, info.table, set);
    }
    Ok(())
}
