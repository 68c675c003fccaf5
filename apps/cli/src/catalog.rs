//! File-backed option source
//!
//! Stands in for the remote concept, encounter type, form and location
//! lookups. The file is re-read on every fetch so a broken catalog behaves
//! like an unreachable server: the search modes absorb the error.

use async_trait::async_trait;
use cohort_search::{Concept, DropdownValue, Error, OptionSource, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    concepts: Vec<Concept>,
    #[serde(default)]
    encounter_types: Vec<DropdownValue>,
    #[serde(default)]
    forms: Vec<DropdownValue>,
    #[serde(default)]
    locations: Vec<DropdownValue>,
}

pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<CatalogFile> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::OptionSource(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::OptionSource(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl OptionSource for FileCatalog {
    async fn search_concepts(&self, search_text: &str) -> Result<Vec<Concept>> {
        let needle = search_text.trim().to_lowercase();
        let catalog = self.read().await?;
        Ok(catalog
            .concepts
            .into_iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect())
    }

    async fn fetch_encounter_types(&self) -> Result<Vec<DropdownValue>> {
        Ok(self.read().await?.encounter_types)
    }

    async fn fetch_forms(&self) -> Result<Vec<DropdownValue>> {
        Ok(self.read().await?.forms)
    }

    async fn fetch_locations(&self) -> Result<Vec<DropdownValue>> {
        Ok(self.read().await?.locations)
    }
}

/// Pick the option whose value or label matches `key`.
pub fn find_option<'a>(options: &'a [DropdownValue], key: &str) -> Option<&'a DropdownValue> {
    options
        .iter()
        .find(|o| o.value == key)
        .or_else(|| options.iter().find(|o| o.label.eq_ignore_ascii_case(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn catalog_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_search_concepts_by_name() {
        let file = catalog_file(
            r#"{
                "concepts": [
                    { "uuid": "c1", "hl7Abbrev": "NM", "name": "BLOOD SUGAR", "units": "mg/dl" },
                    { "uuid": "c2", "hl7Abbrev": "NM", "name": "WEIGHT (KG)", "units": "kg" }
                ]
            }"#,
        );
        let catalog = FileCatalog::new(file.path());

        let found = catalog.search_concepts("blood").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uuid, "c1");
        assert!(catalog.fetch_forms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_catalog_is_option_error() {
        let file = catalog_file("{ not json");
        let catalog = FileCatalog::new(file.path());

        assert!(matches!(
            catalog.fetch_locations().await,
            Err(Error::OptionSource(_))
        ));
    }

    #[test]
    fn test_find_option_by_value_or_label() {
        let options = vec![
            DropdownValue::new("loc-1", "Mulago"),
            DropdownValue::new("loc-2", "Kampala"),
        ];
        assert_eq!(find_option(&options, "loc-2").unwrap().label, "Kampala");
        assert_eq!(find_option(&options, "mulago").unwrap().value, "loc-1");
        assert!(find_option(&options, "Gulu").is_none());
    }
}
