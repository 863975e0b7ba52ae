//! Catalog of upstream weather condition codes.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A human readable weather condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub description: String,
    pub icon: String,
}

/// Condition id (as the upstream API reports it) to condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionCatalog {
    entries: BTreeMap<String, Condition>,
}

impl ConditionCatalog {
    /// Parse a catalog from its JSON object form: `{"800": {"name": ..}}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Condition> {
        self.entries.get(id)
    }

    /// Conditions for a record, in the order of its ids. Unknown ids are skipped.
    ///
    /// Icons get a `d` or `n` suffix depending on whether the record was taken
    /// in daylight, and descriptions are cut at the first `": "`.
    pub fn resolve(&self, record: &Record) -> Vec<Condition> {
        let suffix = if record.is_daytime() { "d" } else { "n" };
        record
            .weather_ids()
            .filter_map(|id| self.entries.get(id))
            .map(|c| Condition {
                name: c.name.clone(),
                description: c
                    .description
                    .split(": ")
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                icon: format!("{}{}", c.icon, suffix),
            })
            .collect()
    }
}

impl FromIterator<(String, Condition)> for ConditionCatalog {
    fn from_iter<T: IntoIterator<Item = (String, Condition)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "800": {"name": "Clear", "description": "clear sky", "icon": "01"},
        "501": {"name": "Rain", "description": "moderate rain: steady", "icon": "10"}
    }"#;

    fn record(weather: &str, dt: i64) -> Record {
        Record {
            dt,
            sunrise: 100,
            sunset: 200,
            weather: weather.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn parses_json_object() {
        let catalog = ConditionCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("800").unwrap().name, "Clear");
    }

    #[test]
    fn resolves_in_id_order_with_day_icons() {
        let catalog = ConditionCatalog::from_json(CATALOG).unwrap();
        let conditions = catalog.resolve(&record("501,800", 150));
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].name, "Rain");
        assert_eq!(conditions[0].description, "moderate rain");
        assert_eq!(conditions[0].icon, "10d");
        assert_eq!(conditions[1].icon, "01d");
    }

    #[test]
    fn night_icons_and_unknown_ids() {
        let catalog = ConditionCatalog::from_json(CATALOG).unwrap();
        let conditions = catalog.resolve(&record("999,800", 250));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].icon, "01n");
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        let catalog = ConditionCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.resolve(&record("800", 150)).is_empty());
    }
}
