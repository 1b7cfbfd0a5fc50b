//! Dataset registry, loaded from embedded TOML configs.
//!
//! Each `.toml` file in `packages/filter/datasets/` is baked into the
//! binary at compile time via [`include_str!`]. Adding a dataset means
//! adding a file and listing it below.

use geoscope_filter_models::DatasetGeoConfig;

use crate::FilterError;

/// TOML configs embedded at compile time.
const DATASET_TOMLS: &[(&str, &str)] = &[
    (
        "asbestos_control_program",
        include_str!("../datasets/asbestos_control_program.toml"),
    ),
    (
        "clean_air_tracking_system",
        include_str!("../datasets/clean_air_tracking_system.toml"),
    ),
    ("crime", include_str!("../datasets/crime.toml")),
    ("dob_permits", include_str!("../datasets/dob_permits.toml")),
    (
        "motor_vehicle_collisions",
        include_str!("../datasets/motor_vehicle_collisions.toml"),
    ),
    (
        "population_by_community_district",
        include_str!("../datasets/population_by_community_district.toml"),
    ),
    ("population_by_nta", include_str!("../datasets/population_by_nta.toml")),
    ("sewer_system_data", include_str!("../datasets/sewer_system_data.toml")),
    (
        "traffic_volume_counts",
        include_str!("../datasets/traffic_volume_counts.toml"),
    ),
];

/// Parses one dataset config.
///
/// # Errors
///
/// Returns [`FilterError::Config`] if the TOML is malformed.
pub fn parse_dataset_toml(text: &str) -> Result<DatasetGeoConfig, FilterError> {
    Ok(toml::from_str(text)?)
}

/// Returns all configured datasets, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any embedded config is malformed.
#[must_use]
pub fn all_datasets() -> Vec<DatasetGeoConfig> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_dataset_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks a dataset up by id or by name (case-insensitive).
///
/// # Errors
///
/// Returns [`FilterError::UnknownDataset`] if nothing matches.
pub fn find_dataset(key: &str) -> Result<DatasetGeoConfig, FilterError> {
    let key = key.trim();
    all_datasets()
        .into_iter()
        .find(|d| d.id == key || d.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| FilterError::UnknownDataset(key.to_string()))
}

#[cfg(test)]
mod tests {
    use geoscope_filter_models::GeoUnit;

    use super::*;

    #[test]
    fn loads_all_datasets() {
        assert_eq!(all_datasets().len(), DATASET_TOMLS.len());
    }

    #[test]
    fn dataset_ids_are_unique() {
        let datasets = all_datasets();
        let mut ids: Vec<&str> = datasets.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DATASET_TOMLS.len());
    }

    #[test]
    fn every_geo_unit_has_its_columns() {
        for dataset in &all_datasets() {
            match dataset.geo_unit {
                None => {}
                Some(GeoUnit::BblSplit) => {
                    let columns = &dataset.columns;
                    assert!(
                        columns.borough.is_some() && columns.block.is_some() && columns.lot.is_some(),
                        "{}: split key columns missing",
                        dataset.id
                    );
                }
                Some(unit) => assert!(
                    dataset.unit_column().is_some(),
                    "{}: no column for {unit}",
                    dataset.id
                ),
            }
        }
    }

    #[test]
    fn finds_by_id_or_name() {
        assert_eq!(find_dataset("5uac-w243").unwrap().name, "Crime");
        assert_eq!(
            find_dataset("dob permits").unwrap().geo_unit,
            Some(GeoUnit::BblSplit)
        );
        assert!(matches!(
            find_dataset("nope"),
            Err(FilterError::UnknownDataset(_))
        ));
    }
}
