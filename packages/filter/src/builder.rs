//! Builds `SoQL` filters from resolved scopes.
//!
//! The seed parcels are first widened to the dataset's surrounding scope
//! (or narrowed to the first seed), then converted to the dataset's geo
//! unit and rendered in its column spelling. A scope that converts to
//! nothing yields a small unfiltered preview instead of a predicate that
//! can never match.

use std::collections::BTreeSet;

use geoscope_filter_models::{
    BoroughFormat, DatasetFilter, DatasetGeoConfig, FilterKind, GeoUnit, DEFAULT_CIRCLE_FT,
    DEFAULT_PREVIEW_LIMIT, DEFAULT_ROW_LIMIT,
};
use geoscope_geography_models::{Bbl, Borough};
use geoscope_resolve::Resolver;
use geoscope_scope::surrounding_many;

/// Meters per international foot, for `within_circle` radii.
const METERS_PER_FOOT: f64 = 0.3048;

/// Builds dataset filters against one resolver.
#[derive(Clone)]
pub struct FilterBuilder {
    resolver: Resolver,
    row_limit: u32,
    preview_limit: u32,
}

impl FilterBuilder {
    /// Builder with the default row and preview limits.
    #[must_use]
    pub const fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            row_limit: DEFAULT_ROW_LIMIT,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    /// Overrides the global row ceiling and the preview limit.
    #[must_use]
    pub const fn with_limits(mut self, row_limit: u32, preview_limit: u32) -> Self {
        self.row_limit = row_limit;
        self.preview_limit = preview_limit;
        self
    }

    /// The resolver scopes are converted with.
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Builds the filter for one dataset.
    ///
    /// Never fails: datasets without a geo unit are fetched unscoped up to
    /// the row ceiling, and scopes that convert to no values (or configs
    /// missing the unit's column) degrade to a preview.
    #[must_use]
    pub fn build(&self, config: &DatasetGeoConfig, seeds: &[Bbl]) -> DatasetFilter {
        let limit = config
            .limit
            .map_or(self.row_limit, |limit| limit.min(self.row_limit));

        let Some(unit) = config.geo_unit else {
            log::debug!("{}: no geographic key, fetching unscoped", config.name);
            return DatasetFilter {
                dataset_id: config.id.clone(),
                where_clause: None,
                limit,
                kind: FilterKind::Unscoped,
            };
        };

        let scope = self.scope_for(config, seeds);
        match self.predicate(config, unit, &scope) {
            Some(predicate) => DatasetFilter {
                dataset_id: config.id.clone(),
                where_clause: Some(predicate),
                limit,
                kind: FilterKind::Scoped,
            },
            None => {
                log::info!(
                    "{}: {} scoped parcels gave no {unit} values, previewing",
                    config.name,
                    scope.len()
                );
                DatasetFilter {
                    dataset_id: config.id.clone(),
                    where_clause: None,
                    limit: self.preview_limit.min(limit),
                    kind: FilterKind::Preview,
                }
            }
        }
    }

    /// Builds filters for several datasets over the same seeds.
    #[must_use]
    pub fn build_all(&self, configs: &[DatasetGeoConfig], seeds: &[Bbl]) -> Vec<DatasetFilter> {
        configs.iter().map(|config| self.build(config, seeds)).collect()
    }

    /// The parcels a dataset is filtered by: the surrounding scope of all
    /// seeds when configured, else the first seed alone.
    #[must_use]
    pub fn scope_for(&self, config: &DatasetGeoConfig, seeds: &[Bbl]) -> Vec<Bbl> {
        if !config.surrounding {
            return seeds.first().copied().into_iter().collect();
        }
        match surrounding_many(self.resolver.index(), seeds, &config.surrounding_options()) {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("{}: surrounding scope failed: {e}", config.name);
                Vec::new()
            }
        }
    }

    /// Distinct values of `unit` for the given parcels, in the dataset's
    /// spelling. Circle and split-key units have no single value per
    /// parcel and render as parcel keys.
    #[must_use]
    pub fn unit_values(&self, config: &DatasetGeoConfig, unit: GeoUnit, scope: &[Bbl]) -> Vec<String> {
        match unit {
            GeoUnit::Bbl | GeoUnit::Radius | GeoUnit::BblSplit => {
                scope.iter().map(ToString::to_string).collect()
            }
            GeoUnit::Precinct => self
                .resolver
                .precincts_for_parcels(scope)
                .iter()
                .map(ToString::to_string)
                .collect(),
            GeoUnit::Nta => self.resolver.areas_for_parcels(scope),
            GeoUnit::Segment => self
                .resolver
                .segments_for_parcels(scope, None)
                .into_iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            GeoUnit::Borough => scope
                .iter()
                .map(Bbl::borough)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|borough| borough_value(borough, config.borough_format))
                .collect(),
        }
    }

    fn predicate(&self, config: &DatasetGeoConfig, unit: GeoUnit, scope: &[Bbl]) -> Option<String> {
        if scope.is_empty() {
            return None;
        }
        match unit {
            GeoUnit::BblSplit => split_predicate(config, scope),
            GeoUnit::Radius => self.circle_predicate(config, scope),
            _ => {
                let Some(column) = config.unit_column() else {
                    log::warn!("{}: no column configured for {unit}", config.name);
                    return None;
                };
                in_predicate(column, &self.unit_values(config, unit, scope))
            }
        }
    }

    fn circle_predicate(&self, config: &DatasetGeoConfig, scope: &[Bbl]) -> Option<String> {
        let Some(column) = config.unit_column() else {
            log::warn!("{}: no location column configured", config.name);
            return None;
        };
        let meters = config.radius_ft.unwrap_or(DEFAULT_CIRCLE_FT) * METERS_PER_FOOT;
        let circles: Vec<String> = scope
            .iter()
            .filter_map(|bbl| self.resolver.coordinate_for_parcel(bbl))
            .map(|(lon, lat)| format!("within_circle({column}, {lat:.6}, {lon:.6}, {meters:.1})"))
            .collect();
        join_or(circles)
    }
}

/// Quotes a `SoQL` string literal, doubling embedded single quotes.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `column IN ('a', 'b')`, or `None` when there are no values.
#[must_use]
pub fn in_predicate(column: &str, values: &[String]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    Some(format!("{column} IN ({})", quoted.join(", ")))
}

/// A borough in the given spelling.
#[must_use]
pub fn borough_value(borough: Borough, format: BoroughFormat) -> String {
    match format {
        BoroughFormat::Code => borough.code().to_string(),
        BoroughFormat::Name => borough.to_string(),
        BoroughFormat::UpperName => borough.to_string().to_uppercase(),
    }
}

fn padded(value: u32, width: usize) -> String {
    format!("{value:0width$}")
}

fn split_predicate(config: &DatasetGeoConfig, scope: &[Bbl]) -> Option<String> {
    let columns = &config.columns;
    let (Some(borough), Some(block), Some(lot)) = (
        columns.borough.as_deref(),
        columns.block.as_deref(),
        columns.lot.as_deref(),
    ) else {
        log::warn!("{}: split key needs borough, block and lot columns", config.name);
        return None;
    };

    let clauses: Vec<String> = scope
        .iter()
        .map(|bbl| {
            format!(
                "({borough} = {} AND {block} = {} AND {lot} = {})",
                quote(&borough_value(bbl.borough(), config.borough_format)),
                quote(&padded(bbl.block(), config.block_width)),
                quote(&padded(bbl.lot(), config.lot_width)),
            )
        })
        .collect();
    join_or(clauses)
}

fn join_or(clauses: Vec<String>) -> Option<String> {
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" OR "))
    }
}
