//! Location arguments.

use futures::{StreamExt as _, stream};
use geoscope_bundle::BundleResolver;
use geoscope_bundle_models::GeoBundle;
use geoscope_geography_models::Bbl;

/// What a location argument names.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// A parcel key in any accepted spelling.
    Bbl(Bbl),
    /// `lon,lat` in degrees.
    Coordinate { lon: f64, lat: f64 },
    /// An address, intersection, or place name.
    Text(String),
}

/// Classifies one location argument.
#[must_use]
pub fn parse_location(text: &str) -> Location {
    let trimmed = text.trim();
    if let Some((lon, lat)) = trimmed.split_once(',')
        && let (Ok(lon), Ok(lat)) = (lon.trim().parse::<f64>(), lat.trim().parse::<f64>())
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
    {
        return Location::Coordinate { lon, lat };
    }
    trimmed
        .parse::<Bbl>()
        .map_or_else(|_| Location::Text(trimmed.to_string()), Location::Bbl)
}

/// Resolves each location argument, keeping argument order. Locations
/// that resolve to nothing are logged and skipped.
pub async fn resolve_all(
    bundles: &BundleResolver,
    locations: &[String],
    borough: &str,
    workers: usize,
) -> Vec<GeoBundle> {
    let resolved: Vec<Option<GeoBundle>> = stream::iter(locations)
        .map(|text| async move {
            let bundle = match parse_location(text) {
                Location::Bbl(bbl) => bundles.resolve_bbl(&bbl).await,
                Location::Coordinate { lon, lat } => bundles.resolve_coordinate(lon, lat).await,
                Location::Text(text) => bundles.resolve_text(&text, borough).await,
            };
            if bundle.is_none() {
                log::warn!("No match for {text:?}");
            }
            bundle
        })
        .buffered(workers.max(1))
        .collect()
        .await;
    resolved.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parcel_keys() {
        let bbl: Bbl = "1013007501".parse().unwrap();
        assert_eq!(parse_location("1013007501"), Location::Bbl(bbl));
        assert_eq!(parse_location(" 1-1300-7501 "), Location::Bbl(bbl));
    }

    #[test]
    fn coordinates() {
        assert_eq!(
            parse_location("-73.9855, 40.758"),
            Location::Coordinate {
                lon: -73.9855,
                lat: 40.758
            }
        );
        assert_eq!(
            parse_location("40.758,-273.9"),
            Location::Text("40.758,-273.9".to_string())
        );
    }

    #[test]
    fn everything_else_is_text() {
        assert_eq!(
            parse_location("237 Park Ave"),
            Location::Text("237 Park Ave".to_string())
        );
        assert_eq!(
            parse_location("Broadway & W 42 St"),
            Location::Text("Broadway & W 42 St".to_string())
        );
    }
}
