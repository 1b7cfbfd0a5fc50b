use geoscope_geography_models::{Bbl, Provenance};

use crate::Resolver;

impl Resolver {
    /// Neighborhood area code of a parcel.
    ///
    /// The parcel layer's pre-joined area column wins when present;
    /// otherwise the area with the largest overlap with the lot polygon.
    #[must_use]
    pub fn area_for_parcel(&self, bbl: &Bbl) -> Option<String> {
        self.area_with_source(bbl).map(|(code, _)| code)
    }

    /// Like [`Self::area_for_parcel`], tagged with where the code came
    /// from.
    #[must_use]
    pub fn area_with_source(&self, bbl: &Bbl) -> Option<(String, Provenance)> {
        let Some(parcel) = self.index().parcels.get(bbl) else {
            log::debug!("No parcel {bbl} for area lookup");
            return None;
        };
        if let Some(code) = &parcel.area_code {
            return Some((code.clone(), Provenance::ParcelIndex));
        }
        let area = self.index().areas.best_overlap(&parcel.geometry);
        if area.is_none() {
            log::debug!("Parcel {bbl} intersects no neighborhood area");
        }
        area.map(|a| (a.code.clone(), Provenance::SpatialJoin))
    }

    /// Neighborhood area code preferring the external geocoder.
    ///
    /// Datasets keyed by area often use the geocoder's code vintage, so
    /// its answer takes precedence over both local sources. Geocoder
    /// failures are logged and fall back to [`Self::area_with_source`].
    pub async fn authoritative_area_for_parcel(&self, bbl: &Bbl) -> Option<(String, Provenance)> {
        if let Some(geocoder) = self.geocoder() {
            match geocoder.bbl(bbl).await {
                Ok(record) => {
                    if let Some(code) = record.nta {
                        return Some((code, Provenance::Geocoder));
                    }
                    log::debug!("Geocoder returned no area for {bbl}");
                }
                Err(e) => log::warn!("Geocoder area lookup failed for {bbl}: {e}"),
            }
        }
        self.area_with_source(bbl)
    }

    /// Sorted keys of every parcel intersecting the area(s) with the
    /// given code.
    #[must_use]
    pub fn parcels_in_area(&self, code: &str) -> Vec<Bbl> {
        let areas = self.index().areas.with_code(code);
        if areas.is_empty() {
            log::debug!("No neighborhood area with code {code:?}");
            return Vec::new();
        }
        let mut keys: Vec<Bbl> = areas
            .iter()
            .flat_map(|area| self.index().parcels.keys_intersecting(&area.geometry))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Distinct area codes of several parcels, sorted.
    #[must_use]
    pub fn areas_for_parcels(&self, bbls: &[Bbl]) -> Vec<String> {
        let mut codes: Vec<String> = bbls
            .iter()
            .filter_map(|bbl| self.area_for_parcel(bbl))
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geoscope_geography_models::Provenance;
    use geoscope_spatial::fixtures::{island, north, south};

    use crate::test_support::{FakeGeocoder, resolver};

    #[test]
    fn spatial_join_picks_overlapping_area() {
        let resolver = resolver();
        assert_eq!(
            resolver.area_with_source(&north(1)),
            Some(("MN01".to_string(), Provenance::SpatialJoin))
        );
        assert_eq!(resolver.area_for_parcel(&north(3)).as_deref(), Some("MN02"));
    }

    #[test]
    fn prejoined_column_wins_over_spatial_join() {
        assert_eq!(
            resolver().area_with_source(&island(1)),
            Some(("MN99".to_string(), Provenance::ParcelIndex))
        );
    }

    #[test]
    fn parcels_in_area_are_sorted_spatial_matches() {
        let keys = resolver().parcels_in_area("mn01");
        assert_eq!(keys, vec![north(1), north(2), south(1), south(2), island(1)]);
    }

    #[test]
    fn unknown_area_has_no_parcels() {
        assert!(resolver().parcels_in_area("QN99").is_empty());
    }

    #[test]
    fn distinct_areas_for_several_parcels() {
        let codes = resolver().areas_for_parcels(&[north(5), north(1), south(5)]);
        assert_eq!(codes, vec!["MN01", "MN02"]);
    }

    #[tokio::test]
    async fn geocoder_area_takes_precedence() {
        let resolver = resolver().with_geocoder(Arc::new(FakeGeocoder::with_area("MN17")));
        assert_eq!(
            resolver.authoritative_area_for_parcel(&north(1)).await,
            Some(("MN17".to_string(), Provenance::Geocoder))
        );
    }

    #[tokio::test]
    async fn failed_geocoder_falls_back_to_index() {
        let resolver = resolver().with_geocoder(Arc::new(FakeGeocoder::failing()));
        assert_eq!(
            resolver.authoritative_area_for_parcel(&north(1)).await,
            Some(("MN01".to_string(), Provenance::SpatialJoin))
        );
    }

    #[tokio::test]
    async fn without_geocoder_uses_index() {
        assert_eq!(
            resolver().authoritative_area_for_parcel(&island(2)).await,
            Some(("MN99".to_string(), Provenance::ParcelIndex))
        );
    }
}
