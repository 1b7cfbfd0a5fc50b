use geoscope_geography_models::{Bbl, Precinct};

use crate::Resolver;

impl Resolver {
    /// Police precinct of a parcel, from the parcel layer's precinct
    /// attribute.
    #[must_use]
    pub fn precinct_for_parcel(&self, bbl: &Bbl) -> Option<Precinct> {
        let precinct = self.index().parcels.precinct_of(bbl);
        if precinct.is_none() {
            log::debug!("No precinct for {bbl}");
        }
        precinct
    }

    /// Sorted keys of every parcel in a precinct.
    #[must_use]
    pub fn parcels_in_precinct(&self, precinct: Precinct) -> Vec<Bbl> {
        self.index().parcels.keys_in_precinct(precinct)
    }

    /// Distinct precincts of several parcels, sorted. Parcels without a
    /// precinct are skipped.
    #[must_use]
    pub fn precincts_for_parcels(&self, bbls: &[Bbl]) -> Vec<Precinct> {
        let mut precincts: Vec<Precinct> = bbls
            .iter()
            .filter_map(|bbl| self.precinct_for_parcel(bbl))
            .collect();
        precincts.sort_unstable();
        precincts.dedup();
        precincts
    }
}

#[cfg(test)]
mod tests {
    use geoscope_spatial::fixtures::{north, south};

    use crate::test_support::resolver;

    #[test]
    fn precinct_comes_from_parcel_attribute() {
        let resolver = resolver();
        assert_eq!(resolver.precinct_for_parcel(&north(3)), Some(1));
        assert_eq!(resolver.precinct_for_parcel(&south(3)), Some(5));
    }

    #[test]
    fn unknown_parcel_has_no_precinct() {
        let resolver = resolver();
        let unknown = "5999990001".parse().unwrap();
        assert_eq!(resolver.precinct_for_parcel(&unknown), None);
    }

    #[test]
    fn precinct_lookups_round_trip() {
        let resolver = resolver();
        let keys = resolver.parcels_in_precinct(1);
        assert_eq!(keys.len(), 7);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        for key in &keys {
            assert_eq!(resolver.precinct_for_parcel(key), Some(1));
        }
    }

    #[test]
    fn empty_precinct_returns_no_parcels() {
        assert!(resolver().parcels_in_precinct(99).is_empty());
    }

    #[test]
    fn distinct_precincts_for_several_parcels() {
        let resolver = resolver();
        let precincts = resolver.precincts_for_parcels(&[south(1), north(1), north(2)]);
        assert_eq!(precincts, vec![1, 5]);
    }
}
