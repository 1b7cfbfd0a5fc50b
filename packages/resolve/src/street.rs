use geoscope_geography_models::{Bbl, SegmentId};
use geoscope_spatial::geometry::union_all;

use crate::Resolver;

impl Resolver {
    /// Ids of street segments whose corridor intersects the parcel,
    /// sorted.
    #[must_use]
    pub fn segments_for_parcel(&self, bbl: &Bbl, fixed_ft: Option<f64>) -> Vec<SegmentId> {
        self.segments_for_parcels(std::slice::from_ref(bbl), fixed_ft)
    }

    /// Ids of street segments whose corridor intersects any of the
    /// parcels, sorted and de-duplicated.
    #[must_use]
    pub fn segments_for_parcels(&self, bbls: &[Bbl], fixed_ft: Option<f64>) -> Vec<SegmentId> {
        let streets = &self.index().streets;
        let mut ids: Vec<SegmentId> = self
            .index()
            .parcels
            .by_keys(bbls)
            .into_iter()
            .flat_map(|parcel| streets.corridors_touching(&parcel.geometry, fixed_ft))
            .filter_map(|row| streets.segment(row).map(|s| s.id.clone()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Sorted keys of parcels intersecting the corridors of the given
    /// segments. Unknown ids are skipped.
    #[must_use]
    pub fn parcels_for_segments(&self, ids: &[SegmentId], fixed_ft: Option<f64>) -> Vec<Bbl> {
        let streets = &self.index().streets;
        let rows: Vec<usize> = ids
            .iter()
            .filter_map(|id| {
                let row = streets.row_of(id);
                if row.is_none() {
                    log::debug!("Unknown street segment {id}");
                }
                row
            })
            .collect();
        self.parcels_along(&rows, fixed_ft)
    }

    /// Distinct names of the streets fronting a parcel, sorted.
    #[must_use]
    pub fn streets_for_parcel(&self, bbl: &Bbl) -> Vec<String> {
        let streets = &self.index().streets;
        let Some(parcel) = self.index().parcels.get(bbl) else {
            return Vec::new();
        };
        let mut names: Vec<String> = streets
            .corridors_touching(&parcel.geometry, None)
            .into_iter()
            .filter_map(|row| streets.segment(row).and_then(|s| s.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Sorted keys of parcels along every segment whose name contains
    /// `name`, case-insensitively.
    #[must_use]
    pub fn parcels_on_street(&self, name: &str, fixed_ft: Option<f64>) -> Vec<Bbl> {
        let rows = self.index().streets.matching_name(name);
        if rows.is_empty() {
            log::debug!("No street segments named like {name:?}");
        }
        self.parcels_along(&rows, fixed_ft)
    }

    fn parcels_along(&self, rows: &[usize], fixed_ft: Option<f64>) -> Vec<Bbl> {
        if rows.is_empty() {
            return Vec::new();
        }
        let corridors = self.index().streets.corridors(rows, fixed_ft);
        let area = union_all(&corridors);
        self.index().parcels.keys_intersecting(&area)
    }
}

#[cfg(test)]
mod tests {
    use geoscope_geography_models::SegmentId;
    use geoscope_spatial::fixtures::{north, south};

    use crate::test_support::resolver;

    #[test]
    fn segments_fronting_a_corner_lot() {
        let ids = resolver().segments_for_parcel(&north(2), None);
        assert_eq!(ids, vec![SegmentId::from("0000002"), SegmentId::from("0000009")]);
    }

    #[test]
    fn street_names_fronting_a_corner_lot() {
        assert_eq!(
            resolver().streets_for_parcel(&north(2)),
            vec!["BROADWAY", "MAIN STREET"]
        );
    }

    #[test]
    fn parcels_along_one_segment() {
        let keys = resolver().parcels_for_segments(&[SegmentId::from("0000002")], None);
        assert_eq!(keys, vec![north(2), south(2)]);
    }

    #[test]
    fn unknown_segments_are_skipped() {
        let resolver = resolver();
        assert!(resolver.parcels_for_segments(&[SegmentId::from("9999999")], None).is_empty());
        let keys = resolver.parcels_for_segments(
            &[SegmentId::from("9999999"), SegmentId::from("0000002")],
            None,
        );
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn parcels_on_street_matches_name_fragment() {
        let keys = resolver().parcels_on_street("broad", None);
        assert_eq!(keys, vec![north(2), north(3), south(2), south(3)]);
    }

    #[test]
    fn blank_street_name_matches_nothing() {
        assert!(resolver().parcels_on_street("  ", None).is_empty());
    }

    #[test]
    fn narrow_fixed_buffer_misses_setback_lots() {
        assert!(
            resolver()
                .parcels_for_segments(&[SegmentId::from("0000002")], Some(10.0))
                .is_empty()
        );
    }
}
