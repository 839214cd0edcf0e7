//! Output row emission for the subscriber and pole pipelines.

use super::{FieldMapping, RowContext};
use crate::assets::Asset;
use crate::spatial::RegionGroups;
use crate::tabular::Record;

/// One output record, keyed by template header in template order.
pub type OutputRow = Record;

/// Rows for grouped subscriber points.
///
/// Groups are emitted in lexicographic order of region name, points within a
/// group in assignment order. Unassigned points follow with an empty region.
pub fn subscriber_rows(
    groups: &RegionGroups<'_>,
    mapping: &FieldMapping,
    distribution_box: &str,
) -> Vec<OutputRow> {
    let mut rows = Vec::with_capacity(groups.assigned_count() + groups.unassigned().len());

    for (region, points) in groups.sorted() {
        for point in points {
            rows.push(mapping.resolve(&RowContext {
                asset: point,
                region: Some(region),
                distribution_box,
            }));
        }
    }

    for point in groups.unassigned() {
        rows.push(mapping.resolve(&RowContext {
            asset: point,
            region: None,
            distribution_box,
        }));
    }

    rows
}

/// Rows for a flat asset list (poles), in collection order.
pub fn asset_rows(assets: &[Asset], mapping: &FieldMapping, distribution_box: &str) -> Vec<OutputRow> {
    assets
        .iter()
        .map(|asset| {
            mapping.resolve(&RowContext {
                asset,
                region: None,
                distribution_box,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coordinate;
    use crate::mapping::{ComputedAttribute, FieldSource, FixedAttribute};
    use crate::spatial::{assign, UnmatchedPolicy};

    fn square(name: &str, lat0: f64, lon0: f64) -> Asset {
        Asset::region(
            name,
            vec![
                Coordinate::new(lat0, lon0),
                Coordinate::new(lat0, lon0 + 2.0),
                Coordinate::new(lat0 + 2.0, lon0 + 2.0),
                Coordinate::new(lat0 + 2.0, lon0),
            ],
        )
    }

    fn mapping() -> FieldMapping {
        let headers: Vec<String> = ["ID", "FAT", "FDT", "EMPTY"].iter().map(|s| s.to_string()).collect();
        let mut mapping = FieldMapping::from_headers(&headers);
        mapping.set("ID", FieldSource::Fixed(FixedAttribute::Name)).unwrap();
        mapping
            .set("FAT", FieldSource::Computed(ComputedAttribute::AssignedRegion))
            .unwrap();
        mapping
            .set("FDT", FieldSource::Computed(ComputedAttribute::DistributionBoxName))
            .unwrap();
        mapping
    }

    #[test]
    fn test_subscriber_rows_sorted_by_region_name() {
        let regions = vec![square("FAT-B", 0.0, 0.0), square("FAT-A", 0.0, 3.0)];
        let points = vec![
            Asset::point("h1", Some(Coordinate::new(1.0, 1.0))),
            Asset::point("h2", Some(Coordinate::new(1.0, 4.0))),
            Asset::point("h3", Some(Coordinate::new(1.5, 1.5))),
        ];
        let groups = assign(&points, &regions, UnmatchedPolicy::FirstRegion);
        let rows = subscriber_rows(&groups, &mapping(), "FDT-01");

        let ids: Vec<_> = rows.iter().map(|r| r["ID"].as_str()).collect();
        assert_eq!(ids, vec!["h2", "h1", "h3"]);
        assert_eq!(rows[0]["FAT"], "FAT-A");
        assert_eq!(rows[1]["FAT"], "FAT-B");
        assert!(rows.iter().all(|r| r["FDT"] == "FDT-01" && r["EMPTY"].is_empty()));
        assert!(rows.iter().all(|r| r.len() == 4));
    }

    #[test]
    fn test_unassigned_rows_follow_with_empty_region() {
        let regions = vec![square("FAT-A", 0.0, 0.0)];
        let points = vec![
            Asset::point("out", Some(Coordinate::new(9.0, 9.0))),
            Asset::point("in", Some(Coordinate::new(1.0, 1.0))),
        ];
        let groups = assign(&points, &regions, UnmatchedPolicy::Unassigned);
        let rows = subscriber_rows(&groups, &mapping(), "FRL0210");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ID"], "in");
        assert_eq!(rows[1]["ID"], "out");
        assert_eq!(rows[1]["FAT"], "");
    }

    #[test]
    fn test_asset_rows_keep_collection_order() {
        let poles = vec![Asset::point("P-2", None), Asset::point("P-1", None)];
        let rows = asset_rows(&poles, &mapping(), "FRL0210");
        let ids: Vec<_> = rows.iter().map(|r| r["ID"].as_str()).collect();
        assert_eq!(ids, vec!["P-2", "P-1"]);
        assert_eq!(rows[0]["FAT"], "");
    }
}
