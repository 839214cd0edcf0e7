//! End-to-end tests: KMZ upload through processed CSV download.

use kmz_oxide::config::PipelineConfig;
use kmz_oxide::mapping::{
    ComputedAttribute, FieldMapping, FieldSource, FixedAttribute, MappingFile,
};
use kmz_oxide::pipeline::{load_template, OutputKind, PipelineRun, Session};
use kmz_oxide::spatial::UnmatchedPolicy;
use kmz_oxide::tabular::TabularMode;
use kmz_oxide::Error;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// Fixture helpers

fn point(name: &str, lon: f64, lat: f64) -> String {
    format!(
        "<Placemark><name>{}</name><Point><coordinates>{},{},0</coordinates></Point></Placemark>",
        name, lon, lat
    )
}

fn square(name: &str, lon0: f64, lat0: f64, size: f64) -> String {
    let (lon1, lat1) = (lon0 + size, lat0 + size);
    format!(
        "<Placemark><name>{name}</name><Polygon><outerBoundaryIs><LinearRing><coordinates>\n\
         {lon0},{lat0},0 {lon1},{lat0},0 {lon1},{lat1},0 {lon0},{lat1},0 {lon0},{lat0},0\n\
         </coordinates></LinearRing></outerBoundaryIs></Polygon></Placemark>"
    )
}

fn folder(name: &str, body: &str) -> String {
    format!("<Folder><name>{}</name>{}</Folder>", name, body)
}

fn network_kml() -> String {
    let home = folder(
        "HOME",
        &[point("HP-001", 1.0, 1.0), point("HP-002", 4.0, 1.0), point("HP-003", 10.0, 10.0)].concat(),
    );
    let biz = folder("HOME-BIZ", &point("BIZ-001", 1.5, 0.5));
    let body = [
        folder("HP", &(home + &biz)),
        folder("POLE", &[point("P-01", 107.61, -6.91), point("P-02", 107.62, -6.92)].concat()),
        folder("FDT", &point("FDT-BDG-01", 107.6, -6.9)),
        folder("FAT", &point("FAT-01", 1.0, 1.0)),
        folder("BOUNDARY FAT", &(square("R1", 0.0, 0.0, 2.0) + &square("R2", 3.0, 0.0, 2.0))),
        folder("SITE PLAN", &point("ignored", 0.0, 0.0)),
    ]
    .concat();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document><name>cluster.kmz</name>{}</Document></kml>"#,
        folder("DISTRIBUSI", &body)
    )
}

fn build_kmz(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn subscriber_mapping(template: &kmz_oxide::TabularDataset) -> FieldMapping {
    let mut mapping = FieldMapping::for_schema(template);
    mapping.apply_subscriber_shortcuts();
    mapping
}

const HP_TEMPLATE: &str = "HOMEPASS_ID;BUILDING_LATITUDE;BUILDING_LONGITUDE;FAT_CODE;FDT_CODE;REMARK\n";
const POLE_TEMPLATE: &str = "POLE_ID,Coordinate (Lat) NEW,Coordinate (Long) NEW,Pole Provider (New)\n";

// Document loading

#[test]
fn test_load_document_summary() {
    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    let run = PipelineRun::load_document("cluster.kmz", &kmz, PipelineConfig::default()).unwrap();
    let summary = run.summary();

    assert_eq!(summary.subscribers, 4);
    assert_eq!(summary.poles, 2);
    assert_eq!(summary.boundary_regions, 2);
    assert_eq!(summary.distribution_points, 1);
    assert_eq!(run.distribution_box(), "FDT-BDG-01");
}

#[test]
fn test_markup_entry_may_live_in_a_subdirectory() {
    let kmz = build_kmz(&[
        ("files/icon.png", "not an image"),
        ("files/Network.KML", network_kml().as_str()),
    ]);
    let run = PipelineRun::load_document("a.KMZ", &kmz, PipelineConfig::default()).unwrap();
    assert_eq!(run.assets().poles().len(), 2);
}

#[test]
fn test_load_document_errors() {
    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    assert!(matches!(
        PipelineRun::load_document("cluster.zip", &kmz, PipelineConfig::default()),
        Err(Error::Format { expected: "kmz", .. })
    ));

    let no_markup = build_kmz(&[("readme.txt", "hello")]);
    assert!(matches!(
        PipelineRun::load_document("cluster.kmz", &no_markup, PipelineConfig::default()),
        Err(Error::Decode(_))
    ));

    assert!(matches!(
        PipelineRun::load_document("cluster.kmz", b"not a zip archive", PipelineConfig::default()),
        Err(Error::Decode(_))
    ));

    let broken = build_kmz(&[("doc.kml", "<kml><Document><Folder></Document></kml>")]);
    assert!(matches!(
        PipelineRun::load_document("cluster.kmz", &broken, PipelineConfig::default()),
        Err(Error::Decode(_))
    ));
}

#[test]
fn test_custom_network_root() {
    let kml = network_kml().replace("DISTRIBUSI", "DISTRIBUTION");
    let kmz = build_kmz(&[("doc.kml", kml.as_str())]);

    let default = PipelineRun::load_document("n.kmz", &kmz, PipelineConfig::default()).unwrap();
    assert_eq!(default.assets().total(), 0);
    assert_eq!(default.distribution_box(), "FRL0210");

    let custom = PipelineRun::load_document(
        "n.kmz",
        &kmz,
        PipelineConfig::default().with_network_root("DISTRIBUTION"),
    )
    .unwrap();
    assert_eq!(custom.summary().poles, 2);
}

// Subscriber pipeline

#[test]
fn test_subscriber_pipeline_end_to_end() {
    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    let run = PipelineRun::load_document("cluster.kmz", &kmz, PipelineConfig::default()).unwrap();
    let template = load_template("homepass.csv", HP_TEMPLATE.as_bytes(), TabularMode::Compat).unwrap();
    let mapping = subscriber_mapping(&template);

    let output = run.process(OutputKind::Subscriber, &template, &mapping).unwrap();
    let text = output.to_text(TabularMode::Compat).unwrap();

    let expected = [
        "HOMEPASS_ID;BUILDING_LATITUDE;BUILDING_LONGITUDE;FAT_CODE;FDT_CODE;REMARK",
        "\"HP-001\";\"1\";\"1\";\"R1\";\"FDT-BDG-01\";\"\"",
        "\"HP-003\";\"10\";\"10\";\"R1\";\"FDT-BDG-01\";\"\"",
        "\"BIZ-001\";\"0.5\";\"1.5\";\"R1\";\"FDT-BDG-01\";\"\"",
        "\"HP-002\";\"1\";\"4\";\"R2\";\"FDT-BDG-01\";\"\"",
    ]
    .join("\n");
    assert_eq!(text, expected);
    assert_eq!(output.file_name(), "processed_homepass.csv");
}

#[test]
fn test_unassigned_bucket_policy() {
    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    let config = PipelineConfig::default().with_unmatched(UnmatchedPolicy::Unassigned);
    let run = PipelineRun::load_document("cluster.kmz", &kmz, config).unwrap();
    let template = load_template("homepass.csv", HP_TEMPLATE.as_bytes(), TabularMode::Compat).unwrap();

    let output = run
        .process(OutputKind::Subscriber, &template, &subscriber_mapping(&template))
        .unwrap();
    let last = output.rows().last().unwrap();
    assert_eq!(last["HOMEPASS_ID"], "HP-003");
    assert_eq!(last["FAT_CODE"], "");
    assert_eq!(output.rows().len(), 4);
}

#[test]
fn test_no_regions_drops_subscribers() {
    let kml = network_kml().replace("BOUNDARY FAT", "BOUNDARY OLD");
    let kmz = build_kmz(&[("doc.kml", kml.as_str())]);
    let run = PipelineRun::load_document("cluster.kmz", &kmz, PipelineConfig::default()).unwrap();
    let template = load_template("homepass.csv", HP_TEMPLATE.as_bytes(), TabularMode::Compat).unwrap();

    let output = run
        .process(OutputKind::Subscriber, &template, &subscriber_mapping(&template))
        .unwrap();
    assert!(output.rows().is_empty());
    assert!(matches!(
        output.to_text(TabularMode::Compat),
        Err(Error::EmptyOutput(OutputKind::Subscriber))
    ));
}

// Pole pipeline

#[test]
fn test_pole_pipeline_with_shortcuts() {
    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    let run = PipelineRun::load_document("cluster.kmz", &kmz, PipelineConfig::default()).unwrap();
    let template = load_template("pole.csv", POLE_TEMPLATE.as_bytes(), TabularMode::Compat).unwrap();

    let mut mapping = FieldMapping::for_schema(&template);
    assert_eq!(mapping.apply_pole_shortcuts(), 4);

    let output = run.process(OutputKind::Pole, &template, &mapping).unwrap();
    let text = output.to_text(TabularMode::Compat).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "POLE_ID;Coordinate (Lat) NEW;Coordinate (Long) NEW;Pole Provider (New)"
    );
    assert_eq!(lines[1], "\"P-01\";\"-6.91\";\"107.61\";\"NEW\"");
    assert_eq!(lines[2], "\"P-02\";\"-6.92\";\"107.62\";\"NEW\"");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_strict_mode_round_trips_quotes() {
    let kml = network_kml().replace("P-01", "P-01 \"old\"; moved");
    let kmz = build_kmz(&[("doc.kml", kml.as_str())]);
    let config = PipelineConfig::default().with_tabular_mode(TabularMode::Strict);
    let run = PipelineRun::load_document("cluster.kmz", &kmz, config).unwrap();
    let template = load_template("pole.csv", b"ID;TYPE\n", TabularMode::Strict).unwrap();

    let mut mapping = FieldMapping::for_schema(&template);
    mapping.set("ID", FieldSource::Fixed(FixedAttribute::Name)).unwrap();
    mapping.set("TYPE", FieldSource::Fixed(FixedAttribute::Type)).unwrap();

    let output = run.process(OutputKind::Pole, &template, &mapping).unwrap();
    let text = output.to_text(TabularMode::Strict).unwrap();
    assert!(text.starts_with("\"ID\";\"TYPE\"\n\"P-01 \"\"old\"\"; moved\";\"point-feature\""));

    let reparsed = kmz_oxide::tabular::parse(&text, TabularMode::Strict);
    assert_eq!(reparsed.rows()[0]["ID"], "P-01 \"old\"; moved");
    assert_eq!(reparsed.rows().len(), 2);
}

// Session

#[test]
fn test_session_flow_and_export_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::default();

    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    session.load_document("cluster.kmz", &kmz).unwrap();
    let template = session
        .load_template(OutputKind::Subscriber, "homepass.csv", HP_TEMPLATE.as_bytes())
        .unwrap();

    let mut mapping = FieldMapping::for_schema(&template);
    mapping.set("HOMEPASS_ID", FieldSource::Fixed(FixedAttribute::Name)).unwrap();
    mapping
        .set("FAT_CODE", FieldSource::Computed(ComputedAttribute::AssignedRegion))
        .unwrap();
    mapping.set("REMARK", FieldSource::Computed(ComputedAttribute::Cluster)).unwrap();
    session.process(OutputKind::Subscriber, &mapping).unwrap();

    let (name, bytes) = session.export(OutputKind::Subscriber).unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, &bytes).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let dataset = kmz_oxide::tabular::parse(&written, TabularMode::Compat);
    assert_eq!(dataset.rows().len(), 4);
    assert_eq!(dataset.rows()[0]["REMARK"], "HP");
    assert_eq!(dataset.rows()[0]["FDT_CODE"], "");
}

#[test]
fn test_session_failed_document_load_keeps_state() {
    let mut session = Session::default();
    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    session.load_document("cluster.kmz", &kmz).unwrap();
    session
        .load_template(OutputKind::Pole, "pole.csv", POLE_TEMPLATE.as_bytes())
        .unwrap();

    let mut mapping = FieldMapping::for_schema(session.template(OutputKind::Pole).unwrap());
    mapping.apply_pole_shortcuts();
    session.process(OutputKind::Pole, &mapping).unwrap();

    assert!(session.load_document("broken.kmz", b"garbage").is_err());
    assert_eq!(session.run().unwrap().summary().poles, 2);
    assert!(session.export(OutputKind::Pole).is_ok());

    // A successful replacement discards outputs of the old document.
    let empty = build_kmz(&[("doc.kml", "<kml><Document/></kml>")]);
    session.load_document("empty.kmz", &empty).unwrap();
    assert!(session.output(OutputKind::Pole).is_none());
    assert!(matches!(
        session.export(OutputKind::Pole),
        Err(Error::EmptyOutput(OutputKind::Pole))
    ));
}

#[test]
fn test_mapping_file_shape() {
    let json = r#"{
        "subscriber": {
            "HOMEPASS_ID": {"fixed": "name"},
            "FAT_CODE": {"computed": "assigned_region"},
            "REMARK": {"literal": "survey 2024"}
        }
    }"#;
    let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
    let sources: std::collections::BTreeMap<String, FieldSource> =
        serde_json::from_value(parsed["subscriber"].clone()).unwrap();

    let template = load_template("homepass.csv", HP_TEMPLATE.as_bytes(), TabularMode::Compat).unwrap();
    let mapping = FieldMapping::from_sources(&template, &sources).unwrap();
    assert_eq!(mapping.mapped_count(), 3);
    assert_eq!(mapping.get("REMARK"), &FieldSource::Literal("survey 2024".to_string()));
}

#[test]
fn test_tag_vocabulary_mapping_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapping.json");
    std::fs::write(
        &path,
        r#"{
            "subscriber": {"HOMEPASS_ID": "name", "FAT_CODE": "fat_code", "FDT_CODE": "fdt_code"},
            "pole": {"POLE_ID": "name", "Pole Provider (New)": {"manual": "NEW"}}
        }"#,
    )
    .unwrap();
    let file = MappingFile::load(&path).unwrap();

    let kmz = build_kmz(&[("doc.kml", network_kml().as_str())]);
    let run = PipelineRun::load_document("cluster.kmz", &kmz, PipelineConfig::default()).unwrap();

    let template = load_template("homepass.csv", HP_TEMPLATE.as_bytes(), TabularMode::Compat).unwrap();
    let mapping = FieldMapping::from_sources(&template, &file.subscriber).unwrap();
    let output = run.process(OutputKind::Subscriber, &template, &mapping).unwrap();
    assert_eq!(output.rows()[0]["HOMEPASS_ID"], "HP-001");
    assert_eq!(output.rows()[0]["FAT_CODE"], "R1");
    assert_eq!(output.rows()[0]["FDT_CODE"], "FDT-BDG-01");

    let template = load_template("pole.csv", POLE_TEMPLATE.as_bytes(), TabularMode::Compat).unwrap();
    let mapping = FieldMapping::from_sources(&template, &file.pole).unwrap();
    let output = run.process(OutputKind::Pole, &template, &mapping).unwrap();
    assert_eq!(output.rows()[1]["POLE_ID"], "P-02");
    assert_eq!(output.rows()[1]["Pole Provider (New)"], "NEW");
}
