mod common;

use std::fs;

use solarsync::domain::CalendarDate;
use solarsync::manifest::Manifest;
use solarsync::source::SourceDescriptor;
use solarsync::window::{DateWindow, WindowSpec};

use common::temp_store;

#[test]
fn layout_paths() {
    let (_temp, store) = temp_store();
    let date: CalendarDate = "20251222".parse().unwrap();

    let path = store.artifact_path(&SourceDescriptor::helioviewer(), date);
    assert!(path.ends_with("docs/imgs/20251222.png"));

    let path = store.artifact_path(&SourceDescriptor::boulder(), date);
    assert!(path.ends_with("docs/boulder/20251222.png"));

    assert!(store.manifest_path("manifest.json").ends_with("docs/manifest.json"));
}

#[test]
fn needs_fetch_flips_after_record() {
    let (_temp, store) = temp_store();
    let source = SourceDescriptor::boulder();
    let date: CalendarDate = "20251222".parse().unwrap();

    assert!(store.needs_fetch(&source, date));
    let path = store.record(&source, date, b"drawing").unwrap();
    assert!(!store.needs_fetch(&source, date));
    assert_eq!(fs::read(path.as_std_path()).unwrap(), b"drawing");

    // other sources keep their own ledger
    assert!(store.needs_fetch(&SourceDescriptor::helioviewer(), date));
}

#[test]
fn manifest_is_published_under_the_store_root() {
    let (_temp, store) = temp_store();
    let window = DateWindow::new("20251222".parse().unwrap(), WindowSpec::default());
    let path = store.manifest_path("manifest.json");

    Manifest::build(&window).write(&path).unwrap();
    let loaded = Manifest::load(path.as_std_path()).unwrap();
    assert_eq!(loaded.frames.len(), 55);
    assert!(fs::read_to_string(path.as_std_path()).unwrap().ends_with("}\n"));
}
