use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "enrichflow_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24"><rect x="2" y="2" width="20" height="20" fill="#3b1c32"/></svg>"##;

#[test]
fn every_node_kind_maps_to_an_icon_file() {
    let kinds = [
        NodeKind::Depositor,
        NodeKind::Metadata,
        NodeKind::Service,
        NodeKind::Enrichment,
        NodeKind::Validation,
    ];
    let mut names: Vec<&str> = kinds
        .iter()
        .map(|k| IconKey::for_kind(*k).file_name())
        .collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 5);
    assert_eq!(IconKey::for_kind(NodeKind::Enrichment).file_name(), "enrich.svg");
}

#[test]
fn load_skips_missing_and_broken_icons() {
    let dir = temp_dir("icons_partial");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("service.svg"), SQUARE).unwrap();
    std::fs::write(dir.join("metadata.svg"), "<svg").unwrap();

    let store = IconStore::load(&dir);
    assert_eq!(store.len(), 1);
    let icon = store.get(IconKey::Service).unwrap();
    assert_eq!((icon.width, icon.height), (ICON_SIZE, ICON_SIZE));
    assert_eq!(icon.rgba8_premul.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
    assert!(store.get(IconKey::Metadata).is_none());
    assert!(store.get(IconKey::Depositor).is_none());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn load_from_missing_directory_is_empty() {
    let store = IconStore::load(std::path::Path::new("/nonexistent/enrichflow/icons"));
    assert!(store.is_empty());
}
