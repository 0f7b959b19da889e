// Tests for status classification and marker colours

use obramap_core::status::{MarkerColor, StatusKind, marker_color};

#[test]
fn test_known_statuses_map_to_their_colours() {
    assert_eq!(marker_color(Some("aprovada")).hex(), "#4CAF50");
    assert_eq!(marker_color(Some("consulta")).hex(), "#2196F3");
    assert_eq!(marker_color(Some("análise")).hex(), "#FF9800");
    assert_eq!(marker_color(Some("residencial")).hex(), "#9C27B0");
    assert_eq!(marker_color(Some("comercial")).hex(), "#F44336");
}

#[test]
fn test_status_matching_is_case_insensitive() {
    assert_eq!(marker_color(Some("APROVADA")), MarkerColor::APPROVED);
    assert_eq!(marker_color(Some("Análise")), MarkerColor::UNDER_REVIEW);
    assert_eq!(marker_color(Some("Comercial")), MarkerColor::COMMERCIAL);
}

#[test]
fn test_missing_or_unknown_status_is_neutral() {
    assert_eq!(marker_color(None), MarkerColor::NEUTRAL);
    assert_eq!(marker_color(Some("")), MarkerColor::NEUTRAL);
    assert_eq!(marker_color(Some("embargada")), MarkerColor::NEUTRAL);
    // Unaccented spelling is a different status.
    assert_eq!(marker_color(Some("analise")), MarkerColor::NEUTRAL);
}

#[test]
fn test_status_kind_round_trips_known_names() {
    for kind in StatusKind::KNOWN {
        assert_eq!(StatusKind::from_status(kind.as_str()), kind);
        assert_ne!(kind.color(), MarkerColor::NEUTRAL);
    }
    assert_eq!(StatusKind::from_status("whatever"), StatusKind::Other);
}

#[test]
fn test_marker_color_rgb() {
    assert_eq!(MarkerColor::APPROVED.rgb(), (0x4C, 0xAF, 0x50));
    assert_eq!(MarkerColor::NEUTRAL.rgb(), (0x99, 0x99, 0x99));
    assert_eq!(MarkerColor::COMMERCIAL.to_string(), "#F44336");
}
