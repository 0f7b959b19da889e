use crate::engine::{MarkerSpec, Popup};
use crate::model::Construction;
use crate::status::marker_color;

const NOT_AVAILABLE: &str = "N/A";

pub fn popup_for(record: &Construction) -> Popup {
    let title = record
        .display_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Construction {}", record.id));

    let mut lines = vec![
        format!("Status: {}", or_not_available(&record.status)),
        format!("City: {}", or_not_available(&record.city)),
    ];
    if !record.address.trim().is_empty() {
        lines.push(format!("Address: {}", record.address));
    }

    Popup { title, lines }
}

/// `None` for records that cannot be placed on the map.
pub fn marker_for(record: &Construction, clickable: bool) -> Option<MarkerSpec> {
    let position = record.position()?;

    Some(MarkerSpec {
        position,
        label: record.id.clone(),
        color: marker_color(Some(&record.status)),
        popup: popup_for(record),
        clickable,
    })
}

fn or_not_available(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LatLng;
    use crate::status::MarkerColor;

    fn record(id: &str, lat: f64, lng: f64, status: &str) -> Construction {
        Construction {
            id: id.to_string(),
            latitude: lat,
            longitude: lng,
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_marker_for_approved_record() {
        let marker = marker_for(&record("7", -27.0, -49.5, "aprovada"), false).unwrap();

        assert_eq!(marker.position, LatLng::new(-27.0, -49.5));
        assert_eq!(marker.label, "7");
        assert_eq!(marker.color, MarkerColor::APPROVED);
        assert!(marker.popup.to_text().contains("Status: aprovada"));
    }

    #[test]
    fn test_popup_fallbacks() {
        let popup = popup_for(&record("12", 1.0, 1.0, ""));

        assert_eq!(popup.title, "Construction 12");
        assert_eq!(popup.lines, vec!["Status: N/A", "City: N/A"]);
    }

    #[test]
    fn test_popup_includes_address_when_present() {
        let mut r = record("3", 1.0, 1.0, "consulta");
        r.company_name = "Construtora Vale".to_string();
        r.city = "Blumenau".to_string();
        r.address = "Rua XV de Novembro, 100".to_string();

        let text = popup_for(&r).to_text();
        assert!(text.starts_with("Construtora Vale\n"));
        assert!(text.contains("City: Blumenau"));
        assert!(text.contains("Address: Rua XV de Novembro, 100"));
    }

    #[test]
    fn test_no_marker_without_coordinates() {
        assert!(marker_for(&record("1", 0.0, -49.5, "aprovada"), true).is_none());
        assert!(marker_for(&record("1", -27.0, 0.0, "aprovada"), true).is_none());
    }
}
