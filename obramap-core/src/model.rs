use serde::{Deserialize, Serialize};

/// Status stored when the backend row carries none.
pub const DEFAULT_STATUS: &str = "Análise";

/// A latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

/// One construction permit as shown on the dashboard.
///
/// Every field is always present; the row mapper fills in empty strings and
/// zeros for anything the backend left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Construction {
    pub id: String,
    pub file_name: String,
    pub date: String,
    pub license_type: String,
    pub cnpj: String,
    pub address: String,
    pub company_name: String,
    pub city: String,
    pub built_area: f64,
    pub land_area: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
}

impl Default for Construction {
    fn default() -> Self {
        Self {
            id: String::new(),
            file_name: String::new(),
            date: String::new(),
            license_type: String::new(),
            cnpj: String::new(),
            address: String::new(),
            company_name: String::new(),
            city: String::new(),
            built_area: 0.0,
            land_area: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            status: DEFAULT_STATUS.to_string(),
        }
    }
}

impl Construction {
    /// Company name, then file name. `None` when both are blank.
    pub fn display_name(&self) -> Option<&str> {
        [&self.company_name, &self.file_name]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    /// Zero doubles as "missing" for coordinates.
    pub fn has_coordinates(&self) -> bool {
        is_usable_coordinate(self.latitude) && is_usable_coordinate(self.longitude)
    }

    pub fn position(&self) -> Option<LatLng> {
        self.has_coordinates()
            .then(|| LatLng::new(self.latitude, self.longitude))
    }
}

fn is_usable_coordinate(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_has_default_status() {
        let record = Construction::default();
        assert_eq!(record.status, DEFAULT_STATUS);
        assert!(!record.has_coordinates());
    }

    #[test]
    fn test_display_name_prefers_company() {
        let mut record = Construction {
            file_name: "alvara-12.pdf".to_string(),
            ..Default::default()
        };
        assert_eq!(record.display_name(), Some("alvara-12.pdf"));

        record.company_name = "Construtora Vale".to_string();
        assert_eq!(record.display_name(), Some("Construtora Vale"));

        record.company_name = "   ".to_string();
        record.file_name.clear();
        assert_eq!(record.display_name(), None);
    }

    #[test]
    fn test_coordinates_must_be_nonzero_and_finite() {
        let mut record = Construction {
            latitude: -27.0,
            longitude: -49.5,
            ..Default::default()
        };
        assert_eq!(record.position(), Some(LatLng::new(-27.0, -49.5)));

        record.longitude = 0.0;
        assert!(record.position().is_none());

        record.longitude = f64::NAN;
        assert!(!record.has_coordinates());
    }
}
