use serde::{Deserialize, Serialize};
use std::fmt;

/// A marker fill colour, kept as the `#RRGGBB` string the map engines expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerColor(&'static str);

impl MarkerColor {
    pub const APPROVED: MarkerColor = MarkerColor("#4CAF50");
    pub const CONSULTATION: MarkerColor = MarkerColor("#2196F3");
    pub const UNDER_REVIEW: MarkerColor = MarkerColor("#FF9800");
    pub const RESIDENTIAL: MarkerColor = MarkerColor("#9C27B0");
    pub const COMMERCIAL: MarkerColor = MarkerColor("#F44336");
    pub const NEUTRAL: MarkerColor = MarkerColor("#999999");

    pub fn hex(&self) -> &'static str {
        self.0
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |range: std::ops::Range<usize>| {
            self.0
                .get(range)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .unwrap_or(0)
        };
        (channel(1..3), channel(3..5), channel(5..7))
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The status vocabulary the backend uses. Anything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Approved,
    Consultation,
    UnderReview,
    Residential,
    Commercial,
    Other,
}

impl StatusKind {
    pub const KNOWN: [StatusKind; 5] = [
        StatusKind::Approved,
        StatusKind::Consultation,
        StatusKind::UnderReview,
        StatusKind::Residential,
        StatusKind::Commercial,
    ];

    /// Case-insensitive; never fails.
    pub fn from_status(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "aprovada" => StatusKind::Approved,
            "consulta" => StatusKind::Consultation,
            "análise" => StatusKind::UnderReview,
            "residencial" => StatusKind::Residential,
            "comercial" => StatusKind::Commercial,
            _ => StatusKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Approved => "aprovada",
            StatusKind::Consultation => "consulta",
            StatusKind::UnderReview => "análise",
            StatusKind::Residential => "residencial",
            StatusKind::Commercial => "comercial",
            StatusKind::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusKind::Approved => "Approved",
            StatusKind::Consultation => "Consultation",
            StatusKind::UnderReview => "Under review",
            StatusKind::Residential => "Residential",
            StatusKind::Commercial => "Commercial",
            StatusKind::Other => "Other",
        }
    }

    pub fn color(&self) -> MarkerColor {
        match self {
            StatusKind::Approved => MarkerColor::APPROVED,
            StatusKind::Consultation => MarkerColor::CONSULTATION,
            StatusKind::UnderReview => MarkerColor::UNDER_REVIEW,
            StatusKind::Residential => MarkerColor::RESIDENTIAL,
            StatusKind::Commercial => MarkerColor::COMMERCIAL,
            StatusKind::Other => MarkerColor::NEUTRAL,
        }
    }
}

/// Marker colour for a status; absent or unknown statuses get the neutral grey.
pub fn marker_color(status: Option<&str>) -> MarkerColor {
    match status {
        Some(status) if !status.is_empty() => StatusKind::from_status(status).color(),
        _ => MarkerColor::NEUTRAL,
    }
}
