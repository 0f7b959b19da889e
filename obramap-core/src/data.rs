// Backend rows -> Construction records

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::model::{Construction, DEFAULT_STATUS};
use obramap_source::ConstructionSource;
use serde_json::Value;
use tracing::{debug, info};

// Column names as they exist in the Supabase view.
const COL_ID: &str = "id";
const COL_FILE_NAME: &str = "Nome do Arquivo";
const COL_DATE: &str = "Data";
const COL_LICENSE_TYPE: &str = "Tipo de Licença";
const COL_CNPJ: &str = "CNPJ";
const COL_ADDRESS: &str = "Endereço";
const COL_COMPANY_NAME: &str = "Nome da Empresa";
const COL_CITY: &str = "Cidade";
const COL_BUILT_AREA: &str = "Área Construída";
const COL_LAND_AREA: &str = "Área do Terreno";
const COL_LATITUDE: &str = "latitude";
const COL_LONGITUDE: &str = "longitude";
const COL_STATUS: &str = "status";

/// Map one raw backend row into a record. Total: anything missing, null or
/// malformed falls back to its default.
pub fn map_row(row: &Value) -> Construction {
    let Some(fields) = row.as_object() else {
        return Construction::default();
    };

    let text = |key: &str| fields.get(key).map(text_value).unwrap_or_default();
    let number = |key: &str| fields.get(key).map(parse_lenient_f64).unwrap_or(0.0);

    let file_name = text(COL_FILE_NAME);
    let id = fields
        .get(COL_ID)
        .filter(|v| !is_falsy(v))
        .map(text_value)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| file_name.clone());

    let status = Some(text(COL_STATUS))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());

    Construction {
        id,
        file_name,
        date: text(COL_DATE),
        license_type: text(COL_LICENSE_TYPE),
        cnpj: text(COL_CNPJ),
        address: text(COL_ADDRESS),
        company_name: text(COL_COMPANY_NAME),
        city: text(COL_CITY),
        built_area: number(COL_BUILT_AREA),
        land_area: number(COL_LAND_AREA),
        latitude: number(COL_LATITUDE),
        longitude: number(COL_LONGITUDE),
        status,
    }
}

pub fn map_rows(rows: &[Value]) -> Vec<Construction> {
    rows.iter().map(map_row).collect()
}

/// Numbers pass through, strings are read by their longest leading numeric
/// prefix (`"12.5 m²"` is 12.5). Everything else, and any non-finite result, is 0.
pub fn parse_lenient_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn parse_leading_float(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when digits follow it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => String::new(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Build a data source from the backend section of the configuration.
pub fn source_from_config(backend: &BackendConfig) -> Result<ConstructionSource> {
    let url = backend
        .url
        .clone()
        .ok_or_else(|| Error::MissingConfig("backend URL (--url or OBRAMAP_URL)".to_string()))?;
    let api_key = backend
        .api_key
        .clone()
        .ok_or_else(|| Error::MissingConfig("API key (--key or OBRAMAP_KEY)".to_string()))?;

    Ok(
        ConstructionSource::with_timeout(url, api_key, backend.timeout_secs)?
            .with_view(backend.view.clone())
            .with_page_size(backend.page_size)
            .with_order(backend.order.clone()),
    )
}

/// Fetch and map every record. Failures propagate; callers decide how to show them.
pub async fn fetch_constructions(source: &ConstructionSource) -> Result<Vec<Construction>> {
    let result = source.fetch().await?;
    let records = map_rows(&result.rows);
    let mappable = records.iter().filter(|r| r.has_coordinates()).count();

    info!(
        "Loaded {} constructions from {} ({} with coordinates)",
        records.len(),
        result.view,
        mappable
    );
    debug!("Fetch took {:?}", result.response_time);

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_leading_float_prefixes() {
        assert_eq!(parse_leading_float("12.5 m²"), Some(12.5));
        assert_eq!(parse_leading_float("  -27.2423"), Some(-27.2423));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("5."), Some(5.0));
        assert_eq!(parse_leading_float("1e3x"), Some(1000.0));
        assert_eq!(parse_leading_float("1e"), Some(1.0));
        assert_eq!(parse_leading_float("12,5"), Some(12.0));
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float("."), None);
    }

    #[test]
    fn test_lenient_parse_rejects_non_finite() {
        assert_eq!(parse_lenient_f64(&json!("1e999")), 0.0);
        assert_eq!(parse_lenient_f64(&json!(true)), 0.0);
        assert_eq!(parse_lenient_f64(&json!(null)), 0.0);
        assert_eq!(parse_lenient_f64(&json!(42)), 42.0);
    }

    #[test]
    fn test_numeric_zero_id_is_treated_as_missing() {
        let record = map_row(&json!({"id": 0, "Nome do Arquivo": "alvara.pdf"}));
        assert_eq!(record.id, "alvara.pdf");
    }
}
