use crate::model::Construction;
use crate::status::{MarkerColor, marker_color};
use std::collections::{BTreeSet, HashMap};

/// Client-side filters. Every criterion is optional; set ones must all match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructionFilter {
    pub search: String,
    pub status: Option<String>,
    pub city: Option<String>,
    pub license_type: Option<String>,
}

impl ConstructionFilter {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.status.is_none()
            && self.city.is_none()
            && self.license_type.is_none()
    }

    pub fn matches(&self, record: &Construction) -> bool {
        self.matches_search(record)
            && equals_ignore_case(self.status.as_deref(), &record.status)
            && equals_ignore_case(self.city.as_deref(), &record.city)
            && equals_ignore_case(self.license_type.as_deref(), &record.license_type)
    }

    pub fn apply(&self, records: &[Construction]) -> Vec<Construction> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    fn matches_search(&self, record: &Construction) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            &record.id,
            &record.company_name,
            &record.file_name,
            &record.address,
            &record.city,
            &record.cnpj,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

fn equals_ignore_case(wanted: Option<&str>, actual: &str) -> bool {
    match wanted {
        Some(wanted) => wanted.to_lowercase() == actual.to_lowercase(),
        None => true,
    }
}

/// One entry of the category scroller.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub status: String,
    pub count: usize,
    pub color: MarkerColor,
}

/// Status categories with their counts, largest first. Statuses differing
/// only by case are one category, named after the first spelling seen.
pub fn categories(records: &[Construction]) -> Vec<Category> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, (String, usize)> = HashMap::new();

    for record in records {
        let key = record.status.to_lowercase();
        counts
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                (record.status.clone(), 0)
            })
            .1 += 1;
    }

    let mut result: Vec<Category> = order
        .into_iter()
        .filter_map(|key| counts.remove(&key))
        .map(|(status, count)| Category {
            color: marker_color(Some(&status)),
            status,
            count,
        })
        .collect();

    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    result
}

/// Distinct non-empty cities, sorted.
pub fn cities(records: &[Construction]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.city.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
