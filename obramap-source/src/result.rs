use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Everything one `fetch` pass brought back from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub view: String,
    pub rows: Vec<Value>,
    pub pages: usize,
    pub response_time: Duration,
}

impl FetchResult {
    pub fn new(view: String) -> Self {
        Self {
            view,
            rows: Vec::new(),
            pages: 0,
            response_time: Duration::from_secs(0),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
