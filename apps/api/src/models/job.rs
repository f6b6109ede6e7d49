use serde::{Deserialize, Serialize};

/// A job posting as returned by the staffing backend's search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    /// HTML, rendered as-is by the job detail page.
    pub description: String,
    pub posted_date: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub salary: String,
    pub zip: String,
    pub city: String,
    pub state: String,
}

/// Search parameters passed straight through to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// Search radius in miles around `zip`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_record_tolerates_missing_fields() {
        let job: JobRecord = serde_json::from_value(json!({
            "id": "J-42",
            "title": "ICU Travel RN",
            "type": "Travel",
            "city": "Austin"
        }))
        .unwrap();
        assert_eq!(job.id, "J-42");
        assert_eq!(job.job_type, "Travel");
        assert_eq!(job.salary, "");
    }

    #[test]
    fn test_search_query_omits_unset_parameters() {
        let query = JobSearchQuery {
            keyword: Some("nurse".to_string()),
            radius: Some(25),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"keyword": "nurse", "radius": 25})
        );
    }
}
