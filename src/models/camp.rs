use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// A scheduled medical camp as returned by the camps API.
///
/// Field names follow the live API exactly (`_id`, `dateTime`,
/// `participantCount`); the legacy prototype names (`id`, `campFees`)
/// are not supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Camp {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Storage key or public URL of the camp image.
    #[serde(default)]
    pub image: String,
    pub fees: f64,
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    pub location: String,
    /// Healthcare professional assigned to the camp.
    pub professional: String,
    #[serde(rename = "participantCount", default)]
    pub participant_count: i64,
    #[serde(default)]
    pub description: String,
    /// User id of the owning organizer. Absent on public listings.
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

impl Camp {
    pub fn formatted_date(&self) -> String {
        match &self.date_time {
            Some(date) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
                    dt.format("%b %d, %Y").to_string()
                } else {
                    // Fall back to raw date string, truncate if too long
                    date.chars().take(10).collect()
                }
            }
            None => "TBD".to_string(),
        }
    }

    pub fn formatted_time(&self) -> Option<String> {
        self.date_time.as_ref().and_then(|date| {
            if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
                Some(dt.format("%I:%M %p").to_string())
            } else {
                None
            }
        })
    }

    /// "Jan 26, 2026 @ 05:00 PM" for detail views
    pub fn formatted_datetime(&self) -> String {
        match &self.date_time {
            Some(date) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
                    dt.format("%b %d, %Y @ %I:%M %p").to_string()
                } else {
                    date.chars().take(16).collect()
                }
            }
            None => "TBD".to_string(),
        }
    }

    pub fn formatted_fees(&self) -> String {
        if self.fees <= 0.0 {
            "Free".to_string()
        } else {
            format!("${:.2}", self.fees)
        }
    }

    pub fn is_free(&self) -> bool {
        self.fees <= 0.0
    }
}

// Sorting options for the available-camps listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum CampSortColumn {
    #[default]
    MostRegistered,
    CampFees,
    Alphabetical,
}

impl CampSortColumn {
    /// Wire value used by the camps listing endpoint.
    pub fn as_param(&self) -> &'static str {
        match self {
            CampSortColumn::MostRegistered => "most-registered",
            CampSortColumn::CampFees => "camp-fees",
            CampSortColumn::Alphabetical => "alphabetical",
        }
    }
}

/// Filter parameters for the available-camps listing.
///
/// Also serves as the cache-key parameter set, so identical filters
/// hit the same cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampQuery {
    pub search: Option<String>,
    pub sort: CampSortColumn,
    pub page: i64,
    pub limit: i64,
}

impl Default for CampQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: CampSortColumn::default(),
            page: 1,
            limit: 6,
        }
    }
}

impl CampQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sort", self.sort.as_param().to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

/// Payload for creating a camp.
///
/// `image` carries the storage key handed back by the upload
/// coordinator; the form is only valid once the binary transfer
/// completed successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CampForm {
    pub name: String,
    pub image: String,
    pub fees: f64,
    #[serde(rename = "dateTime")]
    pub date_time: String,
    pub location: String,
    pub professional: String,
    pub description: String,
}

impl CampForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Camp name is required".to_string());
        }
        if self.image.trim().is_empty() {
            return Err("Camp image is required".to_string());
        }
        if self.fees < 0.0 {
            return Err("Camp fees cannot be negative".to_string());
        }
        if self.date_time.trim().is_empty() {
            return Err("Camp date is required".to_string());
        }
        if self.location.trim().is_empty() {
            return Err("Camp location is required".to_string());
        }
        if self.professional.trim().is_empty() {
            return Err("A healthcare professional is required".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camp_live_field_names() {
        let json = r#"{
            "_id": "665f1c2ab8d24a0012345678",
            "name": "Cardiology Health Camp",
            "image": "uploads/1717000000000-heart.png",
            "fees": 500,
            "dateTime": "2026-02-06T19:00:00+00:00",
            "location": "Dhaka Medical College",
            "professional": "Dr. Ayesha Rahman",
            "participantCount": 42,
            "description": "Free ECG screening",
            "organizer": "665f1c2ab8d24a0087654321",
            "createdAt": "2026-01-01T00:00:00.000Z"
        }"#;

        let camp: Camp = serde_json::from_str(json).expect("camp should parse");
        assert_eq!(camp.id, "665f1c2ab8d24a0012345678");
        assert_eq!(camp.fees, 500.0);
        assert_eq!(camp.participant_count, 42);
        assert_eq!(camp.formatted_date(), "Feb 06, 2026");
        assert_eq!(camp.formatted_fees(), "$500.00");
        assert!(!camp.is_free());
    }

    #[test]
    fn test_parse_camp_minimal() {
        // Listings may omit counts and timestamps
        let json = r#"{
            "_id": "c1",
            "name": "Dental Care Camp",
            "fees": 0,
            "location": "Chittagong",
            "professional": "Dr. K. Das"
        }"#;

        let camp: Camp = serde_json::from_str(json).expect("camp should parse");
        assert_eq!(camp.participant_count, 0);
        assert_eq!(camp.formatted_date(), "TBD");
        assert_eq!(camp.formatted_fees(), "Free");
        assert!(camp.is_free());
    }

    #[test]
    fn test_camp_query_pairs() {
        let query = CampQuery {
            search: Some("dental".to_string()),
            sort: CampSortColumn::CampFees,
            page: 2,
            limit: 6,
        };
        let pairs = query.to_query_pairs();
        assert!(pairs.contains(&("page", "2".to_string())));
        assert!(pairs.contains(&("sort", "camp-fees".to_string())));
        assert!(pairs.contains(&("search", "dental".to_string())));
    }

    #[test]
    fn test_camp_query_omits_empty_search() {
        let pairs = CampQuery::default().to_query_pairs();
        assert!(!pairs.iter().any(|(k, _)| *k == "search"));
    }

    #[test]
    fn test_camp_form_requires_image_key() {
        let mut form = CampForm {
            name: "Eye Care Camp".to_string(),
            image: String::new(),
            fees: 400.0,
            date_time: "2026-03-01T09:00:00Z".to_string(),
            location: "Sylhet".to_string(),
            professional: "Dr. M. Hossain".to_string(),
            description: String::new(),
        };
        assert!(form.validate().is_err());

        form.image = "uploads/1717000000000-eye.png".to_string();
        assert!(form.validate().is_ok());
    }
}
