use serde::{Deserialize, Serialize};

/// Lowest and highest accepted feedback ratings.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Feedback left by a participant after attending a camp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: String,
    pub camp: String,
    pub participant: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

/// Payload for submitting feedback on a camp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FeedbackForm {
    #[serde(rename = "campId")]
    pub camp_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl FeedbackForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.camp_id.trim().is_empty() {
            return Err("Camp id is required".to_string());
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        let mut form = FeedbackForm {
            camp_id: "c1".to_string(),
            rating: 5,
            comment: "Great camp".to_string(),
        };
        assert!(form.validate().is_ok());

        form.rating = 0;
        assert!(form.validate().is_err());

        form.rating = 6;
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_camp_id_required() {
        let form = FeedbackForm {
            camp_id: "  ".to_string(),
            rating: 3,
            comment: String::new(),
        };
        assert!(form.validate().is_err());
    }
}
