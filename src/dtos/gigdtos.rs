use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::gigmodel::{Bid, Gig, HireOutcome};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGigDto {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,

    #[validate(range(min = 1.0, max = 9_999_999_999.99, message = "Budget must be between 1 and 9999999999.99"))]
    pub budget: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBidDto {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub message: String,

    #[validate(range(min = 1.0, max = 9_999_999_999.99, message = "Price must be between 1 and 9999999999.99"))]
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GigDetailDto {
    pub gig: Gig,
    #[serde(rename = "bidCount")]
    pub bid_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HireResponseDto {
    pub gig: Gig,
    #[serde(rename = "hiredBid")]
    pub hired_bid: Bid,
    #[serde(rename = "rejectedCount")]
    pub rejected_count: u64,
}

impl From<HireOutcome> for HireResponseDto {
    fn from(outcome: HireOutcome) -> Self {
        Self {
            gig: outcome.gig,
            hired_bid: outcome.hired_bid,
            rejected_count: outcome.rejected_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_gig_validation() {
        let dto = CreateGigDto {
            title: "Logo".to_string(),
            description: "A clean vector logo".to_string(),
            budget: 150.0,
        };
        assert!(dto.validate().is_ok());

        let dto = CreateGigDto { budget: 0.0, ..dto };
        assert!(dto.validate().is_err());

        let dto = CreateGigDto { budget: 1e15, ..dto };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_create_bid_caps_price() {
        let dto = CreateBidDto {
            message: "I can do it".to_string(),
            price: 1e15,
        };
        assert!(dto.validate().is_err());

        let dto = CreateBidDto { price: 9_999_999_999.99, ..dto };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_bid_requires_message() {
        let dto = CreateBidDto {
            message: String::new(),
            price: 10.0,
        };
        assert!(dto.validate().is_err());
    }
}
