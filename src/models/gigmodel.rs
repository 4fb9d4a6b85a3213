use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "gig_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GigStatus {
    Open,
    Assigned,
}

impl GigStatus {
    pub fn to_str(&self) -> &str {
        match self {
            GigStatus::Open => "open",
            GigStatus::Assigned => "assigned",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Hired,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Gig {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: BigDecimal,
    #[serde(rename = "ownerId")]
    pub owner_id: Uuid,
    pub status: GigStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Bid {
    pub id: Uuid,
    #[serde(rename = "gigId")]
    pub gig_id: Uuid,
    #[serde(rename = "freelancerId")]
    pub freelancer_id: Uuid,
    pub message: String,
    pub price: BigDecimal,
    pub status: BidStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Result of a committed hire: the assigned gig, the winning bid and how many
/// competing bids were turned down.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HireOutcome {
    pub gig: Gig,
    #[serde(rename = "hiredBid")]
    pub hired_bid: Bid,
    #[serde(rename = "rejectedCount")]
    pub rejected_count: u64,
}
