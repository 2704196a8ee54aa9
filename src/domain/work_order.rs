//! Work orders (ODL), parts, and user accounts.

use crate::domain::status::WorkOrderStatus;
use crate::domain::types::{OrderNumber, PartId, TimestampUtc, UserId, WorkOrderId};
use serde::{Deserialize, Serialize};

/// Production priority of a work order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A production lot of a part moving through the plant.
///
/// `status` is a cached projection of the event log (see
/// [`crate::domain::status::replay`]); `version` is the monotonic counter
/// guarding every status write. Both are owned by the engine — API
/// consumers never set them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub order_number: OrderNumber,
    pub part_id: PartId,
    pub quantity: u32,
    pub priority: Priority,
    pub status: WorkOrderStatus,
    /// Bumped by every guarded status write. The optimistic precondition
    /// checks this, not the raw status value, so statuses that legitimately
    /// repeat cannot mask a lost update.
    pub version: u64,
    pub created_at: TimestampUtc,
    pub updated_at: TimestampUtc,
}

impl WorkOrder {
    /// Registers a new work order in status CREATED.
    pub fn new(
        order_number: impl Into<OrderNumber>,
        part_id: PartId,
        quantity: u32,
        priority: Priority,
        now: TimestampUtc,
    ) -> Self {
        Self {
            id: WorkOrderId::new(),
            order_number: order_number.into(),
            part_id,
            quantity,
            priority,
            status: WorkOrderStatus::Created,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A part (article) produced by work orders. Reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub part_number: String,
    pub description: String,
}

impl Part {
    pub fn new(part_number: &str, description: &str) -> Self {
        Self {
            id: PartId::new(),
            part_number: part_number.to_string(),
            description: description.to_string(),
        }
    }
}

/// An operator or supervisor account. Reference data for actor checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    /// Deactivated accounts exist but may not act.
    pub is_active: bool,
}

impl UserAccount {
    /// Creates an active account.
    pub fn new(username: &str) -> Self {
        Self {
            id: UserId::new(),
            username: username.to_string(),
            is_active: true,
        }
    }
}
