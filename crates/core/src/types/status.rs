//! Status enums for catalog and order entities.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Transitions are unconstrained; any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Declined,
}

impl OrderStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Declined,
    ];

    /// Stored/serialized value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Declined => "declined",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Declined => "Declined",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "declined" => Ok(Self::Declined),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How a product reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Downloadable,
    Deliverable,
}

impl ProductType {
    /// Every type, in display order.
    pub const ALL: [Self; 2] = [Self::Downloadable, Self::Deliverable];

    /// Stored/serialized value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Downloadable => "downloadable",
            Self::Deliverable => "deliverable",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Downloadable => "Downloadable",
            Self::Deliverable => "Deliverable",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downloadable" => Ok(Self::Downloadable),
            "deliverable" => Ok(Self::Deliverable),
            _ => Err(format!("invalid product type: {s}")),
        }
    }
}
