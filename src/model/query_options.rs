use crate::store::Dialect;
use serde::{Deserialize, Serialize};

/// Structured WHERE / GROUP BY / ORDER BY / LIMIT clauses of a repository call.
///
/// Absent fields contribute no SQL. `offset` only matters together with
/// `limit` and defaults to 0 there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.condition.is_none()
            && self.group_by.is_none()
            && self.order_by.is_none()
            && self.limit.is_none()
    }

    /// Renders the clauses in the fixed WHERE, GROUP BY, ORDER BY, LIMIT order.
    /// Each clause carries its own leading space so the result can be appended
    /// directly to a statement.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = String::new();
        if let Some(condition) = &self.condition {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        if let Some(group_by) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&dialect.limit_clause(limit, self.offset.unwrap_or(0)));
        }
        sql
    }
}
