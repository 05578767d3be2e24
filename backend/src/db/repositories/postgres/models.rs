use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::profits;
use crate::api::{Profit, ProfitChanges, ProfitId};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = profits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // seq and created_at are only used for ordering and auditing
pub struct ProfitRow {
    pub id: String,
    pub seq: i64,
    pub amount: f64,
    pub name: String,
    pub year: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ProfitRow {
    pub fn into_profit(self) -> RepositoryResult<Profit> {
        let id = ProfitId::parse(self.id.trim()).map_err(|e| {
            RepositoryError::internal(e.to_string(), ErrorContext::new("decode_row"))
        })?;
        Ok(Profit {
            id,
            amount: self.amount,
            name: self.name,
            year: self.year,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = profits)]
pub struct NewProfitRow {
    pub id: String,
    pub amount: f64,
    pub name: String,
    pub year: DateTime<Utc>,
}

impl From<&Profit> for NewProfitRow {
    fn from(profit: &Profit) -> Self {
        Self {
            id: profit.id.to_hex(),
            amount: profit.amount,
            name: profit.name.clone(),
            year: profit.year,
        }
    }
}

/// Partial update; `None` columns are left untouched by Diesel.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = profits)]
pub struct ProfitChangeset {
    pub amount: Option<f64>,
    pub name: Option<String>,
    pub year: Option<DateTime<Utc>>,
}

impl From<ProfitChanges> for ProfitChangeset {
    fn from(changes: ProfitChanges) -> Self {
        Self {
            amount: changes.amount,
            name: changes.name,
            year: changes.year,
        }
    }
}
