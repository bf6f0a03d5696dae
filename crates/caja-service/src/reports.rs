//! # Reports
//!
//! Dashboard figures. Amounts leave this module as decimal strings.

use serde::Serialize;
use ts_rs::TS;

use caja_core::Money;
use caja_db::Database;

use crate::error::ServiceResult;

/// OK sales of one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DaySummary {
    pub day: String,
    pub total: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    /// Sum of OK sales; voided sales are excluded.
    pub total: String,
    pub by_day: Vec<DaySummary>,
    /// Active products at zero stock.
    pub stock_out: i64,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService { db }
    }

    pub async fn summary(&self) -> ServiceResult<SalesSummary> {
        let reports = self.db.reports();

        let total = Money::from_cents(reports.sales_total().await?);
        let by_day = reports
            .sales_by_day()
            .await?
            .into_iter()
            .map(|row| DaySummary {
                day: row.day,
                total: Money::from_cents(row.total_cents).to_string(),
                count: row.count,
            })
            .collect();
        let stock_out = reports.stock_out_count().await?;

        Ok(SalesSummary {
            total: total.to_string(),
            by_day,
            stock_out,
        })
    }
}
