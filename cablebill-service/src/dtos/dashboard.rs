use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::customers::CustomerResponse;
use super::payments::{MonthStatusResponse, PaymentResponse};
use crate::services::aggregation::{DashboardTotals, VillageSummary};
use crate::services::ledger::UserDashboard;

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthCollectedResponse {
    pub month: String,
    pub collected: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillageSummaryResponse {
    pub customers: u64,
    pub total_due: i64,
}

impl From<&VillageSummary> for VillageSummaryResponse {
    fn from(summary: &VillageSummary) -> Self {
        Self {
            customers: summary.customers,
            total_due: summary.total_due,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_customers: u64,
    pub total_due: i64,
    #[serde(rename = "totalCollectedThisMonth")]
    pub collected_this_month: i64,
    #[serde(rename = "last6Months")]
    pub last_six_months: Vec<MonthCollectedResponse>,
    pub village_summary: BTreeMap<String, VillageSummaryResponse>,
}

impl From<&DashboardTotals> for DashboardResponse {
    fn from(totals: &DashboardTotals) -> Self {
        Self {
            total_customers: totals.total_customers,
            total_due: totals.total_due,
            collected_this_month: totals.collected_this_month,
            last_six_months: totals
                .last_six_months
                .iter()
                .map(|m| MonthCollectedResponse {
                    month: m.month.to_string(),
                    collected: m.collected,
                })
                .collect(),
            village_summary: totals
                .village_summary
                .iter()
                .map(|(village, summary)| (village.clone(), summary.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDashboardResponse {
    pub customer: CustomerResponse,
    pub total_due: i64,
    pub unpaid_months: u32,
    #[serde(rename = "last6Months")]
    pub last_six_months: Vec<MonthStatusResponse>,
    #[serde(rename = "allPayments")]
    pub payments: Vec<PaymentResponse>,
}

impl From<&UserDashboard> for UserDashboardResponse {
    fn from(dashboard: &UserDashboard) -> Self {
        Self {
            customer: CustomerResponse::from(&dashboard.customer),
            total_due: dashboard.total_due,
            unpaid_months: dashboard.unpaid_months,
            last_six_months: dashboard.window.iter().map(MonthStatusResponse::from).collect(),
            payments: dashboard.history.iter().map(PaymentResponse::from).collect(),
        }
    }
}
