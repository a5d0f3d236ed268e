//! Due, paid and collected figures derived from customers and payments.
//!
//! Everything here is pure: callers load the rows (concurrently where they
//! can) and hand them over. All money is in the `billAmount` unit.

use mongodb::bson::{oid::ObjectId, DateTime};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Customer, MonthKey, Payment, PaymentStatus};

pub const DASHBOARD_WINDOW_MONTHS: usize = 6;
pub const DEFAULT_ANALYTICS_WINDOW_MONTHS: usize = 6;
pub const MAX_ANALYTICS_WINDOW_MONTHS: usize = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerDue {
    pub customer: Customer,
    pub unpaid_months: u32,
    pub total_due: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthStatus {
    pub month: MonthKey,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VillageSummary {
    pub customers: u64,
    pub total_due: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCollected {
    pub month: MonthKey,
    pub collected: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardTotals {
    pub total_customers: u64,
    pub total_due: i64,
    pub collected_this_month: i64,
    pub last_six_months: Vec<MonthCollected>,
    pub village_summary: BTreeMap<String, VillageSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerAnalytics {
    pub total_due: i64,
    pub unpaid_months: u32,
    pub paid_months: u32,
    /// Number of paid months, not a money amount.
    pub total_collected: u32,
    pub window: Vec<MonthStatus>,
    /// Full history, month descending.
    pub history: Vec<Payment>,
}

/// Unpaid months priced at the customer's current bill amount.
pub fn total_due(unpaid_months: u32, bill_amount: i64) -> i64 {
    bill_amount.max(0).saturating_mul(i64::from(unpaid_months))
}

fn count_status(payments: &[Payment], status: PaymentStatus) -> u32 {
    payments.iter().filter(|p| p.status == status).count() as u32
}

/// Village ascending, total due descending, name ascending. The sort is
/// stable so remaining ties keep the input (creation) order.
pub fn sort_dues(dues: &mut [CustomerDue]) {
    dues.sort_by(|a, b| {
        a.customer
            .village
            .cmp(&b.customer.village)
            .then_with(|| b.total_due.cmp(&a.total_due))
            .then_with(|| a.customer.name.cmp(&b.customer.name))
    });
}

/// Every customer with their unpaid-month count and due, in listing order.
pub fn customer_dues(customers: Vec<Customer>, payments: &[Payment]) -> Vec<CustomerDue> {
    let mut unpaid: HashMap<ObjectId, u32> = HashMap::new();
    for payment in payments.iter().filter(|p| p.status == PaymentStatus::Unpaid) {
        *unpaid.entry(payment.customer_id).or_default() += 1;
    }

    let mut dues: Vec<CustomerDue> = customers
        .into_iter()
        .map(|customer| {
            let unpaid_months = unpaid.get(&customer.id).copied().unwrap_or(0);
            CustomerDue {
                total_due: total_due(unpaid_months, customer.bill_amount),
                unpaid_months,
                customer,
            }
        })
        .collect();

    sort_dues(&mut dues);
    dues
}

/// The `months` months ending at `end`, oldest first. A month with no
/// payment row reads as unpaid.
pub fn rolling_window(payments: &[Payment], end: MonthKey, months: usize) -> Vec<MonthStatus> {
    let by_month: HashMap<MonthKey, &Payment> = payments.iter().map(|p| (p.month, p)).collect();

    end.last_n(months)
        .into_iter()
        .map(|month| match by_month.get(&month) {
            Some(payment) => MonthStatus {
                month,
                status: payment.status,
                paid_at: payment.paid_at,
            },
            None => MonthStatus {
                month,
                status: PaymentStatus::Unpaid,
                paid_at: None,
            },
        })
        .collect()
}

pub fn village_summary(dues: &[CustomerDue]) -> BTreeMap<String, VillageSummary> {
    let mut summary: BTreeMap<String, VillageSummary> = BTreeMap::new();
    for due in dues {
        let entry = summary.entry(due.customer.village.clone()).or_default();
        entry.customers += 1;
        entry.total_due += due.total_due;
    }
    summary
}

/// Sum of bill amounts over customers with a paid row in each month,
/// zero-filled, in the order given.
pub fn collected_by_month(
    customers: &[Customer],
    payments: &[Payment],
    months: &[MonthKey],
) -> Vec<MonthCollected> {
    let bills: HashMap<ObjectId, i64> = customers.iter().map(|c| (c.id, c.bill_amount)).collect();
    let wanted: HashSet<MonthKey> = months.iter().copied().collect();

    let mut collected: HashMap<MonthKey, i64> = HashMap::new();
    for payment in payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Paid && wanted.contains(&p.month))
    {
        // Payments whose customer is gone do not count, as with an inner join.
        if let Some(bill) = bills.get(&payment.customer_id) {
            *collected.entry(payment.month).or_default() += bill.max(&0);
        }
    }

    months
        .iter()
        .map(|month| MonthCollected {
            month: *month,
            collected: collected.get(month).copied().unwrap_or(0),
        })
        .collect()
}

/// Admin dashboard. `total_due` comes from the store's join aggregation and
/// agrees with the sum over [`customer_dues`].
pub fn dashboard(
    customers: Vec<Customer>,
    payments: &[Payment],
    total_due: i64,
    current: MonthKey,
) -> DashboardTotals {
    let window = current.last_n(DASHBOARD_WINDOW_MONTHS);
    let last_six_months = collected_by_month(&customers, payments, &window);
    let collected_this_month = last_six_months
        .last()
        .map(|m| m.collected)
        .unwrap_or(0);

    let total_customers = customers.len() as u64;
    let dues = customer_dues(customers, payments);

    DashboardTotals {
        total_customers,
        total_due,
        collected_this_month,
        last_six_months,
        village_summary: village_summary(&dues),
    }
}

pub fn customer_analytics(
    customer: &Customer,
    history: Vec<Payment>,
    current: MonthKey,
    months: usize,
) -> CustomerAnalytics {
    let unpaid_months = count_status(&history, PaymentStatus::Unpaid);
    let paid_months = count_status(&history, PaymentStatus::Paid);

    CustomerAnalytics {
        total_due: total_due(unpaid_months, customer.bill_amount),
        unpaid_months,
        paid_months,
        total_collected: paid_months,
        window: rolling_window(&history, current, months),
        history,
    }
}
