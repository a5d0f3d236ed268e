use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use super::aggregation::{
    self, CustomerAnalytics, CustomerDue, DashboardTotals, MonthStatus,
    DASHBOARD_WINDOW_MONTHS, MAX_ANALYTICS_WINDOW_MONTHS,
};
use super::error::ServiceError;
use super::metrics;
use super::store::{CustomerPatch, LedgerStore, PaymentUpsert};
use crate::models::{Customer, CustomerIdentity, MonthKey, Payment, PaymentStatus};

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub village: String,
    pub bill_amount: Option<i64>,
}

/// What a logged-in customer sees about their own account.
#[derive(Debug, Clone)]
pub struct UserDashboard {
    pub customer: Customer,
    pub total_due: i64,
    pub unpaid_months: u32,
    pub window: Vec<MonthStatus>,
    pub history: Vec<Payment>,
}

/// Customer and payment operations plus the aggregate views over them.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn create_customer(&self, input: NewCustomer) -> Result<Customer, ServiceError> {
        let name = input.name.trim();
        let village = input.village.trim();
        if name.is_empty() || village.is_empty() {
            return Err(ServiceError::Validation(
                "Name and village are required".to_string(),
            ));
        }
        let bill_amount = input.bill_amount.unwrap_or(0);
        ensure_bill_amount(bill_amount)?;

        let customer = Customer::new(
            name.to_string(),
            input.phone.map(|p| p.trim().to_string()).unwrap_or_default(),
            village.to_string(),
            bill_amount,
        );
        self.store.insert_customer(&customer).await?;

        tracing::info!(customer_id = %customer.id, village = %customer.village, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: ObjectId) -> Result<Customer, ServiceError> {
        self.store
            .find_customer(id)
            .await?
            .ok_or(ServiceError::NotFound("Customer"))
    }

    pub async fn update_customer(
        &self,
        id: ObjectId,
        mut patch: CustomerPatch,
    ) -> Result<Customer, ServiceError> {
        for field in [&mut patch.name, &mut patch.village] {
            if let Some(value) = field {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ServiceError::Validation(
                        "Name and village cannot be empty".to_string(),
                    ));
                }
                *value = trimmed.to_string();
            }
        }
        if let Some(phone) = &mut patch.phone {
            *phone = phone.trim().to_string();
        }
        if let Some(bill_amount) = patch.bill_amount {
            ensure_bill_amount(bill_amount)?;
        }

        let customer = self
            .store
            .update_customer(id, &patch)
            .await?
            .ok_or(ServiceError::NotFound("Customer"))?;

        tracing::info!(customer_id = %id, "Customer updated");
        Ok(customer)
    }

    pub async fn delete_customer(&self, id: ObjectId) -> Result<(), ServiceError> {
        if !self.store.delete_customer_cascade(id).await? {
            return Err(ServiceError::NotFound("Customer"));
        }
        tracing::info!(customer_id = %id, "Customer deleted with payments");
        Ok(())
    }

    /// Every customer with dues, sorted for the admin listing.
    pub async fn list_customers(&self) -> Result<Vec<CustomerDue>, ServiceError> {
        let (customers, payments) =
            tokio::try_join!(self.store.list_customers(), self.store.list_all_payments())?;
        Ok(aggregation::customer_dues(customers, &payments))
    }

    pub async fn list_payments(&self, customer_id: ObjectId) -> Result<Vec<Payment>, ServiceError> {
        let (customer, payments) = tokio::try_join!(
            self.store.find_customer(customer_id),
            self.store.list_payments(customer_id)
        )?;
        if customer.is_none() {
            return Err(ServiceError::NotFound("Customer"));
        }
        Ok(payments)
    }

    pub async fn upsert_payment(
        &self,
        customer_id: ObjectId,
        month: &str,
        status: Option<PaymentStatus>,
        transaction_id: Option<String>,
    ) -> Result<Payment, ServiceError> {
        let month: MonthKey = month.trim().parse()?;
        if self.store.find_customer(customer_id).await?.is_none() {
            return Err(ServiceError::NotFound("Customer"));
        }

        let payment = self
            .store
            .upsert_payment(&PaymentUpsert {
                customer_id,
                month,
                status,
                transaction_id,
            })
            .await?;

        metrics::record_payment_upserted(payment.status.as_str());
        tracing::info!(
            customer_id = %customer_id,
            month = %month,
            status = payment.status.as_str(),
            "Payment upserted"
        );
        Ok(payment)
    }

    /// `months` defaults to six and must fall within 1..=24.
    pub async fn customer_analytics(
        &self,
        customer_id: ObjectId,
        months: Option<usize>,
    ) -> Result<(Customer, CustomerAnalytics), ServiceError> {
        let months = months.unwrap_or(aggregation::DEFAULT_ANALYTICS_WINDOW_MONTHS);
        if !(1..=MAX_ANALYTICS_WINDOW_MONTHS).contains(&months) {
            return Err(ServiceError::Validation(format!(
                "months must be between 1 and {}",
                MAX_ANALYTICS_WINDOW_MONTHS
            )));
        }

        let (customer, history) = tokio::try_join!(
            self.store.find_customer(customer_id),
            self.store.list_payments(customer_id)
        )?;
        let customer = customer.ok_or(ServiceError::NotFound("Customer"))?;

        let analytics =
            aggregation::customer_analytics(&customer, history, MonthKey::current(), months);
        Ok((customer, analytics))
    }

    pub async fn dashboard(&self) -> Result<DashboardTotals, ServiceError> {
        let (customers, payments, total_due) = tokio::try_join!(
            self.store.list_customers(),
            self.store.list_all_payments(),
            self.store.unpaid_bill_total()
        )?;
        Ok(aggregation::dashboard(
            customers,
            &payments,
            total_due,
            MonthKey::current(),
        ))
    }

    pub async fn user_dashboard(&self, customer_id: ObjectId) -> Result<UserDashboard, ServiceError> {
        let (customer, history) = tokio::try_join!(
            self.store.find_customer(customer_id),
            self.store.list_payments(customer_id)
        )?;
        let customer = customer.ok_or(ServiceError::NotFound("Customer"))?;

        let unpaid_months = history
            .iter()
            .filter(|p| p.status == PaymentStatus::Unpaid)
            .count() as u32;
        let window =
            aggregation::rolling_window(&history, MonthKey::current(), DASHBOARD_WINDOW_MONTHS);

        Ok(UserDashboard {
            total_due: aggregation::total_due(unpaid_months, customer.bill_amount),
            unpaid_months,
            customer,
            window,
            history,
        })
    }

    /// Resolve a customer from the identity they typed in.
    pub async fn login_customer(
        &self,
        name: &str,
        phone: &str,
        village: &str,
    ) -> Result<Customer, ServiceError> {
        let identity = CustomerIdentity {
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            village: village.trim().to_string(),
        };
        if identity.name.is_empty() || identity.phone.is_empty() || identity.village.is_empty() {
            return Err(ServiceError::Validation(
                "Name, phone and village are required".to_string(),
            ));
        }

        let found = self.store.find_customer_by_identity(&identity).await?;
        metrics::record_login("user", if found.is_some() { "success" } else { "failure" });
        found.ok_or(ServiceError::NotFound("Customer"))
    }
}

fn ensure_bill_amount(bill_amount: i64) -> Result<(), ServiceError> {
    if bill_amount < 0 {
        return Err(ServiceError::Validation(
            "Bill amount cannot be negative".to_string(),
        ));
    }
    Ok(())
}
