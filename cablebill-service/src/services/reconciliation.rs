use mongodb::bson::{oid::ObjectId, DateTime};
use std::str::FromStr;
use std::sync::Arc;

use super::error::ServiceError;
use super::metrics;
use super::store::{LedgerStore, PaymentRequestWithCustomer, PaymentUpsert};
use crate::models::{Customer, CustomerIdentity, MonthKey, PaymentRequest};

#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    pub name: String,
    pub phone: String,
    pub village: String,
    pub transaction_id: String,
    pub month: String,
    pub amount: i64,
    pub screenshot_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }
}

impl FromStr for Decision {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Decision::Approve),
            "reject" => Ok(Decision::Reject),
            _ => Err(ServiceError::InvalidAction),
        }
    }
}

/// Payment request intake and the approve/reject workflow.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Store an unverified request, resolving the customer when the fuzzy
    /// match finds one.
    pub async fn submit(&self, input: NewPaymentRequest) -> Result<PaymentRequest, ServiceError> {
        let name = input.name.trim();
        let phone = input.phone.trim();
        let village = input.village.trim();
        let transaction_id = input.transaction_id.trim();

        if name.is_empty()
            || phone.is_empty()
            || village.is_empty()
            || transaction_id.is_empty()
            || input.month.trim().is_empty()
        {
            return Err(ServiceError::Validation(
                "All fields except screenshot are required".to_string(),
            ));
        }
        if input.amount <= 0 {
            return Err(ServiceError::Validation(
                "Amount must be greater than 0".to_string(),
            ));
        }
        let month: MonthKey = input.month.trim().parse()?;

        let identity = CustomerIdentity {
            name: name.to_string(),
            phone: phone.to_string(),
            village: village.to_string(),
        };
        let customer_id = self
            .store
            .find_customer_by_identity(&identity)
            .await?
            .map(|c| c.id);

        let now = DateTime::now();
        let request = PaymentRequest {
            id: ObjectId::new(),
            name: identity.name,
            phone: identity.phone,
            village: identity.village,
            customer_id,
            transaction_id: transaction_id.to_string(),
            month,
            amount: input.amount,
            screenshot_url: input.screenshot_url.unwrap_or_default(),
            verified: false,
            verified_by: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_payment_request(&request).await?;

        metrics::record_payment_request_submitted(customer_id.is_some());
        tracing::info!(
            request_id = %request.id,
            matched = customer_id.is_some(),
            month = %month,
            "Payment request submitted"
        );
        Ok(request)
    }

    pub async fn list(
        &self,
        verified: Option<bool>,
    ) -> Result<Vec<PaymentRequestWithCustomer>, ServiceError> {
        Ok(self.store.list_payment_requests(verified).await?)
    }

    /// Returns the request as stored after the decision.
    pub async fn decide(
        &self,
        request_id: ObjectId,
        decision: Decision,
        admin_id: ObjectId,
    ) -> Result<PaymentRequest, ServiceError> {
        let request = self
            .store
            .find_payment_request(request_id)
            .await?
            .ok_or(ServiceError::NotFound("Payment request"))?;

        match decision {
            Decision::Approve => self.approve(&request, admin_id).await?,
            Decision::Reject => self.store.mark_request_rejected(request.id).await?,
        }

        metrics::record_payment_request_decided(decision.as_str());
        tracing::info!(
            request_id = %request.id,
            admin_id = %admin_id,
            action = decision.as_str(),
            "Payment request decided"
        );

        self.store
            .find_payment_request(request_id)
            .await?
            .ok_or(ServiceError::NotFound("Payment request"))
    }

    async fn approve(&self, request: &PaymentRequest, admin_id: ObjectId) -> Result<(), ServiceError> {
        let customer = self.resolve_customer(request).await?;
        self.store
            .set_request_customer(request.id, customer.id)
            .await?;

        let payment = self
            .store
            .upsert_payment(&PaymentUpsert::paid(
                customer.id,
                request.month,
                request.transaction_id.clone(),
            ))
            .await?;
        metrics::record_payment_upserted(payment.status.as_str());

        // Only now is the request marked verified.
        self.store
            .mark_request_approved(request.id, admin_id, DateTime::now())
            .await?;
        Ok(())
    }

    async fn resolve_customer(&self, request: &PaymentRequest) -> Result<Customer, ServiceError> {
        if let Some(id) = request.customer_id {
            if let Some(customer) = self.store.find_customer(id).await? {
                return Ok(customer);
            }
            tracing::warn!(
                request_id = %request.id,
                customer_id = %id,
                "Resolved customer no longer exists, matching again"
            );
        }

        let identity = CustomerIdentity {
            name: request.name.clone(),
            phone: request.phone.clone(),
            village: request.village.clone(),
        };
        if let Some(customer) = self.store.find_customer_by_identity(&identity).await? {
            return Ok(customer);
        }

        let customer = Customer::new(
            request.name.clone(),
            request.phone.clone(),
            request.village.clone(),
            request.amount,
        );
        self.store.insert_customer(&customer).await?;
        tracing::info!(
            customer_id = %customer.id,
            request_id = %request.id,
            "Customer created from payment request"
        );
        Ok(customer)
    }
}
