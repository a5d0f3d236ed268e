use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::store::{
    CustomerPatch, LedgerStore, PaymentRequestWithCustomer, PaymentUpsert, StoreError,
    PAYMENT_REQUEST_LIST_LIMIT,
};
use crate::models::{Admin, Customer, CustomerIdentity, Payment, PaymentRequest, PaymentStatus};

#[derive(Default)]
struct Collections {
    admins: Vec<Admin>,
    customers: Vec<Customer>,
    payments: Vec<Payment>,
    payment_requests: Vec<PaymentRequest>,
}

/// Process-local store for development runs and tests. Vectors keep
/// insertion order, which stands in for creation order.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Internal(anyhow::anyhow!("In-memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Internal(anyhow::anyhow!("In-memory store lock poisoned")))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if data.admins.iter().any(|a| a.email == admin.email) {
            return Err(StoreError::Duplicate(format!("admins.email: {}", admin.email)));
        }
        data.admins.push(admin.clone());
        Ok(())
    }

    async fn find_admin(&self, id: ObjectId) -> Result<Option<Admin>, StoreError> {
        Ok(self.read()?.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self.read()?.admins.iter().find(|a| a.email == email).cloned())
    }

    async fn update_admin_password(
        &self,
        id: ObjectId,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut data = self.write()?;
        match data.admins.iter_mut().find(|a| a.id == id) {
            Some(admin) => {
                admin.password_hash = password_hash.to_string();
                admin.updated_at = DateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        self.write()?.customers.push(customer.clone());
        Ok(())
    }

    async fn find_customer(&self, id: ObjectId) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn update_customer(
        &self,
        id: ObjectId,
        patch: &CustomerPatch,
    ) -> Result<Option<Customer>, StoreError> {
        let mut data = self.write()?;
        let Some(customer) = data.customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            customer.name = name.clone();
        }
        if let Some(phone) = &patch.phone {
            customer.phone = phone.clone();
        }
        if let Some(village) = &patch.village {
            customer.village = village.clone();
        }
        if let Some(bill_amount) = patch.bill_amount {
            customer.bill_amount = bill_amount;
        }
        customer.updated_at = DateTime::now();

        Ok(Some(customer.clone()))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        Ok(self.read()?.customers.clone())
    }

    async fn find_customer_by_identity(
        &self,
        identity: &CustomerIdentity,
    ) -> Result<Option<Customer>, StoreError> {
        Ok(self
            .read()?
            .customers
            .iter()
            .find(|c| identity.matches(c))
            .cloned())
    }

    async fn delete_customer_cascade(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut data = self.write()?;
        data.payments.retain(|p| p.customer_id != id);
        let before = data.customers.len();
        data.customers.retain(|c| c.id != id);
        Ok(data.customers.len() != before)
    }

    async fn list_payments(&self, customer_id: ObjectId) -> Result<Vec<Payment>, StoreError> {
        let mut payments: Vec<Payment> = self
            .read()?
            .payments
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.month.cmp(&a.month));
        Ok(payments)
    }

    async fn list_all_payments(&self) -> Result<Vec<Payment>, StoreError> {
        Ok(self.read()?.payments.clone())
    }

    async fn upsert_payment(&self, upsert: &PaymentUpsert) -> Result<Payment, StoreError> {
        let mut data = self.write()?;
        let now = DateTime::now();
        let position = data
            .payments
            .iter()
            .position(|p| p.customer_id == upsert.customer_id && p.month == upsert.month);

        let payment = match position {
            Some(index) => {
                let updated = upsert.apply(Some(data.payments[index].clone()), now);
                data.payments[index] = updated.clone();
                updated
            }
            None => {
                let created = upsert.apply(None, now);
                data.payments.push(created.clone());
                created
            }
        };
        Ok(payment)
    }

    async fn unpaid_bill_total(&self) -> Result<i64, StoreError> {
        let data = self.read()?;
        let bills: HashMap<ObjectId, i64> = data
            .customers
            .iter()
            .map(|c| (c.id, c.bill_amount))
            .collect();

        Ok(data
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Unpaid)
            .filter_map(|p| bills.get(&p.customer_id))
            .sum())
    }

    async fn insert_payment_request(&self, request: &PaymentRequest) -> Result<(), StoreError> {
        self.write()?.payment_requests.push(request.clone());
        Ok(())
    }

    async fn find_payment_request(
        &self,
        id: ObjectId,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        Ok(self
            .read()?
            .payment_requests
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_payment_requests(
        &self,
        verified: Option<bool>,
    ) -> Result<Vec<PaymentRequestWithCustomer>, StoreError> {
        let data = self.read()?;
        Ok(data
            .payment_requests
            .iter()
            .rev()
            .filter(|r| verified.map_or(true, |v| r.verified == v))
            .take(PAYMENT_REQUEST_LIST_LIMIT)
            .map(|r| PaymentRequestWithCustomer {
                request: r.clone(),
                customer: r
                    .customer_id
                    .and_then(|id| data.customers.iter().find(|c| c.id == id).cloned()),
            })
            .collect())
    }

    async fn set_request_customer(
        &self,
        id: ObjectId,
        customer_id: ObjectId,
    ) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if let Some(request) = data.payment_requests.iter_mut().find(|r| r.id == id) {
            request.customer_id = Some(customer_id);
            request.updated_at = DateTime::now();
        }
        Ok(())
    }

    async fn mark_request_approved(
        &self,
        id: ObjectId,
        admin_id: ObjectId,
        at: DateTime,
    ) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if let Some(request) = data.payment_requests.iter_mut().find(|r| r.id == id) {
            request.verified = true;
            request.verified_by = Some(admin_id);
            request.verified_at = Some(at);
            request.updated_at = at;
        }
        Ok(())
    }

    async fn mark_request_rejected(&self, id: ObjectId) -> Result<(), StoreError> {
        let mut data = self.write()?;
        if let Some(request) = data.payment_requests.iter_mut().find(|r| r.id == id) {
            request.verified = false;
            request.updated_at = DateTime::now();
        }
        Ok(())
    }
}

/// Wraps [`InMemoryStore`] and fails the selected writes, for exercising
/// partial-failure paths.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FaultyStore {
    pub inner: InMemoryStore,
    pub fail_upserts: bool,
    pub fail_deletes: bool,
}

#[cfg(test)]
fn injected_fault() -> StoreError {
    StoreError::Internal(anyhow::anyhow!("injected store fault"))
}

#[cfg(test)]
#[async_trait]
impl LedgerStore for FaultyStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        self.inner.insert_admin(admin).await
    }

    async fn find_admin(&self, id: ObjectId) -> Result<Option<Admin>, StoreError> {
        self.inner.find_admin(id).await
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError> {
        self.inner.find_admin_by_email(email).await
    }

    async fn update_admin_password(
        &self,
        id: ObjectId,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        self.inner.update_admin_password(id, password_hash).await
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        self.inner.insert_customer(customer).await
    }

    async fn find_customer(&self, id: ObjectId) -> Result<Option<Customer>, StoreError> {
        self.inner.find_customer(id).await
    }

    async fn update_customer(
        &self,
        id: ObjectId,
        patch: &CustomerPatch,
    ) -> Result<Option<Customer>, StoreError> {
        self.inner.update_customer(id, patch).await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.inner.list_customers().await
    }

    async fn find_customer_by_identity(
        &self,
        identity: &CustomerIdentity,
    ) -> Result<Option<Customer>, StoreError> {
        self.inner.find_customer_by_identity(identity).await
    }

    async fn delete_customer_cascade(&self, id: ObjectId) -> Result<bool, StoreError> {
        if self.fail_deletes {
            return Err(injected_fault());
        }
        self.inner.delete_customer_cascade(id).await
    }

    async fn list_payments(&self, customer_id: ObjectId) -> Result<Vec<Payment>, StoreError> {
        self.inner.list_payments(customer_id).await
    }

    async fn list_all_payments(&self) -> Result<Vec<Payment>, StoreError> {
        self.inner.list_all_payments().await
    }

    async fn upsert_payment(&self, upsert: &PaymentUpsert) -> Result<Payment, StoreError> {
        if self.fail_upserts {
            return Err(injected_fault());
        }
        self.inner.upsert_payment(upsert).await
    }

    async fn unpaid_bill_total(&self) -> Result<i64, StoreError> {
        self.inner.unpaid_bill_total().await
    }

    async fn insert_payment_request(&self, request: &PaymentRequest) -> Result<(), StoreError> {
        self.inner.insert_payment_request(request).await
    }

    async fn find_payment_request(
        &self,
        id: ObjectId,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        self.inner.find_payment_request(id).await
    }

    async fn list_payment_requests(
        &self,
        verified: Option<bool>,
    ) -> Result<Vec<PaymentRequestWithCustomer>, StoreError> {
        self.inner.list_payment_requests(verified).await
    }

    async fn set_request_customer(
        &self,
        id: ObjectId,
        customer_id: ObjectId,
    ) -> Result<(), StoreError> {
        self.inner.set_request_customer(id, customer_id).await
    }

    async fn mark_request_approved(
        &self,
        id: ObjectId,
        admin_id: ObjectId,
        at: DateTime,
    ) -> Result<(), StoreError> {
        self.inner.mark_request_approved(id, admin_id, at).await
    }

    async fn mark_request_rejected(&self, id: ObjectId) -> Result<(), StoreError> {
        self.inner.mark_request_rejected(id).await
    }
}
