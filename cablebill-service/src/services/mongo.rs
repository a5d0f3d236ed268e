use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson, DateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{
        FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions, ReturnDocument,
    },
    Client as MongoClient, ClientSession, Collection, Database, IndexModel,
};

use super::store::{
    CustomerPatch, LedgerStore, PaymentRequestWithCustomer, PaymentUpsert, StoreError,
    PAYMENT_REQUEST_LIST_LIMIT,
};
use crate::config::MongoConfig;
use crate::models::{Admin, Customer, CustomerIdentity, Payment, PaymentRequest, PaymentStatus};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
    use_transactions: bool,
}

impl MongoStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        tracing::info!(database = %config.database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            StoreError::from(e)
        })?;
        let db = client.database(&config.database);
        tracing::info!(
            database = %config.database,
            use_transactions = config.use_transactions,
            "Successfully connected to MongoDB database"
        );
        Ok(Self {
            client,
            db,
            use_transactions: config.use_transactions,
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), StoreError> {
        tracing::info!("Creating MongoDB indexes for cablebill-service");

        self.customers()
            .create_indexes(
                [
                    index(doc! { "village": 1 }, "village_lookup", false),
                    index(doc! { "name": 1 }, "name_lookup", false),
                    index(doc! { "phone": 1 }, "phone_lookup", false),
                ],
                None,
            )
            .await?;
        tracing::info!("Created indexes on customers.(village, name, phone)");

        self.payments()
            .create_indexes(
                [
                    index(doc! { "customerId": 1, "month": 1 }, "customer_month_unique", true),
                    index(doc! { "status": 1 }, "status_lookup", false),
                    index(doc! { "month": 1 }, "month_lookup", false),
                ],
                None,
            )
            .await?;
        tracing::info!("Created indexes on payments, (customerId, month) unique");

        self.payment_requests()
            .create_indexes(
                [
                    index(doc! { "verified": 1, "createdAt": -1 }, "verified_recent", false),
                    index(doc! { "customerId": 1 }, "customer_lookup", false),
                ],
                None,
            )
            .await?;
        tracing::info!("Created indexes on payment_requests");

        self.admins()
            .create_index(index(doc! { "email": 1 }, "email_unique", true), None)
            .await?;
        tracing::info!("Created unique index on admins.email");

        Ok(())
    }

    fn admins(&self) -> Collection<Admin> {
        self.db.collection("admins")
    }

    fn customers(&self) -> Collection<Customer> {
        self.db.collection("customers")
    }

    fn payments(&self) -> Collection<Payment> {
        self.db.collection("payments")
    }

    fn payment_requests(&self) -> Collection<PaymentRequest> {
        self.db.collection("payment_requests")
    }

    async fn cascade_in_session(
        &self,
        id: ObjectId,
        session: &mut ClientSession,
    ) -> Result<u64, mongodb::error::Error> {
        self.payments()
            .delete_many_with_session(doc! { "customerId": id }, None, session)
            .await?;
        let result = self
            .customers()
            .delete_one_with_session(doc! { "_id": id }, None, session)
            .await?;
        Ok(result.deleted_count)
    }

    async fn try_upsert_payment(
        &self,
        upsert: &PaymentUpsert,
    ) -> Result<Option<Payment>, mongodb::error::Error> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        self.payments()
            .find_one_and_update(
                doc! { "customerId": upsert.customer_id, "month": upsert.month.to_string() },
                payment_update(upsert, DateTime::now()),
                options,
            )
            .await
    }
}

fn index(keys: Document, name: &str, unique: bool) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(unique)
                .build(),
        )
        .build()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Update document for [`PaymentUpsert`]. Fields the caller leaves out are
/// defaulted through `$setOnInsert` so they never clobber an existing row.
fn payment_update(upsert: &PaymentUpsert, now: DateTime) -> Document {
    let mut set = doc! { "updatedAt": now };
    let mut set_on_insert = doc! { "createdAt": now };
    let mut unset = Document::new();

    match upsert.status {
        Some(PaymentStatus::Paid) => {
            set.insert("status", PaymentStatus::Paid.as_str());
            set.insert("paidAt", now);
            set.insert("verifiedByAdmin", true);
        }
        Some(PaymentStatus::Unpaid) => {
            set.insert("status", PaymentStatus::Unpaid.as_str());
            unset.insert("paidAt", "");
            set_on_insert.insert("verifiedByAdmin", false);
        }
        None => {
            set_on_insert.insert("status", PaymentStatus::Unpaid.as_str());
            set_on_insert.insert("verifiedByAdmin", false);
        }
    }

    match &upsert.transaction_id {
        Some(transaction_id) => {
            set.insert("transactionId", transaction_id.as_str());
        }
        None => {
            set_on_insert.insert("transactionId", "");
        }
    }

    let mut update = doc! { "$set": set, "$setOnInsert": set_on_insert };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    update
}

fn bson_to_i64(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

fn decode<T: serde::de::DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    bson::from_document(document)
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("Failed to decode document: {}", e)))
}

fn creation_order() -> Document {
    doc! { "createdAt": 1, "_id": 1 }
}

#[async_trait]
impl LedgerStore for MongoStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                StoreError::from(e)
            })?;
        Ok(())
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        self.admins().insert_one(admin, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate(format!("admins.email: {}", admin.email))
            } else {
                StoreError::from(e)
            }
        })?;
        Ok(())
    }

    async fn find_admin(&self, id: ObjectId) -> Result<Option<Admin>, StoreError> {
        Ok(self.admins().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self.admins().find_one(doc! { "email": email }, None).await?)
    }

    async fn update_admin_password(
        &self,
        id: ObjectId,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let result = self
            .admins()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "password": password_hash, "updatedAt": DateTime::now() } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        self.customers().insert_one(customer, None).await?;
        Ok(())
    }

    async fn find_customer(&self, id: ObjectId) -> Result<Option<Customer>, StoreError> {
        Ok(self.customers().find_one(doc! { "_id": id }, None).await?)
    }

    async fn update_customer(
        &self,
        id: ObjectId,
        patch: &CustomerPatch,
    ) -> Result<Option<Customer>, StoreError> {
        let mut set = doc! { "updatedAt": DateTime::now() };
        if let Some(name) = &patch.name {
            set.insert("name", name.as_str());
        }
        if let Some(phone) = &patch.phone {
            set.insert("phone", phone.as_str());
        }
        if let Some(village) = &patch.village {
            set.insert("village", village.as_str());
        }
        if let Some(bill_amount) = patch.bill_amount {
            set.insert("billAmount", bill_amount);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .customers()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await?)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let options = FindOptions::builder().sort(creation_order()).build();
        let cursor = self.customers().find(None, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_customer_by_identity(
        &self,
        identity: &CustomerIdentity,
    ) -> Result<Option<Customer>, StoreError> {
        let filter = doc! {
            "name": { "$regex": regex::escape(&identity.name), "$options": "i" },
            "phone": identity.phone.as_str(),
            "village": { "$regex": regex::escape(&identity.village), "$options": "i" },
        };
        let options = FindOneOptions::builder().sort(creation_order()).build();
        Ok(self.customers().find_one(filter, options).await?)
    }

    async fn delete_customer_cascade(&self, id: ObjectId) -> Result<bool, StoreError> {
        if !self.use_transactions {
            self.payments()
                .delete_many(doc! { "customerId": id }, None)
                .await?;
            let result = self.customers().delete_one(doc! { "_id": id }, None).await?;
            return Ok(result.deleted_count > 0);
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.cascade_in_session(id, &mut session).await {
            Ok(deleted) => {
                session.commit_transaction().await?;
                Ok(deleted > 0)
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "Failed to abort cascade delete transaction");
                }
                Err(e.into())
            }
        }
    }

    async fn list_payments(&self, customer_id: ObjectId) -> Result<Vec<Payment>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "month": -1 }).build();
        let cursor = self
            .payments()
            .find(doc! { "customerId": customer_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_all_payments(&self) -> Result<Vec<Payment>, StoreError> {
        let cursor = self.payments().find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn upsert_payment(&self, upsert: &PaymentUpsert) -> Result<Payment, StoreError> {
        let result = match self.try_upsert_payment(upsert).await {
            Err(e) if is_duplicate_key(&e) => {
                // Lost an insert race on the unique index; the row exists now.
                tracing::debug!(
                    customer_id = %upsert.customer_id,
                    month = %upsert.month,
                    "Retrying payment upsert after duplicate key"
                );
                self.try_upsert_payment(upsert).await?
            }
            other => other?,
        };

        result.ok_or_else(|| {
            StoreError::Internal(anyhow::anyhow!("Upsert returned no payment document"))
        })
    }

    async fn unpaid_bill_total(&self) -> Result<i64, StoreError> {
        let pipeline = vec![
            doc! { "$match": { "status": PaymentStatus::Unpaid.as_str() } },
            doc! { "$lookup": {
                "from": "customers",
                "localField": "customerId",
                "foreignField": "_id",
                "as": "customer",
            } },
            doc! { "$unwind": "$customer" },
            doc! { "$group": { "_id": Bson::Null, "totalDue": { "$sum": "$customer.billAmount" } } },
        ];

        let rows: Vec<Document> = self
            .payments()
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;

        Ok(rows
            .first()
            .map(|row| bson_to_i64(row.get("totalDue")))
            .unwrap_or(0))
    }

    async fn insert_payment_request(&self, request: &PaymentRequest) -> Result<(), StoreError> {
        self.payment_requests().insert_one(request, None).await?;
        Ok(())
    }

    async fn find_payment_request(
        &self,
        id: ObjectId,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        Ok(self
            .payment_requests()
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn list_payment_requests(
        &self,
        verified: Option<bool>,
    ) -> Result<Vec<PaymentRequestWithCustomer>, StoreError> {
        let mut pipeline = Vec::with_capacity(4);
        if let Some(verified) = verified {
            pipeline.push(doc! { "$match": { "verified": verified } });
        }
        pipeline.push(doc! { "$sort": { "createdAt": -1, "_id": -1 } });
        let limit = PAYMENT_REQUEST_LIST_LIMIT as i64;
        pipeline.push(doc! { "$limit": limit });
        pipeline.push(doc! { "$lookup": {
            "from": "customers",
            "localField": "customerId",
            "foreignField": "_id",
            "as": "customer",
        } });

        let rows: Vec<Document> = self
            .payment_requests()
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;

        rows.into_iter()
            .map(|mut row| {
                let customer = match row.remove("customer") {
                    Some(Bson::Array(matches)) => match matches.into_iter().next() {
                        Some(Bson::Document(doc)) => Some(decode::<Customer>(doc)?),
                        _ => None,
                    },
                    _ => None,
                };
                Ok(PaymentRequestWithCustomer {
                    request: decode(row)?,
                    customer,
                })
            })
            .collect()
    }

    async fn set_request_customer(
        &self,
        id: ObjectId,
        customer_id: ObjectId,
    ) -> Result<(), StoreError> {
        self.payment_requests()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "customerId": customer_id, "updatedAt": DateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn mark_request_approved(
        &self,
        id: ObjectId,
        admin_id: ObjectId,
        at: DateTime,
    ) -> Result<(), StoreError> {
        self.payment_requests()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "verified": true,
                    "verifiedBy": admin_id,
                    "verifiedAt": at,
                    "updatedAt": at,
                } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn mark_request_rejected(&self, id: ObjectId) -> Result<(), StoreError> {
        self.payment_requests()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "verified": false, "updatedAt": DateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }
}
