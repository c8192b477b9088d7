//! DynamoDB token store
//!
//! Items are `{ AccessToken: S, ExpiresAt: S }`; both attributes form the
//! table key. DynamoDB treats `DeleteItem` on a missing key as success, which
//! gives the idempotent delete for free.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use common::TokenRecord;
use tracing::{error, info, instrument};

use crate::{
    ACCESS_TOKEN_ATTR, DEFAULT_TABLE_NAME, EXPIRES_AT_ATTR, StoreError, StoreFuture, TokenKey,
    TokenStore,
};

/// Token store backed by a DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoTokenStore {
    client: Client,
    table_name: String,
}

impl DynamoTokenStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Build a client from the default AWS credential chain.
    ///
    /// `endpoint_url` targets DynamoDB Local or LocalStack.
    pub async fn connect(region: &str, endpoint_url: Option<&str>, table_name: Option<&str>) -> Self {
        let table_name = table_name.unwrap_or(DEFAULT_TABLE_NAME);
        info!(region, endpoint_url = ?endpoint_url, table_name, "creating DynamoDB client");
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_owned()));
        if let Some(url) = endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), table_name)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[instrument(skip_all, fields(table = %self.table_name, expires_at = record.expires_at))]
    async fn put(&self, record: &TokenRecord) -> crate::Result<()> {
        let key = TokenKey::from_record(record);
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(ACCESS_TOKEN_ATTR, AttributeValue::S(key.access_token))
            .item(EXPIRES_AT_ATTR, AttributeValue::S(key.expires_at))
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                error!(error = %detail, "put_item failed");
                StoreError::Write(detail)
            })?;

        info!("inserted token item");
        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.table_name, expires_at = %key.expires_at))]
    async fn remove(&self, key: TokenKey) -> crate::Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(ACCESS_TOKEN_ATTR, AttributeValue::S(key.access_token))
            .key(EXPIRES_AT_ATTR, AttributeValue::S(key.expires_at))
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                error!(error = %detail, "delete_item failed");
                StoreError::Delete(detail)
            })?;

        info!("deleted token item");
        Ok(())
    }
}

impl TokenStore for DynamoTokenStore {
    fn id(&self) -> &str {
        "dynamodb"
    }

    fn save<'a>(&'a self, record: &'a TokenRecord) -> StoreFuture<'a, ()> {
        Box::pin(self.put(record))
    }

    fn delete(&self, key: TokenKey) -> StoreFuture<'_, ()> {
        Box::pin(self.remove(key))
    }
}
