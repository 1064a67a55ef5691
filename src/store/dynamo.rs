//! DynamoDB table store.
//!
//! One physical table, `pk`/`sk` string key pair, secondary indexes as named
//! in [`crate::index::IndexName`]. Any SDK or transport fault maps to
//! `StoreError::Unavailable`; this client never retries.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use super::{Result, StoreError, TableStore};
use crate::codec::{AttrValue, RawRecord, RecordKey};
use crate::index::{QuerySpec, ScanSpec};

/// DynamoDB implementation of `TableStore`.
pub struct DynamoTableStore {
    client: Client,
    table_name: String,
}

impl DynamoTableStore {
    /// Connect to DynamoDB. `endpoint_url` overrides the endpoint for local
    /// development (e.g. dynamodb-local).
    pub async fn new(table_name: impl Into<String>, endpoint_url: Option<&str>) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let client = if let Some(endpoint) = endpoint_url {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&config)
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamo_config)
        } else {
            Client::new(&config)
        };

        let table_name = table_name.into();
        info!(table = %table_name, "Connected to DynamoDB");

        Ok(Self { client, table_name })
    }

    fn to_attribute(value: &AttrValue) -> AttributeValue {
        match value {
            AttrValue::S(s) => AttributeValue::S(s.clone()),
            AttrValue::N(n) => AttributeValue::N(n.to_string()),
        }
    }

    fn from_attribute(name: &str, value: &AttributeValue) -> Result<AttrValue> {
        match value {
            AttributeValue::S(s) => Ok(AttrValue::S(s.clone())),
            AttributeValue::N(n) => n.parse::<i64>().map(AttrValue::N).map_err(|_| {
                StoreError::Unavailable(format!("attribute '{name}' is a non-integer number"))
            }),
            other => Err(StoreError::Unavailable(format!(
                "attribute '{name}' has unsupported type: {other:?}"
            ))),
        }
    }

    fn to_item(record: &RawRecord) -> HashMap<String, AttributeValue> {
        record
            .iter()
            .map(|(name, value)| (name.clone(), Self::to_attribute(value)))
            .collect()
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Result<RawRecord> {
        item.iter()
            .map(|(name, value)| Ok((name.clone(), Self::from_attribute(name, value)?)))
            .collect()
    }
}

#[async_trait]
impl TableStore for DynamoTableStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<RawRecord>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("pk", AttributeValue::S(key.pk.clone()))
            .key("sk", AttributeValue::S(key.sk.clone()))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("get_item failed: {e}")))?;

        match result.item {
            Some(item) => Ok(Some(Self::from_item(&item)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record: RawRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(Self::to_item(&record)))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("put_item failed: {e}")))?;

        debug!("put record");
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("pk", AttributeValue::S(key.pk.clone()))
            .key("sk", AttributeValue::S(key.sk.clone()))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("delete_item failed: {e}")))?;

        Ok(())
    }

    async fn query(&self, spec: &QuerySpec) -> Result<Vec<RawRecord>> {
        let (partition_attr, sort_attr) = match spec.index {
            Some(index) => (index.partition_attr(), index.sort_attr()),
            None => ("pk", Some("sk")),
        };

        let mut condition = "#p = :p".to_string();
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .expression_attribute_names("#p", partition_attr)
            .expression_attribute_values(":p", AttributeValue::S(spec.partition_value.clone()));

        if let Some(index) = spec.index {
            request = request.index_name(index.as_str());
        }
        if let Some(prefix) = &spec.sort_prefix {
            let sort_attr = sort_attr.ok_or_else(|| {
                StoreError::Unavailable("sort prefix on an index without a sort key".to_string())
            })?;
            condition.push_str(" AND begins_with(#s, :s)");
            request = request
                .expression_attribute_names("#s", sort_attr)
                .expression_attribute_values(":s", AttributeValue::S(prefix.clone()));
        }
        request = request
            .key_condition_expression(condition)
            .scan_index_forward(!spec.descending);
        if let Some(limit) = spec.limit {
            request = request.limit(limit as i32);
        }

        let result = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("query failed: {e}")))?;

        let items = result.items();
        debug!(
            index = ?spec.index.map(|i| i.as_str()),
            partition = %spec.partition_value,
            count = items.len(),
            "query"
        );
        items.iter().map(Self::from_item).collect()
    }

    async fn scan(&self, spec: &ScanSpec) -> Result<Vec<RawRecord>> {
        let result = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression("begins_with(#p, :pkp) AND #s = :skv")
            .expression_attribute_names("#p", "pk")
            .expression_attribute_names("#s", "sk")
            .expression_attribute_values(":pkp", AttributeValue::S(spec.pk_prefix.clone()))
            .expression_attribute_values(":skv", AttributeValue::S(spec.sk_equals.clone()))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("scan failed: {e}")))?;

        result.items().iter().map(Self::from_item).collect()
    }
}
