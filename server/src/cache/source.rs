//! Where inventory comes from
//!
//! The builder only talks to [`InventorySource`]; the production
//! implementation calls Identity and Operations Insights.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::models::{CompartmentRecord, DatabaseRecord, HostRecord, RegionRecord, TenancyRecord};
use crate::oci::pagination::list_all;
use crate::oci::{OciClient, OciError, Service};

/// Upper bound for a single inventory listing
pub const INVENTORY_MAX_ITEMS: usize = 100_000;

/// Records from one listing; `truncated` when it stopped at the item cap
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub truncated: bool,
}

impl<T> Listing<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self { items, truncated: false }
    }
}

#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Tenancy of the identity doing the scan
    fn tenancy_id(&self) -> &str;

    /// Region used when the caller names none
    fn default_region(&self) -> &str;

    async fn tenancy(&self) -> Result<TenancyRecord, OciError>;

    async fn region_subscriptions(&self) -> Result<Vec<RegionRecord>, OciError>;

    async fn compartment(&self, id: &str) -> Result<CompartmentRecord, OciError>;

    /// Every ACTIVE compartment below `root`, any depth
    async fn child_compartments(&self, root: &str) -> Result<Listing<CompartmentRecord>, OciError>;

    async fn database_insights(&self, compartment_id: &str, region: &str) -> Result<Listing<DatabaseRecord>, OciError>;

    async fn host_insights(&self, compartment_id: &str, region: &str) -> Result<Listing<HostRecord>, OciError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenancyWire {
    id: String,
    name: String,
    #[serde(default)]
    home_region_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegionSubscriptionWire {
    region_key: String,
    region_name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    is_home_region: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompartmentWire {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    compartment_id: Option<String>,
    #[serde(default)]
    lifecycle_state: Option<String>,
}

impl From<CompartmentWire> for CompartmentRecord {
    fn from(w: CompartmentWire) -> Self {
        CompartmentRecord {
            id: w.id,
            name: w.name,
            description: w.description,
            parent_id: w.compartment_id,
            lifecycle_state: w.lifecycle_state,
            level: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseInsightWire {
    id: String,
    #[serde(default)]
    database_id: Option<String>,
    #[serde(default)]
    database_name: Option<String>,
    #[serde(default)]
    database_display_name: Option<String>,
    #[serde(default)]
    database_type: Option<String>,
    #[serde(default)]
    database_version: Option<String>,
    #[serde(default)]
    entity_source: Option<String>,
    compartment_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    lifecycle_state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostInsightWire {
    id: String,
    #[serde(default)]
    host_name: Option<String>,
    #[serde(default)]
    host_display_name: Option<String>,
    #[serde(default)]
    host_type: Option<String>,
    #[serde(default)]
    platform_type: Option<String>,
    #[serde(default)]
    entity_source: Option<String>,
    compartment_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    lifecycle_state: Option<String>,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, OciError> {
    Ok(serde_json::from_value(value)?)
}

fn decode_all<T: serde::de::DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, OciError> {
    items.into_iter().map(decode).collect()
}

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Inventory read straight from OCI
pub struct OciInventorySource {
    client: OciClient,
}

impl OciInventorySource {
    /// `client` is bound to the home (default) region
    pub fn new(client: OciClient) -> Self {
        Self { client }
    }

    async fn list_children(&self, parent: &str, subtree: bool) -> Result<Listing<CompartmentRecord>, OciError> {
        let mut query = vec![
            pair("compartmentId", parent),
            pair("lifecycleState", "ACTIVE"),
            pair("accessLevel", "ANY"),
        ];
        if subtree {
            query.push(pair("compartmentIdInSubtree", "true"));
        }
        let collected = list_all(&self.client, Service::Identity, "/compartments", &query, INVENTORY_MAX_ITEMS).await?;
        Ok(Listing {
            items: decode_all::<CompartmentWire>(collected.items)?
                .into_iter()
                .map(CompartmentRecord::from)
                .collect(),
            truncated: collected.truncated,
        })
    }
}

#[async_trait]
impl InventorySource for OciInventorySource {
    fn tenancy_id(&self) -> &str {
        self.client.tenancy_id()
    }

    fn default_region(&self) -> &str {
        self.client.region()
    }

    async fn tenancy(&self) -> Result<TenancyRecord, OciError> {
        let path = format!("/tenancies/{}", self.client.tenancy_id());
        let wire: TenancyWire = decode(self.client.get(Service::Identity, &path, &[]).await?.body)?;
        Ok(TenancyRecord {
            id: wire.id,
            name: wire.name,
            home_region_key: wire.home_region_key,
        })
    }

    async fn region_subscriptions(&self) -> Result<Vec<RegionRecord>, OciError> {
        let path = format!("/tenancies/{}/regionSubscriptions", self.client.tenancy_id());
        let body = self.client.get(Service::Identity, &path, &[]).await?.body;
        let wires: Vec<RegionSubscriptionWire> = decode_all(crate::oci::pagination::page_items(body))?;
        Ok(wires
            .into_iter()
            .map(|w| RegionRecord {
                name: w.region_name,
                key: w.region_key,
                is_home_region: w.is_home_region,
                status: w.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            })
            .collect())
    }

    async fn compartment(&self, id: &str) -> Result<CompartmentRecord, OciError> {
        let path = format!("/compartments/{}", id);
        let wire: CompartmentWire = decode(self.client.get(Service::Identity, &path, &[]).await?.body)?;
        Ok(wire.into())
    }

    async fn child_compartments(&self, root: &str) -> Result<Listing<CompartmentRecord>, OciError> {
        // Subtree listing is only accepted on the tenancy itself
        if root == self.client.tenancy_id() {
            return self.list_children(root, true).await;
        }

        let mut found = Listing::complete(Vec::new());
        let mut frontier = vec![root.to_string()];
        while let Some(parent) = frontier.pop() {
            let children = self.list_children(&parent, false).await?;
            found.truncated |= children.truncated;
            frontier.extend(children.items.iter().map(|c| c.id.clone()));
            found.items.extend(children.items);
        }
        Ok(found)
    }

    async fn database_insights(&self, compartment_id: &str, region: &str) -> Result<Listing<DatabaseRecord>, OciError> {
        let client = self.client.with_region(region);
        let query = [pair("compartmentId", compartment_id), pair("lifecycleState", "ACTIVE")];
        let collected = list_all(&client, Service::OperationsInsights, "/databaseInsights", &query, INVENTORY_MAX_ITEMS).await?;

        let items = decode_all::<DatabaseInsightWire>(collected.items)?
            .into_iter()
            .map(|w| DatabaseRecord {
                id: w.id,
                database_id: w.database_id,
                database_name: w.database_name,
                database_display_name: w.database_display_name,
                database_type: w.database_type,
                database_version: w.database_version,
                entity_source: w.entity_source,
                compartment_id: w.compartment_id,
                status: w.status,
                lifecycle_state: w.lifecycle_state,
                region: Some(region.to_string()),
            })
            .collect();
        Ok(Listing {
            items,
            truncated: collected.truncated,
        })
    }

    async fn host_insights(&self, compartment_id: &str, region: &str) -> Result<Listing<HostRecord>, OciError> {
        let client = self.client.with_region(region);
        let query = [pair("compartmentId", compartment_id), pair("lifecycleState", "ACTIVE")];
        let collected = list_all(&client, Service::OperationsInsights, "/hostInsights", &query, INVENTORY_MAX_ITEMS).await?;

        let items = decode_all::<HostInsightWire>(collected.items)?
            .into_iter()
            .map(|w| HostRecord {
                id: w.id,
                host_name: w.host_name,
                host_display_name: w.host_display_name,
                host_type: w.host_type,
                platform_type: w.platform_type,
                entity_source: w.entity_source,
                compartment_id: w.compartment_id,
                status: w.status,
                lifecycle_state: w.lifecycle_state,
                region: Some(region.to_string()),
            })
            .collect();
        Ok(Listing {
            items,
            truncated: collected.truncated,
        })
    }
}
