//! SSM inventory listing merged with EC2 instance descriptions.

use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;

use crate::error::SsmError;
use crate::logging::Logger;

/// Inventory type holding the instance details we need.
pub const INSTANCE_INFORMATION: &str = "AWS:InstanceInformation";

/// Maximum number of instance ids passed to one `DescribeInstances` listing.
pub const DESCRIBE_BATCH_SIZE: usize = 100;

/// One entity from an SSM `GetInventory` page.
///
/// `data` maps an inventory type name to its content rows, each row being a
/// flat field map as returned by the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryEntity {
    pub id: Option<String>,
    pub data: HashMap<String, Vec<HashMap<String, String>>>,
}

/// One instance from an EC2 `DescribeInstances` page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribedInstance {
    pub instance_id: Option<String>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub tags: Vec<(String, String)>,
}

pub type InventoryPage = Vec<InventoryEntity>;
pub type DescriptionPage = Vec<DescribedInstance>;

/// Paginated access to the two remote listings.
///
/// Streams are lazy: each page is requested when the consumer polls for it.
#[cfg_attr(test, mockall::automock)]
pub trait InventorySource {
    fn list_inventory(&self) -> BoxStream<'static, Result<InventoryPage, SsmError>>;

    fn describe_instances(
        &self,
        instance_ids: Vec<String>,
    ) -> BoxStream<'static, Result<DescriptionPage, SsmError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub host_name: Option<String>,
    pub instance_name: Option<String>,
    pub addresses: Vec<String>,
}

impl InstanceRecord {
    pub fn new(instance_id: impl Into<String>, host_name: Option<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            host_name,
            instance_name: None,
            addresses: Vec::new(),
        }
    }

    /// Name used for sorting and display: the `Name` tag, else the host name.
    /// Empty values count as missing.
    pub fn display_name(&self) -> &str {
        self.instance_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.host_name.as_deref())
            .unwrap_or("")
    }
}

/// SSM-registered EC2 instances keyed by instance id, in inventory order.
#[derive(Debug, Clone, Default)]
pub struct InstanceDirectory {
    records: Vec<InstanceRecord>,
    index: HashMap<String, usize>,
}

impl InstanceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing (in place) any earlier one with the same id.
    pub fn insert(&mut self, record: InstanceRecord) {
        match self.index.get(&record.instance_id) {
            Some(&position) => self.records[position] = record,
            None => {
                self.index
                    .insert(record.instance_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, instance_id: &str) -> Option<&InstanceRecord> {
        self.index.get(instance_id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, instance_id: &str) -> Option<&mut InstanceRecord> {
        match self.index.get(instance_id) {
            Some(&i) => Some(&mut self.records[i]),
            None => None,
        }
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.index.contains_key(instance_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.records.iter()
    }

    pub fn instance_ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.instance_id.clone()).collect()
    }
}

impl FromIterator<InstanceRecord> for InstanceDirectory {
    fn from_iter<T: IntoIterator<Item = InstanceRecord>>(iter: T) -> Self {
        let mut directory = Self::new();
        for record in iter {
            directory.insert(record);
        }
        directory
    }
}

/// Build the directory of SSM-registered EC2 instances.
///
/// The SSM inventory decides membership; EC2 only adds names and addresses
/// to instances already collected. Any failing page aborts the whole fetch.
pub async fn fetch<S>(source: &S, log: &Logger) -> Result<InstanceDirectory, SsmError>
where
    S: InventorySource + ?Sized,
{
    log.debug("Listing SSM inventory...");

    let mut directory = InstanceDirectory::new();
    let mut pages = source.list_inventory();

    while let Some(page) = pages.next().await {
        for entity in page? {
            match registered_instance(&entity) {
                Ok(Some(record)) => directory.insert(record),
                Ok(None) => log.debug(&format!(
                    "Skipping terminated instance: {}",
                    entity_label(&entity)
                )),
                Err(err) => log.debug(&err.to_string()),
            }
        }
    }

    log.debug(&format!(
        "Found {} SSM-registered EC2 instances",
        directory.len()
    ));

    if directory.is_empty() {
        return Ok(directory);
    }

    let instance_ids = directory.instance_ids();
    for batch in instance_ids.chunks(DESCRIBE_BATCH_SIZE) {
        log.debug(&format!("Describing {} EC2 instances...", batch.len()));

        let mut pages = source.describe_instances(batch.to_vec());
        while let Some(page) = pages.next().await {
            for described in page? {
                enrich(&mut directory, described);
            }
        }
    }

    Ok(directory)
}

/// Extract a directory record from an inventory entity.
///
/// `Ok(None)` means the instance is terminated and should be left out.
fn registered_instance(entity: &InventoryEntity) -> Result<Option<InstanceRecord>, SsmError> {
    let content = entity
        .data
        .get(INSTANCE_INFORMATION)
        .and_then(|rows| rows.first())
        .ok_or_else(|| malformed(entity, "no instance information content"))?;

    match content.get("ResourceType").map(String::as_str) {
        Some("EC2Instance") => {}
        Some(other) => return Err(malformed(entity, &format!("resource type {}", other))),
        None => return Err(malformed(entity, "no resource type")),
    }

    if content.get("InstanceStatus").map(String::as_str) == Some("Terminated") {
        return Ok(None);
    }

    let instance_id = content
        .get("InstanceId")
        .ok_or_else(|| malformed(entity, "no instance id"))?;

    Ok(Some(InstanceRecord::new(
        instance_id.clone(),
        content.get("ComputerName").cloned(),
    )))
}

fn enrich(directory: &mut InstanceDirectory, described: DescribedInstance) {
    let Some(record) = described
        .instance_id
        .as_deref()
        .and_then(|id| directory.get_mut(id))
    else {
        return;
    };

    record
        .addresses
        .extend(described.private_ip.into_iter().chain(described.public_ip));

    record.instance_name = described
        .tags
        .into_iter()
        .find(|(key, _)| key == "Name")
        .map(|(_, value)| value);
}

fn malformed(entity: &InventoryEntity, reason: &str) -> SsmError {
    SsmError::MalformedInventoryEntry(format!("{} ({})", entity_label(entity), reason))
}

fn entity_label(entity: &InventoryEntity) -> &str {
    entity.id.as_deref().unwrap_or("<no id>")
}
