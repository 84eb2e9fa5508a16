//! Builders for inventory fixtures shared by unit tests.

use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;

use crate::error::SsmError;
use crate::inventory::{DescribedInstance, InventoryEntity, INSTANCE_INFORMATION};

/// A stream that yields every page successfully.
pub fn pages<T: Send + 'static>(pages: Vec<Vec<T>>) -> BoxStream<'static, Result<Vec<T>, SsmError>> {
    stream::iter(pages.into_iter().map(Ok)).boxed()
}

/// A stream that yields `pages` and then fails as `operation` would.
pub fn failing_pages<T: Send + 'static>(
    pages: Vec<Vec<T>>,
    operation: &'static str,
) -> BoxStream<'static, Result<Vec<T>, SsmError>> {
    let failure = SsmError::RemoteService {
        operation,
        message: "ExpiredTokenException: The security token included in the request is expired"
            .to_string(),
    };
    stream::iter(pages.into_iter().map(Ok).chain(std::iter::once(Err(failure)))).boxed()
}

/// An inventory entity carrying a single instance information row.
pub fn entity(id: &str, fields: &[(&str, &str)]) -> InventoryEntity {
    let row: HashMap<String, String> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    InventoryEntity {
        id: Some(id.to_string()),
        data: HashMap::from([(INSTANCE_INFORMATION.to_string(), vec![row])]),
    }
}

/// A running EC2 instance as reported by the SSM inventory.
pub fn ec2_entity(instance_id: &str, computer_name: Option<&str>) -> InventoryEntity {
    let mut fields = vec![
        ("InstanceId", instance_id),
        ("ResourceType", "EC2Instance"),
        ("InstanceStatus", "Active"),
    ];
    if let Some(name) = computer_name {
        fields.push(("ComputerName", name));
    }
    entity(instance_id, &fields)
}

pub fn described(
    instance_id: &str,
    private_ip: Option<&str>,
    public_ip: Option<&str>,
    name: Option<&str>,
) -> DescribedInstance {
    let mut tags = vec![("Environment".to_string(), "test".to_string())];
    if let Some(name) = name {
        tags.push(("Name".to_string(), name.to_string()));
    }

    DescribedInstance {
        instance_id: Some(instance_id.to_string()),
        private_ip: private_ip.map(str::to_string),
        public_ip: public_ip.map(str::to_string),
        tags,
    }
}
