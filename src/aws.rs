//! AWS configuration and the SDK-backed inventory source.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::SsmError;
use crate::inventory::{
    DescribedInstance, DescriptionPage, InventoryEntity, InventoryPage, InventorySource,
};
use crate::logging::Logger;

/// Load the shared AWS configuration.
///
/// Precedence, highest first:
/// 1. CLI arguments (--profile, --region)
/// 2. Environment variables (AWS_PROFILE, AWS_REGION)
/// 3. Shared credentials and config files (~/.aws)
/// 4. Instance metadata (when running on EC2)
pub async fn load_config(profile: Option<String>, region: Option<String>) -> SdkConfig {
    let mut config_loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = region {
        config_loader = config_loader.region(Region::new(region));
    }

    if let Some(profile) = profile {
        config_loader = config_loader.profile_name(profile);
    }

    config_loader.load().await
}

/// Fail early with a readable message when credentials are missing or expired.
pub async fn validate_credentials(config: &SdkConfig, log: &Logger) -> Result<(), SsmError> {
    log.debug("Validating AWS credentials...");

    let identity = aws_sdk_sts::Client::new(config)
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| SsmError::remote("GetCallerIdentity", e))?;

    log.debug(&format!(
        "Authenticated as {}",
        identity.arn().unwrap_or("unknown")
    ));
    Ok(())
}

/// Inventory source backed by the SSM and EC2 APIs.
#[derive(Clone)]
pub struct AwsInventory {
    ssm: aws_sdk_ssm::Client,
    ec2: aws_sdk_ec2::Client,
}

impl AwsInventory {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            ssm: aws_sdk_ssm::Client::new(config),
            ec2: aws_sdk_ec2::Client::new(config),
        }
    }
}

impl InventorySource for AwsInventory {
    fn list_inventory(&self) -> BoxStream<'static, Result<InventoryPage, SsmError>> {
        let paginator = self.ssm.get_inventory().into_paginator().send();

        stream::unfold(paginator, |mut paginator| async move {
            let page = paginator
                .next()
                .await?
                .map(|output| inventory_page(&output))
                .map_err(|e| SsmError::remote("GetInventory", e));
            Some((page, paginator))
        })
        .boxed()
    }

    fn describe_instances(
        &self,
        instance_ids: Vec<String>,
    ) -> BoxStream<'static, Result<DescriptionPage, SsmError>> {
        let paginator = self
            .ec2
            .describe_instances()
            .set_instance_ids(Some(instance_ids))
            .into_paginator()
            .send();

        stream::unfold(paginator, |mut paginator| async move {
            let page = paginator
                .next()
                .await?
                .map(|output| description_page(&output))
                .map_err(|e| SsmError::remote("DescribeInstances", e));
            Some((page, paginator))
        })
        .boxed()
    }
}

fn inventory_page(output: &aws_sdk_ssm::operation::get_inventory::GetInventoryOutput) -> InventoryPage {
    output
        .entities()
        .iter()
        .map(|entity| InventoryEntity {
            id: entity.id().map(|id| id.to_string()),
            data: entity
                .data()
                .map(|data| {
                    data.iter()
                        .map(|(type_name, item)| (type_name.clone(), item.content().to_vec()))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn description_page(
    output: &aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput,
) -> DescriptionPage {
    let mut instances = Vec::new();

    for reservation in output.reservations() {
        for instance in reservation.instances() {
            let tags: Vec<(String, String)> = instance
                .tags()
                .iter()
                .filter_map(|tag| {
                    if let (Some(key), Some(value)) = (tag.key(), tag.value()) {
                        Some((key.to_string(), value.to_string()))
                    } else {
                        None
                    }
                })
                .collect();

            instances.push(DescribedInstance {
                instance_id: instance.instance_id().map(|id| id.to_string()),
                private_ip: instance.private_ip_address().map(|ip| ip.to_string()),
                public_ip: instance.public_ip_address().map(|ip| ip.to_string()),
                tags,
            });
        }
    }

    instances
}
