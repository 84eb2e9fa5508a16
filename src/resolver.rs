//! Resolve a user-supplied token to an SSM-registered instance id.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::SsmError;
use crate::inventory::{self, InstanceDirectory, InventorySource};
use crate::logging::Logger;

static INSTANCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^m?i-[0-9a-f]+$").expect("instance id pattern is valid"));

/// EC2 (`i-…`) or SSM managed instance (`mi-…`) id.
pub fn is_instance_id(token: &str) -> bool {
    INSTANCE_ID.is_match(token)
}

/// Find the single directory entry identified by `token`.
///
/// Host and instance names compare case-insensitively, addresses exactly.
/// More than one hit is an error carrying every candidate id.
pub fn match_token(directory: &InstanceDirectory, token: &str) -> Result<Option<String>, SsmError> {
    let wanted = token.to_lowercase();

    let candidates: Vec<String> = directory
        .iter()
        .filter(|record| {
            let name_hit = [&record.host_name, &record.instance_name]
                .into_iter()
                .flatten()
                .any(|name| name.to_lowercase() == wanted);

            name_hit || record.addresses.iter().any(|address| address == token)
        })
        .map(|record| record.instance_id.clone())
        .collect();

    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.into_iter().next()),
        _ => Err(SsmError::AmbiguousMatch {
            token: token.to_string(),
            candidates,
        }),
    }
}

pub struct Resolver<'a, S: ?Sized> {
    source: &'a S,
    log: &'a Logger,
}

impl<'a, S> Resolver<'a, S>
where
    S: InventorySource + ?Sized,
{
    pub fn new(source: &'a S, log: &'a Logger) -> Self {
        Self { source, log }
    }

    /// Resolve `token`, fetching the inventory only when it is not already
    /// an instance id. Ids are trusted as given.
    pub async fn resolve(&self, token: &str) -> Result<Option<String>, SsmError> {
        if is_instance_id(token) {
            self.log
                .debug(&format!("'{}' is already an instance id", token));
            return Ok(Some(token.to_string()));
        }

        let directory = inventory::fetch(self.source, self.log).await?;
        let resolved = match_token(&directory, token)?;

        if let Some(instance_id) = &resolved {
            self.log
                .debug(&format!("Resolved '{}' to {}", token, instance_id));
        }
        Ok(resolved)
    }

    /// Like [`resolve`](Self::resolve), but zero matches is an error.
    pub async fn require(&self, token: &str) -> Result<String, SsmError> {
        self.resolve(token)
            .await?
            .ok_or_else(|| SsmError::UnresolvedToken {
                token: token.to_string(),
            })
    }
}
