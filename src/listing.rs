//! Aligned table of the instance directory for `--list`.

use crate::inventory::{InstanceDirectory, InstanceRecord};
use crate::logging::Logger;

const COLUMN_GAP: &str = "   ";

/// Render one line per instance, sorted by display name.
///
/// The sort is stable, so entries sharing a display name keep inventory
/// order. An empty directory produces a warning and no rows.
pub fn format_listing(directory: &InstanceDirectory, log: &Logger) -> Vec<String> {
    if directory.is_empty() {
        log.warning("No instances registered in SSM!");
        return Vec::new();
    }

    let mut records: Vec<&InstanceRecord> = directory.iter().collect();
    records.sort_by(|a, b| a.display_name().cmp(b.display_name()));

    let host_width = column_width(&records, |r| r.host_name.as_deref());
    let name_width = column_width(&records, |r| r.instance_name.as_deref());

    records
        .into_iter()
        .map(|record| {
            format!(
                "{id}{gap}{host:<host_width$}{gap}{name:<name_width$}{gap}{addresses}",
                id = record.instance_id,
                gap = COLUMN_GAP,
                host = record.host_name.as_deref().unwrap_or(""),
                name = record.instance_name.as_deref().unwrap_or(""),
                addresses = record.addresses.join(" "),
            )
        })
        .collect()
}

fn column_width<F>(records: &[&InstanceRecord], field: F) -> usize
where
    F: Fn(&InstanceRecord) -> Option<&str>,
{
    records
        .iter()
        .filter_map(|r| field(r))
        .map(|value| value.chars().count())
        .max()
        .unwrap_or(0)
}
