//! Remote process inventory

use std::time::Duration;

use mctl_core::config::InventoryConfig;
use mctl_core::parser::parse_process_listing;
use mctl_core::{PermanentFilter, ProcessRecord};

use crate::error::InventoryError;
use crate::transport::CommandExecutor;

/// Lists remote processes and applies the permanent filter
#[derive(Debug, Clone)]
pub struct Inventory {
    config: InventoryConfig,
    filter: PermanentFilter,
    timeout: Duration,
}

impl Inventory {
    pub fn new(config: InventoryConfig, filter: PermanentFilter, timeout: Duration) -> Self {
        Self {
            config,
            filter,
            timeout,
        }
    }

    pub fn set_filter(&mut self, filter: PermanentFilter) {
        self.filter = filter;
    }

    /// Run the listing command and return the filtered snapshot
    pub async fn refresh<E>(&self, executor: &E) -> Result<Vec<ProcessRecord>, InventoryError>
    where
        E: CommandExecutor + ?Sized,
    {
        let output = executor.exec(&self.config.command, self.timeout).await?;

        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            return Err(InventoryError::RemoteCommand(stderr.to_string()));
        }

        let records = parse_process_listing(&output.stdout, self.config.metric_column);
        let parsed = records.len();
        let snapshot = self.filter.apply(records);

        tracing::debug!(
            "Process inventory: {} parsed, {} after filtering",
            parsed,
            snapshot.len()
        );
        Ok(snapshot)
    }
}
