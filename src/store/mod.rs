pub mod disk;
pub mod memory;

use crate::core::cache::KeyValueCollection;
use crate::core::config::AppConfig;
use disk::DiskCollection;
use memory::MemoryCollection;
use std::sync::Arc;
use tracing::debug;

const RATES_PARTITION: &str = "rates";

/// Opens the collection backing the rates cache. Falls back to memory when
/// the data directory cannot be determined or opened.
pub fn open_rate_collection(config: &AppConfig) -> Arc<dyn KeyValueCollection> {
    let disk = config
        .default_data_path()
        .and_then(|path| DiskCollection::open(&path.join("cache"), RATES_PARTITION));

    match disk {
        Ok(collection) => Arc::new(collection),
        Err(e) => {
            debug!("Persistent cache unavailable, using memory: {:#}", e);
            Arc::new(MemoryCollection::new())
        }
    }
}
