//! Concrete upload destinations
//!
//! | name       | system                 | compensation            |
//! |------------|------------------------|-------------------------|
//! | `objects`  | S3-compatible storage  | delete uploaded keys    |
//! | `metadata` | PostgreSQL             | delete version rows     |
//! | `cache`    | SQLite summaries       | delete rows, best-effort|
//! | `mirror`   | local filesystem       | remove version dir      |

pub mod cache_index;
pub mod metadata_store;
pub mod mirror;
pub mod object_store;

pub use cache_index::CacheIndex;
pub use metadata_store::MetadataStore;
pub use mirror::FsMirror;
pub use object_store::ObjectStore;

use crate::config::{validate_destinations, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::upload::Destination;
use std::sync::Arc;
use tracing::debug;

/// Connect the destinations named in `names`, preserving their order
pub async fn build_destinations(
    config: &PipelineConfig,
    names: &[String],
) -> Result<Vec<Arc<dyn Destination>>> {
    validate_destinations(names)?;

    let mut destinations: Vec<Arc<dyn Destination>> = Vec::with_capacity(names.len());
    for name in names {
        debug!(destination = %name, "Connecting destination");
        let destination: Arc<dyn Destination> = match name.as_str() {
            object_store::NAME => Arc::new(
                ObjectStore::new(&config.storage)
                    .await
                    .map_err(|e| connect_error(name, e))?,
            ),
            metadata_store::NAME => Arc::new(
                MetadataStore::connect(&config.database)
                    .await
                    .map_err(|e| connect_error(name, e))?,
            ),
            cache_index::NAME => Arc::new(
                CacheIndex::open(&config.cache_db)
                    .await
                    .map_err(|e| connect_error(name, e))?,
            ),
            mirror::NAME => Arc::new(FsMirror::new(&config.mirror_dir)),
            other => {
                return Err(PipelineError::config(format!("Unknown destination '{other}'")));
            },
        };
        destinations.push(destination);
    }
    Ok(destinations)
}

fn connect_error(name: &str, err: anyhow::Error) -> PipelineError {
    PipelineError::config(format!("Failed to initialize destination '{name}': {err:#}"))
}
