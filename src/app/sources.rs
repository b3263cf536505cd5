//! Built-in data sources
//!
//! The demo source serves as a reference implementation of the
//! [`DataSource`](crate::app::plugin::DataSource) contract and exercises the
//! full pipeline against a public host with a small fixed catalog. Real
//! sources typically derive their catalog from remote listings instead.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::app::client::HostClient;
use crate::app::models::{LinkItem, LinkItemCollection};
use crate::app::plugin::{DataSource, PluginInfo, PluginRegistry};
use crate::errors::{SourceError, SourceResult};

/// Reference source with a fixed two-entry catalog
pub struct DemoSource {
    info: PluginInfo,
}

impl DemoSource {
    /// Plugin name the source registers under
    pub const NAME: &'static str = "demo";

    /// Create the demo source
    pub fn new() -> Self {
        Self {
            info: PluginInfo::new(Self::NAME, "0.1.0", "raw.githubusercontent.com")
                .expect("demo plugin identity should be valid"),
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for DemoSource {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn produce_catalog(&self, _client: &HostClient) -> SourceResult<LinkItemCollection> {
        let mut items = LinkItemCollection::new();
        items.insert(
            "/rust-lang/rust/master/README.md",
            LinkItem::new("rust-readme", fixed_time(2001, 1, 1, 1, 1, 1)?)
                .map_err(|e| SourceError::Parse {
                    reason: e.to_string(),
                })?,
        );
        items.insert(
            "/rust-lang/cargo/master/README.md",
            LinkItem::new("cargo-readme", fixed_time(2002, 2, 2, 2, 2, 2)?)
                .map_err(|e| SourceError::Parse {
                    reason: e.to_string(),
                })?,
        );
        Ok(items)
    }

    async fn produce_freshness_time(
        &self,
        _client: &HostClient,
    ) -> SourceResult<DateTime<Utc>> {
        fixed_time(1999, 9, 9, 9, 9, 9)
    }
}

fn fixed_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> SourceResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .ok_or_else(|| SourceError::Unavailable {
            reason: "invalid fixed timestamp".to_string(),
        })
}

/// Register the built-in sources
pub fn register_builtin(registry: &mut PluginRegistry) {
    registry.register(DemoSource::NAME, || {
        Box::new(DemoSource::new()) as Box<dyn DataSource>
    });
}
