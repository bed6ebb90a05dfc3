//! Traffic counters of a bearer's network interface.
//!
//! ModemManager does not count bytes itself; the counters come from the
//! network stack. [`NetworkStatsProvider`] abstracts where they are read
//! from, and [`NetworkManagerStats`] reads them from NetworkManager's
//! `Device.Statistics` interface.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use log::{debug, warn};
use tokio::sync::watch;
use zbus::Connection;
use zbus::proxy::CacheProperties;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::models::{ModemError, TrafficStats};
use crate::dbus::{NMDeviceStatisticsProxy, NMProxy};
use crate::monitoring::observer::{ObserverSlot, spawn_observer};
use crate::types::constants::{bus, interface};
use crate::util::utils::property_changes;

/// Source of byte counters for a network interface.
#[async_trait]
pub trait NetworkStatsProvider: Send + Sync {
    /// Reads the current counters of `interface` (e.g. "wwan0").
    async fn traffic_stats(&self, interface: &str) -> Result<TrafficStats>;

    /// Sets how often the counters of `interface` are refreshed.
    /// `0` stops refreshing.
    async fn set_refresh_rate(&self, interface: &str, interval_ms: u32) -> Result<()>;

    /// One item per refresh of the counters of `interface`.
    async fn refreshes(&self, interface: &str) -> Result<BoxStream<'static, ()>>;
}

/// Reads counters from NetworkManager.
#[derive(Debug, Clone)]
pub struct NetworkManagerStats {
    conn: Connection,
}

impl NetworkManagerStats {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn device_path(&self, interface: &str) -> Result<OwnedObjectPath> {
        let nm = NMProxy::new(&self.conn).await?;
        nm.get_device_by_ip_iface(interface)
            .await
            .map_err(|e| ModemError::DbusOperation {
                context: format!("no NetworkManager device for interface '{interface}'"),
                source: e,
            })
    }

    async fn statistics(&self, interface: &str) -> Result<NMDeviceStatisticsProxy<'static>> {
        let path = self.device_path(interface).await?;
        Ok(NMDeviceStatisticsProxy::builder(&self.conn)
            .path(path)?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }
}

/// A statistics change counts as a refresh if either counter moved.
fn is_counter_refresh(names: &[String]) -> bool {
    names.iter().any(|n| n == "RxBytes" || n == "TxBytes")
}

#[async_trait]
impl NetworkStatsProvider for NetworkManagerStats {
    async fn traffic_stats(&self, interface: &str) -> Result<TrafficStats> {
        let stats = self.statistics(interface).await?;
        Ok(TrafficStats {
            rx_bytes: stats.rx_bytes().await?,
            tx_bytes: stats.tx_bytes().await?,
        })
    }

    async fn set_refresh_rate(&self, interface: &str, interval_ms: u32) -> Result<()> {
        let stats = self.statistics(interface).await?;
        stats.set_refresh_rate_ms(interval_ms).await?;
        Ok(())
    }

    async fn refreshes(&self, interface: &str) -> Result<BoxStream<'static, ()>> {
        let path = self.device_path(interface).await?;
        let changes = property_changes(
            &self.conn,
            bus::NM_SERVICE,
            path,
            interface::NM_DEVICE_STATISTICS,
        )
        .await?;
        Ok(changes
            .filter_map(|names| async move { is_counter_refresh(&names).then_some(()) })
            .boxed())
    }
}

/// Calls `callback` once per counter refresh of `interface`, after setting
/// the refresh interval to `interval_ms`.
pub(crate) async fn observe_traffic_stats<P, F>(
    provider: P,
    slot: &ObserverSlot,
    shutdown: watch::Receiver<()>,
    interface: &str,
    interval_ms: u32,
    callback: F,
) -> Result<()>
where
    P: NetworkStatsProvider + 'static,
    F: Fn(TrafficStats) + Send + Sync + 'static,
{
    provider.set_refresh_rate(interface, interval_ms).await?;
    let mut refreshes = provider.refreshes(interface).await?;
    debug!("Watching traffic counters of {interface} every {interval_ms}ms");

    let interface = interface.to_owned();
    spawn_observer(slot, shutdown, "traffic", async move {
        while refreshes.next().await.is_some() {
            match provider.traffic_stats(&interface).await {
                Ok(stats) => callback(stats),
                Err(e) => warn!("Failed to read traffic counters of {interface}: {e}"),
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeStats {
        counters: HashMap<String, TrafficStats>,
        refreshes: usize,
        rates: Arc<Mutex<Vec<(String, u32)>>>,
    }

    #[async_trait]
    impl NetworkStatsProvider for FakeStats {
        async fn traffic_stats(&self, interface: &str) -> Result<TrafficStats> {
            self.counters
                .get(interface)
                .copied()
                .ok_or_else(|| ModemError::KeyNotFound(interface.to_string()))
        }

        async fn set_refresh_rate(&self, interface: &str, interval_ms: u32) -> Result<()> {
            self.rates
                .lock()
                .unwrap()
                .push((interface.to_string(), interval_ms));
            Ok(())
        }

        async fn refreshes(&self, _interface: &str) -> Result<BoxStream<'static, ()>> {
            Ok(futures::stream::iter(vec![(); self.refreshes]).boxed())
        }
    }

    const COUNTERS: TrafficStats = TrafficStats {
        rx_bytes: 1024,
        tx_bytes: 512,
    };

    #[tokio::test]
    async fn one_callback_per_refresh() {
        let mut fake = FakeStats {
            refreshes: 2,
            ..FakeStats::default()
        };
        fake.counters.insert("wwan0".into(), COUNTERS);
        let rates = Arc::clone(&fake.rates);

        let (_shutdown_tx, shutdown) = watch::channel(());
        let slot = ObserverSlot::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        observe_traffic_stats(fake, &slot, shutdown, "wwan0", 1000, move |stats| {
            let _ = tx.send(stats);
        })
        .await
        .unwrap();

        assert_eq!(rx.recv().await, Some(COUNTERS));
        assert_eq!(rx.recv().await, Some(COUNTERS));
        // The refresh stream ended, so the task dropped the callback.
        assert_eq!(rx.recv().await, None);
        assert_eq!(*rates.lock().unwrap(), vec![("wwan0".to_string(), 1000)]);
    }

    #[tokio::test]
    async fn unreadable_counters_are_skipped() {
        let fake = FakeStats {
            refreshes: 3,
            ..FakeStats::default()
        };

        let (_shutdown_tx, shutdown) = watch::channel(());
        let slot = ObserverSlot::default();
        let (tx, mut rx) = mpsc::unbounded_channel::<TrafficStats>();

        observe_traffic_stats(fake, &slot, shutdown, "wwan1", 500, move |stats| {
            let _ = tx.send(stats);
        })
        .await
        .unwrap();

        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn only_counter_changes_count_as_refresh() {
        let names = |list: &[&str]| list.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert!(is_counter_refresh(&names(&["RxBytes", "TxBytes"])));
        assert!(is_counter_refresh(&names(&["TxBytes"])));
        assert!(!is_counter_refresh(&names(&["RefreshRateMs"])));
        assert!(!is_counter_refresh(&names(&[])));
    }
}
