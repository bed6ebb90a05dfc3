use log::debug;
use std::sync::Arc;
use zbus::proxy::CacheProperties;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::models::{IpConfig, IpType, ModemError, TrafficStats};
use crate::core::decode;
use crate::dbus::MMBearerProxy;
use crate::monitoring::observer::ObserverSlot;
use crate::monitoring::traffic::{self, NetworkManagerStats, NetworkStatsProvider};
use crate::types::property_bag::PropertyBag;
use crate::util::utils::{BusLink, bag_from_dict};

/// A packet data connection (ModemManager bearer).
///
/// Obtained from [`crate::Modem::connect`], [`crate::Modem::connections`]
/// or [`crate::Modem::active_connection`].
#[derive(Debug, Clone)]
pub struct Bearer {
    link: BusLink,
    path: OwnedObjectPath,
    traffic_observer: Arc<ObserverSlot>,
}

impl Bearer {
    pub(crate) fn new(link: BusLink, path: OwnedObjectPath) -> Self {
        Self {
            link,
            path,
            traffic_observer: Arc::new(ObserverSlot::default()),
        }
    }

    /// D-Bus object path of the bearer.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    async fn proxy(&self) -> Result<MMBearerProxy<'static>> {
        let conn = self.link.connection()?;
        Ok(MMBearerProxy::builder(&conn)
            .path(self.path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    pub(crate) async fn activate(&self) -> Result<()> {
        debug!("Connecting bearer {}", self.path);
        self.proxy()
            .await?
            .connect()
            .await
            .map_err(|e| ModemError::DbusOperation {
                context: format!("failed to connect bearer {}", self.path),
                source: e,
            })
    }

    /// Disconnects the bearer.
    pub async fn disconnect(&self) -> Result<()> {
        debug!("Disconnecting bearer {}", self.path);
        Ok(self.proxy().await?.disconnect().await?)
    }

    /// Returns `true` if the bearer is connected.
    pub async fn is_active(&self) -> Result<bool> {
        Ok(self.proxy().await?.connected().await?)
    }

    async fn settings(&self) -> Result<PropertyBag> {
        let raw = self.proxy().await?.bearer_properties().await?;
        Ok(bag_from_dict(&raw))
    }

    /// Access point name the bearer was created with.
    pub async fn apn(&self) -> Result<String> {
        self.settings().await?.get("apn")
    }

    /// IP family the bearer was created with.
    pub async fn ip_type(&self) -> Result<IpType> {
        Ok(IpType::from(self.settings().await?.get::<u32>("ip-type")?))
    }

    /// Network interface carrying the data, e.g. "wwan0".
    pub async fn interface(&self) -> Result<String> {
        Ok(self.proxy().await?.interface().await?)
    }

    /// IPv4 configuration, or `None` if none is active.
    pub async fn ipv4_config(&self) -> Result<Option<IpConfig>> {
        let raw = self.proxy().await?.ip4_config().await?;
        Ok(decode::ip_config(&bag_from_dict(&raw), IpType::Ipv4))
    }

    /// IPv6 configuration, or `None` if none is active.
    pub async fn ipv6_config(&self) -> Result<Option<IpConfig>> {
        let raw = self.proxy().await?.ip6_config().await?;
        Ok(decode::ip_config(&bag_from_dict(&raw), IpType::Ipv6))
    }

    fn stats_provider(&self) -> Result<NetworkManagerStats> {
        Ok(NetworkManagerStats::new(self.link.connection()?))
    }

    /// Byte counters of the bearer's interface, read from NetworkManager.
    pub async fn traffic_stats(&self) -> Result<TrafficStats> {
        let interface = self.interface().await?;
        self.stats_provider()?.traffic_stats(&interface).await
    }

    /// Calls `callback` with the interface's byte counters each time
    /// NetworkManager refreshes them, every `interval_ms` milliseconds.
    ///
    /// Replaces any traffic observer registered before on this bearer.
    pub async fn observe_traffic_stats<F>(&self, interval_ms: u32, callback: F) -> Result<()>
    where
        F: Fn(TrafficStats) + Send + Sync + 'static,
    {
        let interface = self.interface().await?;
        traffic::observe_traffic_stats(
            self.stats_provider()?,
            &self.traffic_observer,
            self.link.shutdown(),
            &interface,
            interval_ms,
            callback,
        )
        .await
    }
}
