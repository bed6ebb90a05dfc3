use futures::StreamExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use zbus::proxy::CacheProperties;
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::Result;
use crate::api::bearer::Bearer;
use crate::api::models::{
    IpType, LockState, ModemError, ModemState, PowerState, StateRequirement, Technology,
};
use crate::api::radio::{CellInfo, Location, Signal};
use crate::api::sim::Sim;
use crate::core::decode;
use crate::core::registry::TrackedObject;
use crate::dbus::{
    MMLocationProxy, MMModem3gppProxy, MMModemProxy, MMSignalProxy, MMTimeProxy,
};
use crate::monitoring::observer::{ObserverSlot, spawn_observer};
use crate::types::constants::{bus, interface, location_source};
use crate::util::utils::{BusLink, bag_from_dict, property_changes};

#[derive(Debug, Default)]
struct ModemObservers {
    state: ObserverSlot,
    signal: ObserverSlot,
    location: ObserverSlot,
}

/// A modem exposed by ModemManager.
///
/// Obtained from [`crate::ModemManager`]. The handle is bound to the modem's
/// object path and caches nothing: every getter is a round trip to
/// ModemManager. Once the modem disappears (unplugged, or after
/// [`Modem::reset`]) the handle is stale and a new one must be fetched.
///
/// Clones share observer registrations: each kind of observer can be
/// registered once per modem and a new registration replaces the old one.
///
/// # Example
///
/// ```no_run
/// use mmrs::{ModemManager, ModemState};
///
/// # async fn example() -> mmrs::Result<()> {
/// let mm = ModemManager::new().await?;
/// if let Some(modem) = mm.any_modem() {
///     println!("{} {}", modem.manufacturer().await?, modem.model().await?);
///     if modem.state().await? == ModemState::Disabled {
///         modem.enable(true).await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Modem {
    link: BusLink,
    path: OwnedObjectPath,
    observers: Arc<ModemObservers>,
}

impl TrackedObject for Modem {
    fn object_path(&self) -> &str {
        self.path.as_str()
    }
}

impl Modem {
    pub(crate) fn new(link: BusLink, path: OwnedObjectPath) -> Self {
        Self {
            link,
            path,
            observers: Arc::new(ModemObservers::default()),
        }
    }

    /// D-Bus object path of the modem.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    async fn modem_proxy(&self) -> Result<MMModemProxy<'static>> {
        let conn = self.link.connection()?;
        Ok(MMModemProxy::builder(&conn)
            .path(self.path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn modem_3gpp_proxy(&self) -> Result<MMModem3gppProxy<'static>> {
        let conn = self.link.connection()?;
        Ok(MMModem3gppProxy::builder(&conn)
            .path(self.path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn signal_proxy(&self) -> Result<MMSignalProxy<'static>> {
        let conn = self.link.connection()?;
        Ok(MMSignalProxy::builder(&conn)
            .path(self.path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn location_proxy(&self) -> Result<MMLocationProxy<'static>> {
        let conn = self.link.connection()?;
        Ok(MMLocationProxy::builder(&conn)
            .path(self.path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn require(&self, operation: &str, requirement: StateRequirement) -> Result<()> {
        requirement.check(operation, self.state().await?)
    }

    // ---- identity ----

    pub async fn manufacturer(&self) -> Result<String> {
        Ok(self.modem_proxy().await?.manufacturer().await?)
    }

    pub async fn model(&self) -> Result<String> {
        Ok(self.modem_proxy().await?.model().await?)
    }

    /// IMEI, read from the 3GPP interface.
    pub async fn imei(&self) -> Result<String> {
        Ok(self.modem_3gpp_proxy().await?.imei().await?)
    }

    pub async fn firmware_version(&self) -> Result<String> {
        Ok(self.modem_proxy().await?.revision().await?)
    }

    /// First of the modem's own phone numbers, if the SIM reports any.
    pub async fn phone_number(&self) -> Result<Option<String>> {
        let numbers = self.modem_proxy().await?.own_numbers().await?;
        Ok(numbers.into_iter().next())
    }

    // ---- power ----

    pub async fn power_state(&self) -> Result<PowerState> {
        Ok(PowerState::from(self.modem_proxy().await?.power_state().await?))
    }

    async fn set_power_state(&self, state: PowerState) -> Result<()> {
        self.require(
            "change power state",
            StateRequirement::Exactly(ModemState::Disabled),
        )
        .await?;
        debug!("Setting power state of {} to {state}", self.path);
        self.modem_proxy()
            .await?
            .set_power_state(state.code())
            .await
            .map_err(|e| ModemError::DbusOperation {
                context: format!("failed to set power state to {state}"),
                source: e,
            })
    }

    /// Powers the modem off. The modem must be [`ModemState::Disabled`].
    ///
    /// # Errors
    ///
    /// `PreconditionNotMet` if the modem is in any other state.
    pub async fn power_off(&self) -> Result<()> {
        self.set_power_state(PowerState::Off).await
    }

    /// Puts the modem into low power mode. The modem must be
    /// [`ModemState::Disabled`].
    pub async fn power_low(&self) -> Result<()> {
        self.set_power_state(PowerState::Low).await
    }

    /// Powers the modem fully on. The modem must be [`ModemState::Disabled`].
    pub async fn power_on(&self) -> Result<()> {
        self.set_power_state(PowerState::On).await
    }

    // ---- state ----

    /// Enables (`true`) or disables (`false`) the modem.
    pub async fn enable(&self, enable: bool) -> Result<()> {
        debug!("{} modem {}", if enable { "Enabling" } else { "Disabling" }, self.path);
        Ok(self.modem_proxy().await?.enable(enable).await?)
    }

    /// Resets the modem.
    ///
    /// The modem disappears and comes back under a new object path, which
    /// makes this handle stale. Use [`crate::ModemManager::reset_modem`] to
    /// get the new handle.
    pub async fn reset(&self) -> Result<()> {
        debug!("Resetting modem {}", self.path);
        Ok(self.modem_proxy().await?.reset().await?)
    }

    pub async fn state(&self) -> Result<ModemState> {
        Ok(ModemState::from(self.modem_proxy().await?.state().await?))
    }

    /// Returns `true` if the modem is at least [`ModemState::Enabled`].
    pub async fn is_enabled(&self) -> Result<bool> {
        Ok(self.state().await? >= ModemState::Enabled)
    }

    /// Returns `true` if the modem is at least [`ModemState::Registered`].
    pub async fn is_registered(&self) -> Result<bool> {
        Ok(self.state().await? >= ModemState::Registered)
    }

    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.state().await? == ModemState::Connected)
    }

    pub async fn lock_state(&self) -> Result<LockState> {
        Ok(LockState::from(
            self.modem_proxy().await?.unlock_required().await?,
        ))
    }

    /// Returns `true` if a SIM PIN/PUK (other than PIN2) is required.
    pub async fn is_locked(&self) -> Result<bool> {
        Ok(self.lock_state().await?.is_locked())
    }

    /// Calls `callback(old, new)` on every modem state change.
    ///
    /// Replaces any state observer registered before on this modem.
    pub async fn observe_state<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(ModemState, ModemState) + Send + Sync + 'static,
    {
        let proxy = self.modem_proxy().await?;
        let mut stream = proxy.receive_modem_state_changed().await?;
        debug!("Subscribed to StateChanged on {}", self.path);

        spawn_observer(
            &self.observers.state,
            self.link.shutdown(),
            "state",
            async move {
                while let Some(signal) = stream.next().await {
                    match signal.args() {
                        Ok(args) => callback(
                            ModemState::from(args.old_state),
                            ModemState::from(args.new_state),
                        ),
                        Err(e) => warn!("Undecodable StateChanged signal: {e}"),
                    }
                }
                drop(proxy);
            },
        );
        Ok(())
    }

    // ---- SIM and data connections ----

    /// The active SIM, or `None` if no SIM is inserted.
    pub async fn active_sim(&self) -> Result<Option<Sim>> {
        let path = self.modem_proxy().await?.sim().await?;
        if path.as_str() == bus::NO_OBJECT {
            return Ok(None);
        }
        Ok(Some(Sim::new(self.link.clone(), path)))
    }

    /// All bearers of this modem.
    pub async fn connections(&self) -> Result<Vec<Bearer>> {
        let paths = self.modem_proxy().await?.bearers().await?;
        Ok(paths
            .into_iter()
            .map(|p| Bearer::new(self.link.clone(), p))
            .collect())
    }

    /// The first connected bearer, if any.
    pub async fn active_connection(&self) -> Result<Option<Bearer>> {
        for bearer in self.connections().await? {
            if bearer.is_active().await? {
                return Ok(Some(bearer));
            }
        }
        Ok(None)
    }

    /// Creates a bearer for `apn` and connects it.
    ///
    /// # Errors
    ///
    /// `DbusOperation` if the bearer could not be created or connected.
    pub async fn connect(&self, apn: &str, ip_type: IpType) -> Result<Bearer> {
        let mut settings: HashMap<&str, Value<'_>> = HashMap::new();
        settings.insert("apn", Value::from(apn));
        settings.insert("ip-type", Value::from(ip_type.code()));

        let path = self
            .modem_proxy()
            .await?
            .create_bearer(settings)
            .await
            .map_err(|e| ModemError::DbusOperation {
                context: format!("failed to create bearer for APN '{apn}'"),
                source: e,
            })?;
        debug!("Created bearer {path} for APN '{apn}' ({ip_type})");

        let bearer = Bearer::new(self.link.clone(), path);
        bearer.activate().await?;
        Ok(bearer)
    }

    // ---- network ----

    /// MCC and MNC of the registered network, e.g. `"26201"`.
    pub async fn operator_plmn(&self) -> Result<String> {
        Ok(self.modem_3gpp_proxy().await?.operator_code().await?)
    }

    pub async fn operator_name(&self) -> Result<String> {
        Ok(self.modem_3gpp_proxy().await?.operator_name().await?)
    }

    /// Radio generations currently in use.
    pub async fn technology(&self) -> Result<Technology> {
        let bits = self.modem_proxy().await?.access_technologies().await?;
        Ok(Technology::from_access_technologies(bits))
    }

    /// Signal quality of the serving cell.
    ///
    /// Turns on extended signal reporting at the configured refresh rate if
    /// it is off, so the very first call may return a record without values.
    ///
    /// # Errors
    ///
    /// `PreconditionNotMet` unless the modem is at least registered, and
    /// `UnsupportedTechnology` unless the modem uses exactly LTE or NR.
    pub async fn signal(&self) -> Result<Signal> {
        self.require(
            "access signal quality",
            StateRequirement::AtLeast(ModemState::Registered),
        )
        .await?;

        let proxy = self.signal_proxy().await?;
        if proxy.rate().await? == 0 {
            let rate = refresh_secs(self.link.config().signal_refresh_rate);
            debug!("Enabling signal reporting on {} every {rate}s", self.path);
            proxy.setup(rate).await?;
        }

        let tech = self.technology().await?;
        read_signal(&proxy, tech).await
    }

    /// Calls `callback` with every signal quality update.
    ///
    /// Sets the modem's signal refresh rate to `interval`. Each report of
    /// new LTE or NR values produces one call per technology reported;
    /// nothing is delivered on registration. Updates that cannot be read or
    /// decoded are logged and skipped. Replaces any signal observer
    /// registered before on this modem.
    pub async fn observe_signal<F>(&self, interval: Duration, callback: F) -> Result<()>
    where
        F: Fn(Signal) + Send + Sync + 'static,
    {
        self.require(
            "observe signal quality",
            StateRequirement::AtLeast(ModemState::Registered),
        )
        .await?;

        let proxy = self.signal_proxy().await?;
        proxy.setup(refresh_secs(interval)).await?;

        let conn = self.link.connection()?;
        let mut updates =
            property_changes(&conn, bus::MM_SERVICE, self.path.clone(), interface::SIGNAL).await?;

        spawn_observer(
            &self.observers.signal,
            self.link.shutdown(),
            "signal",
            async move {
                while let Some(names) = updates.next().await {
                    for tech in reported_technologies(&names) {
                        match read_signal(&proxy, tech).await {
                            Ok(signal) => callback(signal),
                            Err(e) => warn!("Skipping {tech} signal update: {e}"),
                        }
                    }
                }
            },
        );
        Ok(())
    }

    /// Serving and neighbouring LTE and NR cells. Cells of other
    /// technologies are left out.
    pub async fn cell_info(&self) -> Result<Vec<CellInfo>> {
        let records = self.modem_proxy().await?.get_cell_info().await?;
        let bags: Vec<_> = records.iter().map(bag_from_dict).collect();
        CellInfo::decode_all(&bags)
    }

    /// Location of the serving cell from the 3GPP LAC/CI source.
    ///
    /// Returns `Ok(None)` if the source is not enabled or its value is
    /// malformed.
    ///
    /// # Errors
    ///
    /// `PreconditionNotMet` unless the modem is at least registered, and
    /// `UnsupportedTechnology` unless the modem uses exactly LTE or NR.
    pub async fn location(&self) -> Result<Option<Location>> {
        self.require(
            "access cell location",
            StateRequirement::AtLeast(ModemState::Registered),
        )
        .await?;

        let sources = self.location_proxy().await?.get_location().await?;
        let Some(data) = lac_ci_string(&sources) else {
            return Ok(None);
        };
        let tech = self.technology().await?;
        Location::from_3gpp(&data, tech)
    }

    /// Calls `callback` with every cell location update.
    ///
    /// Enables the 3GPP LAC/CI location source. Called once per location
    /// change, never on registration. A malformed update is passed on as
    /// `None`. Replaces any location observer registered before on
    /// this modem.
    pub async fn observe_location<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Option<Location>) + Send + Sync + 'static,
    {
        self.require(
            "observe cell location",
            StateRequirement::AtLeast(ModemState::Registered),
        )
        .await?;

        let conn = self.link.connection()?;
        let location = self.location_proxy().await?;
        location
            .setup(location_source::LAC_CI_3GPP, true)
            .await
            .map_err(|e| ModemError::DbusOperation {
                context: "failed to enable 3GPP location source".into(),
                source: e,
            })?;

        let modem = self.modem_proxy().await?;
        let mut updates =
            property_changes(&conn, bus::MM_SERVICE, self.path.clone(), interface::LOCATION)
                .await?;

        spawn_observer(
            &self.observers.location,
            self.link.shutdown(),
            "location",
            async move {
                while let Some(names) = updates.next().await {
                    if !names.iter().any(|n| n == "Location") {
                        continue;
                    }
                    let sources = match location.get_location().await {
                        Ok(sources) => sources,
                        Err(e) => {
                            warn!("Failed to read location update: {e}");
                            continue;
                        }
                    };
                    let Some(data) = lac_ci_string(&sources) else {
                        continue;
                    };
                    let tech = match modem.access_technologies().await {
                        Ok(bits) => Technology::from_access_technologies(bits),
                        Err(e) => {
                            warn!("Failed to read access technology: {e}");
                            continue;
                        }
                    };
                    match Location::from_3gpp(&data, tech) {
                        Ok(loc) => callback(loc),
                        Err(e) => warn!("Skipping location update: {e}"),
                    }
                }
            },
        );
        Ok(())
    }

    // ---- time ----

    /// Network time as reported by the modem, in ISO 8601 format.
    ///
    /// # Errors
    ///
    /// `PreconditionNotMet` unless the modem is at least enabled.
    pub async fn network_time(&self) -> Result<String> {
        self.require(
            "get network time",
            StateRequirement::AtLeast(ModemState::Enabled),
        )
        .await?;

        let conn = self.link.connection()?;
        let proxy = MMTimeProxy::builder(&conn)
            .path(self.path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        Ok(proxy.get_network_time().await?)
    }

    /// Network time as seconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// `InvalidNetworkTime` if the modem's time string cannot be parsed.
    pub async fn network_time_epoch(&self) -> Result<i64> {
        decode::network_time_epoch(&self.network_time().await?)
    }
}

async fn read_signal(proxy: &MMSignalProxy<'_>, tech: Technology) -> Result<Signal> {
    let raw = if tech == Technology::LTE {
        proxy.lte().await?
    } else if tech == Technology::NR5G {
        proxy.nr5g().await?
    } else {
        return Err(ModemError::UnsupportedTechnology(tech));
    };
    Signal::decode(&bag_from_dict(&raw), tech)
}

/// Technologies whose signal values a change notification reports, in
/// LTE then NR order.
fn reported_technologies(names: &[String]) -> Vec<Technology> {
    [("Lte", Technology::LTE), ("Nr5g", Technology::NR5G)]
        .into_iter()
        .filter(|(name, _)| names.iter().any(|n| n == name))
        .map(|(_, tech)| tech)
        .collect()
}

/// Signal refresh rates are whole seconds; anything shorter rounds up to 1.
fn refresh_secs(interval: Duration) -> u32 {
    u32::try_from(interval.as_secs()).unwrap_or(u32::MAX).max(1)
}

/// Extracts the 3GPP LAC/CI string from a location dictionary.
fn lac_ci_string(sources: &HashMap<u32, OwnedValue>) -> Option<String> {
    let value = sources.get(&location_source::LAC_CI_3GPP)?;
    match &**value {
        Value::Str(s) => Some(s.as_str().to_owned()),
        Value::Value(inner) => match &**inner {
            Value::Str(s) => Some(s.as_str().to_owned()),
            _ => None,
        },
        other => {
            warn!("3GPP location has unexpected value {other:?}");
            None
        }
    }
}
