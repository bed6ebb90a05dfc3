use log::debug;
use std::sync::Arc;
use tokio::sync::watch;
use zbus::Connection;
use zbus::proxy::CacheProperties;

use crate::Result;
use crate::api::models::{ModemError, ModemFilter, ModemManagerConfig};
use crate::api::modem::Modem;
use crate::core::object_tracker;
use crate::core::registry::{ObjectRegistry, PendingObject};
use crate::dbus::MMProxy;
use crate::monitoring::observer::ObserverSlot;
use crate::util::utils::BusLink;

#[derive(Debug)]
struct Inner {
    // Handles hold this weakly.
    conn: Arc<Connection>,
    registry: Arc<ObjectRegistry<Modem>>,
    config: Arc<ModemManagerConfig>,
    // Aborts the object tracker task on drop.
    _tracker: ObserverSlot,
    // Closing this channel stops the tracker and every observer task.
    _shutdown: watch::Sender<()>,
}

/// High-level interface to ModemManager over D-Bus.
///
/// This is the main entry point of the crate. On construction it connects
/// to the system bus, lists the modems ModemManager already knows and keeps
/// that list current as modems are plugged in, removed or reset.
///
/// # Creating an Instance
///
/// ```no_run
/// use mmrs::ModemManager;
///
/// # async fn example() -> mmrs::Result<()> {
/// let mm = ModemManager::new().await?;
/// println!("ModemManager {}", mm.version().await?);
/// # Ok(())
/// # }
/// ```
///
/// # Examples
///
/// ## Waiting for a modem
///
/// ```no_run
/// use mmrs::{ModemFilter, ModemManager};
///
/// # async fn example() -> mmrs::Result<()> {
/// let mm = ModemManager::new().await?;
/// let modem = match mm.any_modem() {
///     Some(modem) => modem,
///     None => mm.await_modem(ModemFilter::Any).await?,
/// };
/// println!("Using modem {}", modem.imei().await?);
/// # Ok(())
/// # }
/// ```
///
/// ## Resetting a modem
///
/// ```no_run
/// use mmrs::ModemManager;
///
/// # async fn example() -> mmrs::Result<()> {
/// let mm = ModemManager::new().await?;
/// if let Some(modem) = mm.any_modem() {
///     let modem = mm.reset_modem(&modem).await?;
///     println!("Modem is back at {}", modem.path());
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// `ModemManager` is `Clone` and can be shared across async tasks. Clones
/// share the bus connection and the modem list. When the last clone is
/// dropped, modem handles obtained from it fail with
/// [`ModemError::ManagerDropped`] and their observers stop.
#[derive(Debug, Clone)]
pub struct ModemManager {
    inner: Arc<Inner>,
}

impl ModemManager {
    /// Creates a new `ModemManager` connected to the system D-Bus.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn new() -> Result<Self> {
        Self::with_config(ModemManagerConfig::default()).await
    }

    /// Creates a new `ModemManager` with custom configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use mmrs::{ModemManager, ModemManagerConfig};
    ///
    /// # async fn example() -> mmrs::Result<()> {
    /// let config = ModemManagerConfig::new()
    ///     .with_signal_refresh_rate(Duration::from_secs(2))
    ///     .with_reset_timeout(Duration::from_secs(60));
    /// let mm = ModemManager::with_config(config).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` if the system bus is unreachable or ModemManager
    /// is not running.
    pub async fn with_config(config: ModemManagerConfig) -> Result<Self> {
        let conn = Connection::system()
            .await
            .map(Arc::new)
            .map_err(|e| ModemError::ConnectionFailed(e.to_string()))?;
        let config = Arc::new(config);
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let link = BusLink::new(&conn, shutdown_rx, Arc::clone(&config));

        let registry = Arc::new(ObjectRegistry::new());
        let tracker = ObserverSlot::default();
        object_tracker::start(link, Arc::clone(&registry), &tracker)
            .await
            .map_err(unreachable_service)?;
        debug!("ModemManager ready with {} modem(s)", registry.list().len());

        Ok(Self {
            inner: Arc::new(Inner {
                conn,
                registry,
                config,
                _tracker: tracker,
                _shutdown: shutdown_tx,
            }),
        })
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &ModemManagerConfig {
        &self.inner.config
    }

    /// ModemManager daemon version.
    pub async fn version(&self) -> Result<String> {
        let proxy = MMProxy::builder(&self.inner.conn)
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        Ok(proxy.version().await?)
    }

    /// Asks ModemManager to look for modems it has not picked up yet.
    pub async fn scan_devices(&self) -> Result<()> {
        Ok(MMProxy::new(&self.inner.conn).await?.scan_devices().await?)
    }

    /// Returns `true` if at least one modem is present.
    pub fn modems_available(&self) -> bool {
        self.inner.registry.first().is_some()
    }

    /// All modems present, in the order they appeared.
    pub fn available_modems(&self) -> Vec<Modem> {
        self.inner.registry.list()
    }

    /// The first modem present, if any.
    pub fn any_modem(&self) -> Option<Modem> {
        self.inner.registry.first()
    }

    /// Waits for the next modem matching `filter` to appear.
    ///
    /// Only modems appearing after this call count; check
    /// [`ModemManager::available_modems`] first for modems already present.
    /// One request can be pending at a time: a new call makes the future
    /// returned by the previous one fail with [`ModemError::Cancelled`].
    pub fn await_modem(&self, filter: ModemFilter) -> PendingObject<Modem> {
        debug!("Waiting for modem: {filter}");
        self.inner.registry.await_object(filter)
    }

    /// Resets `modem` and waits for it to come back.
    ///
    /// A reset modem disappears and reappears under a new object path. The
    /// returned handle is bound to the new path; `modem` is stale afterwards.
    ///
    /// # Errors
    ///
    /// - `UnidentifiedModem` if the modem has no IMEI; it is not reset
    /// - `Cancelled` if another await request replaced this one
    /// - `Timeout` if [`ModemManagerConfig::reset_timeout`] elapsed first
    pub async fn reset_modem(&self, modem: &Modem) -> Result<Modem> {
        let identity = match self.inner.registry.identity_of(modem.path()) {
            Some(identity) => identity,
            None => modem.imei().await?,
        };
        let filter = reset_filter(modem.path(), identity)?;

        let pending = self.await_modem(filter);
        modem.reset().await?;
        pending.within(self.inner.config.reset_timeout).await
    }
}

/// Failing to reach ModemManager while starting up means the service is
/// unavailable, whatever the underlying D-Bus error.
fn unreachable_service(e: ModemError) -> ModemError {
    match e {
        ModemError::ConnectionFailed(_) => e,
        other => ModemError::ConnectionFailed(format!(
            "{other}; is ModemManager running?"
        )),
    }
}

/// The request matching the modem at `path` once it comes back from a reset.
fn reset_filter(path: &str, identity: String) -> Result<ModemFilter> {
    if identity.is_empty() {
        return Err(ModemError::UnidentifiedModem(path.to_string()));
    }
    Ok(ModemFilter::Imei(identity))
}
