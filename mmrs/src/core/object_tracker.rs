//! Keeps the modem registry in sync with ModemManager's object tree.
//!
//! ModemManager exports its modems through `org.freedesktop.DBus.ObjectManager`.
//! The tracker subscribes to `InterfacesAdded`/`InterfacesRemoved` first and
//! only then enumerates the existing objects with `GetManagedObjects`, so a
//! modem appearing in between is seen at least once. Enumerated objects and
//! live additions go through the same announcement path; the registry
//! ignores repeated announcements of a known path.

use futures::StreamExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use zbus::fdo::ObjectManagerProxy;
use zbus::proxy::CacheProperties;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::modem::Modem;
use crate::core::registry::ObjectRegistry;
use crate::dbus::MMModem3gppProxy;
use crate::monitoring::observer::{ObserverSlot, spawn_observer};
use crate::try_log;
use crate::types::constants::{bus, interface};
use crate::types::property_bag::PropertyBag;
use crate::util::utils::{BusLink, bag_from_dict};

/// Interface name to properties, as announced for one object.
type InterfaceProperties = HashMap<String, PropertyBag>;

enum ObjectEvent {
    Added(OwnedObjectPath, InterfaceProperties),
    Removed(OwnedObjectPath, Vec<String>),
}

/// Returns `true` if the object at `path` exposing `interfaces` is a modem.
fn is_modem(path: &str, interfaces: &InterfaceProperties) -> bool {
    path.starts_with(bus::MM_MODEM_PATH_PREFIX) && interfaces.contains_key(interface::MODEM)
}

/// Identity of a modem from its announced properties: the 3GPP IMEI, or
/// the generic equipment identifier for modems without a 3GPP interface.
fn announced_identity(interfaces: &InterfaceProperties) -> Option<String> {
    let read = |iface: &str, key: &str| {
        interfaces
            .get(iface)
            .and_then(|props| props.get::<String>(key).ok())
            .filter(|id| !id.is_empty())
    };
    read(interface::MODEM_3GPP, "Imei").or_else(|| read(interface::MODEM, "EquipmentIdentifier"))
}

/// Removal of `interfaces` takes the modem away only if the modem
/// interface itself is among them.
fn removes_modem(path: &str, interfaces: &[String]) -> bool {
    path.starts_with(bus::MM_MODEM_PATH_PREFIX) && interfaces.iter().any(|i| i == interface::MODEM)
}

async fn queried_identity(link: &BusLink, path: &OwnedObjectPath) -> Option<String> {
    let conn = try_log!(link.connection(), "Bus gone while identifying modem");
    let builder = try_log!(
        MMModem3gppProxy::builder(&conn).path(path.clone()),
        "Invalid modem path"
    );
    let proxy = try_log!(
        builder.cache_properties(CacheProperties::No).build().await,
        "Failed to create Modem3gpp proxy"
    );
    let imei = try_log!(proxy.imei().await, "Failed to read modem IMEI");
    Some(imei).filter(|id| !id.is_empty())
}

async fn announce(
    link: &BusLink,
    registry: &ObjectRegistry<Modem>,
    path: OwnedObjectPath,
    interfaces: &InterfaceProperties,
) {
    if !is_modem(path.as_str(), interfaces) {
        return;
    }

    let identity = match announced_identity(interfaces) {
        Some(id) => id,
        None => match queried_identity(link, &path).await {
            Some(id) => id,
            None => {
                warn!("Modem {path} has no identity yet; only 'any' requests can match it");
                String::new()
            }
        },
    };

    registry.on_object_added(Modem::new(link.clone(), path), identity);
}

/// Subscribes to object changes, enumerates the modems present now and
/// spawns the task that applies later changes to `registry`.
///
/// The task runs in `slot` and stops when the manager shuts down.
pub(crate) async fn start(
    link: BusLink,
    registry: Arc<ObjectRegistry<Modem>>,
    slot: &ObserverSlot,
) -> Result<()> {
    let conn = link.connection()?;
    let manager = ObjectManagerProxy::builder(&conn)
        .destination(bus::MM_SERVICE)?
        .path(bus::MM_PATH)?
        .build()
        .await?;

    let added = manager.receive_interfaces_added().await?.filter_map(|signal| async move {
        match signal.args() {
            Ok(args) => {
                let interfaces = args
                    .interfaces_and_properties()
                    .iter()
                    .map(|(name, props)| {
                        let bag = PropertyBag::from_dbus(props.iter().map(|(k, v)| (*k, v)));
                        (name.to_string(), bag)
                    })
                    .collect();
                Some(ObjectEvent::Added(args.object_path().clone().into(), interfaces))
            }
            Err(e) => {
                warn!("Undecodable InterfacesAdded signal: {e}");
                None
            }
        }
    });
    let removed = manager.receive_interfaces_removed().await?.filter_map(|signal| async move {
        match signal.args() {
            Ok(args) => {
                let interfaces = args.interfaces().iter().map(|i| i.to_string()).collect();
                Some(ObjectEvent::Removed(args.object_path().clone().into(), interfaces))
            }
            Err(e) => {
                warn!("Undecodable InterfacesRemoved signal: {e}");
                None
            }
        }
    });
    debug!("Subscribed to ModemManager object changes");

    let objects = manager.get_managed_objects().await?;
    debug!("ModemManager reports {} objects", objects.len());
    for (path, interfaces) in objects {
        let interfaces = interfaces
            .iter()
            .map(|(name, props)| (name.as_str().to_string(), bag_from_dict(props)))
            .collect();
        announce(&link, &registry, path, &interfaces).await;
    }

    let shutdown = link.shutdown();
    spawn_observer(slot, shutdown, "object tracker", async move {
        let mut events = Box::pin(futures::stream::select(added, removed));
        while let Some(event) = events.next().await {
            match event {
                ObjectEvent::Added(path, interfaces) => {
                    announce(&link, &registry, path, &interfaces).await;
                }
                ObjectEvent::Removed(path, interfaces) => {
                    if removes_modem(path.as_str(), &interfaces) {
                        registry.on_object_removed(path.as_str());
                    }
                }
            }
        }
    });
    Ok(())
}
