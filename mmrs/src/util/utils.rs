//! Helpers shared by the handle and monitoring code.
//!
//! Converts D-Bus dictionaries into [`PropertyBag`]s, subscribes to
//! property change notifications and keeps the weak bus reference that
//! every remote handle carries.

use futures::StreamExt;
use futures::stream::BoxStream;
use log::warn;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use zbus::Connection;
use zbus::fdo::PropertiesProxy;
use zvariant::{OwnedObjectPath, OwnedValue};

use crate::Result;
use crate::api::models::{ModemError, ModemManagerConfig};
use crate::types::property_bag::PropertyBag;

/// What a remote handle needs from its manager.
///
/// Holds the bus connection weakly: once the manager is dropped every
/// operation fails with [`ModemError::ManagerDropped`], and the shutdown
/// channel closes so observer tasks stop.
#[derive(Debug, Clone)]
pub(crate) struct BusLink {
    conn: Weak<Connection>,
    shutdown: watch::Receiver<()>,
    config: Arc<ModemManagerConfig>,
}

impl BusLink {
    pub(crate) fn new(
        conn: &Arc<Connection>,
        shutdown: watch::Receiver<()>,
        config: Arc<ModemManagerConfig>,
    ) -> Self {
        Self {
            conn: Arc::downgrade(conn),
            shutdown,
            config,
        }
    }

    /// Upgrades to a live connection.
    pub(crate) fn connection(&self) -> Result<Connection> {
        self.conn
            .upgrade()
            .map(|conn| Connection::clone(&conn))
            .ok_or(ModemError::ManagerDropped)
    }

    /// A fresh receiver of the manager's shutdown channel.
    pub(crate) fn shutdown(&self) -> watch::Receiver<()> {
        self.shutdown.clone()
    }

    pub(crate) fn config(&self) -> &ModemManagerConfig {
        &self.config
    }
}

/// Converts an `a{sv}` dictionary into a property bag.
pub(crate) fn bag_from_dict(dict: &HashMap<String, OwnedValue>) -> PropertyBag {
    PropertyBag::from_dbus(dict.iter().map(|(k, v)| (k, &**v)))
}

/// Names of the properties a `PropertiesChanged` signal reports as changed
/// or invalidated, or `None` if it concerns another interface than `watched`.
fn changed_names<'a>(
    interface: &str,
    watched: &str,
    changed: impl IntoIterator<Item = &'a str>,
    invalidated: impl IntoIterator<Item = &'a str>,
) -> Option<Vec<String>> {
    if interface != watched {
        return None;
    }
    let mut names: Vec<String> = changed.into_iter().map(str::to_owned).collect();
    for name in invalidated {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_owned());
        }
    }
    Some(names)
}

/// One item per `PropertiesChanged` signal that `service` emits for
/// `interface` on `path`, listing the properties it names.
///
/// Unlike property streams, nothing is yielded until something changes.
pub(crate) async fn property_changes(
    conn: &Connection,
    service: &'static str,
    path: OwnedObjectPath,
    interface: &'static str,
) -> Result<BoxStream<'static, Vec<String>>> {
    let props = PropertiesProxy::builder(conn)
        .destination(service)?
        .path(path)?
        .build()
        .await?;
    let signals = props.receive_properties_changed().await?;

    Ok(signals
        .filter_map(move |signal| async move {
            match signal.args() {
                Ok(args) => changed_names(
                    args.interface_name().as_str(),
                    interface,
                    args.changed_properties().keys().copied(),
                    args.invalidated_properties().iter().copied(),
                ),
                Err(e) => {
                    warn!("Undecodable PropertiesChanged signal: {e}");
                    None
                }
            }
        })
        .boxed())
}

/// Macro to convert Result to Option with error logging.
/// Usage: `try_log!(result, "context message")`
#[macro_export]
#[doc(hidden)]
macro_rules! try_log {
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {:?}", $context, e);
                return None;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNAL: &str = "org.freedesktop.ModemManager1.Modem.Signal";

    #[test]
    fn detached_link_reports_manager_dropped() {
        let (_tx, shutdown) = watch::channel(());
        let conn: Weak<Connection> = Weak::new();
        let link = BusLink {
            conn,
            shutdown,
            config: Arc::default(),
        };

        assert!(matches!(link.connection(), Err(ModemError::ManagerDropped)));
    }

    #[test]
    fn changes_of_other_interfaces_are_ignored() {
        let names = changed_names(
            "org.freedesktop.ModemManager1.Modem",
            SIGNAL,
            ["State"],
            [],
        );
        assert_eq!(names, None);
    }

    #[test]
    fn changed_and_invalidated_names_are_merged() {
        let names = changed_names(SIGNAL, SIGNAL, ["Lte", "Rate"], ["Nr5g", "Lte"]);
        assert_eq!(
            names,
            Some(vec!["Lte".to_string(), "Rate".to_string(), "Nr5g".to_string()])
        );
    }
}
