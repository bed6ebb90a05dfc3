use log::debug;
use zbus::proxy::CacheProperties;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::models::ModemError;
use crate::dbus::MMSimProxy;
use crate::types::constants::error_name;
use crate::util::utils::BusLink;

/// Which credential an unlock attempt used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Credential {
    Pin,
    Puk,
}

/// Translates a failed `SendPin`/`SendPuk` call into a domain error.
///
/// `IncorrectPassword` becomes `IncorrectPin` or `IncorrectPuk` and
/// `IncorrectParameters` becomes `InvalidCredentialFormat`. Everything else
/// is reported as `SimUnlockFailed`.
pub(crate) fn classify_unlock_error(
    name: Option<&str>,
    detail: &str,
    credential: Credential,
) -> ModemError {
    match name {
        Some(error_name::INCORRECT_PASSWORD) => match credential {
            Credential::Pin => ModemError::IncorrectPin,
            Credential::Puk => ModemError::IncorrectPuk,
        },
        Some(error_name::INCORRECT_PARAMETERS) => ModemError::InvalidCredentialFormat,
        _ => ModemError::SimUnlockFailed(detail.to_string()),
    }
}

fn unlock_error(err: zbus::Error, credential: Credential) -> ModemError {
    let name = match &err {
        zbus::Error::MethodError(name, _, _) => Some(name.as_str().to_owned()),
        _ => None,
    };
    classify_unlock_error(name.as_deref(), &err.to_string(), credential)
}

/// The SIM card of a modem.
///
/// Obtained from [`crate::Modem::active_sim`].
#[derive(Debug, Clone)]
pub struct Sim {
    link: BusLink,
    path: OwnedObjectPath,
}

impl Sim {
    pub(crate) fn new(link: BusLink, path: OwnedObjectPath) -> Self {
        Self { link, path }
    }

    /// D-Bus object path of the SIM.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    async fn proxy(&self) -> Result<MMSimProxy<'static>> {
        let conn = self.link.connection()?;
        Ok(MMSimProxy::builder(&conn)
            .path(self.path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    /// Unlocks the SIM with its PIN.
    ///
    /// # Errors
    ///
    /// - `IncorrectPin` if the SIM rejected the PIN
    /// - `InvalidCredentialFormat` if the PIN is malformed
    /// - `SimUnlockFailed` for any other failure
    pub async fn send_pin(&self, pin: &str) -> Result<()> {
        debug!("Sending PIN to {}", self.path);
        self.proxy()
            .await?
            .send_pin(pin)
            .await
            .map_err(|e| unlock_error(e, Credential::Pin))
    }

    /// Unblocks the SIM with the PUK and sets `pin` as the new PIN.
    ///
    /// # Errors
    ///
    /// - `IncorrectPuk` if the SIM rejected the PUK
    /// - `InvalidCredentialFormat` if the PUK or PIN is malformed
    /// - `SimUnlockFailed` for any other failure
    pub async fn send_puk(&self, puk: &str, pin: &str) -> Result<()> {
        debug!("Sending PUK to {}", self.path);
        self.proxy()
            .await?
            .send_puk(puk, pin)
            .await
            .map_err(|e| unlock_error(e, Credential::Puk))
    }

    pub async fn is_active(&self) -> Result<bool> {
        Ok(self.proxy().await?.active().await?)
    }

    pub async fn imsi(&self) -> Result<String> {
        Ok(self.proxy().await?.imsi().await?)
    }

    pub async fn iccid(&self) -> Result<String> {
        Ok(self.proxy().await?.sim_identifier().await?)
    }

    /// MCC and MNC of the home network.
    pub async fn home_plmn(&self) -> Result<String> {
        Ok(self.proxy().await?.operator_identifier().await?)
    }

    /// Name of the home network operator.
    pub async fn operator_name(&self) -> Result<String> {
        Ok(self.proxy().await?.operator_name().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorrect_password_depends_on_credential() {
        assert!(matches!(
            classify_unlock_error(Some(error_name::INCORRECT_PASSWORD), "", Credential::Pin),
            ModemError::IncorrectPin
        ));
        assert!(matches!(
            classify_unlock_error(Some(error_name::INCORRECT_PASSWORD), "", Credential::Puk),
            ModemError::IncorrectPuk
        ));
    }

    #[test]
    fn incorrect_parameters_is_format_error() {
        for credential in [Credential::Pin, Credential::Puk] {
            assert!(matches!(
                classify_unlock_error(
                    Some(error_name::INCORRECT_PARAMETERS),
                    "",
                    credential
                ),
                ModemError::InvalidCredentialFormat
            ));
        }
    }

    #[test]
    fn other_errors_keep_detail() {
        let err = classify_unlock_error(
            Some("org.freedesktop.ModemManager1.Error.Core.Failed"),
            "SIM busy",
            Credential::Pin,
        );
        match err {
            ModemError::SimUnlockFailed(detail) => assert_eq!(detail, "SIM busy"),
            other => panic!("expected SimUnlockFailed, got {other:?}"),
        }
        assert!(matches!(
            classify_unlock_error(None, "timeout", Credential::Puk),
            ModemError::SimUnlockFailed(_)
        ));
    }
}
