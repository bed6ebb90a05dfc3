//! Tests for modem state ordering, preconditions and model conversions.

use std::time::Duration;

use mmrs::{
    IpType, LockState, ModemError, ModemFilter, ModemManagerConfig, ModemState, PowerState,
    StateRequirement, Technology,
};

#[test]
fn test_state_ordering() {
    assert!(ModemState::Enabled > ModemState::Disabled);
    assert!(ModemState::Enabled < ModemState::Registered);
    assert!(ModemState::Connected > ModemState::Connecting);
    assert!(ModemState::Unknown < ModemState::Initializing);
    assert!(ModemState::Failed < ModemState::Initializing);
}

#[test]
fn test_state_codes() {
    assert_eq!(ModemState::from(-1), ModemState::Failed);
    assert_eq!(ModemState::from(0), ModemState::Unknown);
    assert_eq!(ModemState::from(3), ModemState::Disabled);
    assert_eq!(ModemState::from(8), ModemState::Registered);
    assert_eq!(ModemState::from(11), ModemState::Connected);
    assert_eq!(ModemState::from(42), ModemState::Unknown);
}

#[test]
fn test_power_change_requires_disabled() {
    let requirement = StateRequirement::Exactly(ModemState::Disabled);
    assert!(requirement.check("change power state", ModemState::Disabled).is_ok());

    match requirement.check("change power state", ModemState::Enabled) {
        Err(ModemError::PreconditionNotMet {
            operation,
            required,
            actual,
        }) => {
            assert_eq!(operation, "change power state");
            assert_eq!(required.state(), ModemState::Disabled);
            assert_eq!(actual, ModemState::Enabled);
        }
        other => panic!("expected PreconditionNotMet, got {other:?}"),
    }

    // Exactly means exactly: a "higher" state does not qualify.
    assert!(!requirement.is_met_by(ModemState::Registered));
}

#[test]
fn test_at_least_requirement() {
    let requirement = StateRequirement::AtLeast(ModemState::Registered);
    assert!(requirement.is_met_by(ModemState::Registered));
    assert!(requirement.is_met_by(ModemState::Connected));
    assert!(!requirement.is_met_by(ModemState::Searching));

    let err = requirement
        .check("access signal quality", ModemState::Enabled)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot access signal quality: modem is enabled, requires at least registered"
    );
}

#[test]
fn test_power_state_codes() {
    for state in [PowerState::Off, PowerState::Low, PowerState::On] {
        assert_eq!(PowerState::from(state.code()), state);
    }
    assert_eq!(PowerState::from(9), PowerState::Unknown);
}

#[test]
fn test_lock_state() {
    assert!(!LockState::from(1).is_locked());
    assert!(LockState::from(2).is_locked());
    assert!(!LockState::from(3).is_locked());
    assert!(LockState::from(4).is_locked());
    assert_eq!(LockState::from(17), LockState::Other(17));
}

#[test]
fn test_technology_from_access_bits() {
    const GPRS: u32 = 1 << 3;
    const HSPA_PLUS: u32 = 1 << 9;
    const LTE: u32 = 1 << 14;
    const NR5G: u32 = 1 << 15;

    assert_eq!(Technology::from_access_technologies(0), Technology::UNKNOWN);
    assert_eq!(Technology::from_access_technologies(GPRS), Technology::GSM);
    assert_eq!(Technology::from_access_technologies(HSPA_PLUS), Technology::UMTS);
    assert_eq!(Technology::from_access_technologies(LTE), Technology::LTE);

    let nsa = Technology::from_access_technologies(LTE | NR5G);
    assert_eq!(nsa, Technology::LTE | Technology::NR5G);
    assert!(!nsa.is_single());
    assert_eq!(nsa.to_string(), "LTE+NR5G");
    assert_eq!(Technology::UNKNOWN.to_string(), "UNKNOWN");
}

#[test]
fn test_ip_type_codes() {
    assert_eq!(IpType::default(), IpType::Ipv4AndIpv6);
    for ip_type in [IpType::Ipv4, IpType::Ipv6, IpType::Ipv4AndIpv6] {
        assert_eq!(IpType::from(ip_type.code()), ip_type);
    }
    assert_eq!(IpType::from(8), IpType::Unknown);
}

#[test]
fn test_modem_filter() {
    assert!(ModemFilter::Any.matches(""));
    assert!(ModemFilter::Any.matches("356938035643809"));

    let filter = ModemFilter::Imei("356938035643809".into());
    assert!(filter.matches("356938035643809"));
    assert!(!filter.matches("356938035643810"));
    assert!(!filter.matches(""));

    // An unidentified modem is never the one an IMEI request waits for.
    assert!(!ModemFilter::Imei(String::new()).matches(""));
}

#[test]
fn test_config_defaults() {
    let config = ModemManagerConfig::default();
    assert_eq!(config.signal_refresh_rate, Duration::from_secs(5));
    assert_eq!(config.reset_timeout, None);

    let config = config.with_signal_refresh_rate(Duration::from_secs(1));
    assert_eq!(config.signal_refresh_rate, Duration::from_secs(1));
}

#[test]
fn test_error_messages() {
    assert_eq!(ModemError::IncorrectPin.to_string(), "incorrect PIN");
    assert_eq!(
        ModemError::UnsupportedTechnology(Technology::GSM).to_string(),
        "technology GSM is not supported"
    );
    assert_eq!(
        ModemError::KeyNotFound("rsrp".into()).to_string(),
        "property 'rsrp' not present"
    );
}

#[test]
fn test_fdo_errors_convert() {
    let err = ModemError::from(zbus::fdo::Error::ServiceUnknown(
        "org.freedesktop.ModemManager1".into(),
    ));
    assert!(matches!(err, ModemError::Dbus(_)));
    assert!(err.to_string().contains("org.freedesktop.ModemManager1"));
}
