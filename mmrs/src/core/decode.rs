//! Field level decoding shared by the signal, location and cell-info records.
//!
//! ModemManager reports some identifiers hex-encoded in strings and packs
//! the 3GPP location into a single comma separated string. The helpers here
//! turn those into plain integers and strings.

use chrono::NaiveDateTime;
use log::debug;

use crate::Result;
use crate::api::models::{IpConfig, IpType, ModemError};
use crate::types::property_bag::PropertyBag;

/// Length of the Mobile Country Code at the start of a PLMN id.
const MCC_LEN: usize = 3;

/// Splits a PLMN id into Mobile Country Code and Mobile Network Code.
///
/// The first three characters are the MCC and the remainder is the MNC.
/// The digits are not validated.
pub(crate) fn split_plmn(plmn: &str) -> (String, String) {
    let split = plmn
        .char_indices()
        .nth(MCC_LEN)
        .map_or(plmn.len(), |(idx, _)| idx);
    let (mcc, mnc) = plmn.split_at(split);
    (mcc.to_string(), mnc.to_string())
}

/// Parses a base-16 field such as `"1A2B"`.
pub(crate) fn parse_hex(field: &str, value: &str) -> Result<u32> {
    u32::from_str_radix(value.trim(), 16).map_err(|_| ModemError::InvalidHex {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Reads the hex string under `key` in `source` and stores it as an integer
/// under `as_key` in `target`. Absent keys are skipped.
pub(crate) fn copy_hex(
    source: &PropertyBag,
    key: &str,
    target: &mut PropertyBag,
    as_key: &str,
) -> Result<()> {
    if let Some(hex) = source.get_optional::<String>(key)? {
        target.insert(as_key, parse_hex(key, &hex)?);
    }
    Ok(())
}

/// Like [`copy_hex`], for fields bounded to 16 bits (physical cell ids).
pub(crate) fn copy_hex_u16(
    source: &PropertyBag,
    key: &str,
    target: &mut PropertyBag,
    as_key: &str,
) -> Result<()> {
    if let Some(hex) = source.get_optional::<String>(key)? {
        let value = parse_hex(key, &hex)?;
        let narrow = u16::try_from(value).map_err(|_| ModemError::InvalidHex {
            field: key.to_string(),
            value: hex.clone(),
        })?;
        target.insert(as_key, narrow);
    }
    Ok(())
}

/// Cell identifiers carried by the 3GPP LAC/CI location source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LacCi {
    pub mcc: String,
    pub mnc: String,
    pub ci: u32,
    pub tac: u32,
}

fn is_short_code(s: &str) -> bool {
    (1..=3).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parses the `"MCC,MNC,LAC,CI,TAC"` string of the 3GPP LAC/CI source.
///
/// LAC, CI and TAC are hex. The LAC must be well formed but is discarded.
/// Any malformed or missing component yields `None`.
pub(crate) fn parse_3gpp_location(data: &str) -> Option<LacCi> {
    let mut parts = data.trim().split(',');
    let mcc = parts.next()?;
    let mnc = parts.next()?;
    let lac = parts.next()?;
    let ci = parts.next()?;
    let tac = parts.next()?;

    if !is_short_code(mcc) || !is_short_code(mnc) {
        debug!("Malformed MCC/MNC in 3GPP location '{data}'");
        return None;
    }

    let hex = |s: &str| u32::from_str_radix(s, 16).ok();
    hex(lac)?;
    let ci = hex(ci)?;
    let tac = hex(tac)?;

    Some(LacCi {
        mcc: mcc.to_string(),
        mnc: mnc.to_string(),
        ci,
        tac,
    })
}

/// Length of `YYYY-MM-DDTHH:MM:SS`; any fraction or offset after it is ignored.
const NETWORK_TIME_LEN: usize = 19;

/// Converts a modem network time string to seconds since the epoch.
///
/// Only the date and time are used; the time zone suffix is ignored and
/// the value is taken as UTC.
pub(crate) fn network_time_epoch(time: &str) -> Result<i64> {
    let invalid = || ModemError::InvalidNetworkTime(time.to_string());
    let prefix = time.get(..NETWORK_TIME_LEN).ok_or_else(invalid)?;
    let parsed =
        NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S").map_err(|_| invalid())?;
    Ok(parsed.and_utc().timestamp())
}

/// Builds an IP configuration from a bearer `Ip4Config`/`Ip6Config` dictionary.
///
/// Returns `None` unless both `address` and `prefix` are reported.
pub(crate) fn ip_config(raw: &PropertyBag, ip_type: IpType) -> Option<IpConfig> {
    let address = raw.get::<String>("address").ok()?;
    let prefix = raw.get::<u32>("prefix").ok()?;
    Some(IpConfig {
        ip_type,
        address,
        prefix,
        gateway: raw.get("gateway").ok(),
        dns1: raw.get("dns1").ok(),
        dns2: raw.get("dns2").ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plmn_split_is_fixed_width() {
        assert_eq!(split_plmn("26201"), ("262".into(), "01".into()));
        assert_eq!(split_plmn("310260"), ("310".into(), "260".into()));
        assert_eq!(split_plmn("abcde"), ("abc".into(), "de".into()));
        assert_eq!(split_plmn("26"), ("26".into(), String::new()));
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex("ci", "1A2B").unwrap(), 6699);
        assert_eq!(parse_hex("tac", "3c4d").unwrap(), 15437);
        match parse_hex("ci", "XYZ") {
            Err(ModemError::InvalidHex { field, value }) => {
                assert_eq!(field, "ci");
                assert_eq!(value, "XYZ");
            }
            other => panic!("expected InvalidHex, got {other:?}"),
        }
    }

    #[test]
    fn copy_hex_skips_absent() {
        let mut source = PropertyBag::new();
        source.insert("physical-ci", "01F7");
        let mut target = PropertyBag::new();

        copy_hex(&source, "ci", &mut target, "ci").unwrap();
        copy_hex_u16(&source, "physical-ci", &mut target, "pci").unwrap();

        assert!(!target.has_key("ci"));
        assert_eq!(target.get::<u16>("pci").unwrap(), 503);
    }

    #[test]
    fn copy_hex_u16_rejects_wide_values() {
        let mut source = PropertyBag::new();
        source.insert("physical-ci", "1FFFF");
        let mut target = PropertyBag::new();
        assert!(copy_hex_u16(&source, "physical-ci", &mut target, "pci").is_err());
    }

    #[test]
    fn location_string_parses() {
        let loc = parse_3gpp_location("262,02,FFFE,1A2B,3C4D").unwrap();
        assert_eq!(loc.mcc, "262");
        assert_eq!(loc.mnc, "02");
        assert_eq!(loc.ci, 6699);
        assert_eq!(loc.tac, 15437);
    }

    #[test]
    fn location_string_ignores_trailing_fields() {
        let loc = parse_3gpp_location("262,02,FFFE,1A2B,3C4D,extra").unwrap();
        assert_eq!(loc.tac, 15437);
    }

    #[test]
    fn malformed_location_strings_yield_none() {
        assert_eq!(parse_3gpp_location("262,02,FFFE,1A2B"), None);
        assert_eq!(parse_3gpp_location(""), None);
        assert_eq!(parse_3gpp_location("2620,02,FFFE,1A2B,3C4D"), None);
        assert_eq!(parse_3gpp_location("26x,02,FFFE,1A2B,3C4D"), None);
        assert_eq!(parse_3gpp_location("262,02,ZZ,1A2B,3C4D"), None);
        assert_eq!(parse_3gpp_location("262,02,FFFE,1A2B,"), None);
    }

    #[test]
    fn network_time_ignores_zone() {
        assert_eq!(
            network_time_epoch("2024-03-01T12:30:45+01:00").unwrap(),
            1_709_296_245
        );
        assert_eq!(network_time_epoch("1970-01-01T00:00:00Z").unwrap(), 0);
    }

    #[test]
    fn network_time_rejects_garbage() {
        assert!(matches!(
            network_time_epoch("yesterday"),
            Err(ModemError::InvalidNetworkTime(_))
        ));
        assert!(network_time_epoch("2024-13-01T12:30:45").is_err());
    }

    #[test]
    fn ip_config_requires_address_and_prefix() {
        let mut raw = PropertyBag::new();
        raw.insert("address", "10.64.1.2");
        assert_eq!(ip_config(&raw, IpType::Ipv4), None);

        raw.insert("prefix", 30u32);
        raw.insert("dns1", "10.0.0.1");
        let config = ip_config(&raw, IpType::Ipv4).unwrap();
        assert_eq!(config.address, "10.64.1.2");
        assert_eq!(config.prefix, 30);
        assert_eq!(config.gateway, None);
        assert_eq!(config.dns1.as_deref(), Some("10.0.0.1"));
    }
}
