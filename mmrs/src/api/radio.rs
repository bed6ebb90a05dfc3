//! Technology specific radio records: signal quality, cell location and
//! cell information.
//!
//! Every record is a closed set of variants, one per supported radio
//! generation. The variant is chosen when the record is decoded and never
//! changes. Field accessors return [`ModemError::KeyNotFound`] when the
//! modem did not report that field.
//!
//! Only LTE (4G) and NR (5G) records are decoded. Any other
//! [`Technology`], including combinations of generations, is rejected with
//! [`ModemError::UnsupportedTechnology`].

use log::{debug, warn};
use std::fmt::{Display, Formatter};

use crate::Result;
use crate::api::models::{ModemError, Technology};
use crate::core::decode::{self, copy_hex, copy_hex_u16, split_plmn};
use crate::types::constants::cell_type;
use crate::types::property_bag::PropertyBag;

fn supported(tech: Technology) -> Result<Technology> {
    if tech == Technology::LTE || tech == Technology::NR5G {
        Ok(tech)
    } else {
        Err(ModemError::UnsupportedTechnology(tech))
    }
}

/// LTE signal quality.
#[derive(Debug, Clone, PartialEq)]
pub struct LteSignal {
    values: PropertyBag,
}

impl LteSignal {
    fn decode(raw: &PropertyBag) -> Result<Self> {
        let mut values = PropertyBag::new();
        values.maybe_insert_from::<f64>(raw, "rsrp")?;
        values.maybe_insert_from::<f64>(raw, "rsrq")?;
        values.maybe_insert_from::<f64>(raw, "rssi")?;
        values.maybe_insert_from_as::<f64>(raw, "snr", "sinr")?;
        Ok(Self { values })
    }

    /// Reference Signal Received Power in dBm.
    pub fn rsrp(&self) -> Result<f64> {
        self.values.get("rsrp")
    }

    /// Reference Signal Received Quality in dB.
    pub fn rsrq(&self) -> Result<f64> {
        self.values.get("rsrq")
    }

    /// Received Signal Strength Indication in dBm.
    pub fn rssi(&self) -> Result<f64> {
        self.values.get("rssi")
    }

    /// Signal to interference plus noise ratio in dB.
    pub fn sinr(&self) -> Result<f64> {
        self.values.get("sinr")
    }

    /// The reported values.
    pub fn properties(&self) -> &PropertyBag {
        &self.values
    }
}

/// 5G NR signal quality.
#[derive(Debug, Clone, PartialEq)]
pub struct Nr5gSignal {
    values: PropertyBag,
}

impl Nr5gSignal {
    fn decode(raw: &PropertyBag) -> Result<Self> {
        let mut values = PropertyBag::new();
        values.maybe_insert_from::<f64>(raw, "rsrp")?;
        values.maybe_insert_from::<f64>(raw, "rsrq")?;
        values.maybe_insert_from_as::<f64>(raw, "snr", "sinr")?;
        Ok(Self { values })
    }

    /// Reference Signal Received Power in dBm.
    pub fn rsrp(&self) -> Result<f64> {
        self.values.get("rsrp")
    }

    /// Reference Signal Received Quality in dB.
    pub fn rsrq(&self) -> Result<f64> {
        self.values.get("rsrq")
    }

    /// Signal to interference plus noise ratio in dB.
    pub fn sinr(&self) -> Result<f64> {
        self.values.get("sinr")
    }

    /// The reported values.
    pub fn properties(&self) -> &PropertyBag {
        &self.values
    }
}

/// Signal quality of the serving cell.
///
/// # Example
///
/// ```
/// use mmrs::{PropertyBag, Signal, Technology};
///
/// let mut raw = PropertyBag::new();
/// raw.insert("rsrp", -97.0);
/// raw.insert("snr", 11.5);
///
/// let signal = Signal::decode(&raw, Technology::LTE).unwrap();
/// match &signal {
///     Signal::Lte(lte) => {
///         assert_eq!(lte.rsrp().unwrap(), -97.0);
///         assert_eq!(lte.sinr().unwrap(), 11.5);
///         assert!(lte.rssi().is_err());
///     }
///     Signal::Nr5g(_) => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Lte(LteSignal),
    Nr5g(Nr5gSignal),
}

impl Signal {
    /// Decodes a raw `Modem.Signal` dictionary for the given technology.
    ///
    /// # Errors
    ///
    /// `UnsupportedTechnology` unless `tech` is exactly LTE or NR5G, and
    /// `TypeMismatch` if a reported value is not a number.
    pub fn decode(raw: &PropertyBag, tech: Technology) -> Result<Self> {
        if supported(tech)? == Technology::LTE {
            Ok(Self::Lte(LteSignal::decode(raw)?))
        } else {
            Ok(Self::Nr5g(Nr5gSignal::decode(raw)?))
        }
    }

    /// The radio generation of this record.
    pub fn technology(&self) -> Technology {
        match self {
            Self::Lte(_) => Technology::LTE,
            Self::Nr5g(_) => Technology::NR5G,
        }
    }

    /// Reference Signal Received Power in dBm.
    pub fn rsrp(&self) -> Result<f64> {
        match self {
            Self::Lte(s) => s.rsrp(),
            Self::Nr5g(s) => s.rsrp(),
        }
    }

    /// Reference Signal Received Quality in dB.
    pub fn rsrq(&self) -> Result<f64> {
        match self {
            Self::Lte(s) => s.rsrq(),
            Self::Nr5g(s) => s.rsrq(),
        }
    }

    /// Signal to interference plus noise ratio in dB.
    pub fn sinr(&self) -> Result<f64> {
        match self {
            Self::Lte(s) => s.sinr(),
            Self::Nr5g(s) => s.sinr(),
        }
    }

    /// The reported values.
    pub fn properties(&self) -> &PropertyBag {
        match self {
            Self::Lte(s) => s.properties(),
            Self::Nr5g(s) => s.properties(),
        }
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} signal {}", self.technology(), self.properties())
    }
}

/// Identifiers locating a 4G or 5G cell.
///
/// LTE and NR share the same identifiers, so both [`Location`] variants
/// wrap this type.
#[derive(Debug, Clone, PartialEq)]
pub struct CellLocation {
    values: PropertyBag,
}

impl CellLocation {
    fn decode(raw: &PropertyBag) -> Result<Self> {
        let mut values = PropertyBag::new();
        if let Some(plmn) = raw.get_optional::<String>("operator-id")? {
            let (mcc, mnc) = split_plmn(&plmn);
            values.insert("mcc", mcc);
            values.insert("mnc", mnc);
        }
        copy_hex(raw, "ci", &mut values, "ci")?;
        copy_hex(raw, "tac", &mut values, "tac")?;
        Ok(Self { values })
    }

    /// Mobile Country Code, e.g. `"262"`.
    pub fn mcc(&self) -> Result<String> {
        self.values.get("mcc")
    }

    /// Mobile Network Code, e.g. `"01"`.
    pub fn mnc(&self) -> Result<String> {
        self.values.get("mnc")
    }

    /// Cell identity.
    pub fn ci(&self) -> Result<u32> {
        self.values.get("ci")
    }

    /// Tracking area code.
    pub fn tac(&self) -> Result<u32> {
        self.values.get("tac")
    }

    /// The reported values.
    pub fn properties(&self) -> &PropertyBag {
        &self.values
    }
}

/// Location of the serving cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Lte(CellLocation),
    Nr5g(CellLocation),
}

impl Location {
    fn tagged(tech: Technology, cell: CellLocation) -> Result<Self> {
        if supported(tech)? == Technology::LTE {
            Ok(Self::Lte(cell))
        } else {
            Ok(Self::Nr5g(cell))
        }
    }

    /// Decodes the location fields of a raw cell-info record.
    ///
    /// `operator-id` is split into MCC and MNC; `ci` and `tac` are hex.
    ///
    /// # Errors
    ///
    /// `UnsupportedTechnology` unless `tech` is exactly LTE or NR5G, and
    /// `InvalidHex` if `ci` or `tac` is not a hex number.
    pub fn decode(raw: &PropertyBag, tech: Technology) -> Result<Self> {
        supported(tech)?;
        Self::tagged(tech, CellLocation::decode(raw)?)
    }

    /// Parses the 3GPP LAC/CI location string `"MCC,MNC,LAC,CI,TAC"`.
    ///
    /// A malformed string yields `Ok(None)` so that one bad update does
    /// not end a location observer.
    ///
    /// # Errors
    ///
    /// `UnsupportedTechnology` unless `tech` is exactly LTE or NR5G.
    ///
    /// # Example
    ///
    /// ```
    /// use mmrs::{Location, Technology};
    ///
    /// let loc = Location::from_3gpp("262,02,FFFE,1A2B,3C4D", Technology::LTE)
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(loc.cell().ci().unwrap(), 6699);
    /// assert_eq!(loc.cell().tac().unwrap(), 15437);
    ///
    /// assert!(Location::from_3gpp("262,02", Technology::LTE).unwrap().is_none());
    /// ```
    pub fn from_3gpp(data: &str, tech: Technology) -> Result<Option<Self>> {
        supported(tech)?;
        let Some(parsed) = decode::parse_3gpp_location(data) else {
            warn!("Ignoring malformed 3GPP location '{data}'");
            return Ok(None);
        };

        let mut values = PropertyBag::new();
        values.insert("mcc", parsed.mcc);
        values.insert("mnc", parsed.mnc);
        values.insert("ci", parsed.ci);
        values.insert("tac", parsed.tac);
        Self::tagged(tech, CellLocation { values }).map(Some)
    }

    /// The radio generation of this record.
    pub fn technology(&self) -> Technology {
        match self {
            Self::Lte(_) => Technology::LTE,
            Self::Nr5g(_) => Technology::NR5G,
        }
    }

    /// The cell identifiers.
    pub fn cell(&self) -> &CellLocation {
        match self {
            Self::Lte(c) | Self::Nr5g(c) => c,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} location {}", self.technology(), self.cell().properties())
    }
}

/// Information about one LTE cell reported by `GetCellInfo()`.
#[derive(Debug, Clone, PartialEq)]
pub struct LteCellInfo {
    values: PropertyBag,
    signal: LteSignal,
    location: CellLocation,
}

impl LteCellInfo {
    fn decode(raw: &PropertyBag) -> Result<Self> {
        let mut values = common_cell_fields(raw)?;
        values.maybe_insert_from::<u32>(raw, "earfcn")?;
        copy_hex_u16(raw, "physical-ci", &mut values, "pci")?;
        Ok(Self {
            values,
            signal: LteSignal::decode(raw)?,
            location: CellLocation::decode(raw)?,
        })
    }

    /// Whether this is the serving cell. Defaults to `false` when unreported.
    pub fn serving(&self) -> bool {
        self.values.get_or_default("serving", false)
    }

    /// Cell identity; usually not reported for neighbour cells.
    pub fn ci(&self) -> Result<u32> {
        self.values.get("ci")
    }

    /// E-UTRA absolute radio frequency channel number.
    pub fn earfcn(&self) -> Result<u32> {
        self.values.get("earfcn")
    }

    /// Physical cell id (0..503).
    pub fn pci(&self) -> Result<u16> {
        self.values.get("pci")
    }

    /// Signal quality of this cell.
    pub fn signal(&self) -> &LteSignal {
        &self.signal
    }

    /// Location identifiers of this cell.
    pub fn location(&self) -> &CellLocation {
        &self.location
    }
}

/// Information about one 5G NR cell reported by `GetCellInfo()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Nr5gCellInfo {
    values: PropertyBag,
    signal: Nr5gSignal,
    location: CellLocation,
}

impl Nr5gCellInfo {
    fn decode(raw: &PropertyBag) -> Result<Self> {
        let mut values = common_cell_fields(raw)?;
        values.maybe_insert_from::<u32>(raw, "nrarfcn")?;
        copy_hex_u16(raw, "physical-ci", &mut values, "pci")?;
        Ok(Self {
            values,
            signal: Nr5gSignal::decode(raw)?,
            location: CellLocation::decode(raw)?,
        })
    }

    /// Whether this is the serving cell. Defaults to `false` when unreported.
    pub fn serving(&self) -> bool {
        self.values.get_or_default("serving", false)
    }

    /// Cell identity; usually not reported for neighbour cells.
    pub fn ci(&self) -> Result<u32> {
        self.values.get("ci")
    }

    /// NR absolute radio frequency channel number.
    pub fn nrarfcn(&self) -> Result<u32> {
        self.values.get("nrarfcn")
    }

    /// Physical cell id (0..1007).
    pub fn pci(&self) -> Result<u16> {
        self.values.get("pci")
    }

    /// Signal quality of this cell.
    pub fn signal(&self) -> &Nr5gSignal {
        &self.signal
    }

    /// Location identifiers of this cell.
    pub fn location(&self) -> &CellLocation {
        &self.location
    }
}

fn common_cell_fields(raw: &PropertyBag) -> Result<PropertyBag> {
    let mut values = PropertyBag::new();
    values.maybe_insert_from::<bool>(raw, "serving")?;
    copy_hex(raw, "ci", &mut values, "ci")?;
    Ok(values)
}

/// One serving or neighbouring cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellInfo {
    Lte(LteCellInfo),
    Nr5g(Nr5gCellInfo),
}

impl CellInfo {
    /// Decodes one raw `GetCellInfo()` record, classified by its
    /// `cell-type` key.
    ///
    /// Returns `Ok(None)` for cell types other than LTE and NR.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if `cell-type` is missing, `InvalidHex` for malformed
    /// hex identifiers and `TypeMismatch` for values of the wrong type.
    pub fn decode(raw: &PropertyBag) -> Result<Option<Self>> {
        match raw.get::<u32>("cell-type")? {
            cell_type::LTE => Ok(Some(Self::Lte(LteCellInfo::decode(raw)?))),
            cell_type::NR5G => Ok(Some(Self::Nr5g(Nr5gCellInfo::decode(raw)?))),
            other => {
                debug!("Dropping cell-info record of cell type {other}");
                Ok(None)
            }
        }
    }

    /// Decodes a sequence of raw records, keeping only LTE and NR cells in
    /// their original order.
    ///
    /// # Errors
    ///
    /// Fails on the first record that [`CellInfo::decode`] rejects.
    pub fn decode_all<'a, I>(records: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = &'a PropertyBag>,
    {
        records
            .into_iter()
            .filter_map(|raw| Self::decode(raw).transpose())
            .collect()
    }

    /// The radio generation of this record.
    pub fn technology(&self) -> Technology {
        match self {
            Self::Lte(_) => Technology::LTE,
            Self::Nr5g(_) => Technology::NR5G,
        }
    }

    /// Whether this is the serving cell.
    pub fn serving(&self) -> bool {
        match self {
            Self::Lte(c) => c.serving(),
            Self::Nr5g(c) => c.serving(),
        }
    }

    /// Cell identity.
    pub fn ci(&self) -> Result<u32> {
        match self {
            Self::Lte(c) => c.ci(),
            Self::Nr5g(c) => c.ci(),
        }
    }

    /// Physical cell id.
    pub fn pci(&self) -> Result<u16> {
        match self {
            Self::Lte(c) => c.pci(),
            Self::Nr5g(c) => c.pci(),
        }
    }

    /// Location identifiers of this cell.
    pub fn location(&self) -> &CellLocation {
        match self {
            Self::Lte(c) => c.location(),
            Self::Nr5g(c) => c.location(),
        }
    }
}

impl Display for CellInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lte(c) => write!(
                f,
                "LTE cell {} signal {} location {}",
                c.values,
                c.signal.properties(),
                c.location.properties()
            ),
            Self::Nr5g(c) => write!(
                f,
                "NR5G cell {} signal {} location {}",
                c.values,
                c.signal.properties(),
                c.location.properties()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lte_record() -> PropertyBag {
        let mut raw = PropertyBag::new();
        raw.insert("cell-type", cell_type::LTE);
        raw.insert("serving", true);
        raw.insert("operator-id", "26201");
        raw.insert("ci", "1A2B");
        raw.insert("tac", "3C4D");
        raw.insert("physical-ci", "1F");
        raw.insert("earfcn", 1300u32);
        raw.insert("rsrp", -95.0);
        raw.insert("rsrq", -9.5);
        raw.insert("snr", 14.0);
        raw
    }

    #[test]
    fn lte_signal_renames_snr() {
        let signal = Signal::decode(&lte_record(), Technology::LTE).unwrap();
        assert_eq!(signal.technology(), Technology::LTE);
        assert_eq!(signal.sinr().unwrap(), 14.0);
        assert!(!signal.properties().has_key("snr"));
        assert!(matches!(
            signal.properties().get::<f64>("rssi"),
            Err(ModemError::KeyNotFound(_))
        ));
    }

    #[test]
    fn nr_signal_ignores_rssi() {
        let mut raw = PropertyBag::new();
        raw.insert("rssi", -60.0);
        raw.insert("rsrp", -80.0);
        let signal = Signal::decode(&raw, Technology::NR5G).unwrap();
        assert!(matches!(signal, Signal::Nr5g(_)));
        assert!(!signal.properties().has_key("rssi"));
        assert_eq!(signal.rsrp().unwrap(), -80.0);
    }

    #[test]
    fn unsupported_technologies_are_rejected() {
        let raw = PropertyBag::new();
        for tech in [
            Technology::UNKNOWN,
            Technology::GSM,
            Technology::UMTS,
            Technology::LTE | Technology::NR5G,
        ] {
            assert!(matches!(
                Signal::decode(&raw, tech),
                Err(ModemError::UnsupportedTechnology(t)) if t == tech
            ));
            assert!(Location::decode(&raw, tech).is_err());
            assert!(Location::from_3gpp("262,02,FFFE,1A2B,3C4D", tech).is_err());
        }
    }

    #[test]
    fn location_from_record() {
        let loc = Location::decode(&lte_record(), Technology::NR5G).unwrap();
        assert_eq!(loc.technology(), Technology::NR5G);
        let cell = loc.cell();
        assert_eq!(cell.mcc().unwrap(), "262");
        assert_eq!(cell.mnc().unwrap(), "01");
        assert_eq!(cell.ci().unwrap(), 6699);
        assert_eq!(cell.tac().unwrap(), 15437);
    }

    #[test]
    fn location_bad_hex_is_an_error() {
        let mut raw = PropertyBag::new();
        raw.insert("ci", "nothex");
        assert!(matches!(
            Location::decode(&raw, Technology::LTE),
            Err(ModemError::InvalidHex { .. })
        ));
    }

    #[test]
    fn lte_location_string_keeps_lte_tag() {
        let loc = Location::from_3gpp("262,02,FFFE,1A2B,3C4D", Technology::LTE)
            .unwrap()
            .unwrap();
        assert!(matches!(loc, Location::Lte(_)));
        let loc = Location::from_3gpp("262,02,FFFE,1A2B,3C4D", Technology::NR5G)
            .unwrap()
            .unwrap();
        assert!(matches!(loc, Location::Nr5g(_)));
    }

    #[test]
    fn lte_cell_info_fields() {
        let Some(CellInfo::Lte(cell)) = CellInfo::decode(&lte_record()).unwrap() else {
            panic!("expected an LTE cell");
        };
        assert!(cell.serving());
        assert_eq!(cell.ci().unwrap(), 6699);
        assert_eq!(cell.pci().unwrap(), 31);
        assert_eq!(cell.earfcn().unwrap(), 1300);
        assert_eq!(cell.signal().rsrq().unwrap(), -9.5);
        assert_eq!(cell.location().tac().unwrap(), 15437);
    }

    #[test]
    fn sparse_cell_info_decodes() {
        let mut raw = PropertyBag::new();
        raw.insert("cell-type", cell_type::NR5G);
        let cell = CellInfo::decode(&raw).unwrap().unwrap();
        assert!(!cell.serving());
        assert!(matches!(cell.ci(), Err(ModemError::KeyNotFound(_))));
        assert!(matches!(cell.pci(), Err(ModemError::KeyNotFound(_))));
        assert!(cell.location().properties().is_empty());
    }

    #[test]
    fn missing_cell_type_is_key_not_found() {
        let raw = PropertyBag::new();
        assert!(matches!(
            CellInfo::decode(&raw),
            Err(ModemError::KeyNotFound(key)) if key == "cell-type"
        ));
    }
}
