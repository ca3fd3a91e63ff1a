use serde::{Deserialize, Serialize};
use std::fmt;

/// Value carried by a KPI line
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum KpiValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiValue::Int(v) => write!(f, "{}", v),
            KpiValue::Float(v) => write_float(f, *v),
            KpiValue::Text(v) => f.write_str(v),
        }
    }
}

/// Shortest round-trip form with a fractional part (`3000.0`); exponents are
/// signed and at least two digits (`1e+16`, `2.5e-07`); `nan`, `inf`, `-inf`.
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "inf" } else { "-inf" });
    }

    // Debug keeps the fractional part, Display would drop it
    let repr = format!("{:?}", v);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            write!(f, "{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => f.write_str(&repr),
    }
}

impl From<i64> for KpiValue {
    fn from(v: i64) -> Self {
        KpiValue::Int(v)
    }
}

impl From<i32> for KpiValue {
    fn from(v: i32) -> Self {
        KpiValue::Int(v as i64)
    }
}

impl From<f64> for KpiValue {
    fn from(v: f64) -> Self {
        KpiValue::Float(v)
    }
}

impl From<&str> for KpiValue {
    fn from(v: &str) -> Self {
        KpiValue::Text(v.to_string())
    }
}

impl From<String> for KpiValue {
    fn from(v: String) -> Self {
        KpiValue::Text(v)
    }
}

/// Named telemetry value with an optional unit.
///
/// Names and units end up between double quotes on the wire and must not
/// contain `"` or a newline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Kpi {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub value: KpiValue,
}

impl Kpi {
    pub fn new(name: impl Into<String>, value: impl Into<KpiValue>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            value: value.into(),
        }
    }

    pub fn with_unit(name: impl Into<String>, unit: impl Into<String>, value: impl Into<KpiValue>) -> Self {
        Self {
            name: name.into(),
            unit: Some(unit.into()),
            value: value.into(),
        }
    }
}

/// Packet kind requested by a snapshot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum PacketKind {
    All,
    Update,
    Metadata,
    /// Kept verbatim so the broadcaster can report it instead of dropping the snapshot
    Unrecognized(String),
}

impl PacketKind {
    pub fn as_str(&self) -> &str {
        match self {
            PacketKind::All => "ALL",
            PacketKind::Update => "UPDATE",
            PacketKind::Metadata => "METADATA",
            PacketKind::Unrecognized(s) => s,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PacketKind {
    fn from(s: &str) -> Self {
        match s {
            "ALL" => PacketKind::All,
            "UPDATE" => PacketKind::Update,
            "METADATA" => PacketKind::Metadata,
            other => PacketKind::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for PacketKind {
    fn from(s: String) -> Self {
        PacketKind::from(s.as_str())
    }
}

impl From<PacketKind> for String {
    fn from(kind: PacketKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One producer-submitted batch of KPI values
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Seconds, written into the packet header
    pub timestamp: f64,
    pub kind: PacketKind,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
}

impl Snapshot {
    pub fn new(timestamp: f64, kind: PacketKind, kpis: Vec<Kpi>) -> Self {
        Self { timestamp, kind, kpis }
    }

    pub fn update(timestamp: f64, kpis: Vec<Kpi>) -> Self {
        Self::new(timestamp, PacketKind::Update, kpis)
    }

    pub fn all(timestamp: f64, kpis: Vec<Kpi>) -> Self {
        Self::new(timestamp, PacketKind::All, kpis)
    }

    pub fn metadata(timestamp: f64) -> Self {
        Self::new(timestamp, PacketKind::Metadata, Vec::new())
    }

    /// Parse a snapshot from one JSON document
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fixed identity of one broadcaster instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_name: String,
    pub protocol_version: String,
}

impl DeviceIdentity {
    pub fn new(device_name: impl Into<String>, protocol_version: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            protocol_version: protocol_version.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_formatting() {
        assert_eq!(KpiValue::Int(3000).to_string(), "3000");
        assert_eq!(KpiValue::Float(3000.0).to_string(), "3000.0");
        assert_eq!(KpiValue::Float(12.75).to_string(), "12.75");
        assert_eq!(KpiValue::Text("N".to_string()).to_string(), "N");
    }

    #[test]
    fn test_float_edge_formatting() {
        assert_eq!(KpiValue::Float(1e16).to_string(), "1e+16");
        assert_eq!(KpiValue::Float(-1.5e20).to_string(), "-1.5e+20");
        assert_eq!(KpiValue::Float(2.5e-7).to_string(), "2.5e-07");
        assert_eq!(KpiValue::Float(1e-100).to_string(), "1e-100");
        assert_eq!(KpiValue::Float(0.0001).to_string(), "0.0001");
        assert_eq!(KpiValue::Float(f64::NAN).to_string(), "nan");
        assert_eq!(KpiValue::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(KpiValue::Float(f64::NEG_INFINITY).to_string(), "-inf");
    }

    #[test]
    fn test_packet_kind_parsing() {
        assert_eq!(PacketKind::from("ALL"), PacketKind::All);
        assert_eq!(PacketKind::from("UPDATE"), PacketKind::Update);
        assert_eq!(PacketKind::from("METADATA"), PacketKind::Metadata);
        // Case-sensitive, like the wire protocol
        assert_eq!(PacketKind::from("all"), PacketKind::Unrecognized("all".to_string()));
        assert_eq!(PacketKind::Unrecognized("X".to_string()).to_string(), "X");
    }

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{"timestamp":1.5,"kind":"UPDATE","kpis":[
            {"name":"RPM","unit":"rpm","value":3000},
            {"name":"Boost","value":1.25},
            {"name":"Gear","value":"N"}
        ]}"#;
        let snapshot = Snapshot::from_json(json).unwrap();

        assert_eq!(snapshot.kind, PacketKind::Update);
        assert_eq!(snapshot.kpis.len(), 3);
        assert_eq!(snapshot.kpis[0], Kpi::with_unit("RPM", "rpm", 3000));
        assert_eq!(snapshot.kpis[1].value, KpiValue::Float(1.25));
        assert_eq!(snapshot.kpis[2].value, KpiValue::Text("N".to_string()));
    }

    #[test]
    fn test_snapshot_unknown_kind_is_kept() {
        let snapshot = Snapshot::from_json(r#"{"timestamp":0.0,"kind":"BOGUS"}"#).unwrap();
        assert_eq!(snapshot.kind, PacketKind::Unrecognized("BOGUS".to_string()));
        assert!(snapshot.kpis.is_empty());
    }

    #[test]
    fn test_snapshot_bad_json() {
        assert!(Snapshot::from_json("{not json").is_err());
    }
}
