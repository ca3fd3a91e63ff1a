//! NBP wire encoding
//!
//! ```text
//! *NBP1,ALL,1.500000
//! "RPM","rpm":3000
//! "Speed":60
//! #
//!
//! ```

use std::fmt::Write;

use crate::error::{BroadcasterError, Result};
use crate::kpi::{DeviceIdentity, Kpi, PacketKind};
use crate::store::KpiStore;

/// Inbound request for a full-state packet
pub const REQUEST_ALL: &str = "!ALL";

/// Encode a KPI packet: header, one line per KPI in the given order, footer
pub fn encode<'a, I>(kind: &PacketKind, protocol_version: &str, timestamp: f64, kpis: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a Kpi>,
{
    let mut packet = format!("*{},{},{:.6}\n", protocol_version, kind, timestamp);

    for kpi in kpis {
        // Writing into a String cannot fail
        let _ = match &kpi.unit {
            Some(unit) => writeln!(packet, "\"{}\",\"{}\":{}", kpi.name, unit, kpi.value),
            None => writeln!(packet, "\"{}\":{}", kpi.name, kpi.value),
        };
    }

    packet.push_str("#\n\n");
    packet.into_bytes()
}

/// Encode the device name announcement
pub fn metadata(device_name: &str) -> Vec<u8> {
    format!("@NAME:{}\n\n", device_name).into_bytes()
}

/// Build the packet a snapshot of `kind` asks for, from the current store.
///
/// UPDATE carries the dirty KPIs only. With nothing dirty it falls back to
/// the full ALL packet, header included.
pub fn build_packet(
    identity: &DeviceIdentity,
    kind: &PacketKind,
    timestamp: f64,
    store: &KpiStore,
) -> Result<Vec<u8>> {
    let version = identity.protocol_version.as_str();

    match kind {
        PacketKind::Update if store.has_dirty() => Ok(encode(kind, version, timestamp, store.dirty())),
        PacketKind::All | PacketKind::Update => Ok(encode(&PacketKind::All, version, timestamp, store.all())),
        PacketKind::Metadata => Ok(metadata(&identity.device_name)),
        PacketKind::Unrecognized(other) => Err(BroadcasterError::UnrecognizedKind(other.clone())),
    }
}

/// True when inbound bytes are a full-state request
pub fn is_request_all(inbound: &[u8]) -> bool {
    String::from_utf8_lossy(inbound).trim() == REQUEST_ALL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::Snapshot;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new("TestDevice", "NBP1")
    }

    #[test]
    fn test_encode_with_unit() {
        let kpis = vec![Kpi::with_unit("RPM", "rpm", 3000)];
        let packet = encode(&PacketKind::All, "NBP1", 1.5, &kpis);
        assert_eq!(packet, b"*NBP1,ALL,1.500000\n\"RPM\",\"rpm\":3000\n#\n\n".to_vec());
    }

    #[test]
    fn test_encode_without_unit() {
        let kpis = vec![Kpi::new("Speed", 60)];
        let packet = String::from_utf8(encode(&PacketKind::Update, "NBP1", 0.0, &kpis)).unwrap();
        assert_eq!(packet, "*NBP1,UPDATE,0.000000\n\"Speed\":60\n#\n\n");
    }

    #[test]
    fn test_encode_empty() {
        let packet = encode(&PacketKind::All, "NBP2", 12.3456789, std::iter::empty());
        assert_eq!(packet, b"*NBP2,ALL,12.345679\n#\n\n".to_vec());
    }

    #[test]
    fn test_metadata() {
        assert_eq!(metadata("Dash"), b"@NAME:Dash\n\n".to_vec());
    }

    #[test]
    fn test_build_all_uses_mapping_order() {
        let mut store = KpiStore::new();
        store.merge(&Snapshot::update(0.0, vec![Kpi::new("A", 1), Kpi::new("B", 2)]));
        store.clear_dirty();
        store.merge(&Snapshot::update(0.0, vec![Kpi::new("B", 3)]));

        let packet = build_packet(&identity(), &PacketKind::All, 2.0, &store).unwrap();
        assert_eq!(
            String::from_utf8(packet).unwrap(),
            "*NBP1,ALL,2.000000\n\"A\":1\n\"B\":3\n#\n\n"
        );
    }

    #[test]
    fn test_build_update_uses_dirty_order() {
        let mut store = KpiStore::new();
        store.merge(&Snapshot::update(0.0, vec![Kpi::new("A", 1), Kpi::new("B", 2)]));
        store.clear_dirty();
        store.merge(&Snapshot::update(0.0, vec![Kpi::new("B", 5), Kpi::new("A", 6)]));

        let packet = build_packet(&identity(), &PacketKind::Update, 3.0, &store).unwrap();
        assert_eq!(
            String::from_utf8(packet).unwrap(),
            "*NBP1,UPDATE,3.000000\n\"B\":5\n\"A\":6\n#\n\n"
        );
    }

    #[test]
    fn test_update_with_nothing_dirty_equals_all() {
        let mut store = KpiStore::new();
        store.merge(&Snapshot::update(0.0, vec![Kpi::with_unit("RPM", "rpm", 3000), Kpi::new("Speed", 60)]));
        store.clear_dirty();

        let update = build_packet(&identity(), &PacketKind::Update, 4.25, &store).unwrap();
        let all = build_packet(&identity(), &PacketKind::All, 4.25, &store).unwrap();
        assert_eq!(update, all);
    }

    #[test]
    fn test_build_metadata_and_unrecognized() {
        let store = KpiStore::new();
        let packet = build_packet(&identity(), &PacketKind::Metadata, 0.0, &store).unwrap();
        assert_eq!(packet, b"@NAME:TestDevice\n\n".to_vec());

        let err = build_packet(&identity(), &PacketKind::from("NOPE"), 0.0, &store).unwrap_err();
        assert!(matches!(err, BroadcasterError::UnrecognizedKind(ref k) if k == "NOPE"));
    }

    #[test]
    fn test_request_all_detection() {
        assert!(is_request_all(b"!ALL"));
        assert!(is_request_all(b"!ALL\n"));
        assert!(is_request_all(b"  !ALL\r\n"));
        assert!(!is_request_all(b"!all\n"));
        assert!(!is_request_all(b"!ALL extra\n"));
        assert!(!is_request_all(b""));
    }
}
