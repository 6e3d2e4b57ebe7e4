use proptest::prelude::*;

use migtrack_types::script::{split_sections, version_from_filename};
use migtrack_types::{MigrationStatus, NewTrackingRecord, RecordId, Timestamp, TrackingRecord};

fn status_strategy() -> impl Strategy<Value = MigrationStatus> {
    prop::sample::select(MigrationStatus::ALL.to_vec())
}

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// has_expired agrees with manual arithmetic, boundary included.
    #[test]
    fn timestamp_has_expired(base in 0u64..1_000_000, dur in 0u64..1_000_000, now in 0u64..3_000_000) {
        let t = Timestamp::new(base);
        prop_assert_eq!(t.has_expired(dur, Timestamp::new(now)), now >= base + dur);
    }

    /// Any numeric version survives the file-name round trip.
    #[test]
    fn numeric_version_from_filename(version in "[0-9]{1,14}", name in "[a-z_]{0,20}") {
        let file = if name.is_empty() {
            format!("{version}.sql")
        } else {
            format!("{version}_{name}.sql")
        };
        prop_assert_eq!(version_from_filename(&file), Some(version.as_str()));
    }

    /// Up and down sections never leak into each other.
    #[test]
    fn sections_do_not_mix(up in "[A-Z ;]{1,30}", down in "[a-z ;]{1,30}") {
        let body = format!("-- migrate:up\n{up}\n-- migrate:down\n{down}\n");
        let (parsed_up, parsed_down) = split_sections(&body);
        prop_assert_eq!(parsed_up, up.trim().to_string());
        prop_assert_eq!(parsed_down, down.trim().to_string());
    }

    /// Tracking records survive bincode, which is how the LMDB store persists them.
    #[test]
    fn tracking_record_bincode_roundtrip(
        id in 0u64..u64::MAX,
        version in "[0-9]{14}",
        status in status_strategy(),
        created in 0u64..4_000_000_000,
        key in "[a-z_]{1,12}",
        value in ".{0,24}",
    ) {
        let record: TrackingRecord = NewTrackingRecord::new(version, status, Timestamp::new(created))
            .with_branch("feature/x")
            .with_meta(&key, value)
            .into_record(RecordId::new(id));
        let encoded = bincode::serialize(&record).unwrap();
        let decoded: TrackingRecord = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, record);
    }
}
