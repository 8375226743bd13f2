use std::fs;
use std::path::{Path, PathBuf};

use sirius::{encode_record, ChannelClass, ChannelInfo, ChannelMap, SamplingClass, RECORD_LEN};

/// Addresses: 1 thin strip (250 MHz, group 1), 2 thick detector (500 MHz,
/// group 1), 3 scintillator (500 MHz), 4 thick detector (250 MHz, group 2).
pub fn test_map() -> ChannelMap {
    ChannelMap::from_infos([
        ChannelInfo {
            address: 1,
            sampling: SamplingClass::Rate250MHz,
            class: ChannelClass::ThinStrip,
            local: 11,
            group: 1,
        },
        ChannelInfo {
            address: 2,
            sampling: SamplingClass::Rate500MHz,
            class: ChannelClass::ThickDetector,
            local: 21,
            group: 1,
        },
        ChannelInfo {
            address: 3,
            sampling: SamplingClass::Rate500MHz,
            class: ChannelClass::Scintillator,
            local: 5,
            group: 9,
        },
        ChannelInfo {
            address: 4,
            sampling: SamplingClass::Rate250MHz,
            class: ChannelClass::ThickDetector,
            local: 22,
            group: 2,
        },
    ])
    .unwrap()
}

/// Thin-strip record at `ns` (multiple of 8), zero CFD correction.
pub fn thin(ns: i64) -> [u8; RECORD_LEN] {
    encode_record(1, false, ns as u64 / 8, 0x0000, 1000)
}

/// Thick-detector record at `ns` (multiple of 10), zero CFD correction.
pub fn thick(ns: i64) -> [u8; RECORD_LEN] {
    encode_record(2, false, ns as u64 / 10, 0x2000, 2000)
}

/// Scintillator record at `ns` (multiple of 10), zero CFD correction.
pub fn scint(ns: i64) -> [u8; RECORD_LEN] {
    encode_record(3, false, ns as u64 / 10, 0x2000, 3000)
}

pub fn write_run(dir: &Path, name: &str, records: &[[u8; RECORD_LEN]]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, records.concat()).unwrap();
    path
}
