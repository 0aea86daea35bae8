//! Catalog fixtures served by the fake vendor
//!
//! Labels line up with the provider's size/image alias tables.

use vpsfleet_provider::api::{ImageRecord, PlanRecord, RegionRecord};

pub fn plans() -> Vec<PlanRecord> {
    [
        ("plan-1", "Standard 1024", 20_480, 1_024),
        ("plan-2", "Standard 2048", 30_720, 2_048),
        ("plan-3", "Standard 4096", 49_152, 4_096),
        ("plan-4", "Standard 8192", 98_304, 8_192),
    ]
    .into_iter()
    .map(|(id, label, disk_mb, ram_mb)| PlanRecord {
        id: id.to_string(),
        label: label.to_string(),
        disk_mb,
        ram_mb,
    })
    .collect()
}

pub fn regions() -> Vec<RegionRecord> {
    [
        ("region-2", "dallas"),
        ("region-3", "fremont"),
        ("region-4", "atlanta"),
        ("region-6", "newark"),
        ("region-7", "london"),
        ("region-8", "tokyo"),
        ("region-9", "singapore"),
        ("region-10", "frankfurt"),
    ]
    .into_iter()
    .map(|(id, label)| RegionRecord {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

pub fn images() -> Vec<ImageRecord> {
    [
        ("image-124", "Ubuntu 14.04 LTS"),
        ("image-146", "Ubuntu 16.04 LTS"),
        ("image-127", "CentOS 6.8"),
        ("image-129", "CentOS 7"),
        ("image-130", "Debian 7"),
        ("image-140", "Debian 8"),
        ("image-149", "Fedora 24"),
        ("image-155", "Fedora 25"),
    ]
    .into_iter()
    .map(|(id, label)| ImageRecord {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}
