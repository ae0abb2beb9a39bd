//! Region names, region keys and OCID parsing
//!
//! OCIDs look like `ocid1.<type>.<realm>.<region>.<unique>`. The region
//! segment is a full region name, a three letter region key, or empty for
//! realm-global resources such as tenancies and compartments.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Known region key to region name pairs
pub const REGIONS: &[(&str, &str)] = &[
    ("iad", "us-ashburn-1"),
    ("phx", "us-phoenix-1"),
    ("sjc", "us-sanjose-1"),
    ("ord", "us-chicago-1"),
    ("yyz", "ca-toronto-1"),
    ("yul", "ca-montreal-1"),
    ("gru", "sa-saopaulo-1"),
    ("vcp", "sa-vinhedo-1"),
    ("scl", "sa-santiago-1"),
    ("vap", "sa-valparaiso-1"),
    ("bog", "sa-bogota-1"),
    ("qro", "mx-queretaro-1"),
    ("mty", "mx-monterrey-1"),
    ("lhr", "uk-london-1"),
    ("cwl", "uk-cardiff-1"),
    ("fra", "eu-frankfurt-1"),
    ("ams", "eu-amsterdam-1"),
    ("zrh", "eu-zurich-1"),
    ("cdg", "eu-paris-1"),
    ("mrs", "eu-marseille-1"),
    ("lin", "eu-milan-1"),
    ("arn", "eu-stockholm-1"),
    ("mad", "eu-madrid-1"),
    ("jnb", "af-johannesburg-1"),
    ("dxb", "me-dubai-1"),
    ("auh", "me-abudhabi-1"),
    ("jed", "me-jeddah-1"),
    ("ruh", "me-riyadh-1"),
    ("mtz", "il-jerusalem-1"),
    ("bom", "ap-mumbai-1"),
    ("hyd", "ap-hyderabad-1"),
    ("sin", "ap-singapore-1"),
    ("xsp", "ap-singapore-2"),
    ("icn", "ap-seoul-1"),
    ("yny", "ap-chuncheon-1"),
    ("nrt", "ap-tokyo-1"),
    ("kix", "ap-osaka-1"),
    ("syd", "ap-sydney-1"),
    ("mel", "ap-melbourne-1"),
];

static OCID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ocid1\.([a-z0-9]+)\.([a-z0-9]+)\.([a-z0-9-]*)(\.[a-z0-9-]*)?\.([a-z0-9]+)$")
        .expect("static OCID pattern")
});

/// Parsed components of an OCID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcidParts {
    pub resource_type: String,
    pub realm: String,
    pub region: Option<String>,
    pub unique_id: String,
}

/// Known region entry as exposed by the `list_known_regions` tool
#[derive(Debug, Clone, Serialize)]
pub struct KnownRegion {
    pub key: &'static str,
    pub name: &'static str,
}

pub fn is_ocid(value: &str) -> bool {
    OCID_PATTERN.is_match(value)
}

/// Split an OCID into its parts. The region is resolved to a region name.
pub fn parse_ocid(ocid: &str) -> Option<OcidParts> {
    let caps = OCID_PATTERN.captures(ocid)?;
    let region_segment = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

    Some(OcidParts {
        resource_type: caps[1].to_string(),
        realm: caps[2].to_string(),
        region: normalize_region(region_segment),
        unique_id: caps[5].to_string(),
    })
}

/// Region name encoded in an OCID, if any
pub fn region_from_ocid(ocid: &str) -> Option<String> {
    parse_ocid(ocid).and_then(|p| p.region)
}

pub fn region_name_for_key(key: &str) -> Option<&'static str> {
    let key = key.to_ascii_lowercase();
    REGIONS.iter().find(|(k, _)| *k == key).map(|(_, name)| *name)
}

pub fn region_key_for_name(name: &str) -> Option<&'static str> {
    let name = name.to_ascii_lowercase();
    REGIONS.iter().find(|(_, n)| *n == name).map(|(key, _)| *key)
}

/// Accept either a region key or a region name and return the region name.
///
/// Unknown values that look like region names (`xx-yyyy-N`) pass through
/// unchanged so that newly launched regions keep working.
pub fn normalize_region(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(name) = region_name_for_key(value) {
        return Some(name.to_string());
    }

    let lower = value.to_ascii_lowercase();
    if lower.contains('-') {
        return Some(lower);
    }

    None
}

pub fn known_regions() -> Vec<KnownRegion> {
    REGIONS
        .iter()
        .map(|(key, name)| KnownRegion { key, name })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_key_segment() {
        let ocid = "ocid1.opsidatabaseinsight.oc1.iad.amaaaaaaexample";
        assert_eq!(region_from_ocid(ocid).as_deref(), Some("us-ashburn-1"));
    }

    #[test]
    fn test_region_from_name_segment() {
        let ocid = "ocid1.autonomousdatabase.oc1.eu-frankfurt-1.antheljexample";
        assert_eq!(region_from_ocid(ocid).as_deref(), Some("eu-frankfurt-1"));
    }

    #[test]
    fn test_realm_global_ocid_has_no_region() {
        let ocid = "ocid1.tenancy.oc1..aaaaaaaaexample";
        let parts = parse_ocid(ocid).unwrap();
        assert_eq!(parts.resource_type, "tenancy");
        assert_eq!(parts.realm, "oc1");
        assert_eq!(parts.region, None);
        assert_eq!(parts.unique_id, "aaaaaaaaexample");
    }

    #[test]
    fn test_not_an_ocid() {
        assert!(!is_ocid("my-compartment"));
        assert_eq!(region_from_ocid("ocid2.thing"), None);
    }

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("PHX").as_deref(), Some("us-phoenix-1"));
        assert_eq!(normalize_region("us-phoenix-1").as_deref(), Some("us-phoenix-1"));
        assert_eq!(normalize_region("zz-newregion-1").as_deref(), Some("zz-newregion-1"));
        assert_eq!(normalize_region("zzz"), None);
        assert_eq!(normalize_region(""), None);
    }

    #[test]
    fn test_key_name_tables_agree() {
        for (key, name) in REGIONS {
            assert_eq!(region_key_for_name(name), Some(*key));
            assert_eq!(region_name_for_key(key), Some(*name));
        }
    }
}
