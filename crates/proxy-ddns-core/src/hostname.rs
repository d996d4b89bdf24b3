//! Hostname normalization and zone ownership
//!
//! Every hostname that enters the system (from the domain source, from the
//! provider's record listing) goes through [`normalize`] so that set
//! membership and map lookups compare like with like.

use crate::config::ZoneConfig;

/// Normalize a hostname: lowercase, no surrounding whitespace, no trailing dots.
///
/// Idempotent: `normalize(&normalize(h)) == normalize(h)`.
pub fn normalize(hostname: &str) -> String {
    hostname
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_lowercase()
}

/// Whether `hostname` is `domain` itself or a subdomain of it.
///
/// The match happens on a label boundary, so `myexample.com` is not
/// considered part of `example.com`. Both arguments are expected normalized.
pub fn is_within(hostname: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    match hostname.strip_suffix(domain) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

/// Index of the zone that owns `hostname`, if any.
///
/// Unlike a plain `ends_with(domain_name)` test, ownership requires a label
/// boundary (see [`is_within`]), so `badexample.com` never lands in the
/// `example.com` zone. Incomplete zones own nothing. When several zones
/// contain the hostname the most specific (longest domain name) wins; ties go
/// to the first configured.
pub fn owning_zone(hostname: &str, zones: &[ZoneConfig]) -> Option<usize> {
    let mut owner: Option<(usize, usize)> = None;

    for (index, zone) in zones.iter().enumerate() {
        if !zone.is_complete() {
            continue;
        }
        let domain = normalize(&zone.domain_name);
        if !is_within(hostname, &domain) {
            continue;
        }
        if owner.is_none_or(|(_, len)| domain.len() > len) {
            owner = Some((index, domain.len()));
        }
    }

    owner.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str) -> ZoneConfig {
        ZoneConfig::new(name, "token", format!("zone-{name}"))
    }

    #[test]
    fn normalize_lowercases_and_strips() {
        assert_eq!(normalize("  WWW.Example.COM. "), "www.example.com");
        assert_eq!(normalize("a.example.com.."), "a.example.com");
        assert_eq!(normalize("a.example.com . "), "a.example.com");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" . "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Example.com",
            " a.B.c. ",
            "x. .",
            "\tHost.Example.Org.\n",
            "ÄBC.example",
            "...",
            "plain",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn is_within_respects_label_boundaries() {
        assert!(is_within("example.com", "example.com"));
        assert!(is_within("a.example.com", "example.com"));
        assert!(is_within("deep.a.example.com", "example.com"));
        assert!(!is_within("myexample.com", "example.com"));
        assert!(!is_within("example.org", "example.com"));
        assert!(!is_within("a.example.com", ""));
    }

    #[test]
    fn most_specific_zone_wins() {
        let zones = vec![zone("example.com"), zone("lab.example.com")];

        assert_eq!(owning_zone("www.example.com", &zones), Some(0));
        assert_eq!(owning_zone("host.lab.example.com", &zones), Some(1));
        assert_eq!(owning_zone("lab.example.com", &zones), Some(1));
        assert_eq!(owning_zone("other.net", &zones), None);
    }

    #[test]
    fn suffix_without_label_boundary_is_not_owned() {
        let zones = vec![zone("example.com")];

        assert_eq!(owning_zone("badexample.com", &zones), None);
        assert_eq!(owning_zone("a.badexample.com", &zones), None);
    }

    #[test]
    fn incomplete_zones_own_nothing() {
        let zones = vec![ZoneConfig::new("example.com", "", "zone")];
        assert_eq!(owning_zone("a.example.com", &zones), None);
    }

    #[test]
    fn zone_names_are_compared_normalized() {
        let zones = vec![zone("Example.COM.")];
        assert_eq!(owning_zone("a.example.com", &zones), Some(0));
    }
}
