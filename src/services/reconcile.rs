// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Merge rules for configuration sets.
//!
//! Sources never announce deletions. A configuration stays alive as long
//! as it keeps being re-announced within the expiry window and is dropped
//! once its `last_seen` falls out of it.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::repository::models::CredentialSupported;

/// Outcome of merging an incoming snapshot into the stored set.
#[derive(Debug, Default)]
pub struct Reconciled {
    /// Final set to persist: refreshed survivors followed by new entries.
    pub configurations: Vec<CredentialSupported>,
    /// Stored ids dropped because they expired.
    pub evicted: Vec<String>,
}

/// A deadline past the representable range never expires.
pub fn is_expired(configuration: &CredentialSupported, now: DateTime<Utc>, expiry: Duration) -> bool {
    configuration
        .last_seen
        .checked_add_signed(expiry)
        .is_some_and(|deadline| deadline < now)
}

/// Whole-issuer merge.
///
/// Expired stored entries are dropped. Surviving entries that are announced
/// again only get `last_seen` bumped, their stored content is kept.
/// Announced ids not stored yet are appended as they came in.
pub fn merge_issuer_configurations(
    stored: Vec<CredentialSupported>,
    incoming: Vec<CredentialSupported>,
    now: DateTime<Utc>,
    expiry: Duration,
) -> Reconciled {
    let announced: HashSet<&str> = incoming
        .iter()
        .map(|c| c.credential_configuration_id.as_str())
        .collect();

    let mut reconciled = Reconciled::default();
    for mut configuration in stored {
        if is_expired(&configuration, now, expiry) {
            reconciled.evicted.push(configuration.credential_configuration_id);
            continue;
        }
        if announced.contains(configuration.credential_configuration_id.as_str()) {
            configuration.last_seen = now;
        }
        reconciled.configurations.push(configuration);
    }

    let kept: HashSet<String> = reconciled
        .configurations
        .iter()
        .map(|c| c.credential_configuration_id.clone())
        .collect();
    let mut added = HashSet::new();
    for configuration in incoming {
        if kept.contains(&configuration.credential_configuration_id) {
            continue;
        }
        // a snapshot never yields the same id twice
        if added.insert(configuration.credential_configuration_id.clone()) {
            reconciled.configurations.push(configuration);
        }
    }

    reconciled
}

/// Single-configuration merge: the incoming entry replaces any stored entry
/// with the same id and inherits its `first_seen`. Other entries are kept
/// untouched, no expiry sweep happens on this path.
pub fn merge_single_configuration(
    stored: Vec<CredentialSupported>,
    mut incoming: CredentialSupported,
    now: DateTime<Utc>,
) -> Vec<CredentialSupported> {
    incoming.first_seen = now;
    incoming.last_seen = now;

    let mut merged = Vec::with_capacity(stored.len() + 1);
    for configuration in stored {
        if configuration.credential_configuration_id == incoming.credential_configuration_id {
            incoming.first_seen = configuration.first_seen;
            continue;
        }
        merged.push(configuration);
    }
    merged.push(incoming);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testutil::configuration;

    fn seen(id: &str, last_seen: DateTime<Utc>) -> CredentialSupported {
        let mut c = configuration(id);
        c.first_seen = last_seen - Duration::hours(1);
        c.last_seen = last_seen;
        c
    }

    fn ids(configurations: &[CredentialSupported]) -> Vec<&str> {
        configurations.iter().map(|c| c.credential_configuration_id.as_str()).collect()
    }

    #[test]
    fn expired_entries_are_evicted() {
        let now = Utc::now();
        let expiry = Duration::seconds(60);
        let stored = vec![
            seen("A", now - expiry - Duration::seconds(1)),
            seen("B", now - Duration::seconds(5)),
        ];
        let incoming = vec![seen("B", now)];

        let reconciled = merge_issuer_configurations(stored, incoming, now, expiry);

        assert_eq!(ids(&reconciled.configurations), vec!["B"]);
        assert_eq!(reconciled.evicted, vec!["A".to_owned()]);
    }

    #[test]
    fn entry_exactly_at_the_window_edge_survives() {
        let now = Utc::now();
        let expiry = Duration::seconds(60);
        let stored = vec![seen("A", now - expiry)];

        let reconciled = merge_issuer_configurations(stored, Vec::new(), now, expiry);

        assert_eq!(ids(&reconciled.configurations), vec!["A"]);
        assert!(reconciled.evicted.is_empty());
    }

    #[test]
    fn huge_expiry_never_expires() {
        let now = Utc::now();
        let expiry = Duration::MAX;

        let reconciled = merge_issuer_configurations(vec![seen("A", now - Duration::days(365))], Vec::new(), now, expiry);

        assert_eq!(ids(&reconciled.configurations), vec!["A"]);
        assert!(reconciled.evicted.is_empty());
    }

    #[test]
    fn refresh_bumps_last_seen_but_keeps_content() {
        let now = Utc::now();
        let expiry = Duration::seconds(60);
        let mut stored = seen("A", now - Duration::seconds(30));
        stored.format = "jwt_vc_json".to_owned();
        let first_seen = stored.first_seen;
        let mut announced = seen("A", now);
        announced.format = "vc+sd-jwt".to_owned();

        let reconciled = merge_issuer_configurations(vec![stored], vec![announced], now, expiry);

        let a = &reconciled.configurations[0];
        assert_eq!(a.format, "jwt_vc_json");
        assert_eq!(a.last_seen, now);
        assert_eq!(a.first_seen, first_seen);
    }

    #[test]
    fn unannounced_survivor_keeps_its_last_seen() {
        let now = Utc::now();
        let last_seen = now - Duration::seconds(10);

        let reconciled =
            merge_issuer_configurations(vec![seen("A", last_seen)], vec![seen("B", now)], now, Duration::seconds(60));

        assert_eq!(ids(&reconciled.configurations), vec!["A", "B"]);
        assert_eq!(reconciled.configurations[0].last_seen, last_seen);
    }

    #[test]
    fn expired_entry_announced_again_comes_back_fresh() {
        let now = Utc::now();
        let expiry = Duration::seconds(60);
        let mut fresh = seen("A", now);
        fresh.first_seen = now;

        let reconciled = merge_issuer_configurations(
            vec![seen("A", now - Duration::hours(2))],
            vec![fresh],
            now,
            expiry,
        );

        assert_eq!(reconciled.evicted, vec!["A".to_owned()]);
        assert_eq!(ids(&reconciled.configurations), vec!["A"]);
        assert_eq!(reconciled.configurations[0].first_seen, now);
    }

    #[test]
    fn single_merge_replaces_content_and_carries_first_seen() {
        let now = Utc::now();
        let stored = vec![seen("A", now - Duration::hours(3)), seen("B", now - Duration::hours(3))];
        let first_seen = stored[0].first_seen;
        let mut incoming = configuration("A");
        incoming.format = "vc+sd-jwt".to_owned();

        let merged = merge_single_configuration(stored, incoming, now);

        assert_eq!(ids(&merged), vec!["B", "A"]);
        let a = &merged[1];
        assert_eq!(a.format, "vc+sd-jwt");
        assert_eq!(a.first_seen, first_seen);
        assert_eq!(a.last_seen, now);
        // no sweep on this path
        assert_eq!(merged[0].last_seen, now - Duration::hours(3));
    }

    #[test]
    fn single_merge_of_new_id_starts_now() {
        let now = Utc::now();

        let merged = merge_single_configuration(Vec::new(), configuration("A"), now);

        assert_eq!(merged[0].first_seen, now);
        assert_eq!(merged[0].last_seen, now);
    }
}
