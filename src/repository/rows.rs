// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconstruction of nested records from flat, ordered result sets.
//!
//! Both the issuer read (issuers LEFT JOIN credentials_supported) and the
//! configuration read return one row per configuration. Rows belonging to
//! the same tenant arrive next to each other and are folded into a single
//! record by [`group_contiguous`].

use super::models::{CredentialSupported, Issuer};

/// One row of the issuers/credentials_supported join. `configuration` is
/// `None` when the tenant has no configuration at all.
#[derive(Clone, Debug)]
pub struct JoinedRow {
    pub issuer: Issuer,
    pub configuration: Option<CredentialSupported>,
}

/// One row of the credentials_supported relation.
#[derive(Clone, Debug)]
pub struct ConfigurationRow {
    pub tenant_id: String,
    pub configuration: CredentialSupported,
}

/// Folds runs of consecutive rows with an equal key into one value each.
///
/// `start` builds the value from the first row of a run, `extend` merges
/// every following row of the same run into it. Rows with the same key that
/// are not adjacent end up in separate values.
pub fn group_contiguous<R, K, T, I>(
    rows: I,
    key: impl Fn(&R) -> K,
    mut start: impl FnMut(R) -> T,
    mut extend: impl FnMut(&mut T, R),
) -> Vec<T>
where
    I: IntoIterator<Item = R>,
    K: PartialEq,
{
    let mut out = Vec::new();
    let mut current: Option<(K, T)> = None;

    for row in rows {
        let row_key = key(&row);
        let same_run = matches!(&current, Some((run_key, _)) if *run_key == row_key);

        if same_run {
            if let Some((_, acc)) = current.as_mut() {
                extend(acc, row);
            }
            continue;
        }

        if let Some((_, done)) = current.take() {
            out.push(done);
        }
        current = Some((row_key, start(row)));
    }

    if let Some((_, done)) = current {
        out.push(done);
    }
    out
}

/// Issuers with their configuration sets, one per run of same-tenant rows.
pub fn reduce_issuers(rows: Vec<JoinedRow>) -> Vec<Issuer> {
    group_contiguous(
        rows,
        |row| row.issuer.tenant_id.clone(),
        |row| {
            let mut issuer = row.issuer;
            issuer.credentials_supported = row.configuration.into_iter().collect();
            issuer
        },
        |issuer: &mut Issuer, row| issuer.credentials_supported.extend(row.configuration),
    )
}

/// Configuration sets, one per run of same-tenant rows.
pub fn reduce_configurations(rows: Vec<ConfigurationRow>) -> Vec<(String, Vec<CredentialSupported>)> {
    group_contiguous(
        rows,
        |row| row.tenant_id.clone(),
        |row| (row.tenant_id, vec![row.configuration]),
        |acc: &mut (String, Vec<CredentialSupported>), row| acc.1.push(row.configuration),
    )
}
