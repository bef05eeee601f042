// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Statements whose shape depends on the data: partial updates and
//! multi-row inserts. Fixed statements live under `sql/`.

use tokio_postgres::types::ToSql;

use crate::errors::IssuerError;

pub type BoxedParam = Box<dyn ToSql + Sync + Send>;
pub type ParamRefs<'a> = Vec<&'a (dyn ToSql + Sync)>;

pub fn param<T>(value: T) -> BoxedParam
where
    T: ToSql + Sync + Send + 'static,
{
    Box::new(value)
}

fn as_refs(params: &[BoxedParam]) -> ParamRefs<'_> {
    params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect()
}

/// `UPDATE <table> SET .. WHERE ..` with only the columns that were set.
pub struct UpdateStatement {
    table: &'static str,
    assignments: Vec<&'static str>,
    filters: Vec<&'static str>,
    params: Vec<BoxedParam>,
    filter_params: Vec<BoxedParam>,
}

impl UpdateStatement {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            filters: Vec::new(),
            params: Vec::new(),
            filter_params: Vec::new(),
        }
    }

    pub fn set<T>(mut self, column: &'static str, value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.assignments.push(column);
        self.params.push(param(value));
        self
    }

    /// Sets the column only when a value is present.
    pub fn set_if<T>(self, column: &'static str, value: Option<T>) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    pub fn filter<T>(mut self, column: &'static str, value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.filters.push(column);
        self.filter_params.push(param(value));
        self
    }

    pub fn to_sql(&self) -> Result<(String, ParamRefs<'_>), IssuerError> {
        if self.assignments.is_empty() {
            return Err(IssuerError::store("failed to build query", "update without columns"));
        }
        if self.filters.is_empty() {
            return Err(IssuerError::store("failed to build query", "update without filter"));
        }

        let sets = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ${}", col, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let offset = self.assignments.len();
        let wheres = self
            .filters
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ${}", col, offset + i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");

        let sql = format!("UPDATE {} SET {} WHERE {}", self.table, sets, wheres);
        let mut params = as_refs(&self.params);
        params.extend(as_refs(&self.filter_params));
        Ok((sql, params))
    }
}

/// `INSERT INTO <table> (..) VALUES (..), (..)`.
pub struct InsertStatement {
    table: &'static str,
    columns: &'static [&'static str],
    rows: usize,
    params: Vec<BoxedParam>,
    malformed: bool,
}

impl InsertStatement {
    pub fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        Self { table, columns, rows: 0, params: Vec::new(), malformed: false }
    }

    pub fn values(mut self, row: Vec<BoxedParam>) -> Self {
        if row.len() != self.columns.len() {
            self.malformed = true;
        }
        self.rows += 1;
        self.params.extend(row);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn to_sql(&self) -> Result<(String, ParamRefs<'_>), IssuerError> {
        if self.malformed {
            return Err(IssuerError::store("failed to build query", "row length does not match columns"));
        }
        if self.rows == 0 {
            return Err(IssuerError::store("failed to build query", "insert without values"));
        }

        let width = self.columns.len();
        let tuples = (0..self.rows)
            .map(|row| {
                let placeholders = (1..=width)
                    .map(|col| format!("${}", row * width + col))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", placeholders)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(", "),
            tuples
        );
        Ok((sql, as_refs(&self.params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["tenant_id", "\"order\""];

    #[test]
    fn update_only_contains_set_columns() {
        let stmt = UpdateStatement::new("issuers")
            .set_if("credential_endpoint", Some("https://issuer/credential".to_owned()))
            .set_if::<String>("signed_metadata", None)
            .set("credential_identifiers_supported", true)
            .filter("tenant_id", "T1".to_owned())
            .filter("credential_issuer", "https://issuer".to_owned());

        let (sql, params) = stmt.to_sql().expect("statement should build");

        assert_eq!(
            sql,
            "UPDATE issuers SET credential_endpoint = $1, credential_identifiers_supported = $2 \
             WHERE tenant_id = $3 AND credential_issuer = $4"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn update_without_columns_fails_to_build() {
        let stmt = UpdateStatement::new("issuers").filter("tenant_id", "T1".to_owned());
        assert!(matches!(stmt.to_sql(), Err(IssuerError::Store { .. })));
    }

    #[test]
    fn insert_numbers_placeholders_per_row() {
        let stmt = InsertStatement::new("credentials_supported", COLUMNS)
            .values(vec![param("T1".to_owned()), param(vec!["a".to_owned()])])
            .values(vec![param("T1".to_owned()), param(Vec::<String>::new())]);

        let (sql, params) = stmt.to_sql().expect("statement should build");

        assert_eq!(
            sql,
            "INSERT INTO credentials_supported (tenant_id, \"order\") VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn insert_rejects_short_rows() {
        let stmt = InsertStatement::new("credentials_supported", COLUMNS).values(vec![param("T1".to_owned())]);
        assert!(stmt.to_sql().is_err());
        assert!(InsertStatement::new("credentials_supported", COLUMNS).to_sql().is_err());
    }
}
