//! Terminology access over an sqlx connection pool.

use crate::{ConceptDescription, Language, Result, TerminologyError, TerminologySource};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use std::collections::BTreeSet;
use tokio::runtime::Handle;

/// Database-backed terminology.
///
/// Queries run on a pooled connection so concurrent workers don't serialize
/// on one socket. The synchronous [`TerminologySource`] methods drive the pool
/// on `handle`; call them from outside the runtime (worker threads).
#[derive(Clone)]
pub struct SqlTerminology {
    pool: AnyPool,
    handle: Handle,
}

impl SqlTerminology {
    /// Open a pool against any supported URL (`mysql://`, `sqlite://`).
    pub fn connect(url: &str, max_connections: u32, handle: Handle) -> Result<Self> {
        sqlx::any::install_default_drivers();
        tracing::info!(url = %mask_url(url), max_connections, "connecting to terminology database");

        let pool = handle
            .block_on(
                AnyPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(url),
            )
            .map_err(|source| {
                tracing::warn!(error = %source, "failed to connect to terminology database");
                TerminologyError::Connect {
                    url: mask_url(url),
                    source,
                }
            })?;

        Ok(Self { pool, handle })
    }

    pub fn from_pool(pool: AnyPool, handle: Handle) -> Self {
        Self { pool, handle }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Close every pooled connection.
    pub fn close(&self) {
        self.handle.block_on(self.pool.close());
    }

    async fn fetch_types(&self, cui: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT TUI FROM MRSTY WHERE CUI = ? ORDER BY TUI")
            .bind(cui.to_string())
            .fetch_all(&self.pool)
            .await?;
        first_column(&rows)
    }

    async fn fetch_descriptions(
        &self,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
    ) -> Result<Vec<ConceptDescription>> {
        let mut sql = String::from("SELECT CUI, STR FROM MRCONSO WHERE LAT = ?");
        if let Some(cuis) = cuis {
            if cuis.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; cuis.len()].join(", ");
            sql.push_str(&format!(" AND CUI IN ({placeholders})"));
        }
        sql.push_str(" ORDER BY CUI, STR");
        tracing::debug!(%sql, language = language.terminology_code(), "fetching concept descriptions");

        let mut query = sqlx::query(&sql).bind(language.terminology_code().to_string());
        for cui in cuis.into_iter().flatten() {
            query = query.bind(cui.clone());
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<ConceptDescription> {
                Ok(ConceptDescription {
                    cui: row.try_get::<String, _>(0)?,
                    description: row.try_get::<String, _>(1)?,
                })
            })
            .collect()
    }

    async fn fetch_code_cuis(&self, code: &str, language: Option<Language>) -> Result<Vec<String>> {
        let rows = match language {
            Some(lang) => {
                sqlx::query(
                    "SELECT DISTINCT CUI FROM MRCONSO WHERE CODE = ? AND LAT = ? ORDER BY CUI",
                )
                .bind(code.to_string())
                .bind(lang.terminology_code().to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT DISTINCT CUI FROM MRCONSO WHERE CODE = ? ORDER BY CUI")
                    .bind(code.to_string())
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        first_column(&rows)
    }
}

impl TerminologySource for SqlTerminology {
    fn semantic_types(&self, cui: &str) -> Result<Vec<String>> {
        self.handle.block_on(self.fetch_types(cui))
    }

    fn concept_descriptions(
        &self,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
    ) -> Result<Vec<ConceptDescription>> {
        self.handle.block_on(self.fetch_descriptions(language, cuis))
    }

    fn cuis_for_code(&self, code: &str, language: Option<Language>) -> Result<Vec<String>> {
        self.handle.block_on(self.fetch_code_cuis(code, language))
    }
}

fn first_column(rows: &[AnyRow]) -> Result<Vec<String>> {
    rows.iter()
        .map(|row| row.try_get::<String, _>(0).map_err(TerminologyError::from))
        .collect()
}

/// Hide the password part of a database URL for logging.
fn mask_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Runtime;

    const SCHEMA: &str = r#"
CREATE TABLE MRCONSO (CUI TEXT NOT NULL, LAT TEXT NOT NULL, CODE TEXT NOT NULL, STR TEXT NOT NULL);
CREATE TABLE MRSTY (CUI TEXT NOT NULL, TUI TEXT NOT NULL);
INSERT INTO MRCONSO VALUES ('C0011849', 'FRE', 'E11', 'diabète');
INSERT INTO MRCONSO VALUES ('C0011849', 'FRE', 'E11', 'diabète sucré');
INSERT INTO MRCONSO VALUES ('C0011849', 'ENG', 'E11', 'diabetes mellitus');
INSERT INTO MRCONSO VALUES ('C0021400', 'FRE', 'J11', 'grippe');
INSERT INTO MRSTY VALUES ('C0011849', 'T047');
INSERT INTO MRSTY VALUES ('C0021400', 'T047');
INSERT INTO MRSTY VALUES ('C0021400', 'T033');
"#;

    fn terminology(rt: &Runtime) -> SqlTerminology {
        sqlx::any::install_default_drivers();
        let pool = rt
            .block_on(
                AnyPoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect("sqlite::memory:"),
            )
            .unwrap();
        rt.block_on(sqlx::raw_sql(SCHEMA).execute(&pool)).unwrap();
        SqlTerminology::from_pool(pool, rt.handle().clone())
    }

    #[test]
    fn semantic_types_by_concept() {
        let rt = Runtime::new().unwrap();
        let term = terminology(&rt);
        assert_eq!(term.semantic_types("C0021400").unwrap(), vec!["T033", "T047"]);
        assert!(term.semantic_types("C9999999").unwrap().is_empty());
    }

    #[test]
    fn descriptions_by_language_and_filter() {
        let rt = Runtime::new().unwrap();
        let term = terminology(&rt);

        let all = term.concept_descriptions(Language::French, None).unwrap();
        assert_eq!(
            all,
            vec![
                ConceptDescription::new("C0011849", "diabète"),
                ConceptDescription::new("C0011849", "diabète sucré"),
                ConceptDescription::new("C0021400", "grippe"),
            ]
        );

        let filter: BTreeSet<String> = ["C0021400".to_string()].into();
        let some = term
            .concept_descriptions(Language::French, Some(&filter))
            .unwrap();
        assert_eq!(some, vec![ConceptDescription::new("C0021400", "grippe")]);

        let none = term
            .concept_descriptions(Language::French, Some(&BTreeSet::new()))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn concepts_by_source_code() {
        let rt = Runtime::new().unwrap();
        let term = terminology(&rt);
        assert_eq!(term.cuis_for_code("E11", None).unwrap(), vec!["C0011849"]);
        assert_eq!(
            term.cuis_for_code("J11", Some(Language::English)).unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn masks_credentials() {
        assert_eq!(
            mask_url("mysql://umls:secret@db:3306/umls"),
            "mysql://umls:***@db:3306/umls"
        );
        assert_eq!(mask_url("sqlite::memory:"), "sqlite::memory:");
    }
}
