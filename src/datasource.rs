//! Derivation of per-tenant connection strings.
//!
//! Every tenant gets its own database on the server described by the base
//! datasource. Where the tenant goes depends on the database provider:
//!
//! - path-style URLs (MySQL, PostgreSQL, MongoDB) get the tenant as their
//!   first path segment,
//! - SQL Server gets it as the `database` query parameter,
//! - file-based databases (SQLite) cannot host more than one database, so
//!   every tenant shares the base datasource.

use derive_more::{Display, Error};
use std::borrow::Cow;
use url::Url;

/// A database provider that a datasource URL can point to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display)]
pub enum DatabaseProvider {
    /// Microsoft SQL Server. The tenant selects the `database` parameter.
    #[display(fmt = "sqlserver")]
    SqlServer,
    /// MySQL. The tenant is the first path segment.
    #[display(fmt = "mysql")]
    MySql,
    /// PostgreSQL. The tenant is the first path segment.
    #[display(fmt = "postgresql")]
    PostgreSql,
    /// MongoDB. The tenant is the first path segment.
    #[display(fmt = "mongodb")]
    MongoDb,
    /// SQLite. All tenants share the same file.
    #[display(fmt = "sqlite")]
    Sqlite,
}

/// An error that occurred while deriving a tenant's datasource.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum DatasourceError {
    /// The datasource uses a protocol no provider is known for.
    #[display(fmt = "database provider `{}` is not supported", protocol)]
    UnsupportedProvider {
        /// The protocol of the datasource.
        protocol: String,
    },

    /// The datasource is not a valid URL.
    #[display(fmt = "invalid datasource: {}", source)]
    Invalid {
        /// The reason the datasource could not be parsed.
        source: url::ParseError,
    },

    /// The datasource has no authority, so no path can be added to it.
    #[display(fmt = "datasource `{}` cannot hold a database path", datasource)]
    NotHierarchical {
        /// The offending datasource.
        datasource: String,
    },
}

impl DatabaseProvider {
    /// Detects the provider of a datasource. A datasource without a
    /// `<protocol>://` prefix (such as `file:./dev.db`) is a local file
    /// and has no provider.
    ///
    /// ```
    /// use tenant_injector::DatabaseProvider;
    ///
    /// let provider = DatabaseProvider::from_datasource("mysql://localhost");
    /// assert_eq!(Ok(Some(DatabaseProvider::MySql)), provider);
    ///
    /// let provider = DatabaseProvider::from_datasource("file:./dev.db");
    /// assert_eq!(Ok(None), provider);
    ///
    /// assert!(DatabaseProvider::from_datasource("oracle://host").is_err());
    /// ```
    pub fn from_datasource(
        datasource: &str,
    ) -> Result<Option<Self>, DatasourceError> {
        let Some((protocol, _)) = datasource.split_once("://") else {
            return Ok(None);
        };

        let provider = match protocol.to_ascii_lowercase().as_str() {
            "sqlserver" => DatabaseProvider::SqlServer,
            "mysql" => DatabaseProvider::MySql,
            "postgresql" | "postgres" => DatabaseProvider::PostgreSql,
            "mongodb" | "mongodb+srv" => DatabaseProvider::MongoDb,
            "file" | "sqlite" => DatabaseProvider::Sqlite,
            _ => {
                return Err(DatasourceError::UnsupportedProvider {
                    protocol: protocol.to_owned(),
                });
            }
        };

        Ok(Some(provider))
    }

    /// Whether every tenant has to share the base datasource.
    #[must_use]
    pub fn is_shared(self) -> bool {
        matches!(self, DatabaseProvider::Sqlite)
    }

    /// Derives the datasource of a tenant from the base datasource.
    ///
    /// ```
    /// use tenant_injector::DatabaseProvider;
    ///
    /// let url = DatabaseProvider::PostgreSql
    ///     .tenant_url("postgresql://user:pass@db:5432", "acme")
    ///     .unwrap();
    /// assert_eq!("postgresql://user:pass@db:5432/acme", url);
    ///
    /// let url = DatabaseProvider::SqlServer
    ///     .tenant_url("sqlserver://user:pass@db:1433", "acme")
    ///     .unwrap();
    /// assert_eq!("sqlserver://user:pass@db:1433?database=acme", url);
    /// ```
    pub fn tenant_url<'a>(
        self,
        datasource: &'a str,
        tenant: &str,
    ) -> Result<Cow<'a, str>, DatasourceError> {
        if self.is_shared() {
            return Ok(Cow::Borrowed(datasource));
        }

        let mut url = Url::parse(datasource)
            .map_err(|source| DatasourceError::Invalid { source })?;
        match self {
            DatabaseProvider::SqlServer => set_database_param(&mut url, tenant),
            _ => prepend_path_segment(&mut url, tenant, datasource)?,
        }

        Ok(Cow::Owned(url.into()))
    }
}

fn set_database_param(url: &mut Url, tenant: &str) {
    let mut replaced = false;
    let params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            if key == "database" {
                replaced = true;
                (key.into_owned(), tenant.to_owned())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear().extend_pairs(params);
    if !replaced {
        query.append_pair("database", tenant);
    }
}

fn prepend_path_segment(
    url: &mut Url,
    tenant: &str,
    datasource: &str,
) -> Result<(), DatasourceError> {
    let rest = url.path().trim_start_matches('/').to_owned();
    url.path_segments_mut()
        .map_err(|()| DatasourceError::NotHierarchical {
            datasource: datasource.to_owned(),
        })?
        .clear()
        .push(tenant);

    if !rest.is_empty() {
        url.set_path(&format!("{}/{rest}", url.path()));
    }

    Ok(())
}
