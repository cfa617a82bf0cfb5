use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub media_root: PathBuf,
    pub page_size: u64,
    pub last_movies: u64,
    pub admin: Option<AdminCredentials>,
}

#[derive(Clone, Debug)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `var`, which returns `None` for unset keys.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&var, "PORT", 3000)?;

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://cinema.db?mode=rwc".to_string());

        let media_root = PathBuf::from(var("MEDIA_ROOT").unwrap_or_else(|| "media".to_string()));

        let page_size: u64 = parse_or(&var, "PAGE_SIZE", 2)?;
        anyhow::ensure!(page_size > 0, "PAGE_SIZE must be positive");

        let last_movies: u64 = parse_or(&var, "LAST_MOVIES", 2)?;

        let admin = match (var("ADMIN_USERNAME"), var("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !password.is_empty() => {
                Some(AdminCredentials { username, password })
            }
            _ => None,
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            media_root,
            page_size,
            last_movies,
            admin,
        })
    }
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key}={raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.page_size, 2);
        assert_eq!(config.last_movies, 2);
        assert!(config.admin.is_none());
    }

    #[test]
    fn numeric_settings_are_parsed() {
        let config = load(&[("PAGE_SIZE", "10"), ("LAST_MOVIES", "5")]).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.last_movies, 5);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let err = load(&[("LAST_MOVIES", "five")]).unwrap_err();
        assert!(format!("{err:#}").contains("LAST_MOVIES"));

        let err = load(&[("PAGE_SIZE", "-1")]).unwrap_err();
        assert!(format!("{err:#}").contains("PAGE_SIZE"));

        assert!(load(&[("PAGE_SIZE", "0")]).is_err());
    }

    #[test]
    fn admin_needs_both_credentials() {
        assert!(load(&[("ADMIN_USERNAME", "staff")]).unwrap().admin.is_none());
        let config = load(&[("ADMIN_USERNAME", "staff"), ("ADMIN_PASSWORD", "secret")]).unwrap();
        let admin = config.admin.unwrap();
        assert_eq!((admin.username.as_str(), admin.password.as_str()), ("staff", "secret"));
    }
}
