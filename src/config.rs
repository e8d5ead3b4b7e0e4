//! Configuration structures.
//!
//! See [`doc/mirin.conf`](../doc/mirin.conf) on the repository for an
//! explanation of each setting.

use serde::{Deserialize, Serialize};
use std::{fmt, fs, io, net, path};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Format(serde_yaml::Error),
    InvalidDomain,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(err) => Some(err),
            Self::InvalidDomain => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(val: io::Error) -> Self { Self::Io(val) }
}

impl From<serde_yaml::Error> for Error {
    fn from(val: serde_yaml::Error) -> Self { Self::Format(val) }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => err.fmt(f),
            Self::Format(err) => err.fmt(f),
            Self::InvalidDomain => write!(f, "'domain' must be a domain name (e.g. chat.example.org)"),
        }
    }
}

/// The whole configuration.
#[derive(Deserialize, Serialize)]
pub struct Config {
    /// The domain of the server, used as prefix of all replies.
    #[serde(default = "domain")]
    pub domain: String,

    /// Listening addresses.
    #[serde(default = "bindings")]
    pub bindings: Vec<net::SocketAddr>,

    /// The number of worker threads; 0 lets the runtime choose.
    #[serde(default)]
    pub workers: usize,
}

fn bindings() -> Vec<net::SocketAddr> {
    vec![net::SocketAddr::from(([127, 0, 0, 1], 6667))]
}

fn domain() -> String {
    gethostname::gethostname().into_string()
        .unwrap_or_else(|_| String::from("mirin.localdomain"))
}

impl Config {
    pub fn sample() -> Self {
        Self {
            domain: String::from("mirin.localdomain"),
            bindings: bindings(),
            workers: 0,
        }
    }

    /// Reads the configuration file at the given path.
    pub fn from_file(path: impl AsRef<path::Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let res: Self = serde_yaml::from_str(&contents)?;

        if res.domain.is_empty() || res.domain.contains(|c: char| c.is_whitespace()) {
            return Err(Error::InvalidDomain);
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("domain: chat.example.org").unwrap();
        assert_eq!(config.domain, "chat.example.org");
        assert_eq!(config.bindings, bindings());
        assert_eq!(config.workers, 0);
    }

    #[test]
    fn test_sample_round_trip() {
        let sample = serde_yaml::to_string(&Config::sample()).unwrap();
        let config: Config = serde_yaml::from_str(&sample).unwrap();
        assert_eq!(config.domain, "mirin.localdomain");
        assert_eq!(config.bindings, bindings());
    }

    #[test]
    fn test_full_config() {
        let config: Config = serde_yaml::from_str("
domain: chat.example.org
bindings:
  - 0.0.0.0:6667
  - '[::]:6667'
workers: 4
").unwrap();
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.workers, 4);
    }
}
