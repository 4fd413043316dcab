//! Farm membership as seen by the replay subsystem.
//!
//! The directory only answers "which addresses should receive a replication
//! call right now"; topology discovery is someone else's job.

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use url::Url;

/// Source of peer addresses and their replication participation flag.
pub trait NodeDirectory: Send + Sync {
    /// Address -> participates in replication.
    fn members(&self) -> BTreeMap<String, bool>;

    /// Participating peers, excluding `self_address` when given.
    fn replication_peers(&self, self_address: Option<&str>) -> Vec<String> {
        self.members()
            .into_iter()
            .filter(|(address, participates)| {
                *participates && Some(address.as_str()) != self_address
            })
            .map(|(address, _)| address)
            .collect()
    }
}

/// Directory built once from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticNodeDirectory {
    members: BTreeMap<String, bool>,
}

impl StaticNodeDirectory {
    #[must_use]
    pub fn new(members: BTreeMap<String, bool>) -> Self {
        Self { members }
    }

    /// Parse `ADDR[=true|false]` specs; the flag defaults to `true`.
    ///
    /// # Errors
    /// Returns an error if an address is not a valid base URL or a flag is not a boolean.
    pub fn parse<I, S>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut members = BTreeMap::new();
        for spec in specs {
            let spec = spec.as_ref().trim();
            if spec.is_empty() {
                continue;
            }
            let (address, participates) = match spec.rsplit_once('=') {
                Some((address, flag)) => {
                    let participates = flag
                        .trim()
                        .parse::<bool>()
                        .map_err(|_| anyhow!("invalid participation flag in peer spec: {spec}"))?;
                    (address, participates)
                }
                None => (spec, true),
            };
            members.insert(normalize_address(address)?, participates);
        }
        Ok(Self { members })
    }
}

impl NodeDirectory for StaticNodeDirectory {
    fn members(&self) -> BTreeMap<String, bool> {
        self.members.clone()
    }
}

/// Canonical base URL form for a node address.
///
/// A bare `host:port` gets an `http://` scheme; trailing slashes are dropped.
///
/// # Errors
/// Returns an error if the address is empty, not a URL, or has no host.
pub fn normalize_address(address: &str) -> Result<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(anyhow!("empty node address"));
    }

    let with_scheme = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| anyhow!("invalid node address {address}: {e}"))?;
    if url.host_str().is_none() {
        return Err(anyhow!("node address has no host: {address}"));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme_and_strips_slash() -> Result<()> {
        assert_eq!(normalize_address("node2:8080")?, "http://node2:8080");
        assert_eq!(normalize_address("https://node3:8443/")?, "https://node3:8443");
        assert_eq!(normalize_address(" http://10.0.0.4:8080 ")?, "http://10.0.0.4:8080");
        Ok(())
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(normalize_address("").is_err());
        assert!(normalize_address("http://").is_err());
        assert!(normalize_address("http://exa mple:80").is_err());
    }

    #[test]
    fn parse_specs_with_flags() -> Result<()> {
        let directory = StaticNodeDirectory::parse([
            "node1:8080",
            "node2:8080=false",
            "http://node3:8080=true",
            "",
        ])?;
        let members = directory.members();
        assert_eq!(members.len(), 3);
        assert_eq!(members.get("http://node1:8080"), Some(&true));
        assert_eq!(members.get("http://node2:8080"), Some(&false));
        assert_eq!(members.get("http://node3:8080"), Some(&true));
        Ok(())
    }

    #[test]
    fn parse_rejects_bad_flag() {
        assert!(StaticNodeDirectory::parse(["node1:8080=maybe"]).is_err());
    }

    #[test]
    fn replication_peers_skip_self_and_non_participants() -> Result<()> {
        let directory =
            StaticNodeDirectory::parse(["node1:8080", "node2:8080=false", "node3:8080"])?;
        assert_eq!(
            directory.replication_peers(Some("http://node1:8080")),
            vec!["http://node3:8080".to_string()]
        );
        assert_eq!(
            directory.replication_peers(None),
            vec![
                "http://node1:8080".to_string(),
                "http://node3:8080".to_string()
            ]
        );
        Ok(())
    }
}
