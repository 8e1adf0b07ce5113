// ABOUTME: Local system facts exposed to templates
// ABOUTME: Hostname, resolv.conf nameservers and available CPU count

use std::path::{Path, PathBuf};

use super::error::{ProviderError, Result};

const RESOLV_CONF: &str = "/etc/resolv.conf";

#[derive(Debug, Clone)]
pub struct SystemProbe {
    resolv_conf: PathBuf,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self {
            resolv_conf: PathBuf::from(RESOLV_CONF),
        }
    }
}

impl SystemProbe {
    /// Read nameservers from a different resolver file
    pub fn with_resolv_conf(path: impl AsRef<Path>) -> Self {
        Self {
            resolv_conf: path.as_ref().to_path_buf(),
        }
    }

    pub fn hostname(&self) -> Result<String> {
        let hostname = hostname::get().map_err(|e| ProviderError::Io {
            context: "getHostname".to_string(),
            source: e,
        })?;
        Ok(hostname.to_string_lossy().to_string())
    }

    pub fn nameservers(&self) -> Result<Vec<String>> {
        let contents =
            std::fs::read_to_string(&self.resolv_conf).map_err(|e| ProviderError::Io {
                context: format!("getNameServers: {}", self.resolv_conf.display()),
                source: e,
            })?;
        Ok(parse_nameservers(&contents))
    }

    pub fn num_cpu(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Collect the address of every `nameserver` line
pub fn parse_nameservers(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("nameserver") => fields.next().map(str::to_string),
                _ => None,
            }
        })
        .collect()
}
