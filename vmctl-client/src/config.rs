//! Host connection settings and power-on options.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Virtualization product the client talks to (`vmrun -T <type>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostType {
    /// Workstation on the local machine.
    #[default]
    #[serde(alias = "workstation")]
    Ws,
    /// Player on the local machine.
    Player,
    /// Fusion on the local machine.
    Fusion,
    /// Server 2.x, reached through a host URL.
    Server,
    /// ESX/ESXi host.
    Esx,
    /// vCenter.
    Vc,
}

impl HostType {
    /// Remote hosts need a URL and credentials and address VMs by
    /// datastore path rather than local file path.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::Server | Self::Esx | Self::Vc)
    }

    /// Value passed to `vmrun -T`.
    #[must_use]
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Player => "player",
            Self::Fusion => "fusion",
            Self::Server => "server",
            Self::Esx => "esx",
            Self::Vc => "vc",
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl FromStr for HostType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ws" | "workstation" => Ok(Self::Ws),
            "player" => Ok(Self::Player),
            "fusion" => Ok(Self::Fusion),
            "server" => Ok(Self::Server),
            "esx" => Ok(Self::Esx),
            "vc" => Ok(Self::Vc),
            other => Err(ClientError::InvalidHost {
                reason: format!("unknown host type '{other}'"),
            }),
        }
    }
}

/// Where and how to reach the virtualization host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct HostConfig {
    /// Path to the `vmrun` binary, or a bare name looked up in `PATH`.
    pub vmrun_path: PathBuf,

    /// Product type.
    pub host_type: HostType,

    /// Host URL for remote products, e.g. `https://192.2.3.4:8333/sdk`.
    pub host: Option<String>,

    /// User name for remote products.
    pub user: Option<String>,

    /// Password for remote products.
    pub password: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            vmrun_path: PathBuf::from("vmrun"),
            host_type: HostType::Ws,
            host: None,
            user: None,
            password: None,
        }
    }
}

impl HostConfig {
    /// Arguments prefixed to every `vmrun` invocation.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidHost`] when a remote host type has no URL.
    pub fn vmrun_args(&self) -> Result<Vec<String>, ClientError> {
        let mut args = vec!["-T".to_owned(), self.host_type.as_arg().to_owned()];
        if self.host_type.is_remote() {
            let host = self.host.as_deref().filter(|h| !h.is_empty()).ok_or_else(|| {
                ClientError::InvalidHost {
                    reason: format!("host type {} requires a host URL", self.host_type),
                }
            })?;
            args.extend(["-h".to_owned(), host.to_owned()]);
            if let Some(user) = &self.user {
                args.extend(["-u".to_owned(), user.clone()]);
            }
            if let Some(password) = &self.password {
                args.extend(["-p".to_owned(), password.clone()]);
            }
        }
        Ok(args)
    }
}

/// Options for [`VmControl::power_on`](crate::VmControl::power_on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerOnOptions {
    /// Open the product UI for the VM.
    #[default]
    LaunchGui,
    /// Run without UI.
    Headless,
}

impl PowerOnOptions {
    /// Value passed to `vmrun start`.
    #[must_use]
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::LaunchGui => "gui",
            Self::Headless => "nogui",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_host_args_only_name_the_product() {
        let config = HostConfig::default();
        let args = match config.vmrun_args() {
            Ok(a) => a,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(args, vec!["-T", "ws"]);
    }

    #[test]
    fn remote_host_args_include_credentials() {
        let config = HostConfig {
            host_type: HostType::Server,
            host: Some("https://192.2.3.4:8333/sdk".to_owned()),
            user: Some("root".to_owned()),
            password: Some("hideme".to_owned()),
            ..HostConfig::default()
        };
        let args = match config.vmrun_args() {
            Ok(a) => a,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(
            args,
            vec!["-T", "server", "-h", "https://192.2.3.4:8333/sdk", "-u", "root", "-p", "hideme"]
        );
    }

    #[test]
    fn remote_host_without_url_is_rejected() {
        let config = HostConfig { host_type: HostType::Esx, ..HostConfig::default() };
        assert!(matches!(config.vmrun_args(), Err(ClientError::InvalidHost { .. })));
    }

    #[test]
    fn host_type_parses_case_insensitively() {
        assert_eq!("Workstation".parse::<HostType>().ok(), Some(HostType::Ws));
        assert_eq!("PLAYER".parse::<HostType>().ok(), Some(HostType::Player));
        assert!("hyperv".parse::<HostType>().is_err());
    }

    #[test]
    fn config_file_accepts_workstation_like_the_environment() {
        let config: HostConfig = match serde_json::from_str(r#"{"host_type":"workstation"}"#) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.host_type, HostType::Ws);
        assert_eq!(Ok(config.host_type), "workstation".parse::<HostType>().map_err(|e| e.to_string()));
    }

    #[test]
    fn host_config_deserializes_with_defaults() {
        let config: HostConfig = match serde_json::from_str(r#"{"host_type":"player"}"#) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.host_type, HostType::Player);
        assert_eq!(config.vmrun_path, PathBuf::from("vmrun"));
    }
}
