use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
};

use bollard::secret::{HostConfig, Mount, MountTypeEnum, PortBinding};

use crate::LaunchConfig;

pub const GRIST_CONTAINER_NAME: &str = "gristcontainer";
pub const GRIST_IMAGE: &str = "gristlabs/grist";
pub const GRIST_PORT: u16 = 8484;
/// Where the host directory shows up inside the container
pub const GRIST_PERSIST_DIR: &str = "/persist";
pub const GRIST_EMAIL_ENV_VAR_NAME: &str = "GRIST_DEFAULT_EMAIL";

/// Define port mapping like for the argument `-p
/// <host_ip>:<host_port>:<container_port>`. Only tcp is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBind {
    container_port: u16,
    host_port: Option<u16>,
    host_ip: Option<IpAddr>,
}

impl PortBind {
    /// Results in the port mapping `<port>:<port>`
    pub fn new(port: u16) -> Self {
        Self {
            container_port: port,
            host_port: Some(port),
            host_ip: None,
        }
    }

    /// Sets a different `host_port` in `<host_port>:<container_port>`
    pub fn with_host_port(mut self, host_port: u16) -> Self {
        self.host_port = Some(host_port);
        self
    }

    /// Sets a different host IP in `<host_ip>:<host_port>:<container_port>`
    pub fn with_host_ip(mut self, host_ip: IpAddr) -> Self {
        self.host_ip = Some(host_ip);
        self
    }

    pub fn container_port(&self) -> u16 {
        self.container_port
    }

    pub fn host_port(&self) -> u16 {
        self.host_port.unwrap_or(self.container_port)
    }

    pub fn host_ip(&self) -> Option<IpAddr> {
        self.host_ip
    }

    /// The engine's key for this port, e.g. `8484/tcp`
    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.container_port)
    }
}

impl From<u16> for PortBind {
    /// Calls `Self::new(port)`
    fn from(port: u16) -> Self {
        Self::new(port)
    }
}

/// Everything the engine needs to create the managed container. The launcher
/// only ever builds one of these, see [ContainerSpec::grist].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// `KEY=value` entries
    pub env_vars: Vec<String>,
    /// Read/write bind mounts as `(host_path, container_path)`
    pub binds: Vec<(PathBuf, String)>,
    pub port_bindings: Vec<PortBind>,
}

impl ContainerSpec {
    /// The fixed Grist container: `gristlabs/grist` named `gristcontainer`,
    /// port 8484 published on `127.0.0.1:8484`, `config.host_dir` mounted at
    /// `/persist`, and `GRIST_DEFAULT_EMAIL` set to `config.email`.
    pub fn grist(config: &LaunchConfig) -> Self {
        Self {
            name: GRIST_CONTAINER_NAME.to_owned(),
            image: GRIST_IMAGE.to_owned(),
            env_vars: vec![format!("{GRIST_EMAIL_ENV_VAR_NAME}={}", config.email)],
            binds: vec![(config.host_dir.clone(), GRIST_PERSIST_DIR.to_owned())],
            port_bindings: vec![
                PortBind::new(GRIST_PORT).with_host_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
            ],
        }
    }

    /// The argument to the API's equivalent of `docker create`. Nothing beyond
    /// what is in `self` gets set, so there are no resource limits, restart
    /// policy, or extra networks.
    pub fn to_bollard_config(&self) -> bollard::container::Config<String> {
        let (exposed_ports, port_bindings) = port_bindings_to_bollard_args(&self.port_bindings);

        // [docker reference](https://docs.docker.com/reference/api/engine/version/v1.47/#tag/Container/operation/ContainerCreate)
        let mounts = self
            .binds
            .iter()
            .map(|(host, container)| Mount {
                typ: Some(MountTypeEnum::BIND),
                source: Some(host.to_string_lossy().into_owned()),
                target: Some(container.clone()),
                read_only: Some(false),
                ..Default::default()
            })
            .collect();

        bollard::container::Config {
            image: Some(self.image.clone()),
            tty: Some(false),
            exposed_ports,
            env: Some(self.env_vars.clone()),
            host_config: Some(HostConfig {
                port_bindings,
                mounts: Some(mounts),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[allow(clippy::type_complexity)] // internal only
pub(crate) fn port_bindings_to_bollard_args(
    pbs: &[PortBind],
) -> (
    Option<HashMap<String, HashMap<(), ()>>>,
    Option<HashMap<String, Option<Vec<PortBinding>>>>,
) {
    Some(
        pbs.iter()
            .map(|pb| {
                (
                    (pb.port_key(), HashMap::new()),
                    (
                        pb.port_key(),
                        Some(vec![PortBinding {
                            host_port: Some(pb.host_port().to_string()),
                            host_ip: pb.host_ip.as_ref().map(ToString::to_string),
                        }]),
                    ),
                )
            })
            .unzip(),
    )
    .unzip()
}
