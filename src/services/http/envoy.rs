//! Payloads for the load-balancer discovery endpoints: the v1 registration format and the
//! v2 endpoint discovery (`ClusterLoadAssignment`) format.

use serde::{Deserialize, Serialize};

pub const CLUSTER_LOAD_ASSIGNMENT_TYPE: &str =
    "type.googleapis.com/envoy.api.v2.ClusterLoadAssignment";
pub const DEFAULT_AVAILABILITY_ZONE: &str = "default";

/// 端点解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointParseError {
    #[error("Endpoint '{0}' doesn't contain port info")]
    MissingPort(String),
    #[error("Failed to parse port from endpoint '{0}'")]
    InvalidPort(String),
}

/// 将 `host:port` 拆分为主机与端口；以最后一个冒号分隔，IPv6 地址必须写成 `[v6]:port`
pub fn parse_host_port(raw: &str) -> Result<(String, u16), EndpointParseError> {
    let missing_port = || EndpointParseError::MissingPort(raw.to_string());

    let (host, port) = raw
        .rsplit_once(':')
        .filter(|(host, _)| !host.is_empty())
        .ok_or_else(missing_port)?;

    // 不带方括号的主机里仍有冒号，说明这是一个没有端口的裸 IPv6 地址
    let host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(bracketed) if !bracketed.is_empty() => bracketed,
        Some(_) => return Err(missing_port()),
        None if host.contains(':') => return Err(missing_port()),
        None => host,
    };

    let port = port
        .parse::<u16>()
        .map_err(|_| EndpointParseError::InvalidPort(raw.to_string()))?;

    Ok((host.to_string(), port))
}

// ---------- v1 registration ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationV1Response {
    pub hosts: Vec<HostV1>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostV1 {
    pub ip_address: String,
    pub port: u16,
    pub tags: TagsV1,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagsV1 {
    pub az: String,
    pub canary: bool,
    pub load_balancing_weight: u32,
}

impl Default for TagsV1 {
    fn default() -> Self {
        Self {
            az: DEFAULT_AVAILABILITY_ZONE.to_string(),
            canary: false,
            load_balancing_weight: 1,
        }
    }
}

impl RegistrationV1Response {
    pub fn from_endpoints(endpoints: &[String]) -> Result<Self, EndpointParseError> {
        let hosts = endpoints
            .iter()
            .map(|endpoint| {
                let (ip_address, port) = parse_host_port(endpoint)?;
                Ok(HostV1 {
                    ip_address,
                    port,
                    tags: TagsV1::default(),
                })
            })
            .collect::<Result<Vec<_>, EndpointParseError>>()?;
        Ok(Self { hosts })
    }
}

// ---------- v2 endpoint discovery ----------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryV2Request {
    #[serde(default)]
    pub resource_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryV2Response {
    pub version_info: String,
    pub resources: Vec<ResourceV2>,
}

impl Default for DiscoveryV2Response {
    fn default() -> Self {
        Self {
            version_info: "v1".to_string(),
            resources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceV2 {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub cluster_name: String,
    pub endpoints: Vec<LocalityEndpointsV2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityEndpointsV2 {
    pub lb_endpoints: Vec<LbEndpointV2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbEndpointV2 {
    pub endpoint: EndpointV2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointV2 {
    pub address: AddressV2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressV2 {
    pub socket_address: SocketAddressV2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketAddressV2 {
    pub address: String,
    pub port_value: u16,
}

impl ResourceV2 {
    pub fn from_endpoints(
        cluster_name: &str,
        endpoints: &[String],
    ) -> Result<Self, EndpointParseError> {
        let lb_endpoints = endpoints
            .iter()
            .map(|endpoint| {
                let (address, port_value) = parse_host_port(endpoint)?;
                Ok(LbEndpointV2 {
                    endpoint: EndpointV2 {
                        address: AddressV2 {
                            socket_address: SocketAddressV2 {
                                address,
                                port_value,
                            },
                        },
                    },
                })
            })
            .collect::<Result<Vec<_>, EndpointParseError>>()?;

        Ok(Self {
            type_url: CLUSTER_LOAD_ASSIGNMENT_TYPE.to_string(),
            cluster_name: cluster_name.to_string(),
            endpoints: vec![LocalityEndpointsV2 { lb_endpoints }],
        })
    }
}
