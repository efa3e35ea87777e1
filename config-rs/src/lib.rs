//! config-rs/lib.rs
//! Shared configuration utilities for the image report pipeline services.
//! Provides standardized port/address management and per-hop timeouts.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Default upload size accepted by the gateway and the stages (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Load a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    if dotenv::dotenv().is_err() {
        log::debug!("No .env file found, using process environment only");
    }
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "GATEWAY", "DETECTION")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// The port number to use for the service
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    env::var(&var_name)
        .unwrap_or_else(|_| default_port.to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        })
}

/// Create a SocketAddr for binding a service
///
/// `{NAME}_SERVICE_ADDR` may carry a full `host:port` or `http://host:port`
/// override; otherwise the service binds on all interfaces.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        let stripped = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str)
            .trim_end_matches('/');

        if let Ok(addr) = stripped.parse::<SocketAddr>() {
            return addr;
        }
        log::warn!("Invalid address format in {}, using default", var_name);
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Get client connection address for connecting to a service
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "DETECTION", "FEEDBACK")
/// * `default_port` - The default port to use if not specified in environment
/// * `host` - Optional host to use if not specified in environment (default: "localhost")
///
/// # Returns
/// A base URL for the client to connect to the service
pub fn get_client_address(service_name: &str, default_port: u16, host: Option<&str>) -> String {
    let addr_var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());
    let port_var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());

    if let Ok(addr) = env::var(&addr_var_name) {
        if addr.starts_with("http://") || addr.starts_with("https://") {
            return addr.trim_end_matches('/').to_string();
        }
        return format!("http://{}", addr);
    }

    let port = env::var(&port_var_name)
        .unwrap_or_else(|_| default_port.to_string())
        .parse::<u16>()
        .unwrap_or(default_port);

    let host = host.unwrap_or("localhost");
    format!("http://{}:{}", host, port)
}

/// Timeout for the hop *into* the named service.
///
/// Read from `{NAME}_HOP_TIMEOUT_SECS`; falls back to the service's default.
pub fn get_hop_timeout(service_name: &str) -> Duration {
    let var_name = format!("{}_HOP_TIMEOUT_SECS", service_name.to_uppercase());
    let default_secs = get_default_hop_timeout_secs(service_name);
    let secs = match env::var(&var_name) {
        Ok(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            log::warn!("Invalid timeout in {}, using default {}s", var_name, default_secs);
            default_secs
        }),
        Err(_) => default_secs,
    };
    Duration::from_secs(secs)
}

/// Maximum accepted upload size, from `MAX_UPLOAD_BYTES`.
pub fn get_max_upload_bytes() -> usize {
    env::var("MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
}

/// Get service name for logging and monitoring
pub fn get_formatted_service_name(service_name: &str) -> String {
    match service_name.to_uppercase().as_str() {
        "GATEWAY" => "api-gateway".to_string(),
        "DETECTION" => "detection-service".to_string(),
        "ANALYSIS" => "analysis-service".to_string(),
        "FEEDBACK" => "feedback-service".to_string(),
        _ => format!("{}-service", service_name.to_lowercase()),
    }
}

/// Get default port for a specific service
pub fn get_default_port(service_name: &str) -> u16 {
    match service_name.to_uppercase().as_str() {
        "GATEWAY" => 5000,
        "DETECTION" => 5001,
        "ANALYSIS" => 5002,
        "FEEDBACK" => 5003,
        _ => 5100,
    }
}

/// Services that are called over a hop, outermost first.
pub const HOP_CHAIN: [&str; 3] = ["DETECTION", "ANALYSIS", "FEEDBACK"];

/// Default timeout in seconds for the hop into a service.
///
/// Each hop outlasts the one below it, so a slow stage times out at its
/// caller and the caller still reports back with its own contribution.
pub fn get_default_hop_timeout_secs(service_name: &str) -> u64 {
    match service_name.to_uppercase().as_str() {
        "DETECTION" => 150,
        "ANALYSIS" => 130,
        "FEEDBACK" => 100,
        _ => 30,
    }
}

/// Adjacent hops, outer then inner, where the outer timeout is not longer
/// than the inner one.
pub fn misordered_hops<'a>(timeouts: &[(&'a str, Duration)]) -> Vec<(&'a str, &'a str)> {
    timeouts
        .windows(2)
        .filter(|pair| pair[0].1 <= pair[1].1)
        .map(|pair| (pair[0].0, pair[1].0))
        .collect()
}

/// Warn about configured hop timeouts that would let an outer hop give up
/// before the inner one can report. Returns `true` when the chain is ordered.
pub fn check_hop_timeout_order() -> bool {
    let timeouts: Vec<(&str, Duration)> = HOP_CHAIN
        .iter()
        .map(|name| (*name, get_hop_timeout(name)))
        .collect();

    let misordered = misordered_hops(&timeouts);
    for (outer, inner) in &misordered {
        log::warn!(
            "{}_HOP_TIMEOUT_SECS ({}s) is not longer than {}_HOP_TIMEOUT_SECS ({}s); \
             a slow {} will be reported as a {} timeout",
            outer,
            get_hop_timeout(outer).as_secs(),
            inner,
            get_hop_timeout(inner).as_secs(),
            get_formatted_service_name(inner),
            get_formatted_service_name(outer),
        );
    }
    misordered.is_empty()
}

/// Per-service view over the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    service_name: String,
}

impl ServiceConfig {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_uppercase(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn display_name(&self) -> String {
        get_formatted_service_name(&self.service_name)
    }

    pub fn get_service_port(&self) -> u16 {
        get_service_port(&self.service_name, get_default_port(&self.service_name))
    }

    pub fn get_bind_address(&self) -> SocketAddr {
        get_bind_address(&self.service_name, get_default_port(&self.service_name))
    }

    /// Base URL of another service, honouring that service's overrides.
    pub fn get_client_address(&self, target: &str) -> String {
        get_client_address(target, get_default_port(target), None)
    }

    /// Timeout this service applies when calling `target`.
    pub fn get_hop_timeout(&self, target: &str) -> Duration {
        get_hop_timeout(target)
    }

    pub fn get_max_upload_bytes(&self) -> usize {
        get_max_upload_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_service_port() {
        std::env::set_var("CFGTEST_SERVICE_PORT", "9000");
        assert_eq!(get_service_port("CFGTEST", 8000), 9000);

        std::env::set_var("CFGBAD_SERVICE_PORT", "not-a-port");
        assert_eq!(get_service_port("CFGBAD", 8000), 8000);

        std::env::remove_var("UNKNOWN_SERVICE_PORT");
        assert_eq!(get_service_port("UNKNOWN", 8000), 8000);
    }

    #[test]
    fn test_get_bind_address() {
        std::env::set_var("BINDTEST_SERVICE_ADDR", "http://127.0.0.1:6001");
        assert_eq!(
            get_bind_address("BINDTEST", 6000),
            "127.0.0.1:6001".parse::<SocketAddr>().unwrap()
        );

        std::env::remove_var("BINDDEFAULT_SERVICE_ADDR");
        std::env::remove_var("BINDDEFAULT_SERVICE_PORT");
        assert_eq!(
            get_bind_address("BINDDEFAULT", 6000),
            "0.0.0.0:6000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_get_client_address() {
        std::env::set_var("CLIENTTEST_SERVICE_ADDR", "http://example.com:9000/");
        assert_eq!(get_client_address("CLIENTTEST", 8000, None), "http://example.com:9000");

        std::env::set_var("CLIENTBARE_SERVICE_ADDR", "10.0.0.5:9000");
        assert_eq!(get_client_address("CLIENTBARE", 8000, None), "http://10.0.0.5:9000");

        std::env::remove_var("CLIENTPORT_SERVICE_ADDR");
        std::env::set_var("CLIENTPORT_SERVICE_PORT", "9001");
        assert_eq!(get_client_address("CLIENTPORT", 8000, None), "http://localhost:9001");

        std::env::remove_var("CLIENTNONE_SERVICE_ADDR");
        std::env::remove_var("CLIENTNONE_SERVICE_PORT");
        assert_eq!(get_client_address("CLIENTNONE", 8000, None), "http://localhost:8000");
        assert_eq!(
            get_client_address("CLIENTNONE", 8000, Some("service.local")),
            "http://service.local:8000"
        );
    }

    #[test]
    fn test_hop_timeouts() {
        std::env::remove_var("ANALYSIS_HOP_TIMEOUT_SECS");
        assert_eq!(get_hop_timeout("analysis"), Duration::from_secs(130));

        std::env::set_var("HOPTEST_HOP_TIMEOUT_SECS", "7");
        assert_eq!(get_hop_timeout("HOPTEST"), Duration::from_secs(7));

        std::env::set_var("HOPBAD_HOP_TIMEOUT_SECS", "soon");
        assert_eq!(get_hop_timeout("HOPBAD"), Duration::from_secs(30));
    }

    #[test]
    fn test_pipeline_defaults() {
        let ports: Vec<u16> = ["GATEWAY", "DETECTION", "ANALYSIS", "FEEDBACK"]
            .into_iter()
            .map(get_default_port)
            .collect();
        assert_eq!(ports, vec![5000, 5001, 5002, 5003]);
        assert_eq!(get_formatted_service_name("analysis"), "analysis-service");

        let config = ServiceConfig::new("detection");
        assert_eq!(config.service_name(), "DETECTION");
        assert_eq!(config.display_name(), "detection-service");
    }

    #[test]
    fn test_default_hop_timeouts_shrink_inward() {
        let defaults: Vec<(&str, Duration)> = HOP_CHAIN
            .iter()
            .map(|name| (*name, Duration::from_secs(get_default_hop_timeout_secs(name))))
            .collect();

        assert!(misordered_hops(&defaults).is_empty(), "{:?}", defaults);
        assert!(defaults.iter().all(|(_, t)| *t >= Duration::from_secs(15) && *t <= Duration::from_secs(150)));
    }

    #[test]
    fn test_misordered_hops_are_reported() {
        let timeouts = [
            ("DETECTION", Duration::from_secs(150)),
            ("ANALYSIS", Duration::from_secs(15)),
            ("FEEDBACK", Duration::from_secs(120)),
        ];
        assert_eq!(misordered_hops(&timeouts), vec![("ANALYSIS", "FEEDBACK")]);

        let equal = [("ANALYSIS", Duration::from_secs(100)), ("FEEDBACK", Duration::from_secs(100))];
        assert_eq!(misordered_hops(&equal), vec![("ANALYSIS", "FEEDBACK")]);
    }
}
