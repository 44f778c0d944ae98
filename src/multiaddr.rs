//! Multiaddr to HTTP URL conversion.
//!
//! Only the shape `/<host-type>/<host>/tcp/<port>/<http|https>` is supported, which is how
//! providers advertise HTTP retrieval endpoints to IPNI.

use crate::error::MultiaddrError;

/// Convert an HTTP multiaddr into a base URL (no trailing slash).
///
/// Default ports (80 for http, 443 for https) are omitted from the URL.
pub fn multiaddr_to_http_url(addr: &str) -> Result<String, MultiaddrError> {
    let mut parts = addr.split('/').skip(1);
    let host_type = parts.next().unwrap_or_default();
    let host = parts.next().unwrap_or_default();
    let protocol = parts.next().unwrap_or_default();
    let port = parts.next().unwrap_or_default();
    let scheme = parts.next().unwrap_or_default();

    let host = match host_type {
        "ip4" | "dns" | "dns4" | "dns6" => host.to_string(),
        "ip6" => format!("[{host}]"),
        other => {
            return Err(MultiaddrError::UnsupportedHostType {
                addr: addr.to_string(),
                host_type: other.to_string(),
            });
        }
    };

    if protocol != "tcp" {
        return Err(MultiaddrError::UnsupportedProtocol {
            addr: addr.to_string(),
            protocol: protocol.to_string(),
        });
    }

    if scheme != "http" && scheme != "https" {
        return Err(MultiaddrError::UnsupportedScheme {
            addr: addr.to_string(),
            scheme: scheme.to_string(),
        });
    }

    if parts.next().is_some() {
        return Err(MultiaddrError::TooManyParts {
            addr: addr.to_string(),
        });
    }

    let default_port = matches!((scheme, port), ("http", "80") | ("https", "443"));
    if default_port {
        Ok(format!("{scheme}://{host}"))
    } else {
        Ok(format!("{scheme}://{host}:{port}"))
    }
}
