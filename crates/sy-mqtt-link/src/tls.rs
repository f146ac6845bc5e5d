//! TLS transport selection.
//!
//! TLS kicks in only when a CA certificate path is configured; a client
//! certificate + key pair on top enables mutual TLS for brokers that
//! demand it. Without a CA path the link stays plain TCP.

use rumqttc::Transport;

use crate::config::MqttConfig;
use crate::error::{LinkError, LinkResult};

/// Pick the transport for the configured broker.
pub fn transport(config: &MqttConfig) -> LinkResult<Transport> {
    let Some(ca_path) = &config.ca_cert_path else {
        return Ok(Transport::Tcp);
    };

    let ca = std::fs::read(ca_path)
        .map_err(|e| LinkError::Tls(format!("failed to read CA cert '{ca_path}': {e}")))?;

    let client_auth = match (&config.client_cert_path, &config.client_key_path) {
        (Some(cert_path), Some(key_path)) => {
            let cert = std::fs::read(cert_path).map_err(|e| {
                LinkError::Tls(format!("failed to read client cert '{cert_path}': {e}"))
            })?;
            let key = std::fs::read(key_path).map_err(|e| {
                LinkError::Tls(format!("failed to read client key '{key_path}': {e}"))
            })?;
            Some((cert, key))
        }
        (None, None) => None,
        _ => {
            return Err(LinkError::Tls(
                "client_cert_path and client_key_path must be set together".into(),
            ));
        }
    };

    Ok(Transport::tls_with_config(
        rumqttc::TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth,
        },
    ))
}
