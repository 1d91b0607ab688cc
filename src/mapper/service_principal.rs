//! `service_principal` block
//!
//! The flattened block carries the client secret: it is the storage-safe
//! form written back to the host's state. Anything printed or logged goes
//! through [`display_safe`](super::display_safe) first.

use serde_json::{json, Value};

use super::attrs::ResourceData;
use crate::cluster::ServicePrincipal;
use crate::Result;

/// Attribute key of the block
pub const SERVICE_PRINCIPAL: &str = "service_principal";

/// Build a [`ServicePrincipal`] from `service_principal = [{ client_id, client_secret }]`
pub fn expand_service_principal(data: &ResourceData) -> Result<ServicePrincipal> {
    let block = data.single_block(SERVICE_PRINCIPAL)?;
    Ok(ServicePrincipal {
        client_id: block.required_string("client_id")?.to_string(),
        client_secret: block.required_string("client_secret")?.to_string(),
    })
}

/// Flatten a [`ServicePrincipal`] into a single-element block list
pub fn flatten_service_principal(sp: &ServicePrincipal) -> Vec<Value> {
    vec![json!({
        "client_id": sp.client_id,
        "client_secret": sp.client_secret,
    })]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::display_safe;

    fn sample() -> ServicePrincipal {
        ServicePrincipal {
            client_id: "client id".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    #[test]
    fn flatten_emits_one_block_with_client_id() {
        let flattened = flatten_service_principal(&sample());
        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0]["client_id"], "client id");
    }

    #[test]
    fn round_trip_preserves_credentials() {
        let mut d = ResourceData::new();
        d.set(SERVICE_PRINCIPAL, flatten_service_principal(&sample()));
        assert_eq!(expand_service_principal(&d).unwrap(), sample());
    }

    #[test]
    fn missing_secret_is_rejected() {
        let mut d = ResourceData::new();
        d.set(SERVICE_PRINCIPAL, json!([{"client_id": "id"}]));
        let err = expand_service_principal(&d).unwrap_err();
        assert_eq!(err.field(), Some("service_principal.0.client_secret"));
    }

    #[test]
    fn display_channel_never_shows_secret() {
        let mut d = ResourceData::new();
        d.set(SERVICE_PRINCIPAL, flatten_service_principal(&sample()));
        let shown = display_safe(&d).into_value().to_string();
        assert!(shown.contains("client id"));
        assert!(!shown.contains("\"secret\""));
    }
}
