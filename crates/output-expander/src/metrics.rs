use crate::error::{RegisterError, Result};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

#[derive(Clone)]
pub struct CodecMetrics {
    pub decoded: IntCounter,
    pub encoded: IntCounter,
    pub unknown_register: IntCounter,
    pub malformed_payload: IntCounter,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub codec: CodecMetrics,
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    IntCounter::new(name, help).map_err(|e| RegisterError::Metrics(format!("init {name}: {e}")))
}

impl MetricsHub {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let codec = CodecMetrics {
            decoded: counter("oe_messages_decoded", "Messages decoded into register values")?,
            encoded: counter("oe_messages_encoded", "Messages built from register values")?,
            unknown_register: counter(
                "oe_unknown_register",
                "Messages addressed to no known register",
            )?,
            malformed_payload: counter(
                "oe_malformed_payload",
                "Messages whose payload did not fit their register",
            )?,
        };
        for c in [
            &codec.decoded,
            &codec.encoded,
            &codec.unknown_register,
            &codec.malformed_payload,
        ] {
            registry
                .register(Box::new(c.clone()))
                .map_err(|e| RegisterError::Metrics(e.to_string()))?;
        }
        Ok(Self { registry, codec })
    }

    /// Prometheus text exposition of every registered counter
    pub fn encode_text(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| RegisterError::Metrics(format!("encode: {e}")))?;
        String::from_utf8(buf).map_err(|e| RegisterError::Metrics(format!("encode: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_counters_as_text() {
        let hub = MetricsHub::new().unwrap();
        hub.codec.decoded.inc_by(3);
        let text = hub.encode_text().unwrap();
        assert!(text.contains("oe_messages_decoded 3"));
        assert!(text.contains("oe_unknown_register 0"));
    }
}
