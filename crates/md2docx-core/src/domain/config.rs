//! Backend configuration value object.

use serde::{Deserialize, Serialize};

/// Port the backend listens on when nothing else is configured.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

const fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

/// Configuration round-tripped to and from the backend.
///
/// Decoding is lenient: the backend's GET reply wraps these fields in an
/// envelope (`success`, `message`) and may omit `server_port`, which then
/// falls back to [`DEFAULT_SERVER_PORT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(default)]
    pub pandoc_path: String,
    #[serde(default)]
    pub template_file: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            pandoc_path: String::new(),
            template_file: String::new(),
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let config = ConfigData {
            pandoc_path: "/usr/bin/pandoc".to_string(),
            template_file: String::new(),
            server_port: 8081,
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            json!({"pandoc_path": "/usr/bin/pandoc", "template_file": "", "server_port": 8081})
        );
    }

    #[test]
    fn test_decode_envelope_without_port() {
        let config: ConfigData = serde_json::from_value(json!({
            "success": true,
            "message": "ok",
            "pandoc_path": "pandoc",
            "template_file": "/t/ref.docx"
        }))
        .unwrap();
        assert_eq!(config.pandoc_path, "pandoc");
        assert_eq!(config.template_file, "/t/ref.docx");
        assert_eq!(config.server_port, DEFAULT_SERVER_PORT);
    }
}
