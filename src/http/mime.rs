//! # Tabla de mime types
//! src/http/mime.rs
//!
//! Mapea extensiones de archivo a mime types para los archivos estáticos.

use std::collections::HashMap;

/// Mime type cuando la extensión no es conocida
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const DEFAULT_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/plain"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
];

/// Tabla extensión → mime type
#[derive(Debug, Clone)]
pub struct MimeTypes {
    types: HashMap<String, String>,
}

impl MimeTypes {
    /// Tabla con los tipos más comunes
    pub fn new() -> Self {
        let types = DEFAULT_TYPES
            .iter()
            .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
            .collect();
        Self { types }
    }

    /// Agrega o reemplaza una entrada (la extensión va sin punto)
    pub fn insert(&mut self, extension: &str, mime_type: &str) {
        self.types
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), mime_type.to_string());
    }

    /// Busca el mime type de una extensión, sin distinguir mayúsculas
    ///
    /// # Ejemplo
    /// ```
    /// use smart_http_server::http::MimeTypes;
    ///
    /// let mimes = MimeTypes::new();
    /// assert_eq!(mimes.lookup("PNG"), "image/png");
    /// assert_eq!(mimes.lookup("xyz"), "application/octet-stream");
    /// ```
    pub fn lookup(&self, extension: &str) -> &str {
        self.types
            .get(&extension.to_ascii_lowercase())
            .map_or(DEFAULT_MIME_TYPE, String::as_str)
    }
}

impl Default for MimeTypes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mimes = MimeTypes::new();
        assert_eq!(mimes.lookup("html"), "text/html");
        assert_eq!(mimes.lookup("Jpg"), "image/jpeg");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(MimeTypes::new().lookup("bin"), DEFAULT_MIME_TYPE);
        assert_eq!(MimeTypes::new().lookup(""), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_insert_override() {
        let mut mimes = MimeTypes::new();
        mimes.insert(".TXT", "text/x-custom");
        mimes.insert("wasm", "application/wasm");
        assert_eq!(mimes.lookup("txt"), "text/x-custom");
        assert_eq!(mimes.lookup("wasm"), "application/wasm");
    }
}
