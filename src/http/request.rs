//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser de la cabecera de un request HTTP/1.0 o HTTP/1.1. Solo se
//! acepta `GET`; el body se ignora.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /path?param1=value1&param2=value2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Cookie: sid="ABCDEFGHIJKLMNOPQRST"\r\n
//! \r\n
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.x`
//! 2. **Headers**: pares `Name: Value`; una línea que empieza con espacio o
//!    tab continúa el header anterior
//! 3. **Empty Line**: fin de la cabecera

use super::status::StatusCode;
use std::collections::HashMap;
use thiserror::Error;

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestParseError {
    #[error("Empty request")]
    EmptyRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl RequestParseError {
    /// Status con el que se responde cada error
    pub fn status(&self) -> StatusCode {
        match self {
            RequestParseError::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
            RequestParseError::UnsupportedVersion(_) => StatusCode::HttpVersionNotSupported,
            _ => StatusCode::BadRequest,
        }
    }
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Siempre "GET" en un request aceptado
    method: String,

    /// Path decodificado, sin query (ej: "/scripts/osnovni.smscr")
    path: String,

    /// Query parameters decodificados
    query_params: HashMap<String, String>,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    /// Cookies recibidas (valores sin comillas)
    cookies: HashMap<String, String>,

    /// "HTTP/1.0" o "HTTP/1.1"
    version: String,
}

impl Request {
    /// Parsea la cabecera de un request
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use smart_http_server::http::Request;
    ///
    /// let raw = b"GET /calc?a=10&b=20 HTTP/1.1\r\nHost: localhost:8080\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/calc");
    /// assert_eq!(request.query_param("a"), Some("10"));
    /// assert_eq!(request.host(), Some("localhost"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, RequestParseError> {
        let request_str = String::from_utf8_lossy(buffer);

        // Las líneas se separan por '\n'; un '\r' final se descarta
        let mut lines = request_str.split('\n').map(|line| line.trim_end_matches('\r'));

        let request_line = lines
            .by_ref()
            .find(|line| !line.trim().is_empty())
            .ok_or(RequestParseError::EmptyRequest)?;

        // 1. Request line
        let (method, path, query_params, version) = Self::parse_request_line(request_line)?;

        // 2. Headers
        let headers = Self::parse_headers(lines)?;

        // 3. Cookies
        let cookies = headers
            .get("cookie")
            .map(|value| Self::parse_cookies(value))
            .unwrap_or_default();

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            cookies,
            version,
        })
    }

    /// Formato: `GET /path?query HTTP/1.1`
    fn parse_request_line(
        line: &str,
    ) -> Result<(String, String, HashMap<String, String>, String), RequestParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(RequestParseError::InvalidRequestLine);
        }

        let method = parts[0];
        if !method.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(RequestParseError::InvalidRequestLine);
        }

        let version = parts[2];
        if !version.starts_with("HTTP/") {
            return Err(RequestParseError::InvalidRequestLine);
        }
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(RequestParseError::UnsupportedVersion(version.to_string()));
        }

        if method != "GET" {
            return Err(RequestParseError::MethodNotAllowed(method.to_string()));
        }

        if !parts[1].starts_with('/') {
            return Err(RequestParseError::InvalidRequestLine);
        }
        let (path, query_params) = Self::parse_path_and_query(parts[1]);

        Ok((method.to_string(), path, query_params, version.to_string()))
    }

    /// Ejemplo: "/calc?a=1&b=2" → ("/calc", {"a": "1", "b": "2"})
    fn parse_path_and_query(path_with_query: &str) -> (String, HashMap<String, String>) {
        match path_with_query.split_once('?') {
            Some((path, query)) => (url_decode(path, false), Self::parse_query_string(query)),
            None => (url_decode(path_with_query, false), HashMap::new()),
        }
    }

    /// Pares sin '=' o con nombre vacío se descartan
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (url_decode(key, true), url_decode(value, true)))
            .collect()
    }

    /// Cada header tiene formato "Name: Value"; el nombre se guarda en minúsculas
    fn parse_headers<'l>(
        lines: impl Iterator<Item = &'l str>,
    ) -> Result<HashMap<String, String>, RequestParseError> {
        let mut headers: HashMap<String, String> = HashMap::new();
        let mut last_name: Option<String> = None;

        for line in lines {
            // La línea vacía marca el fin de los headers
            if line.is_empty() {
                break;
            }

            // CR sueltos y otros caracteres de control no llegan a los headers
            if line.chars().any(|c| c.is_control() && c != '\t') {
                return Err(RequestParseError::InvalidHeader(line.escape_debug().to_string()));
            }

            // Continuación del header anterior
            if line.starts_with(' ') || line.starts_with('\t') {
                let name = last_name
                    .as_ref()
                    .ok_or_else(|| RequestParseError::InvalidHeader(line.to_string()))?;
                if let Some(value) = headers.get_mut(name) {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| RequestParseError::InvalidHeader(line.to_string()))?;
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return Err(RequestParseError::InvalidHeader(line.to_string()));
            }

            headers.insert(name.clone(), value.trim().to_string());
            last_name = Some(name);
        }

        Ok(headers)
    }

    /// `Cookie: a="1"; b=2` → {"a": "1", "b": "2"}
    fn parse_cookies(header: &str) -> HashMap<String, String> {
        header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                (name.trim().to_string(), value.to_string())
            })
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// # Ejemplo
    /// ```
    /// use smart_http_server::http::Request;
    ///
    /// let raw = b"GET /test?num=42 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.query_param("num"), Some("42"));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Busca un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|s| s.as_str())
    }

    /// Valor del header `Host` sin el puerto.
    ///
    /// `None` si falta o trae caracteres que no son de un hostname.
    pub fn host(&self) -> Option<&str> {
        let host = self.header("host")?;
        if !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':' | '[' | ']'))
        {
            return None;
        }
        let host = match host.rfind(':') {
            // "[::1]:8080" → "[::1]", "localhost:8080" → "localhost"
            Some(colon) if !host[colon..].contains(']') => &host[..colon],
            _ => host,
        };
        (!host.is_empty()).then_some(host)
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Decodifica secuencias `%XX`; con `plus_as_space` convierte '+' en espacio.
/// Una secuencia inválida se deja tal cual.
fn url_decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(high), Some(low)) => {
                        decoded.push(high << 4 | low);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' if plus_as_space => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}
