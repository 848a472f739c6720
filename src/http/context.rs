//! # Contexto de Request/Response
//! src/http/context.rs
//!
//! Estado de una petición mientras se procesa: parámetros, cookies de
//! salida y los datos del header. El header se genera una sola vez, en la
//! primera escritura; después de eso status, mime type, encoding, headers
//! y cookies ya no pueden cambiar.
//!
//! ## Formato del header
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html; charset=UTF-8\r\n
//! Content-Length: 13\r\n              (opcional)
//! X-Otro-Header: valor\r\n            (opcional)
//! Set-Cookie: sid="ABC"; Path=/\r\n   (uno por cookie)
//! \r\n
//! ```
//!
//! ## Tres espacios de parámetros
//!
//! - **parameters**: query string, solo lectura.
//! - **persistent parameters**: viven en la sesión y se comparten entre
//!   requests con el mismo `sid`.
//! - **temporary parameters**: solo durante esta cadena de dispatch.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use smart_http_server::http::RequestContext;
//! use std::collections::HashMap;
//!
//! let mut output = Vec::new();
//! let mut context = RequestContext::new(&mut output, HashMap::new(), Default::default(), Vec::new());
//! context.set_mime_type("text/plain").unwrap();
//! context.write_str("Hola").unwrap();
//! assert!(context.set_mime_type("text/html").is_err());
//! ```

use super::cookie::Cookie;
use crate::server::dispatch::Dispatcher;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Mapa de parámetros persistentes compartido por todas las requests de una sesión
pub type SharedParameters = Arc<RwLock<HashMap<String, String>>>;

/// Errores del contexto
#[derive(Debug, Error)]
pub enum ContextError {
    /// Se intentó modificar el header después de enviarlo
    #[error("cannot change {0}: header already sent")]
    HeaderAlreadySent(&'static str),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codificaciones soportadas para `write_str`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Utf8,
    Latin1,
}

impl Charset {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Some(Charset::Utf8),
            "ISO-8859-1" | "LATIN1" => Some(Charset::Latin1),
            _ => None,
        }
    }

    fn encode<'t>(&self, text: &'t str) -> Cow<'t, [u8]> {
        match self {
            Charset::Utf8 => Cow::Borrowed(text.as_bytes()),
            Charset::Latin1 => Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect(),
            ),
        }
    }
}

/// Contexto de una petición en curso
pub struct RequestContext<'a> {
    output: &'a mut dyn Write,

    /// Versión para la status line (ej: "1.1")
    version: String,
    status_code: u16,
    status_text: String,
    mime_type: String,
    encoding: String,
    charset: Charset,
    content_length: Option<u64>,

    /// Headers adicionales, en orden de inserción
    headers: Vec<(String, String)>,
    output_cookies: Vec<Cookie>,

    parameters: HashMap<String, String>,
    persistent_parameters: SharedParameters,
    temporary_parameters: HashMap<String, String>,

    header_generated: bool,
    dispatcher: Option<Arc<dyn Dispatcher>>,
}

impl<'a> RequestContext<'a> {
    /// Crea un contexto con status 200, `text/html` y UTF-8
    pub fn new(
        output: &'a mut dyn Write,
        parameters: HashMap<String, String>,
        persistent_parameters: SharedParameters,
        output_cookies: Vec<Cookie>,
    ) -> Self {
        Self {
            output,
            version: "1.1".to_string(),
            status_code: 200,
            status_text: "OK".to_string(),
            mime_type: "text/html".to_string(),
            encoding: "UTF-8".to_string(),
            charset: Charset::Utf8,
            content_length: None,
            headers: Vec::new(),
            output_cookies,
            parameters,
            persistent_parameters,
            temporary_parameters: HashMap::new(),
            header_generated: false,
            dispatcher: None,
        }
    }

    /// Versión HTTP de la status line; acepta `"HTTP/1.0"` o `"1.0"`
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.trim_start_matches("HTTP/").to_string();
        self
    }

    /// Dispatcher para reenviar internamente a otra ruta
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn dispatcher(&self) -> Option<Arc<dyn Dispatcher>> {
        self.dispatcher.clone()
    }

    // === Parámetros de la query string (solo lectura) ===

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Nombres ordenados alfabéticamente
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // === Parámetros persistentes (sesión) ===

    pub fn persistent_parameter(&self, name: &str) -> Option<String> {
        self.persistent_parameters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn persistent_parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .persistent_parameters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }

    pub fn set_persistent_parameter(&self, name: &str, value: &str) {
        self.persistent_parameters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_persistent_parameter(&self, name: &str) {
        self.persistent_parameters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    // === Parámetros temporales ===

    pub fn temporary_parameter(&self, name: &str) -> Option<&str> {
        self.temporary_parameters.get(name).map(String::as_str)
    }

    pub fn temporary_parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.temporary_parameters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn set_temporary_parameter(&mut self, name: &str, value: &str) {
        self.temporary_parameters
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_temporary_parameter(&mut self, name: &str) {
        self.temporary_parameters.remove(name);
    }

    // === Datos del header ===

    pub fn set_status_code(&mut self, code: u16) -> Result<(), ContextError> {
        self.ensure_header_pending("status code")?;
        self.status_code = code;
        Ok(())
    }

    pub fn set_status_text(&mut self, text: &str) -> Result<(), ContextError> {
        self.ensure_header_pending("status text")?;
        self.status_text = text.to_string();
        Ok(())
    }

    pub fn set_mime_type(&mut self, mime_type: &str) -> Result<(), ContextError> {
        self.ensure_header_pending("mime type")?;
        self.mime_type = mime_type.to_string();
        Ok(())
    }

    /// Cambia el encoding del texto escrito con [`write_str`](Self::write_str)
    pub fn set_encoding(&mut self, encoding: &str) -> Result<(), ContextError> {
        self.ensure_header_pending("encoding")?;
        self.charset = Charset::from_label(encoding)
            .ok_or_else(|| ContextError::UnsupportedEncoding(encoding.to_string()))?;
        self.encoding = encoding.to_string();
        Ok(())
    }

    pub fn set_content_length(&mut self, length: Option<u64>) -> Result<(), ContextError> {
        self.ensure_header_pending("content length")?;
        self.content_length = length;
        Ok(())
    }

    /// Agrega una línea de header adicional
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), ContextError> {
        self.ensure_header_pending("headers")?;
        self.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    pub fn add_cookie(&mut self, cookie: Cookie) -> Result<(), ContextError> {
        self.ensure_header_pending("cookies")?;
        self.output_cookies.push(cookie);
        Ok(())
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_header_generated(&self) -> bool {
        self.header_generated
    }

    // === Escritura ===

    /// Escribe bytes al cliente; la primera llamada envía antes el header
    pub fn write(&mut self, data: &[u8]) -> Result<(), ContextError> {
        if !self.header_generated {
            let header = self.render_header();
            self.output.write_all(header.as_bytes())?;
            self.header_generated = true;
        }
        self.output.write_all(data)?;
        Ok(())
    }

    /// Escribe texto codificado con el encoding actual
    pub fn write_str(&mut self, text: &str) -> Result<(), ContextError> {
        let charset = self.charset;
        self.write(&charset.encode(text))
    }

    pub fn flush(&mut self) -> Result<(), ContextError> {
        self.output.flush()?;
        Ok(())
    }

    fn ensure_header_pending(&self, what: &'static str) -> Result<(), ContextError> {
        if self.header_generated {
            Err(ContextError::HeaderAlreadySent(what))
        } else {
            Ok(())
        }
    }

    fn render_header(&self) -> String {
        let mut header = String::new();

        // 1. Status line
        header.push_str(&format!(
            "HTTP/{} {} {}\r\n",
            self.version, self.status_code, self.status_text
        ));

        // 2. Content-Type (charset solo para tipos textuales)
        if self.mime_type.starts_with("text/") {
            header.push_str(&format!(
                "Content-Type: {}; charset={}\r\n",
                self.mime_type, self.encoding
            ));
        } else {
            header.push_str(&format!("Content-Type: {}\r\n", self.mime_type));
        }

        // 3. Headers opcionales
        if let Some(length) = self.content_length {
            header.push_str(&format!("Content-Length: {}\r\n", length));
        }
        for (name, value) in &self.headers {
            header.push_str(&format!("{}: {}\r\n", name, value));
        }

        // 4. Cookies
        for cookie in &self.output_cookies {
            header.push_str(&format!("Set-Cookie: {}\r\n", cookie));
        }

        // 5. Línea vacía que separa headers del body
        header.push_str("\r\n");
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(output: &mut Vec<u8>) -> RequestContext<'_> {
        RequestContext::new(output, HashMap::new(), SharedParameters::default(), Vec::new())
    }

    #[test]
    fn test_header_written_once() {
        let mut output = Vec::new();
        {
            let mut ctx = context(&mut output);
            ctx.write_str("uno").unwrap();
            ctx.write_str(" dos").unwrap();
            ctx.write(b"!").unwrap();
        }
        let text = String::from_utf8(output).unwrap();

        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\n\r\nuno dos!"
        );
        assert_eq!(text.matches("HTTP/1.1").count(), 1);
    }

    #[test]
    fn test_setters_fail_after_header() {
        let mut output = Vec::new();
        let mut ctx = context(&mut output);
        ctx.write(b"").unwrap();
        assert!(ctx.is_header_generated());

        assert!(matches!(ctx.set_mime_type("text/plain"), Err(ContextError::HeaderAlreadySent(_))));
        assert!(ctx.set_status_code(404).is_err());
        assert!(ctx.set_status_text("Not Found").is_err());
        assert!(ctx.set_encoding("UTF-8").is_err());
        assert!(ctx.set_content_length(Some(1)).is_err());
        assert!(ctx.add_header("X-A", "b").is_err());
        assert!(ctx.add_cookie(Cookie::new("a", "b")).is_err());
    }

    #[test]
    fn test_non_text_mime_has_no_charset() {
        let mut output = Vec::new();
        {
            let mut ctx = context(&mut output).with_version("HTTP/1.0");
            ctx.set_mime_type("image/png").unwrap();
            ctx.set_content_length(Some(3)).unwrap();
            ctx.set_status_code(201).unwrap();
            ctx.set_status_text("Created").unwrap();
            ctx.write(&[1, 2, 3]).unwrap();
        }

        let header_end = output.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let header = String::from_utf8(output[..header_end + 4].to_vec()).unwrap();
        assert_eq!(
            header,
            "HTTP/1.0 201 Created\r\nContent-Type: image/png\r\nContent-Length: 3\r\n\r\n"
        );
        assert_eq!(&output[header_end + 4..], &[1, 2, 3]);
    }

    #[test]
    fn test_headers_and_cookies_order() {
        let mut output = Vec::new();
        {
            let mut ctx = context(&mut output);
            ctx.add_cookie(
                Cookie::new("korisnik", "perica")
                    .with_domain("127.0.0.1")
                    .with_path("/")
                    .with_max_age(3600)
                    .with_http_only(true),
            )
            .unwrap();
            ctx.add_header("Cache-Control", "no-cache").unwrap();
            ctx.write_str("x").unwrap();
        }
        let text = String::from_utf8(output).unwrap();

        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/html; charset=UTF-8\r\n\
             Cache-Control: no-cache\r\n\
             Set-Cookie: korisnik=\"perica\"; Domain=127.0.0.1; Path=/; Max-Age=3600; HttpOnly\r\n\
             \r\n\
             x"
        );
    }

    #[test]
    fn test_latin1_encoding() {
        let mut output = Vec::new();
        {
            let mut ctx = context(&mut output);
            ctx.set_encoding("ISO-8859-1").unwrap();
            ctx.write_str("ñ€").unwrap();
        }
        assert!(output.ends_with(&[0xF1, b'?']));
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("charset=ISO-8859-1"));
    }

    #[test]
    fn test_unsupported_encoding() {
        let mut output = Vec::new();
        let mut ctx = context(&mut output);
        assert!(matches!(
            ctx.set_encoding("KLINGON"),
            Err(ContextError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_parameter_namespaces() {
        let mut params = HashMap::new();
        params.insert("b".to_string(), "2".to_string());
        params.insert("a".to_string(), "1".to_string());
        let persistent = SharedParameters::default();

        let mut output = Vec::new();
        let mut ctx = RequestContext::new(&mut output, params, persistent.clone(), Vec::new());

        assert_eq!(ctx.parameter("a"), Some("1"));
        assert_eq!(ctx.parameter_names(), vec!["a", "b"]);

        ctx.set_persistent_parameter("color", "azul");
        assert_eq!(persistent.read().unwrap().get("color").map(String::as_str), Some("azul"));
        assert_eq!(ctx.persistent_parameter_names(), vec!["color".to_string()]);
        ctx.remove_persistent_parameter("color");
        assert_eq!(ctx.persistent_parameter("color"), None);

        ctx.set_temporary_parameter("t", "v");
        assert_eq!(ctx.temporary_parameter("t"), Some("v"));
        assert_eq!(ctx.temporary_parameter_names(), vec!["t"]);
        ctx.remove_temporary_parameter("t");
        assert_eq!(ctx.temporary_parameter("t"), None);
    }
}
