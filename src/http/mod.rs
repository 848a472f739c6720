//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Protocolo HTTP/1.0 y HTTP/1.1 implementado a mano:
//!
//! - Parsing de la cabecera del request (solo `GET`)
//! - Contexto de la petición, que genera el header de la respuesta
//! - Cookies de salida y tabla de mime types
//! - Códigos de estado
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html; charset=UTF-8\r\n
//! Set-Cookie: sid="ABCDEFGHIJKLMNOPQRST"; Domain=localhost; Path=/; HttpOnly\r\n
//! \r\n
//! <html>...
//! ```

pub mod context;
pub mod cookie;
pub mod mime;
pub mod request;
pub mod status;

pub use context::{ContextError, RequestContext, SharedParameters};
pub use cookie::Cookie;
pub use mime::MimeTypes;
pub use request::{Request, RequestParseError};
pub use status::StatusCode;
