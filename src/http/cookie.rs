//! # Cookies de salida
//! src/http/cookie.rs
//!
//! Cookie que el servidor envía en un header `Set-Cookie`. Los atributos
//! se emiten siempre en el mismo orden: `Domain`, `Path`, `Max-Age`,
//! `HttpOnly`, y solo si están presentes.

use std::fmt;

/// Cookie con sus atributos opcionales
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    max_age: Option<u64>,
    http_only: bool,
}

impl Cookie {
    /// Crea una cookie sin atributos
    ///
    /// # Ejemplo
    /// ```
    /// use smart_http_server::http::Cookie;
    ///
    /// let cookie = Cookie::new("sid", "ABC")
    ///     .with_path("/")
    ///     .with_http_only(true);
    /// assert_eq!(cookie.to_string(), r#"sid="ABC"; Path=/; HttpOnly"#);
    /// ```
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: None,
            path: None,
            max_age: None,
            http_only: false,
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Duración en segundos
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn max_age(&self) -> Option<u64> {
        self.max_age
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }
}

impl fmt::Display for Cookie {
    /// Valor del header `Set-Cookie` (sin el nombre del header)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.name, self.value)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_cookie() {
        assert_eq!(Cookie::new("a", "b").to_string(), r#"a="b""#);
    }

    #[test]
    fn test_all_attributes_in_order() {
        let cookie = Cookie::new("korisnik", "perica")
            .with_http_only(true)
            .with_max_age(3600)
            .with_path("/")
            .with_domain("127.0.0.1");

        assert_eq!(
            cookie.to_string(),
            r#"korisnik="perica"; Domain=127.0.0.1; Path=/; Max-Age=3600; HttpOnly"#
        );
    }

    #[test]
    fn test_accessors() {
        let cookie = Cookie::new("sid", "X").with_max_age(10);
        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.value(), "X");
        assert_eq!(cookie.domain(), None);
        assert_eq!(cookie.max_age(), Some(10));
        assert!(!cookie.is_http_only());
    }
}
