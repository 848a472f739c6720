//! # Formato decimal por patrón
//! src/script/format.rs
//!
//! Implementa la función `@decfmt`: formatea un número con un patrón al
//! estilo `#,##0.00`.
//!
//! | Símbolo | Significado |
//! |---|---|
//! | `0` | dígito obligatorio |
//! | `#` | dígito opcional |
//! | `,` | separador de miles (el tamaño del grupo es la cantidad de dígitos después de la última coma) |
//! | `.` | separador decimal |
//!
//! El redondeo es al valor más cercano, con empates al par.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal format pattern: '{0}'")]
pub struct FormatError(pub String);

fn pattern_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<int>[#,]*[0,]*)(?:\.(?P<frac>0*#*))?$").expect("valid decfmt regex")
    })
}

/// Patrón de formato ya analizado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalFormat {
    min_integer_digits: usize,
    min_fraction_digits: usize,
    max_fraction_digits: usize,
    grouping_size: Option<usize>,
}

impl DecimalFormat {
    /// Analiza un patrón
    ///
    /// # Ejemplo
    /// ```
    /// use smart_http_server::script::format::DecimalFormat;
    ///
    /// let format = DecimalFormat::parse("0.000").unwrap();
    /// assert_eq!(format.format(0.5), "0.500");
    /// assert!(DecimalFormat::parse("abc").is_err());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError(pattern.to_string());

        let captures = pattern_regex().captures(pattern).ok_or_else(invalid)?;
        let integer = captures.name("int").map_or("", |m| m.as_str());
        let fraction = captures.name("frac").map(|m| m.as_str());

        let integer_digits = integer.chars().filter(|c| *c != ',').count();
        if integer_digits == 0 && fraction.map_or(true, str::is_empty) {
            return Err(invalid());
        }
        if integer.starts_with(',') || integer.ends_with(',') || integer.contains(",,") {
            return Err(invalid());
        }

        let grouping_size = integer
            .rfind(',')
            .map(|idx| integer[idx + 1..].len());

        let fraction = fraction.unwrap_or("");

        Ok(Self {
            min_integer_digits: integer.chars().filter(|c| *c == '0').count(),
            min_fraction_digits: fraction.chars().filter(|c| *c == '0').count(),
            max_fraction_digits: fraction.len(),
            grouping_size,
        })
    }

    /// Formatea `value` según el patrón
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }

        let rounded = format!("{:.*}", self.max_fraction_digits, value.abs());
        let (integer, fraction) = match rounded.split_once('.') {
            Some((integer, fraction)) => (integer, fraction),
            None => (rounded.as_str(), ""),
        };

        // Parte fraccionaria: quitar ceros opcionales
        let mut fraction = fraction.to_string();
        while fraction.len() > self.min_fraction_digits && fraction.ends_with('0') {
            fraction.pop();
        }

        // Parte entera: quitar ceros a la izquierda y rellenar hasta el mínimo
        let mut integer = integer.trim_start_matches('0').to_string();
        while integer.len() < self.min_integer_digits {
            integer.insert(0, '0');
        }
        if integer.is_empty() && fraction.is_empty() {
            integer.push('0');
        }

        if let Some(size) = self.grouping_size.filter(|size| *size > 0) {
            integer = group_digits(&integer, size);
        }

        let mut result = String::new();
        let is_zero = integer.chars().chain(fraction.chars()).all(|c| c == '0' || c == ',');
        if value.is_sign_negative() && !is_zero {
            result.push('-');
        }
        result.push_str(&integer);
        if !fraction.is_empty() {
            result.push('.');
            result.push_str(&fraction);
        }
        result
    }
}

fn group_digits(digits: &str, size: usize) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / size);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % size == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
