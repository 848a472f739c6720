//! # Workers de demostración
//! src/workers/demo.rs
//!
//! | Worker | Parámetros | Resultado |
//! |---|---|---|
//! | `HelloWorker` | `name` | saludo con la fecha y el largo del nombre |
//! | `EchoParams` | cualquiera | tabla HTML con los parámetros |
//! | `SumWorker` | `a`, `b` | reenvía a `calc.smscr` con `varA`, `varB`, `zbroj` |
//! | `BgColorWorker` | `bgcolor` | guarda el color en la sesión |
//! | `Home` | - | reenvía a `home.smscr` con `background` |

use super::{forward, Worker, WorkerError};
use crate::http::RequestContext;
use std::time::{SystemTime, UNIX_EPOCH};

/// Color de fondo cuando la sesión no tiene uno
const DEFAULT_BGCOLOR: &str = "7F7F7F";

/// Saluda e informa el largo del parámetro `name`
pub struct HelloWorker;

impl Worker for HelloWorker {
    fn process(&self, context: &mut RequestContext<'_>) -> Result<(), WorkerError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let name = context.parameter("name").map(str::to_string);

        context.set_mime_type("text/html")?;
        context.write_str("<html><body>")?;
        context.write_str("<h1>Hello!!!</h1>")?;
        context.write_str(&format!("<p>Now is: {} (unix time)</p>", now))?;
        match name.as_deref() {
            Some(name) if !name.trim().is_empty() => {
                context.write_str(&format!(
                    "<p>Your name has {} letters.</p>",
                    name.trim().chars().count()
                ))?;
            }
            _ => context.write_str("<p>You did not send me your name!</p>")?,
        }
        context.write_str("</body></html>")?;
        Ok(())
    }
}

/// Muestra los parámetros de la query string en una tabla
pub struct EchoParams;

impl Worker for EchoParams {
    fn process(&self, context: &mut RequestContext<'_>) -> Result<(), WorkerError> {
        let rows: Vec<String> = context
            .parameter_names()
            .into_iter()
            .map(|name| {
                let value = context.parameter(name).unwrap_or_default();
                format!("<tr><td>{}</td><td>{}</td></tr>", escape_html(name), escape_html(value))
            })
            .collect();

        context.set_mime_type("text/html")?;
        context.write_str("<html><body><table border=\"1\">")?;
        context.write_str("<tr><th>Name</th><th>Value</th></tr>")?;
        for row in rows {
            context.write_str(&row)?;
        }
        context.write_str("</table></body></html>")?;
        Ok(())
    }
}

/// Suma `a` y `b` (por defecto 1 y 2) y delega el render a un script privado
pub struct SumWorker;

impl SumWorker {
    const PAGE: &'static str = "/private/pages/calc.smscr";

    fn integer_parameter(context: &RequestContext<'_>, name: &str, default: i64) -> i64 {
        context
            .parameter(name)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }
}

impl Worker for SumWorker {
    fn process(&self, context: &mut RequestContext<'_>) -> Result<(), WorkerError> {
        let a = Self::integer_parameter(context, "a", 1);
        let b = Self::integer_parameter(context, "b", 2);

        context.set_temporary_parameter("varA", &a.to_string());
        context.set_temporary_parameter("varB", &b.to_string());
        context.set_temporary_parameter("zbroj", &a.wrapping_add(b).to_string());

        forward(context, Self::PAGE)
    }
}

/// Guarda un color `RRGGBB` válido como parámetro persistente
pub struct BgColorWorker;

impl BgColorWorker {
    fn is_hex_color(value: &str) -> bool {
        value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl Worker for BgColorWorker {
    fn process(&self, context: &mut RequestContext<'_>) -> Result<(), WorkerError> {
        let color = context.parameter("bgcolor").map(str::to_string);

        let updated = match color {
            Some(color) if Self::is_hex_color(&color) => {
                context.set_persistent_parameter("bgcolor", &color.to_ascii_uppercase());
                true
            }
            _ => false,
        };

        context.set_mime_type("text/html")?;
        context.write_str("<html><body>")?;
        if updated {
            context.write_str("<p>Color updated.</p>")?;
        } else {
            context.write_str("<p>Color not updated.</p>")?;
        }
        context.write_str("<a href=\"/index2.html\">Back to home</a>")?;
        context.write_str("</body></html>")?;
        Ok(())
    }
}

/// Página principal: toma el color de la sesión y delega a un script privado
pub struct Home;

impl Home {
    const PAGE: &'static str = "/private/pages/home.smscr";
}

impl Worker for Home {
    fn process(&self, context: &mut RequestContext<'_>) -> Result<(), WorkerError> {
        let background = context
            .persistent_parameter("bgcolor")
            .unwrap_or_else(|| DEFAULT_BGCOLOR.to_string());
        context.set_temporary_parameter("background", &background);

        forward(context, Self::PAGE)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::context::SharedParameters;
    use crate::server::dispatch::{DispatchError, Dispatcher};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Dispatcher falso que registra el path y los temporales recibidos
    #[derive(Default)]
    struct Grabador {
        llamadas: Mutex<Vec<(String, HashMap<String, String>)>>,
    }

    impl Dispatcher for Grabador {
        fn forward(&self, path: &str, context: &mut RequestContext<'_>) -> Result<(), DispatchError> {
            let temporales = context
                .temporary_parameter_names()
                .into_iter()
                .map(|name| (name.to_string(), context.temporary_parameter(name).unwrap().to_string()))
                .collect();
            self.llamadas.lock().unwrap().push((path.to_string(), temporales));
            Ok(())
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn body(output: Vec<u8>) -> String {
        let text = String::from_utf8(output).unwrap();
        text[text.find("\r\n\r\n").unwrap() + 4..].to_string()
    }

    #[test]
    fn test_hello_worker_counts_letters() {
        let mut output = Vec::new();
        {
            let mut context = RequestContext::new(
                &mut output,
                params(&[("name", "Ivana")]),
                SharedParameters::default(),
                Vec::new(),
            );
            HelloWorker.process(&mut context).unwrap();
        }
        assert!(body(output).contains("Your name has 5 letters."));
    }

    #[test]
    fn test_hello_worker_without_name() {
        let mut output = Vec::new();
        {
            let mut context =
                RequestContext::new(&mut output, HashMap::new(), SharedParameters::default(), Vec::new());
            HelloWorker.process(&mut context).unwrap();
        }
        assert!(body(output).contains("You did not send me your name!"));
    }

    #[test]
    fn test_echo_params_table() {
        let mut output = Vec::new();
        {
            let mut context = RequestContext::new(
                &mut output,
                params(&[("b", "<2>"), ("a", "1")]),
                SharedParameters::default(),
                Vec::new(),
            );
            EchoParams.process(&mut context).unwrap();
        }
        let html = body(output);
        let a = html.find("<td>a</td><td>1</td>").unwrap();
        let b = html.find("<td>b</td><td>&lt;2&gt;</td>").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_sum_worker_defaults_and_forward() {
        let grabador = Arc::new(Grabador::default());
        let mut output = Vec::new();
        {
            let mut context =
                RequestContext::new(&mut output, params(&[("a", "x")]), SharedParameters::default(), Vec::new())
                    .with_dispatcher(grabador.clone());
            SumWorker.process(&mut context).unwrap();
        }

        let llamadas = grabador.llamadas.lock().unwrap();
        assert_eq!(llamadas.len(), 1);
        let (path, temporales) = &llamadas[0];
        assert_eq!(path, "/private/pages/calc.smscr");
        assert_eq!(temporales["varA"], "1");
        assert_eq!(temporales["varB"], "2");
        assert_eq!(temporales["zbroj"], "3");
    }

    #[test]
    fn test_sum_worker_with_params() {
        let grabador = Arc::new(Grabador::default());
        let mut output = Vec::new();
        {
            let mut context = RequestContext::new(
                &mut output,
                params(&[("a", "10"), ("b", "-4")]),
                SharedParameters::default(),
                Vec::new(),
            )
            .with_dispatcher(grabador.clone());
            SumWorker.process(&mut context).unwrap();
        }
        assert_eq!(grabador.llamadas.lock().unwrap()[0].1["zbroj"], "6");
    }

    #[test]
    fn test_bgcolor_worker() {
        let persistent = SharedParameters::default();

        let mut output = Vec::new();
        {
            let mut context =
                RequestContext::new(&mut output, params(&[("bgcolor", "00ff7f")]), persistent.clone(), Vec::new());
            BgColorWorker.process(&mut context).unwrap();
        }
        assert!(body(output).contains("Color updated."));
        assert_eq!(persistent.read().unwrap()["bgcolor"], "00FF7F");

        let mut output = Vec::new();
        {
            let mut context =
                RequestContext::new(&mut output, params(&[("bgcolor", "verde")]), persistent.clone(), Vec::new());
            BgColorWorker.process(&mut context).unwrap();
        }
        assert!(body(output).contains("Color not updated."));
        assert_eq!(persistent.read().unwrap()["bgcolor"], "00FF7F");
    }

    #[test]
    fn test_home_uses_session_color() {
        let grabador = Arc::new(Grabador::default());
        let persistent = SharedParameters::default();

        let mut output = Vec::new();
        {
            let mut context = RequestContext::new(&mut output, HashMap::new(), persistent.clone(), Vec::new())
                .with_dispatcher(grabador.clone());
            Home.process(&mut context).unwrap();
        }
        persistent.write().unwrap().insert("bgcolor".into(), "112233".into());
        let mut output = Vec::new();
        {
            let mut context = RequestContext::new(&mut output, HashMap::new(), persistent.clone(), Vec::new())
                .with_dispatcher(grabador.clone());
            Home.process(&mut context).unwrap();
        }

        let llamadas = grabador.llamadas.lock().unwrap();
        assert_eq!(llamadas[0].0, "/private/pages/home.smscr");
        assert_eq!(llamadas[0].1["background"], DEFAULT_BGCOLOR);
        assert_eq!(llamadas[1].1["background"], "112233");
    }
}
