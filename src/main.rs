use std::path::{Component, Path, PathBuf};

use wicket::app::{Application, ResponseBody};
use wicket::config::Config;
use wicket::http::environ::Environment;
use wicket::http::request::Method;
use wicket::http::response::{Responder, StatusCode};
use wicket::server::{Listener, Server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(cfg.max_level())
        .init();

    if let Err(e) = run(cfg).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e);
    }
    Ok(())
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    let server_cfg = ServerConfig::resolve(&cfg.server).await?;
    let listener = Listener::bind(&server_cfg)?;
    let server = Server::new(
        listener,
        Demo {
            static_dir: cfg.static_dir,
        },
    );

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

/// Serves files from `static_dir` and otherwise describes the request.
///
/// With a `static_dir`, a GET that maps to no regular file is a 404.
struct Demo {
    static_dir: Option<PathBuf>,
}

impl Application for Demo {
    fn call(
        &self,
        environ: Environment,
        responder: &mut Responder,
    ) -> anyhow::Result<ResponseBody> {
        if let (Method::GET, Some(dir)) = (&environ.request_method, &self.static_dir) {
            let body = static_path(dir, &environ.path_info)
                .filter(|path| path.is_file())
                .and_then(|path| Some((ResponseBody::file(&path).ok()?, path)));

            return match body {
                Some((body, path)) => {
                    responder.start_response(
                        StatusCode::Ok.to_string(),
                        vec![("Content-Type".to_string(), content_type(&path).to_string())],
                        None,
                    )?;
                    Ok(body)
                }
                None => plain_text(
                    responder,
                    StatusCode::NotFound,
                    format!("{} not found\n", environ.path_info),
                ),
            };
        }

        let text = match &environ.form {
            Some(form) => {
                let mut fields: Vec<_> =
                    form.iter().map(|(k, v)| format!("{}={}\n", k, v)).collect();
                fields.sort();
                fields.concat()
            }
            None => format!(
                "{} {} ({}) served by {}:{}\n",
                environ.request_method,
                environ.path_info,
                environ.server_protocol,
                environ.server_name,
                environ.server_port
            ),
        };
        plain_text(responder, StatusCode::Ok, text)
    }
}

fn plain_text(
    responder: &mut Responder,
    status: StatusCode,
    text: String,
) -> anyhow::Result<ResponseBody> {
    responder.start_response(
        status.to_string(),
        vec![
            ("Content-Type".to_string(), "text/plain; charset=utf-8".to_string()),
            ("Content-Length".to_string(), text.len().to_string()),
        ],
        None,
    )?;
    Ok(ResponseBody::once(text))
}

/// Maps a request path under `dir`, refusing anything that could escape it.
fn static_path(dir: &Path, path_info: &str) -> Option<PathBuf> {
    let relative = match path_info.trim_start_matches('/') {
        "" => "index.html",
        rel => rel,
    };
    let safe = Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    safe.then(|| dir.join(relative))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        _ => "application/octet-stream",
    }
}
