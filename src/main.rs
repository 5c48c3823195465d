//! svc-lifecycle demo service
//!
//! ```text
//! svc-lifecycle [--config PATH] [-v] [--profile-server-enable] serve [--http-addr ADDR]
//! svc-lifecycle [--config PATH] check
//!
//!   Global:  log config → runtime metrics → diagnostic server
//!   serve:   shutdown watcher → HTTP service
//!   check:   Global only
//! ```
//!
//! SIGINT, SIGTERM or SIGHUP post exit code 0; the `serve` handler is then
//! stopped in reverse order, followed by the Global component.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use svc_lifecycle::http::{DiagnosticServer, HttpService};
use svc_lifecycle::observability::{LogConfigComponent, RuntimeMetricsComponent};
use svc_lifecycle::{
    service_main, with_command, with_command_handler, with_global, with_long_description,
    with_named_component, with_shutdown_watcher, CompositeComponent,
};

#[derive(Serialize)]
struct Greeting {
    message: &'static str,
}

fn app() -> Router {
    Router::new()
        .route("/", get(|| async { Json(Greeting { message: "hello" }) }))
        .route("/health", get(|| async { "ok" }))
}

fn global() -> Result<CompositeComponent, svc_lifecycle::ComponentError> {
    CompositeComponent::new([
        with_named_component("log_config", LogConfigComponent::new()),
        with_named_component("runtime_metrics", RuntimeMetricsComponent::new()),
        with_named_component("profile_server", DiagnosticServer::new()),
    ])
}

fn serve() -> Result<CompositeComponent, svc_lifecycle::ComponentError> {
    CompositeComponent::new([
        with_shutdown_watcher(),
        with_named_component("http_service", HttpService::new(app())),
    ])
}

fn main() {
    let components = global().and_then(|global| Ok((global, serve()?)));
    let (global, serve) = match components {
        Ok(components) => components,
        Err(err) => {
            eprintln!("failed to assemble components: {err}");
            std::process::exit(svc_lifecycle::service::EXIT_SERVICE_FAILURE);
        }
    };

    service_main(
        "svc-lifecycle",
        "Example supervised service",
        [
            with_long_description(
                "Runs an HTTP service under lifecycle supervision. \
                 Shut down with SIGINT, SIGTERM or SIGHUP.",
            ),
            with_global(global),
            with_command_handler("serve", "Serve HTTP until signaled", serve),
            with_command(clap::Command::new("check").about("Load configuration and exit")),
        ],
    )
}
