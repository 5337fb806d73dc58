//! HTTP server core implementation

use actix_web::{web, App, HttpServer as ActixHttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::config::ListenConfig;
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::Result;

/// HTTP server over the monitor's read-only snapshot API.
pub struct HttpServer {
    listen: ListenConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server around already-wired application state.
    pub fn new(listen: ListenConfig, state: AppState) -> Self {
        Self { listen, state }
    }

    /// Bind and serve until shutdown.
    pub async fn start(self) -> Result<()> {
        let state = web::Data::new(self.state);
        let addr = (self.listen.host.clone(), self.listen.port);
        info!("Listening on http://{}:{}", addr.0, addr.1);

        ActixHttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(TracingLogger::default())
                .configure(routes::health::configure_routes)
                .configure(routes::servers::configure_routes)
                .configure(routes::log::configure_routes)
        })
        .bind(addr)?
        .run()
        .await?;
        Ok(())
    }
}
