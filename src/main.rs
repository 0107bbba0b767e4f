use std::sync::Arc;

mod api;
mod config;
mod ledger;
mod models;
mod notification;
mod persistence;
mod telemetry;

use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server,
};
use tower::Service;

#[cfg(feature = "telemetry")]
use {
    axum::{body::Body, http},
    tower_http::trace::TraceLayer,
    tower_request_id::{RequestId, RequestIdLayer},
    tracing::error_span,
};

#[tokio::main]
async fn main() {
    telemetry::init();

    let config = config::Config::from_env().unwrap_or_else(|err| panic!("{}", err));

    let repo = persistence::database::Repository::new(&config.database)
        .await
        .unwrap_or_else(|err| panic!("failed to connect to postgres database: {}", err));

    let publisher = notification::amqp::Publisher::new(&config.broker)
        .await
        .unwrap_or_else(|err| {
            panic!(
                "failed to connect to message broker on {}:{}: {}",
                config.broker.host, config.broker.port, err
            )
        });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .unwrap_or_else(|_| panic!("failed to bind listener to port: {}", config.port));

    telemetry::info!(
        "Listening on {}",
        listener.local_addr().expect("failed to get local addr")
    );

    let ledger = ledger::Ledger::new(Arc::new(repo), Arc::new(publisher));
    let app = api::app::new(Arc::new(ledger));

    #[cfg(feature = "telemetry")]
    let app = app
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<Body>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unknown".into());

                error_span!(
                    "request",
                    id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(RequestIdLayer);

    // Continuously accept new connections.
    loop {
        let (socket, _remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
            Err(err) => {
                telemetry::error!("failed to accept connection: {}", err);
                continue;
            }
        };
        let tower_service = app.clone();

        tokio::spawn(async move {
            let socket = TokioIo::new(socket);

            let hyper_service =
                hyper::service::service_fn(move |request: axum::extract::Request<Incoming>| {
                    tower_service.clone().call(request)
                });

            #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
            if let Err(err) = server::conn::auto::Builder::new(TokioExecutor::new())
                .http2()
                .keep_alive_timeout(std::time::Duration::from_secs(120))
                .keep_alive_interval(std::time::Duration::from_secs(30))
                .timer(TokioTimer::new())
                .serve_connection(socket, hyper_service)
                .await
            {
                telemetry::error!("failed to serve connection: {}", err);
            }
        });
    }
}
