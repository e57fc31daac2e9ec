use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use log::info;
use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use structopt::StructOpt;
use tomato_serve::{Predictor, TfClassifier};
use tower::ServiceBuilder;

mod config;
mod routes;
mod upload;

use config::ServerArgs;
use routes::AppContext;

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, Box<dyn Error>> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| format!("{}:{} did not resolve to any address", host, port).into())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Could not install shutdown handler: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = ServerArgs::from_args();

    // The model is loaded exactly once; every request shares this handle.
    let classifier = TfClassifier::load(&args.model_dir)?;

    let ctx = Arc::new(AppContext {
        predictor: Arc::new(Predictor::new(Arc::new(classifier))),
        error_status: args.error_status,
        max_upload_bytes: args.max_upload_bytes,
    });

    let addr = resolve(&args.host, args.port).await?;

    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let ctx = Arc::clone(&ctx);

        let service = ServiceBuilder::new()
            .layer(routes::cors())
            .service(service_fn(move |req| routes::handle(req, Arc::clone(&ctx))));

        async move { Ok::<_, Infallible>(service) }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);

    info!("Listening on http://{}", addr);

    server.with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped, releasing model");

    Ok(())
}
