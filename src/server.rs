//! HTTP trigger server
//! Serves the generated document on the trigger path and an empty body everywhere else

use crate::config::{GeneratorConfig, ServerConfig};
use crate::entry::{parse_entries, random_port};
use crate::error::GenerateError;
use crate::fetch::ListSource;
use crate::render::render_document;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const GENERATION_FAILED: &str = "Error generating configuration";

/// Configuration generator server
pub struct ConfigServer {
    server_config: ServerConfig,
    config: GeneratorConfig,
    source: Arc<dyn ListSource>,
}

impl ConfigServer {
    /// Create a new server
    pub fn new(server_config: ServerConfig, config: GeneratorConfig, source: Arc<dyn ListSource>) -> Self {
        Self {
            server_config,
            config,
            source,
        }
    }

    /// Start serving
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let addr: SocketAddr = format!("0.0.0.0:{}", self.server_config.http_port).parse()?;

        info!(
            "Generator listening on HTTP:{} (trigger path {})",
            self.server_config.http_port, self.config.trigger_path
        );

        self.run_http_server(addr).await
    }

    /// Run HTTP server
    async fn run_http_server(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("HTTP server listening on {}", addr);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = self.clone();

            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream, remote_addr).await {
                    debug!("HTTP connection error from {}: {}", remote_addr, e);
                }
            });
        }
    }

    /// Handle a single HTTP connection
    async fn handle_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) -> Result<()> {
        let io = TokioIo::new(stream);

        http1::Builder::new()
            .serve_connection(
                io,
                service_fn(move |req| {
                    let server = self.clone();
                    async move { server.handle_request(req, remote_addr).await }
                }),
            )
            .await
            .map_err(|e| anyhow!("HTTP service error: {}", e))
    }

    /// Handle incoming request
    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
        debug!("{} {} from {}", req.method(), req.uri().path(), remote_addr);
        Ok(self.route(req.uri().path()).await)
    }

    /// Answer a request for `path`
    pub async fn route(&self, path: &str) -> Response<BoxBody<Bytes, hyper::Error>> {
        if path != self.config.trigger_path {
            return Self::empty_response();
        }

        match self.generate().await {
            Ok(document) => Self::document_response(document),
            Err(e) => {
                error!("Error generating config: {}", e);
                Self::error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED)
            }
        }
    }

    /// Run the pipeline with random default ports
    pub async fn generate(&self) -> Result<String, GenerateError> {
        self.generate_with(random_port).await
    }

    /// Run the pipeline with a caller-supplied port choice
    pub async fn generate_with<F>(&self, pick_port: F) -> Result<String, GenerateError>
    where
        F: FnMut(&[u16]) -> u16,
    {
        let mut lines = Vec::new();
        for url in self.config.list_urls() {
            lines.extend(self.source.fetch_lines(url).await?);
        }

        let entries = parse_entries(&lines, &self.config.default_ports, pick_port);
        info!("Rendering document with {} proxies", entries.len());

        Ok(render_document(&entries, &self.config.render_params())?)
    }

    /// Create document response
    fn document_response(document: String) -> Response<BoxBody<Bytes, hyper::Error>> {
        let mut response = Response::new(Self::full_body(Bytes::from(document)));
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        response
    }

    /// Create empty response
    fn empty_response() -> Response<BoxBody<Bytes, hyper::Error>> {
        let mut response = Response::new(Self::empty_body());
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        response
    }

    /// Create error response
    fn error_response(status: StatusCode, message: &'static str) -> Response<BoxBody<Bytes, hyper::Error>> {
        let mut response = Response::new(Self::full_body(Bytes::from_static(message.as_bytes())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        response
    }

    /// Create full body
    fn full_body(bytes: Bytes) -> BoxBody<Bytes, hyper::Error> {
        Full::new(bytes).map_err(|never| match never {}).boxed()
    }

    /// Create empty body
    fn empty_body() -> BoxBody<Bytes, hyper::Error> {
        Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
    }
}
