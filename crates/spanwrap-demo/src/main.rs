//! spanwrap-demo: runs a small order service through the interceptor.
//!
//! # Usage
//!
//! ```bash
//! spanwrap-demo --orders 3 --otel-endpoint http://localhost:4317
//! ```
//!
//! Environment variables can also be used:
//! - `SKIP_TRACING`: Disable span creation
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//! - `SPANWRAP_LOG_FORMAT`: Console log format (text, json)

mod shop;

use anyhow::Result;
use clap::Parser;
use spanwrap::observability::init_telemetry;
use spanwrap::{Interceptor, OtelSink, TraceConfig, TraceSink, TracingSink};

use crate::shop::OrderService;

/// Run a few intercepted calls against the configured sink.
#[derive(Parser, Debug)]
#[command(name = "spanwrap-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of orders to place
    #[arg(short, long, default_value_t = 3)]
    orders: u32,

    /// Create spans with the OpenTelemetry tracer instead of `tracing` spans
    #[arg(long)]
    otel_sink: bool,

    #[command(flatten)]
    trace: TraceConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive until all spans are flushed
    let _telemetry = init_telemetry(&cli.trace)?;

    let config = cli.trace.interceptor_config();
    if cli.otel_sink {
        let sink = OtelSink::global(cli.trace.tracer_name.clone());
        run(Interceptor::new(sink, &config), cli.orders).await;
    } else {
        run(Interceptor::new(TracingSink::new(), &config), cli.orders).await;
    }

    tracing::info!("Demo complete");
    Ok(())
}

async fn run<S: TraceSink>(interceptor: Interceptor<S>, orders: u32) {
    let mut shop = OrderService::new(interceptor, [("widget", 5), ("gadget", 1)]);

    let mut placed = Vec::new();
    for n in 1..=orders {
        match shop.place_order("widget", n) {
            Ok(order_id) => {
                tracing::info!(order_id, qty = n, "Order placed");
                placed.push(order_id);
            }
            Err(e) => tracing::warn!(error = %e, qty = n, "Order rejected"),
        }
    }

    if let Err(e) = shop.place_order("sprocket", 1) {
        tracing::warn!(error = %e, "Order rejected");
    }

    for order_id in &placed {
        if let Err(e) = shop.ship(*order_id).await {
            tracing::warn!(error = %e, order_id, "Shipping failed");
        }
    }

    if let Some(first) = placed.first() {
        if let Err(e) = shop.cancel_order(*first) {
            tracing::warn!(error = %e, "Cancel failed");
        }
    }
    if let Err(e) = shop.cancel_order(u64::MAX) {
        tracing::warn!(error = %e, "Cancel failed");
    }

    tracing::info!(
        stock = shop.get_total_stock(),
        open_orders = shop.audit(),
        "Inventory after demo"
    );
}
