use gatelog_api::{run_server, telemetry};

#[tokio::main]
async fn main() {
    let telemetry_config = telemetry::TelemetryConfig::from_env();
    if let Err(e) = telemetry::init_telemetry(telemetry_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(err) = run_server().await {
        tracing::error!(error = %err, "Server terminated with error");
        std::process::exit(1);
    }
}
