//! `HEALTHCHECK` helper for the forum server image. Asks `/health` whether
//! Postgres is reachable and maps the answer to the exit code (0 on 200).
//!
//! `HOST`, `HTTP_PORT_API` and `HEALTH_PATH` override the target, which
//! defaults to `http://localhost:8081/health`.

use std::{env, process::exit, time::Duration};

async fn probe(url: &str) -> Result<reqwest::StatusCode, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()?;

    Ok(client.get(url).send().await?.status())
}

#[tokio::main]
async fn main() {
    let port = env::var("HTTP_PORT_API").unwrap_or_else(|_| "8081".into());
    let host = env::var("HOST").unwrap_or_else(|_| "localhost".into());
    let path = env::var("HEALTH_PATH").unwrap_or_else(|_| "/health".into());

    let url = format!("http://{host}:{port}{path}");

    match probe(&url).await {
        Ok(status) if status == reqwest::StatusCode::OK => {
            println!("Health OK: {}", status);
            exit(0);
        }
        Ok(status) => {
            eprintln!("Unhealthy: {}", status);
            exit(1);
        }
        Err(err) => {
            eprintln!("Request error: {err}");
            exit(1);
        }
    }
}
