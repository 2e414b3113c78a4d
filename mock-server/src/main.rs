use tokio::net::TcpListener;

/// Serves the hub mock on `127.0.0.1:$PORT` (default 3000).
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("hub mock listening on http://{addr} (user {:?})", mock_server::USER);
    mock_server::run(listener).await
}
