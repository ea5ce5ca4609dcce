mod client;
mod server;

use crate::report::Summary;
use crate::socket::TestSocket;

pub async fn run(sock: &TestSocket, mime_type: &'static str, summary: &mut Summary) -> anyhow::Result<()> {
    let listener = sock.bind()?;
    let server = tokio::spawn(server::start(listener, mime_type));
    sock.wait_ready().await?;

    println!("=== Transcode Tests ({mime_type}) ===");
    let cases = client::run_transcode_tests(sock, mime_type).await;

    server.abort();
    let _ = server.await;
    summary.report(mime_type, &cases);
    Ok(())
}
