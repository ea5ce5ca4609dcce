mod client;
mod server;

use crate::report::Summary;
use crate::socket::TestSocket;

pub async fn run(sock: &TestSocket, summary: &mut Summary) -> anyhow::Result<()> {
    let listener = sock.bind()?;
    let server = tokio::spawn(server::start(listener));
    sock.wait_ready().await?;

    println!("=== Bad Payload Tests ===");
    let cases = client::run_bad_payload_tests(sock).await;

    server.abort();
    let _ = server.await;
    summary.report("bad payload", &cases);
    Ok(())
}
