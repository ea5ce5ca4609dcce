mod client;
mod server;

use crate::report::Summary;
use crate::socket::TestSocket;

pub async fn run(sock: &TestSocket, summary: &mut Summary) -> anyhow::Result<()> {
    let listener = sock.bind()?;
    let server = tokio::spawn(server::start(listener));
    sock.wait_ready().await?;

    println!("=== Pre-encode Hook Tests ===");
    let cases = client::run_pre_encode_tests(sock).await;

    server.abort();
    let _ = server.await;
    summary.report("pre-encode", &cases);
    Ok(())
}
