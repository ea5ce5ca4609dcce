pub mod fixture;
pub mod report;
pub mod socket;
mod bad_payload;
mod pre_encode;
mod transcode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let pid = std::process::id();
    let sock = socket::TestSocket::new(&format!("msgpack-axum-test-{pid}"))?;

    let mut summary = report::Summary::default();

    transcode::run(&sock, msgpack_axum::DEFAULT_MIME_TYPE, &mut summary).await?;
    transcode::run(&sock, "application/x-custom-msgpack", &mut summary).await?;
    pre_encode::run(&sock, &mut summary).await?;
    bad_payload::run(&sock, &mut summary).await?;

    println!();
    println!("{}/{} passed", summary.passed, summary.total);

    if summary.passed < summary.total {
        std::process::exit(1);
    }

    Ok(())
}
