#[tokio::main]
async fn main() {
    if let Err(error) = copilot_dashboard_lib::run().await {
        eprintln!("{}", copilot_dashboard_lib::to_client_error(error));
        std::process::exit(1);
    }
}
