use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = machina_api::Args::parse();

	machina_api::run(args).await
}
