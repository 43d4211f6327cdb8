use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = machina_admin::Args::parse();

	machina_admin::run(args).await
}
