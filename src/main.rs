use clap::Parser;
use color_eyre::Result;

use fsadmin::cli::Args;
use fsadmin::{app, config, logging};

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override base URL if specified on command line
  let config = match args.base_url {
    Some(url) => {
      let config = config.with_base_url(url);
      config.validate()?;
      config
    }
    None => config,
  };

  let _log_guard = logging::init(&config.log, args.verbose)?;

  let app = app::App::new(&config)?;
  let mut stdout = std::io::stdout().lock();
  app.run(args.command, &mut stdout).await?;

  Ok(())
}
