//! `oauth2-relay` binary: parse configuration, then serve the relay until Ctrl-C.

// crates.io
use clap::Parser;
// self
use oauth2_relay::{config::Config, server};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	server::serve(Config::parse()).await
}
