use structopt::*;

use mountkeeper::{commands::*, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = Options::from_args();
    let _logger = logging::init(&options.log)?;

    options.command.run(&options).await
}
