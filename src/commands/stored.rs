use structopt::*;
use uuid::Uuid;

use crate::{config::Config, params::keys, store::*};

#[derive(StructOpt, Debug)]
pub struct ListCommand {}

impl ListCommand {
    pub fn run(&self, config: Config) -> anyhow::Result<()> {
        let store = Store::new(&config.storage_dir);
        for path in store.list()? {
            let params = match read_parameters(&path) {
                Ok(params) => params,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            println!(
                "{}\t{}\t{}\t{}",
                params.str(keys::UUID).unwrap_or("?"),
                params.str(keys::TYPE_ID).unwrap_or("?"),
                params.str(keys::VOLUME_NAME).unwrap_or("-"),
                params.str(keys::MOUNT_PATH).unwrap_or("-"),
            );
        }
        Ok(())
    }
}

#[derive(StructOpt, Debug)]
pub struct ForgetCommand {
    pub id: Uuid,
}

impl ForgetCommand {
    pub fn run(&self, config: Config) -> anyhow::Result<()> {
        Store::new(&config.storage_dir).remove(self.id)?;
        log::info!("Forgot {}", self.id);
        Ok(())
    }
}
