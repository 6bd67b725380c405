//! User configuration commands.

use color_eyre::eyre::{eyre, Result};

use casefile_core::config::{load_user_config, save_user_config, UserConfig};
use casefile_core::Identity;

use crate::ConfigCommands;

pub fn run(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::SetUser { handle, email } => {
            let cfg = UserConfig {
                user: Some(Identity::new(handle.clone(), email.clone())),
            };
            save_user_config(None, &cfg)?;
            println!("Configured user: {handle} <{email}>");
            Ok(())
        }
        ConfigCommands::GetUser => {
            let cfg = load_user_config(None)?;
            match cfg.user {
                Some(user) => {
                    println!("{user}");
                    Ok(())
                }
                None => Err(eyre!(
                    "no user configured; run `casefile config set-user --handle <h> --email <e>`"
                )),
            }
        }
    }
}
