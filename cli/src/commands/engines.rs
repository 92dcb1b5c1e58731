use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct EnginesCommand {}

impl EnginesCommand {
    pub fn run(&self) -> Result<()> {
        println!("Storage engines:");
        for name in backup_rotator_backends::default_registry().names() {
            println!("  {}", name);
        }
        println!("Rotators:");
        for name in backup_rotator_rotators::default_registry().names() {
            println!("  {}", name);
        }
        Ok(())
    }
}
