//! Declarative step list

use pf_core::StepName;

/// Progress logged once the session is open, before the first step
pub const CONNECTED_PROGRESS: u8 = 2;

/// One pipeline step: its name, the message logged when it starts and the
/// cumulative progress it declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub name: StepName,
    pub message: &'static str,
    pub progress: u8,
}

const fn step(name: StepName, message: &'static str, progress: u8) -> StepDefinition {
    StepDefinition {
        name,
        message,
        progress,
    }
}

/// The provisioning steps, in execution order
pub const PIPELINE: [StepDefinition; 9] = [
    step(StepName::SystemCheck, "Checking system compatibility...", 5),
    step(StepName::SystemUpdate, "Updating system packages...", 15),
    step(StepName::InstallDependencies, "Installing dependencies...", 30),
    step(StepName::SetupWebserver, "Setting up web server...", 45),
    step(StepName::SetupDatabase, "Setting up database...", 60),
    step(StepName::UploadFiles, "Uploading panel files...", 75),
    step(StepName::ConfigurePanel, "Configuring panel...", 85),
    step(StepName::SetupPermissions, "Setting up permissions...", 95),
    step(StepName::Finalize, "Finalizing installation...", 100),
];

/// Look up a step's definition
pub fn definition(name: StepName) -> Option<&'static StepDefinition> {
    PIPELINE.iter().find(|s| s.name == name)
}
