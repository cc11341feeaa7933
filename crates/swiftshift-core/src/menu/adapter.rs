use crate::{menu::MenuCommand, ports::MenuRegistrar};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: usize,
    pub failed: usize,
}

/// Replay a command buffer against the native registrar.
///
/// Best-effort: a failed `clear` or `create` is logged and the rest of the tree
/// is still attempted (native hosts cap item counts, for one).
pub async fn apply(registrar: &dyn MenuRegistrar, commands: Vec<MenuCommand>) -> ApplyReport {
    let mut report = ApplyReport::default();
    for cmd in commands {
        match cmd {
            MenuCommand::Clear => {
                if let Err(e) = registrar.clear().await {
                    tracing::warn!(error = %e, "menu clear failed");
                }
            }
            MenuCommand::Create(node) => match registrar.create(&node).await {
                Ok(()) => report.created += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(id = %node.id, error = %e, "menu item creation failed");
                }
            },
        }
    }
    report
}
