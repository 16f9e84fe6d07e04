/// Workspace-wide result type.
pub type Result<T> = anyhow::Result<T>;
