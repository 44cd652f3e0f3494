use crate::codec::{CodecCommand, CodecInvoker};
use crate::error::{BridgeError, Result};
use crate::host::{ExportScope, SceneHost, StagedHost};
use std::path::Path;

/// Host adapter that shells out to configured import/export commands.
///
/// Operations without a configured command go to the fallback host.
#[derive(Debug, Clone)]
pub struct CommandHost {
    import_command: Option<Vec<String>>,
    export_command: Option<Vec<String>>,
    invoker: CodecInvoker,
    fallback: StagedHost,
}

impl CommandHost {
    pub fn new(invoker: CodecInvoker) -> Self {
        Self {
            import_command: None,
            export_command: None,
            invoker,
            fallback: StagedHost::new(),
        }
    }

    pub fn with_import_command(mut self, command: Option<Vec<String>>) -> Self {
        self.import_command = command;
        self
    }

    pub fn with_export_command(mut self, command: Option<Vec<String>>) -> Self {
        self.export_command = command;
        self
    }

    pub fn with_fallback(mut self, fallback: StagedHost) -> Self {
        self.fallback = fallback;
        self
    }

    fn run(&self, what: &str, template: &[String], path: &Path, scope: ExportScope) -> Result<()> {
        let (program, rest) = template.split_first().ok_or_else(|| BridgeError::Config {
            message: format!("host {} command is empty", what),
        })?;

        let path = path.to_string_lossy();
        let args: Vec<String> = rest
            .iter()
            .map(|arg| arg.replace("{path}", &path).replace("{scope}", scope.as_str()))
            .collect();

        let command = CodecCommand::new(program);
        tracing::info!(%command, ?args, "Running host {} command", what);

        let result = self
            .invoker
            .invoke(&command, &args)
            .map_err(|e| BridgeError::Host {
                message: format!("{} command could not run: {}", what, e),
            })?;
        if !result.success() {
            return Err(BridgeError::Host {
                message: format!("{} command failed ({})", what, result.failure_detail()),
            });
        }

        Ok(())
    }
}

impl SceneHost for CommandHost {
    fn import_scene(&self, source: &Path) -> Result<()> {
        match &self.import_command {
            Some(template) => self.run("import", template, source, ExportScope::All),
            None => self.fallback.import_scene(source),
        }
    }

    fn export_scene(&self, destination: &Path, scope: ExportScope) -> Result<()> {
        match &self.export_command {
            Some(template) => self.run("export", template, destination, scope),
            None => self.fallback.export_scene(destination, scope),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn template(script: &str) -> Option<Vec<String>> {
        Some(vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "host".to_string(),
            "{path}".to_string(),
            "{scope}".to_string(),
        ])
    }

    #[test]
    fn test_export_command_substitutes_placeholders() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("out.fbx");

        let host = CommandHost::new(CodecInvoker::new(Duration::from_secs(10)))
            .with_export_command(template("printf '%s' \"$2\" > \"$1\""));

        host.export_scene(&destination, ExportScope::Selected).unwrap();
        assert_eq!(fs::read_to_string(&destination).unwrap(), "selected");
    }

    #[test]
    fn test_failing_command_is_host_error() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("out.fbx");

        let host = CommandHost::new(CodecInvoker::new(Duration::from_secs(10)))
            .with_export_command(template("echo 'no active scene' >&2; exit 2"));

        match host.export_scene(&destination, ExportScope::All) {
            Err(BridgeError::Host { message }) => {
                assert!(message.contains("exit code 2"), "{}", message);
                assert!(message.contains("no active scene"), "{}", message);
            }
            other => panic!("expected host error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_is_host_error() {
        let host = CommandHost::new(CodecInvoker::default())
            .with_import_command(Some(vec!["/nonexistent/blender".to_string()]));

        match host.import_scene(Path::new("model.fbx")) {
            Err(BridgeError::Host { message }) => {
                assert!(message.contains("/nonexistent/blender"), "{}", message);
            }
            other => panic!("expected host error, got {:?}", other),
        }
    }

    #[test]
    fn test_timed_out_command_is_host_error() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("out.fbx");

        let host = CommandHost::new(CodecInvoker::new(Duration::from_secs(1)))
            .with_export_command(template("sleep 10"));

        match host.export_scene(&destination, ExportScope::All) {
            Err(BridgeError::Host { message }) => {
                assert!(message.contains("timed out"), "{}", message);
            }
            other => panic!("expected host error, got {:?}", other),
        }
    }

    #[test]
    fn test_unconfigured_operation_uses_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let staged = temp_dir.path().join("staged.fbx");
        let destination = temp_dir.path().join("out.fbx");
        fs::write(&staged, b"staged").unwrap();

        let host = CommandHost::new(CodecInvoker::default())
            .with_fallback(StagedHost::new().with_staged_export(&staged));

        host.export_scene(&destination, ExportScope::All).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), b"staged");
    }
}
