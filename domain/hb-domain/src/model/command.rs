use crate::error::{DomainError, ValidationField};

/// フロントエンドの既定コマンドライン
pub const DEFAULT_COMMAND_LINE: &str = "/bin/ls -al /var/root";

/// ヘルパーに実行させる1件のコマンド。
///
/// 先頭トークンが実行ファイルパス、残りが引数。
/// 空白を含む引数やクォートは表現できない（既知の制約）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command_path: String,
    arguments: Vec<String>,
}

impl CommandRequest {
    pub fn new<S: Into<String>>(
        command_path: S,
        arguments: Vec<String>,
    ) -> Result<Self, DomainError> {
        let command_path = command_path.into();
        if command_path.trim().is_empty() {
            return Err(DomainError::validation(
                ValidationField::Command,
                "Command cannot be empty.",
            ));
        }
        if command_path.contains('\0') || arguments.iter().any(|arg| arg.contains('\0')) {
            return Err(DomainError::validation(
                ValidationField::Command,
                "Command cannot contain NUL characters.",
            ));
        }
        Ok(Self {
            command_path,
            arguments,
        })
    }

    /// 空白区切りのコマンドラインを分割する。
    /// トークンが1つも無ければ Validation(Command)。
    pub fn parse(line: &str) -> Result<Self, DomainError> {
        let mut tokens = line.split_whitespace().map(str::to_string);
        let Some(command_path) = tokens.next() else {
            return Err(DomainError::validation(
                ValidationField::Command,
                "Command cannot be empty.",
            ));
        };
        Self::new(command_path, tokens.collect())
    }

    pub fn command_path(&self) -> &str {
        &self.command_path
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

/// ヘルパーが返す1回分の実行結果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub exit_status: i32,
    pub standard_output: String,
    pub standard_error: String,
}

impl CommandResult {
    /// 省略された出力は空文字として扱う。
    pub fn from_wire(
        exit_status: i32,
        standard_output: Option<String>,
        standard_error: Option<String>,
    ) -> Self {
        Self {
            exit_status,
            standard_output: standard_output.unwrap_or_default(),
            standard_error: standard_error.unwrap_or_default(),
        }
    }
}

/// 完了コールバックに渡される唯一の終端値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed(CommandResult),
    ConnectionFailed(DomainError),
}

impl CommandOutcome {
    pub fn into_result(self) -> Result<CommandResult, DomainError> {
        match self {
            Self::Completed(result) => Ok(result),
            Self::ConnectionFailed(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_whitespace() {
        let req = CommandRequest::parse("  /bin/ls   -al\t/var/root ").unwrap();
        assert_eq!(req.command_path(), "/bin/ls");
        assert_eq!(req.arguments(), ["-al", "/var/root"]);
    }

    #[test]
    fn parse_default_command_line() {
        let req = CommandRequest::parse(DEFAULT_COMMAND_LINE).unwrap();
        assert_eq!(req.command_path(), "/bin/ls");
        assert_eq!(req.arguments().len(), 2);
    }

    #[test]
    fn parse_rejects_blank_line() {
        for line in ["", "   ", "\t\n"] {
            let err = CommandRequest::parse(line).unwrap_err();
            assert_eq!(
                err,
                DomainError::validation(ValidationField::Command, "Command cannot be empty.")
            );
        }
    }

    #[test]
    fn new_rejects_nul() {
        let err = CommandRequest::new("/bin/echo", vec!["a\0b".into()]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn from_wire_normalizes_absent_streams() {
        let result = CommandResult::from_wire(3, None, Some("oops".into()));
        assert_eq!(result.exit_status, 3);
        assert_eq!(result.standard_output, "");
        assert_eq!(result.standard_error, "oops");
    }
}
