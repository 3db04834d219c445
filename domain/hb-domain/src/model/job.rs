/// launchd のジョブデータベースから読み出したレコード（読み取り専用）。
///
/// launchd のキー `Label` と `Program` に対応する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledJobRecord {
    pub label: String,
    pub program: String,
}

impl InstalledJobRecord {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
        }
    }
}

/// is_installed で観測される状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    Installed,
}

impl InstallState {
    pub fn from_installed(installed: bool) -> Self {
        if installed {
            Self::Installed
        } else {
            Self::NotInstalled
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed)
    }

    /// 表示用の文言
    pub fn label(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::NotInstalled => "not installed",
        }
    }
}
