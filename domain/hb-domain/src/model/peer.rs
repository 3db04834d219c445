/// 接続元プロセスのコード署名検証結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// 要件を満たす署名あり
    Satisfied,
    /// 署名はあるが要件を満たさない
    NotSatisfied { reason: String },
    Unsigned,
    Error { message: String },
    Unsupported { reason: String },
}

/// カーネルから取得した接続元の資格情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    pub pid: Option<i32>,
    pub uid: u32,
    pub gid: u32,
    /// 解決できなかった場合は None
    pub executable: Option<String>,
}

/// ヘルパー側のクライアント信頼ルール。
///
/// すべて未設定の場合は誰も信頼しない（fail-closed）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientTrustRules {
    /// コード署名要件（SMAuthorizedClients 由来）
    pub code_requirement: Option<String>,
    /// 許可する実行ファイルのフルパス
    pub allowed_executables: Vec<String>,
    pub allowed_uids: Vec<u32>,
    /// 実行ファイルの SHA-256（16進小文字）
    pub executable_sha256: Option<String>,
}

impl ClientTrustRules {
    pub fn is_empty(&self) -> bool {
        self.code_requirement.is_none()
            && self.allowed_executables.is_empty()
            && self.allowed_uids.is_empty()
            && self.executable_sha256.is_none()
    }
}

/// 信頼判定に使う接続元の証拠一式
#[derive(Debug, Clone)]
pub struct ClientEvidence {
    pub peer: PeerIdentity,
    /// code_requirement 設定時のみ取得
    pub signature: Option<SignatureStatus>,
    /// executable_sha256 設定時のみ取得
    pub executable_sha256: Option<String>,
}
