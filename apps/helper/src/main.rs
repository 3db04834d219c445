//! hb-helper: launchd から起動される特権ヘルパー。
//! Unix ソケットで待ち受け、信頼できる呼び出し元のコマンドを実行して結果を返す。

use clap::Parser;
use hb_composition::HelperDomain;
use hb_composition::helper::{HelperOptions, HelperRuntime};
use hb_composition::write_lifecycle_line;
use std::path::PathBuf;
use std::process::ExitCode;

const COMPONENT: &str = "HELPER";

#[derive(Parser, Debug)]
#[command(name = "hb-helper", about = "HelperBless privileged helper")]
struct Args {
    /// ジョブラベル（既定: 埋め込み Info.plist の CFBundleIdentifier）
    #[arg(long)]
    label: Option<String>,
    /// launchd ドメイン（system|user）
    #[arg(long, default_value = "system", value_parser = parse_domain)]
    domain: HelperDomain,
    /// ソケットパス（既定: ドメインとラベルから導出）
    #[arg(long)]
    socket: Option<PathBuf>,
    /// 接続を許可する uid（複数指定可）
    #[arg(long = "allow-uid")]
    allow_uid: Vec<u32>,
    /// 接続を許可する実行ファイルのフルパス（複数指定可）
    #[arg(long = "allow-exe")]
    allow_exe: Vec<String>,
    /// 呼び出し元実行ファイルの SHA-256
    #[arg(long = "client-sha256")]
    client_sha256: Option<String>,
}

fn parse_domain(value: &str) -> Result<HelperDomain, String> {
    HelperDomain::from_str(value).ok_or_else(|| format!("unknown domain '{value}' (expected system or user)"))
}

impl From<Args> for HelperOptions {
    fn from(args: Args) -> Self {
        Self {
            label: args.label,
            domain: args.domain,
            socket: args.socket,
            allow_uids: args.allow_uid,
            allow_exes: args.allow_exe,
            client_sha256: args.client_sha256,
        }
    }
}

fn main() -> ExitCode {
    hb_composition::init_tracing("hb-helper");
    let args = Args::parse();

    let result = HelperRuntime::from_options(args.into()).and_then(|runtime| {
        tracing::info!(
            label = runtime.label().label(),
            socket = %runtime.socket_path().display(),
            "helper starting"
        );
        runtime.run()
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let msg = format!("hb-helper error: {err:#}");
            eprintln!("{msg}");
            write_lifecycle_line(COMPONENT, &msg);
            ExitCode::from(1)
        }
    }
}
