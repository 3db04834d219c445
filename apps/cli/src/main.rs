//! hb-cli: 特権ヘルパーのインストール／削除／状態確認と、
//! ヘルパー経由でのコマンド実行を行うフロントエンド CLI。

use clap::{Parser, Subcommand};
use hb_composition::client::ClientRuntime;
use hb_composition::domain::error::ValidationField;
use hb_composition::{CommandResult, DomainError, InstallState, write_lifecycle_line};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

const COMPONENT: &str = "CLI";
const BELL: &str = "\x07";

#[derive(Parser, Debug)]
#[command(name = "hb-cli", about = "Install and drive the HelperBless privileged helper")]
struct Cli {
    /// 設定ファイル（既定: アプリケーションサポート配下の config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// ヘルパーのインストール状態を表示
    Status,
    /// ヘルパーをインストール（SMJobBless。管理者の同意を求められる）
    Install,
    /// ヘルパーを削除
    Remove,
    /// ヘルパーにコマンドを実行させる（省略時は設定の既定コマンド）
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
    /// インストール状態を一定間隔で表示（Ctrl-C で終了）
    Watch,
}

fn main() -> ExitCode {
    hb_composition::init_tracing("hb-cli");
    let cli = Cli::parse();

    let runtime = match ClientRuntime::bootstrap(cli.config.as_deref()) {
        Ok(runtime) => runtime,
        Err(err) => {
            let text = match hb_composition::domain_error(&err) {
                Some(domain) => format!("{}: {}", domain.title(), domain.message()),
                None => format!("Error: {err:#}"),
            };
            eprintln!("{text}");
            write_lifecycle_line(COMPONENT, &format!("bootstrap failed: {err:#}"));
            return ExitCode::from(1);
        }
    };

    match cli.command {
        Command::Status => {
            print_state(runtime.status());
            ExitCode::SUCCESS
        }
        Command::Install => report("install", runtime.install().map(|()| {
            print_state(runtime.status());
        })),
        Command::Remove => report("remove", runtime.remove().map(|()| {
            print_state(runtime.status());
        })),
        Command::Run { line } => {
            let line = command_line(&line, runtime.default_command());
            report("run", runtime.execute_blocking(&line).map(|result| print_result(&result)))
        }
        Command::Watch => watch(&runtime),
    }
}

/// 引数が無ければ既定コマンド。明示された空文字列はそのまま（空として拒否される）
fn command_line(args: &[String], default_command: &str) -> String {
    if args.is_empty() {
        default_command.to_string()
    } else {
        args.join(" ")
    }
}

fn print_state(state: InstallState) {
    println!("Helper: {}", state.label());
}

fn print_result(result: &CommandResult) {
    print!("{}", result.standard_output);
    let _ = std::io::stdout().flush();
    eprint!("{}", result.standard_error);
    println!("Exit status: {}", result.exit_status);
}

/// 失敗はタイトル付きで表示し、ライフサイクルログにも残す
fn report(action: &str, result: Result<(), DomainError>) -> ExitCode {
    match result {
        Ok(()) => {
            write_lifecycle_line(COMPONENT, &format!("{action} ok"));
            ExitCode::SUCCESS
        }
        Err(err) => {
            write_lifecycle_line(COMPONENT, &format!("{action} failed: {err}"));
            if matches!(
                err,
                DomainError::Validation {
                    field: ValidationField::Command,
                    ..
                }
            ) {
                eprint!("{BELL}");
                eprintln!("{}: {}", err.title(), err.message());
                return ExitCode::from(2);
            }
            eprintln!("{}: {}", err.title(), err.message());
            ExitCode::from(1)
        }
    }
}

fn watch(runtime: &ClientRuntime) -> ExitCode {
    let (tx, rx) = mpsc::channel();
    let _task = match runtime.watch(tx) {
        Ok(task) => task,
        Err(err) => {
            eprintln!("Error: {err:#}");
            write_lifecycle_line(COMPONENT, &format!("watch failed: {err:#}"));
            return ExitCode::from(1);
        }
    };
    let mut last = None;
    for state in rx {
        if last != Some(state) {
            print_state(state);
            tracing::debug!(state = state.label(), "install state changed");
            last = Some(state);
        }
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_collects_trailing_words() {
        let cli = Cli::try_parse_from(["hb-cli", "run", "/bin/ls", "-al", "/var/root"]).unwrap();
        match cli.command {
            Command::Run { line } => assert_eq!(line, ["/bin/ls", "-al", "/var/root"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn missing_line_uses_default_command() {
        assert_eq!(command_line(&[], "/bin/ls -al /var/root"), "/bin/ls -al /var/root");
        assert_eq!(command_line(&["".into()], "/bin/ls"), "");
        assert_eq!(
            command_line(&["/bin/echo".into(), "hi".into()], "/bin/ls"),
            "/bin/echo hi"
        );
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["hb-cli", "status", "--config", "/tmp/c.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
    }
}
